// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement and model transforms
//!
//! Converts element placements into 4x4 matrices and builds the model-wide
//! offset/rotation transform applied to every output placement.

use crate::error::{Error, Result};
use ifcgeom_core::Placement;
use nalgebra::{Matrix4, Quaternion, UnitQuaternion, Vector3};

/// Axis placement into a local-to-parent transformation matrix.
///
/// `axis` is the local Z (default +Z), `ref_direction` the local X (default
/// +X), projected to be orthogonal to Z.
pub fn axis2_placement(
    location: [f64; 3],
    axis: Option<[f64; 3]>,
    ref_direction: Option<[f64; 3]>,
) -> Result<Matrix4<f64>> {
    let z_axis = match axis {
        Some(a) => Vector3::from(a)
            .try_normalize(1e-12)
            .ok_or_else(|| Error::DegenerateShape("placement axis has zero length".into()))?,
        None => Vector3::z(),
    };
    let x_axis = match ref_direction {
        Some(r) => Vector3::from(r)
            .try_normalize(1e-12)
            .ok_or_else(|| Error::DegenerateShape("placement ref direction has zero length".into()))?,
        None => Vector3::x(),
    };

    // Ensure X is orthogonal to Z (project X onto plane perpendicular to Z)
    let x_axis_orthogonal = x_axis - z_axis * x_axis.dot(&z_axis);
    let x_axis_final = match x_axis_orthogonal.try_normalize(1e-6) {
        Some(x) => x,
        // X and Z are parallel or nearly parallel - use a default perpendicular direction
        None if z_axis.z.abs() < 0.9 => Vector3::z().cross(&z_axis).normalize(),
        None => Vector3::x().cross(&z_axis).normalize(),
    };

    // Y axis is cross product of Z and X (right-hand rule: Y = Z x X)
    let y_axis = z_axis.cross(&x_axis_final).normalize();

    // Columns represent parent-space directions of local axes
    let mut transform = Matrix4::identity();
    transform
        .fixed_view_mut::<3, 1>(0, 0)
        .copy_from(&x_axis_final);
    transform.fixed_view_mut::<3, 1>(0, 1).copy_from(&y_axis);
    transform.fixed_view_mut::<3, 1>(0, 2).copy_from(&z_axis);
    transform
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&Vector3::from(location));

    if !transform.iter().all(|v| v.is_finite()) {
        return Err(Error::DegenerateShape("placement is not finite".into()));
    }
    Ok(transform)
}

/// Resolve a placement chain into an object-to-world matrix
pub fn placement_matrix(placement: &Placement) -> Result<Matrix4<f64>> {
    let local = axis2_placement(placement.location, placement.axis, placement.ref_direction)?;
    match &placement.relative_to {
        Some(parent) => Ok(placement_matrix(parent)? * local),
        None => Ok(local),
    }
}

/// Model-wide offset and rotation.
///
/// The offset is applied first, then the rotation: `M = R * T`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelTransform {
    pub offset: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            offset: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }
}

impl ModelTransform {
    /// From `model-offset` (x, y, z) and `model-rotation` (x, y, z, w)
    pub fn new(offset: [f64; 3], rotation: [f64; 4]) -> Result<Self> {
        let [x, y, z, w] = rotation;
        let q = Quaternion::new(w, x, y, z);
        if q.norm() < 1e-12 {
            return Err(Error::DegenerateShape(
                "model rotation quaternion has zero length".into(),
            ));
        }
        Ok(Self {
            offset: Vector3::from(offset),
            rotation: UnitQuaternion::from_quaternion(q),
        })
    }

    pub fn is_identity(&self) -> bool {
        self.offset == Vector3::zeros() && self.rotation == UnitQuaternion::identity()
    }

    pub fn matrix(&self) -> Matrix4<f64> {
        self.rotation.to_homogeneous() * Matrix4::new_translation(&self.offset)
    }

    /// Apply to an object placement matrix
    pub fn apply(&self, placement: &Matrix4<f64>) -> Matrix4<f64> {
        if self.is_identity() {
            *placement
        } else {
            self.matrix() * placement
        }
    }
}

/// Scale the translation part of a matrix, leaving the rotation untouched
pub fn scale_translation(matrix: &Matrix4<f64>, factor: f64) -> Matrix4<f64> {
    let mut scaled = *matrix;
    for row in 0..3 {
        scaled[(row, 3)] *= factor;
    }
    scaled
}

/// Row-major 3x4 representation used in output records
pub fn to_row_major_3x4(matrix: &Matrix4<f64>) -> [f64; 12] {
    let mut out = [0.0; 12];
    for row in 0..3 {
        for col in 0..4 {
            out[row * 4 + col] = matrix[(row, col)];
        }
    }
    out
}
