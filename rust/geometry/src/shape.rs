// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary representation of one element
//!
//! Planar polygonal faces plus curves, in a single coordinate frame. This is
//! the form geometry stays in until it is triangulated or serialized.

use crate::triangulation::try_polygon_normal;
use nalgebra::{Matrix4, Point3, Vector3};

/// Material slot meaning "no style"
pub const NO_MATERIAL: i32 = -1;

/// Planar polygon with outward normal
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Counter-clockwise when viewed against `normal`
    pub points: Vec<Point3<f64>>,
    pub normal: Vector3<f64>,
    /// Index into the element's material list, or [`NO_MATERIAL`]
    pub material: i32,
}

impl Face {
    /// Build a face, deriving the normal from the loop.
    /// Returns `None` for loops with fewer than three points or zero area.
    pub fn new(points: Vec<Point3<f64>>, material: i32) -> Option<Self> {
        let normal = try_polygon_normal(&points)?;
        Some(Self {
            points,
            normal,
            material,
        })
    }

    pub fn reversed(mut self) -> Self {
        self.points.reverse();
        self.normal = -self.normal;
        self
    }

    /// Signed distance of the face plane from the origin along its normal
    pub fn plane_offset(&self) -> f64 {
        self.normal.dot(&self.points[0].coords)
    }
}

/// Open or closed polyline
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub points: Vec<Point3<f64>>,
    pub closed: bool,
}

impl Curve {
    /// Number of line segments
    pub fn segment_count(&self) -> usize {
        match self.points.len() {
            0 | 1 => 0,
            n if self.closed => n,
            n => n - 1,
        }
    }
}

/// Faces and curves of one element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub faces: Vec<Face>,
    pub curves: Vec<Curve>,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_faces(faces: Vec<Face>) -> Self {
        Self {
            faces,
            curves: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty() && self.curves.is_empty()
    }

    pub fn has_surfaces(&self) -> bool {
        !self.faces.is_empty()
    }

    pub fn merge(&mut self, other: Shape) {
        self.faces.extend(other.faces);
        self.curves.extend(other.curves);
    }

    /// Assign one material to every face
    pub fn set_material(&mut self, material: i32) {
        for face in &mut self.faces {
            face.material = material;
        }
    }

    /// Apply an affine transform to every point.
    ///
    /// Normals use the inverse transpose so non-uniform scales stay correct.
    pub fn transform(&mut self, transform: &Matrix4<f64>) {
        let normal_matrix = transform
            .try_inverse()
            .unwrap_or(*transform)
            .transpose();

        for face in &mut self.faces {
            for p in &mut face.points {
                *p = transform.transform_point(p);
            }
            let n = (normal_matrix * face.normal.to_homogeneous()).xyz();
            face.normal = n.try_normalize(1e-12).unwrap_or(face.normal);
        }
        for curve in &mut self.curves {
            for p in &mut curve.points {
                *p = transform.transform_point(p);
            }
        }
    }

    /// Uniform scale about the origin
    pub fn scale(&mut self, factor: f64) {
        if factor == 1.0 {
            return;
        }
        self.transform(&Matrix4::new_scaling(factor));
    }

    /// Axis-aligned bounds over all points, `None` when empty
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut points = self
            .faces
            .iter()
            .flat_map(|f| f.points.iter())
            .chain(self.curves.iter().flat_map(|c| c.points.iter()));

        let first = points.next()?;
        let (mut min, mut max) = (*first, *first);
        for p in points {
            min = min.inf(p);
            max = max.sup(p);
        }
        Some((min, max))
    }

    /// Every coordinate is finite
    pub fn is_finite(&self) -> bool {
        self.faces
            .iter()
            .flat_map(|f| f.points.iter())
            .chain(self.curves.iter().flat_map(|c| c.points.iter()))
            .all(|p| p.iter().all(|c| c.is_finite()))
    }

    pub fn vertex_count(&self) -> usize {
        self.faces.iter().map(|f| f.points.len()).sum::<usize>()
            + self.curves.iter().map(|c| c.points.len()).sum::<usize>()
    }
}

/// Whether two axis-aligned boxes overlap, with a tolerance
pub fn bounds_overlap(
    a: &(Point3<f64>, Point3<f64>),
    b: &(Point3<f64>, Point3<f64>),
    tolerance: f64,
) -> bool {
    (0..3).all(|i| a.0[i] <= b.1[i] + tolerance && b.0[i] <= a.1[i] + tolerance)
}
