// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Extrusion operations - converting 2D profiles to closed solids

use crate::error::{Error, Result};
use crate::profile::Profile2D;
use crate::shape::{Face, Shape};
use nalgebra::{Matrix4, Point2, Point3};

/// Extrude a counter-clockwise 2D profile along +Z into a closed shell.
///
/// Produces one bottom cap, one top cap and one quad per profile edge, all
/// carrying `material`.
pub fn extrude_profile(
    profile: &Profile2D,
    depth: f64,
    material: i32,
    transform: Option<&Matrix4<f64>>,
) -> Result<Shape> {
    if !(depth.is_finite() && depth > 0.0) {
        return Err(Error::InvalidExtrusion(format!(
            "Depth must be positive, got {}",
            depth
        )));
    }

    let outer = &profile.outer;
    if outer.len() < 3 {
        return Err(Error::InvalidProfile(
            "Profile must have at least 3 vertices".to_string(),
        ));
    }

    let mut faces = Vec::with_capacity(outer.len() + 2);

    let bottom: Vec<Point3<f64>> = outer.iter().rev().map(|p| lift(p, 0.0)).collect();
    let top: Vec<Point3<f64>> = outer.iter().map(|p| lift(p, depth)).collect();
    for cap in [bottom, top] {
        let face = Face::new(cap, material)
            .ok_or_else(|| Error::InvalidProfile("Profile cap is degenerate".to_string()))?;
        faces.push(face);
    }

    create_side_walls(outer, depth, material, &mut faces);

    let mut shape = Shape::from_faces(faces);
    if let Some(mat) = transform {
        shape.transform(mat);
    }
    Ok(shape)
}

#[inline]
fn lift(p: &Point2<f64>, z: f64) -> Point3<f64> {
    Point3::new(p.x, p.y, z)
}

/// Create side walls for a profile boundary
fn create_side_walls(boundary: &[Point2<f64>], depth: f64, material: i32, faces: &mut Vec<Face>) {
    for i in 0..boundary.len() {
        let j = (i + 1) % boundary.len();

        let p0 = &boundary[i];
        let p1 = &boundary[j];

        let quad = vec![lift(p0, 0.0), lift(p1, 0.0), lift(p1, depth), lift(p0, depth)];

        // Degenerate edges (duplicate points) yield no face
        if let Some(face) = Face::new(quad, material) {
            faces.push(face);
        }
    }
}
