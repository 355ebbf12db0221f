// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Representation items to shapes
//!
//! Every item kind of the element model maps to faces (boxes, meshes,
//! extrusions) or curves (polylines, circles) in the element's local frame.

use crate::error::{Error, Result};
use crate::extrusion::extrude_profile;
use crate::profile::{circle_points, create_circle, Profile2D};
use crate::shape::{Curve, Face, Shape};
use crate::transform::placement_matrix;
use ifcgeom_core::{ItemGeometry, Placement};
use nalgebra::{Matrix4, Point3};

/// Parameters shared by all items of one element
#[derive(Debug, Clone, Copy)]
pub struct TessellationParams {
    /// Segments used for full circles
    pub circle_segments: usize,
    /// Length below which points are considered coincident
    pub tolerance: f64,
}

impl Default for TessellationParams {
    fn default() -> Self {
        Self {
            circle_segments: 16,
            tolerance: 1e-9,
        }
    }
}

/// Convert one representation item into a shape whose faces carry `material`
pub fn item_to_shape(
    item: &ItemGeometry,
    material: i32,
    params: &TessellationParams,
) -> Result<Shape> {
    match item {
        ItemGeometry::Box { min, max } => box_shape(Point3::from(*min), Point3::from(*max), material),
        ItemGeometry::Mesh { vertices, faces } => mesh_shape(vertices, faces, material, params),
        ItemGeometry::Extrusion {
            profile,
            depth,
            position,
        } => {
            let profile = Profile2D::from_coords(profile).validated(params.tolerance)?;
            let transform = position_matrix(position.as_ref())?;
            extrude_profile(&profile, *depth, material, transform.as_ref())
        }
        ItemGeometry::CircleExtrusion {
            radius,
            depth,
            position,
        } => {
            let profile = create_circle(*radius, params.circle_segments)?;
            let transform = position_matrix(position.as_ref())?;
            extrude_profile(&profile, *depth, material, transform.as_ref())
        }
        ItemGeometry::Polyline { points } => {
            if points.len() < 2 {
                return Err(Error::DegenerateShape(format!(
                    "polyline needs at least 2 points, got {}",
                    points.len()
                )));
            }
            let closed = points.len() > 2 && points.first() == points.last();
            let mut pts: Vec<Point3<f64>> = points.iter().map(|p| Point3::from(*p)).collect();
            if closed {
                pts.pop();
            }
            Ok(Shape {
                faces: Vec::new(),
                curves: vec![Curve {
                    points: pts,
                    closed,
                }],
            })
        }
        ItemGeometry::Circle { radius, center } => {
            if !(radius.is_finite() && *radius > 0.0) {
                return Err(Error::DegenerateShape(format!(
                    "circle radius must be positive, got {}",
                    radius
                )));
            }
            let points = circle_points(*radius, params.circle_segments)
                .into_iter()
                .map(|p| Point3::new(center[0] + p.x, center[1] + p.y, center[2]))
                .collect();
            Ok(Shape {
                faces: Vec::new(),
                curves: vec![Curve {
                    points,
                    closed: true,
                }],
            })
        }
    }
}

fn position_matrix(position: Option<&Placement>) -> Result<Option<Matrix4<f64>>> {
    position.map(placement_matrix).transpose()
}

/// Axis-aligned block with outward-facing quads
pub fn box_shape(min: Point3<f64>, max: Point3<f64>, material: i32) -> Result<Shape> {
    if !(0..3).all(|i| max[i] > min[i]) {
        return Err(Error::DegenerateShape(format!(
            "box extent must be positive, got min {:?} max {:?}",
            min.coords.as_slice(),
            max.coords.as_slice()
        )));
    }

    let v = [
        Point3::new(min.x, min.y, min.z), // 0: front-bottom-left
        Point3::new(max.x, min.y, min.z), // 1: front-bottom-right
        Point3::new(max.x, max.y, min.z), // 2: front-top-right
        Point3::new(min.x, max.y, min.z), // 3: front-top-left
        Point3::new(min.x, min.y, max.z), // 4: back-bottom-left
        Point3::new(max.x, min.y, max.z), // 5: back-bottom-right
        Point3::new(max.x, max.y, max.z), // 6: back-top-right
        Point3::new(min.x, max.y, max.z), // 7: back-top-left
    ];

    // Counter-clockwise when viewed from outside
    const QUADS: [[usize; 4]; 6] = [
        [0, 3, 2, 1], // -Z
        [4, 5, 6, 7], // +Z
        [0, 4, 7, 3], // -X
        [1, 2, 6, 5], // +X
        [0, 1, 5, 4], // -Y
        [3, 7, 6, 2], // +Y
    ];

    let faces = QUADS
        .iter()
        .filter_map(|q| Face::new(q.iter().map(|&i| v[i]).collect(), material))
        .collect();
    Ok(Shape::from_faces(faces))
}

fn mesh_shape(
    vertices: &[[f64; 3]],
    faces: &[Vec<u32>],
    material: i32,
    params: &TessellationParams,
) -> Result<Shape> {
    if let Some(v) = vertices.iter().find(|v| v.iter().any(|c| !c.is_finite())) {
        return Err(Error::DegenerateShape(format!("non-finite vertex {:?}", v)));
    }

    let mut out = Vec::with_capacity(faces.len());
    let mut dropped = 0usize;
    for (face_index, face) in faces.iter().enumerate() {
        let mut points = Vec::with_capacity(face.len());
        for &index in face {
            let vertex = vertices.get(index as usize).ok_or_else(|| {
                Error::DegenerateShape(format!(
                    "face {} references vertex {} of {}",
                    face_index,
                    index,
                    vertices.len()
                ))
            })?;
            points.push(Point3::from(*vertex));
        }
        points.dedup_by(|a, b| (*a - *b).norm() <= params.tolerance);

        match Face::new(points, material) {
            Some(f) => out.push(f),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!(dropped, total = faces.len(), "Dropped degenerate mesh faces");
    }
    if out.is_empty() {
        return Err(Error::EmptyMesh(format!(
            "none of {} faces is a valid polygon",
            faces.len()
        )));
    }
    Ok(Shape::from_faces(out))
}
