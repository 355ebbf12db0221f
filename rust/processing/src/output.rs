// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Result geometry records

use crate::materials::OutputMaterial;
use ifcgeom_geometry::transform::to_row_major_3x4;
use ifcgeom_geometry::{Matrix4, Mesh, Shape};
use serde::Serialize;

/// Geometry of one element, in the form selected by `iterator-output`
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Triangulated(Mesh),
    /// JSON boundary representation of faces and curves
    Serialized(String),
}

/// One processed element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementShape {
    pub id: u32,
    pub guid: String,
    pub name: Option<String>,
    pub entity: String,
    /// Identifier of the context the geometry came from (e.g. `Body`)
    pub context: String,
    /// Object-to-world matrix; identity when `use-world-coords` is set
    pub transformation: Matrix4<f64>,
    pub geometry: Geometry,
    /// Materials referenced by face / triangle material ids
    pub materials: Vec<OutputMaterial>,
}

impl ElementShape {
    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.geometry {
            Geometry::Triangulated(mesh) => Some(mesh),
            Geometry::Serialized(_) => None,
        }
    }

    pub fn serialized(&self) -> Option<&str> {
        match &self.geometry {
            Geometry::Serialized(brep) => Some(brep),
            Geometry::Triangulated(_) => None,
        }
    }

    /// Transformation as a row-major 3x4 matrix
    pub fn matrix(&self) -> [f64; 12] {
        to_row_major_3x4(&self.transformation)
    }

    /// Triangulated geometry with the transformation applied
    pub fn world_mesh(&self) -> Option<Mesh> {
        let mut mesh = self.mesh()?.clone();
        if self.transformation != Matrix4::identity() {
            mesh.transform(&self.transformation);
        }
        Some(mesh)
    }
}

/// Geometry of one representation item requested on its own
#[derive(Debug, Clone, PartialEq)]
pub struct ItemShape {
    /// Model transform; identity when `use-world-coords` is set
    pub transformation: Matrix4<f64>,
    pub geometry: Geometry,
    pub materials: Vec<OutputMaterial>,
}

impl ItemShape {
    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.geometry {
            Geometry::Triangulated(mesh) => Some(mesh),
            Geometry::Serialized(_) => None,
        }
    }
}

#[derive(Serialize)]
struct SerializedFace {
    points: Vec<[f64; 3]>,
    normal: [f64; 3],
    material: i32,
}

#[derive(Serialize)]
struct SerializedCurve {
    points: Vec<[f64; 3]>,
    closed: bool,
}

#[derive(Serialize)]
struct SerializedShape {
    faces: Vec<SerializedFace>,
    curves: Vec<SerializedCurve>,
}

/// JSON boundary representation of a shape
pub fn serialize_shape(shape: &Shape) -> serde_json::Result<String> {
    let brep = SerializedShape {
        faces: shape
            .faces
            .iter()
            .map(|f| SerializedFace {
                points: f.points.iter().map(|p| [p.x, p.y, p.z]).collect(),
                normal: [f.normal.x, f.normal.y, f.normal.z],
                material: f.material,
            })
            .collect(),
        curves: shape
            .curves
            .iter()
            .map(|c| SerializedCurve {
                points: c.points.iter().map(|p| [p.x, p.y, p.z]).collect(),
                closed: c.closed,
            })
            .collect(),
    };
    serde_json::to_string(&brep)
}
