// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IfcGeom Geometry Processing
//!
//! Tessellation of element representation items into faces and curves,
//! opening subtraction and layer slicing with csgrs, earcutr triangulation
//! and nalgebra for transformations.

pub mod csg;
pub mod error;
pub mod extrusion;
pub mod mesh;
pub mod profile;
pub mod shape;
pub mod tessellate;
pub mod transform;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Matrix4, Point2, Point3, Vector2, Vector3};

pub use csg::ClippingProcessor;
pub use error::{Error, Result};
pub use extrusion::extrude_profile;
pub use mesh::Mesh;
pub use profile::Profile2D;
pub use shape::{Curve, Face, Shape, NO_MATERIAL};
pub use tessellate::{box_shape, item_to_shape, TessellationParams};
pub use transform::{placement_matrix, ModelTransform};
pub use triangulation::triangulate_polygon;
