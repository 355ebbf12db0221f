// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometry iteration over an element model.
//!
//! [`GeometryIterator`] drives a batch run over many elements on a rayon
//! worker pool; [`create_shape`] processes a single element synchronously.
//! Both read an immutable [`SettingsSnapshot`](ifcgeom_core::SettingsSnapshot)
//! and share the same per-element [`Pipeline`].
//!
//! ```rust,ignore
//! use ifcgeom_core::{names, Model, Settings};
//! use ifcgeom_processing::{GeometryIterator, RunParameters};
//! use std::sync::Arc;
//!
//! let settings = Settings::new().with(names::WELD_VERTICES, false)?;
//! let params = RunParameters::builder(settings.snapshot()).threads(4).build()?;
//! let mut iterator = GeometryIterator::new(Arc::new(Model::open("model.json")?), params)?;
//! if iterator.initialize()? {
//!     for shape in &mut iterator {
//!         println!("#{} {} triangles", shape.id, shape.mesh().map_or(0, |m| m.triangle_count()));
//!     }
//! }
//! ```

pub mod error;
pub mod iterator;
pub mod mapping;
pub mod materials;
pub mod output;
pub mod params;
pub mod pipeline;
pub mod serializer;
pub mod shape;

pub use error::{ElementError, ElementErrorKind, FatalError, RunError};
pub use iterator::{CancelHandle, GeometryIterator, RunState, RunSummary};
pub use materials::OutputMaterial;
pub use output::{ElementShape, Geometry, ItemShape};
pub use params::{RunParameters, RunParametersBuilder};
pub use pipeline::Pipeline;
pub use serializer::ObjSerializer;
pub use shape::{
    create_shape, create_shape_for_item, create_shape_with_representation, ShapeError,
};
