// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # IfcGeom Core
//!
//! Configuration contract and element model for IFC geometry iteration.
//!
//! ## Overview
//!
//! - **Option registry**: static, process-wide tables of named options with
//!   kinds, defaults and scopes
//! - **Settings**: mutable, validated settings objects and frozen snapshots
//! - **Element model**: elements, placements, representations, styles and
//!   material associations decoded from JSON
//! - **Filters and contexts**: include/exclude filters and representation
//!   context selection
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ifcgeom_core::{keys, names, Settings};
//!
//! let mut settings = Settings::new();
//! settings.set(names::WELD_VERTICES, false)?;
//! settings.set(names::MODEL_OFFSET, [0.0, 0.0, -10.0])?;
//!
//! assert!(!settings.value(keys::WELD_VERTICES));
//! assert!(settings.set(names::WELD_VERTICES, 1.5).is_err());
//! ```

pub mod context;
pub mod error;
pub mod filter;
pub mod model;
pub mod registry;
pub mod schema;
pub mod settings;
pub mod value;

pub use context::{ContextSelector, DEFAULT_CONTEXT_TYPE};
pub use error::{ConfigError, ModelError, Result};
pub use filter::{ElementFilter, FilterKind, FilterSpec, ResolvedFilter, DEFAULT_EXCLUDED_TYPES};
pub use model::{
    Element, ItemGeometry, LayerAxis, Material, MaterialAssociation, MaterialLayer, Model,
    Placement, Representation, RepresentationContext, RepresentationItem, Style,
};
pub use registry::{names, OptionDef, Profile, Registry, Scope};
pub use schema::IfcType;
pub use settings::{
    env_var_name, keys, GeometryOptions, Key, OptionSet, OptionType, SerializerOptions,
    SerializerSettings, Settings, SettingsSnapshot, ENV_PREFIX,
};
pub use value::{Dimensionality, IteratorOutput, ObjectRef, OptionKind, OptionValue};
