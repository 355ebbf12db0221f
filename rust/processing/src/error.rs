// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use ifcgeom_core::{ConfigError, ModelError};
use thiserror::Error;

/// Why a single element produced no geometry
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ElementErrorKind {
    #[error("element not found in model")]
    NotFound,

    #[error("no representation in the selected contexts")]
    NoRepresentation,

    #[error("representation {0} not found")]
    UnknownRepresentation(u32),

    #[error("no geometry of the requested dimensionality")]
    NoGeometry,

    #[error("invalid placement: {0}")]
    InvalidPlacement(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Geometry(#[from] ifcgeom_geometry::Error),
}

/// Failure scoped to one element; a batch run continues past it
#[derive(Debug, Clone, Error, PartialEq)]
#[error("#{id} ({entity}): {kind}")]
pub struct ElementError {
    pub id: u32,
    pub entity: String,
    pub kind: ElementErrorKind,
}

impl ElementError {
    pub fn new(id: u32, entity: impl Into<String>, kind: impl Into<ElementErrorKind>) -> Self {
        Self {
            id,
            entity: entity.into(),
            kind: kind.into(),
        }
    }

    /// Elements that have nothing to emit are skipped rather than reported
    pub fn is_skip(&self) -> bool {
        matches!(
            self.kind,
            ElementErrorKind::NoRepresentation | ElementErrorKind::NoGeometry
        )
    }
}

/// Errors that abort a run
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("model data unavailable: {0}")]
    Model(#[from] ModelError),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors surfaced when constructing or initialising a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl From<ModelError> for RunError {
    fn from(err: ModelError) -> Self {
        RunError::Fatal(FatalError::Model(err))
    }
}

pub type Result<T> = std::result::Result<T, RunError>;
