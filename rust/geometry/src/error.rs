// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Invalid extrusion parameters: {0}")]
    InvalidExtrusion(String),

    #[error("Degenerate shape: {0}")]
    DegenerateShape(String),

    #[error("Self-intersecting wire: {0}")]
    SelfIntersectingWire(String),

    #[error("Boolean operation failed: {0}")]
    BooleanFailed(String),

    #[error("Empty mesh: {0}")]
    EmptyMesh(String),
}
