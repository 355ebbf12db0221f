// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for configuration and model loading

use crate::value::OptionKind;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration errors.
///
/// Always surfaced synchronously at the `set` / construction call that caused
/// them; values are never coerced between kinds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("Type mismatch for option '{name}': expected {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: OptionKind,
        found: OptionKind,
    },

    #[error("Invalid value for option '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Option '{0}' is set per iterator or shape request, not on shared settings")]
    WrongScope(String),

    #[error("Include and exclude filters are mutually exclusive")]
    ConflictingFilters,

    #[error("Thread count must be at least 1, got {0}")]
    InvalidThreadCount(i64),

    #[error("Cannot parse '{text}' as {kind} for option '{name}'")]
    Parse {
        name: String,
        kind: OptionKind,
        text: String,
    },
}

/// Errors raised while acquiring model data
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Cannot read model: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed model data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate element id #{0}")]
    DuplicateElement(u32),

    #[error("Element #{element} references missing element #{target} via {relation}")]
    DanglingReference {
        element: u32,
        target: u32,
        relation: &'static str,
    },
}
