// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line front end of the geometry iterator.
//!
//! The binary is a thin wrapper: [`args::parse_from`] resolves flags,
//! environment and profile defaults into an [`args::Invocation`], and
//! [`run::execute`] drives one batch run with it.

pub mod args;
pub mod config;
pub mod logging;
pub mod run;

/// Exit code when `--validate` saw an ERROR event
pub const EXIT_VALIDATION_FAILED: i32 = 1;
/// Exit code for configuration and fatal run errors
pub const EXIT_FATAL: i32 = 2;
