// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ifcgeom` - generate element geometry from a building model
//!
//! ```text
//! ifcgeom [FLAGS] <INPUT.json> [OUTPUT.obj|OUTPUT.json]
//! ifcgeom --print-settings --weld-vertices
//! ```

use ifcgeom_cli::args::{self, Invocation};
use ifcgeom_cli::config::Config;
use ifcgeom_cli::{logging, run, EXIT_FATAL, EXIT_VALIDATION_FAILED};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = Config::from_env();

    let invocation = match args::parse_from(std::env::args_os(), &config, |name| {
        std::env::var(name).ok()
    }) {
        Ok(invocation) => invocation,
        Err(e) => match e.downcast::<clap::Error>() {
            // --help, --version and usage errors
            Ok(clap_error) => clap_error.exit(),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                return ExitCode::from(EXIT_FATAL as u8);
            }
        },
    };

    let counter = match logging::init(invocation.log_format) {
        Ok(counter) => counter,
        Err(e) => {
            eprintln!("Error: cannot initialize logging: {:#}", e);
            return ExitCode::from(EXIT_FATAL as u8);
        }
    };

    match execute(&invocation) {
        Ok(()) if invocation.validate && counter.count() > 0 => {
            tracing::info!(errors = counter.count(), "Validation failed");
            ExitCode::from(EXIT_VALIDATION_FAILED as u8)
        }
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "Run aborted");
            ExitCode::from(EXIT_FATAL as u8)
        }
    }
}

fn execute(invocation: &Invocation) -> anyhow::Result<()> {
    if invocation.print_settings {
        print!("{}", run::describe_settings(&invocation.settings));
        print!("{}", run::describe_settings(&invocation.serializer));
        if invocation.input.is_none() {
            return Ok(());
        }
    }

    let summary = run::execute(invocation)?;
    tracing::debug!(?summary, "Run summary");
    Ok(())
}
