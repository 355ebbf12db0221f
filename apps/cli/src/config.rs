// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Runtime configuration loaded from environment variables.
//!
//! Geometry options are read from `IFCGEOM_<OPTION>` by
//! [`Settings::apply_env`](ifcgeom_core::Settings::apply_env); this covers the
//! process-level knobs that are not options.

use clap::ValueEnum;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// CLI runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Worker threads when `--threads` is not given.
    pub threads: usize,
    /// Log format when `--log-format` is not given.
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            threads: lookup("IFCGEOM_THREADS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or_else(num_cpus::get),
            log_format: lookup("IFCGEOM_LOG_FORMAT")
                .and_then(|v| LogFormat::parse(&v))
                .unwrap_or_default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars() {
        let config = Config::from_vars(|name| match name {
            "IFCGEOM_THREADS" => Some("3".into()),
            "IFCGEOM_LOG_FORMAT" => Some("JSON".into()),
            _ => None,
        });
        assert_eq!(config.threads, 3);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = Config::from_vars(|name| match name {
            "IFCGEOM_THREADS" => Some("0".into()),
            "IFCGEOM_LOG_FORMAT" => Some("xml".into()),
            _ => None,
        });
        assert_eq!(config.threads, num_cpus::get());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }
}
