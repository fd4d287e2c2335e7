// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! tracing subscriber setup for binaries and tests embedding this crate.
//!
//! Reads `RUST_LOG` (default `info`) and `LOG_FORMAT` (`json` or `pretty`).
//! The library itself only emits events; installing a subscriber is the
//! caller's choice.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LOG_FORMAT_ENV;

const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Unknown values fall back to `Pretty`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_ENV)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }
}

/// Install the global subscriber using the environment.
///
/// Returns `false` if a subscriber was already installed.
pub fn init_tracing() -> bool {
    init_tracing_with(LogFormat::from_env())
}

pub fn init_tracing_with(format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let result = match format {
        LogFormat::Json => fmt()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .try_init(),
        LogFormat::Pretty => fmt().with_env_filter(filter).with_target(false).try_init(),
    };
    result.is_ok()
}
