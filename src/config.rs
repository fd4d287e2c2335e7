// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Environment variable names and defaults for the metadata store client.
//! Configuration is an explicit value handed to each client; nothing here is
//! process-global.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `METADATA_HOST` | Base URL of the metadata store | `https://metadata.tor.us` |
//! | `METADATA_SERVER_TIME_OFFSET_MS` | Clock skew against the store, in milliseconds | `0` |
//! | `METADATA_API_KEY` | Sent as `x-api-key` on every request | Optional |
//! | `METADATA_EMBED_HOST` | Sent as `x-embed-host` on every request | Optional |
//! | `METADATA_REQUEST_TIMEOUT_SECS` | HTTP request timeout | `15` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::time::Duration;

use url::Url;

use crate::store::StoreError;

/// Environment variable name for the metadata store base URL.
pub const METADATA_HOST_ENV: &str = "METADATA_HOST";

/// Environment variable name for the server clock offset.
///
/// Signed milliseconds added to the local clock before a write is stamped.
pub const METADATA_SERVER_TIME_OFFSET_ENV: &str = "METADATA_SERVER_TIME_OFFSET_MS";

/// Environment variable name for the store API key.
pub const METADATA_API_KEY_ENV: &str = "METADATA_API_KEY";

/// Environment variable name for the embedding host header.
pub const METADATA_EMBED_HOST_ENV: &str = "METADATA_EMBED_HOST";

/// Environment variable name for the HTTP request timeout in seconds.
pub const METADATA_REQUEST_TIMEOUT_ENV: &str = "METADATA_REQUEST_TIMEOUT_SECS";

/// Environment variable name for the log output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_METADATA_HOST: &str = "https://metadata.tor.us";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Connection settings for one metadata store client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataConfig {
    /// Validated `http`/`https` base URL.
    pub host: String,
    pub server_time_offset_ms: i64,
    pub api_key: Option<String>,
    pub embed_host: Option<String>,
    pub request_timeout: Duration,
}

impl MetadataConfig {
    /// Settings for a store at `host` with every other value defaulted.
    pub fn new(host: &str) -> Result<Self, StoreError> {
        Ok(Self {
            host: parse_host(host)?,
            ..Self::default()
        })
    }

    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable source.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = match get(METADATA_HOST_ENV) {
            Some(value) => parse_host(&value)?,
            None => DEFAULT_METADATA_HOST.to_string(),
        };

        let server_time_offset_ms = match get(METADATA_SERVER_TIME_OFFSET_ENV) {
            Some(value) => value.parse::<i64>().map_err(|e| {
                StoreError::Config(format!("{METADATA_SERVER_TIME_OFFSET_ENV}: {e}"))
            })?,
            None => 0,
        };

        let request_timeout = match get(METADATA_REQUEST_TIMEOUT_ENV) {
            Some(value) => Duration::from_secs(value.parse::<u64>().map_err(|e| {
                StoreError::Config(format!("{METADATA_REQUEST_TIMEOUT_ENV}: {e}"))
            })?),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        Ok(Self {
            host,
            server_time_offset_ms,
            api_key: get(METADATA_API_KEY_ENV),
            embed_host: get(METADATA_EMBED_HOST_ENV),
            request_timeout,
        })
    }

    pub fn with_server_time_offset_ms(mut self, offset_ms: i64) -> Self {
        self.server_time_offset_ms = offset_ms;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_embed_host(mut self, embed_host: impl Into<String>) -> Self {
        self.embed_host = Some(embed_host.into());
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Absolute URL for an endpoint path such as `set` or `get`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.host.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_METADATA_HOST.to_string(),
            server_time_offset_ms: 0,
            api_key: None,
            embed_host: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

fn parse_host(value: &str) -> Result<String, StoreError> {
    let url = Url::parse(value)
        .map_err(|e| StoreError::Config(format!("{METADATA_HOST_ENV}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(value.to_string()),
        other => Err(StoreError::Config(format!(
            "{METADATA_HOST_ENV}: unsupported scheme {other}"
        ))),
    }
}
