// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Metadata store client contract.
//!
//! The store is an external key-addressed service: one opaque string slot
//! per `(public key, namespace)`, written only with a [`SignedRecord`] that
//! recovers to that key. An empty string is the "absent" sentinel.
//!
//! ## Implementations
//!
//! - [`HttpMetadataStore`] talks to a real store over HTTPS
//! - [`InMemoryMetadataStore`] keeps slots in process and verifies signatures
//!   the way a conforming server does

mod http;
mod memory;

pub use http::HttpMetadataStore;
pub use memory::InMemoryMetadataStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::crypto::{
    build_signed_record, CryptoError, PrivateKey, PubKeyParams, SetData, SignedRecord,
};

/// Errors talking to a metadata store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Metadata store read failed: {0}")]
    Read(String),

    #[error("Metadata store write failed: {0}")]
    Write(String),

    #[error("Metadata store configuration invalid: {0}")]
    Config(String),
}

/// Body of `POST /set`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetMetadataRequest {
    #[serde(rename = "pub_key_X")]
    pub pub_key_x: String,
    #[serde(rename = "pub_key_Y")]
    pub pub_key_y: String,
    pub set_data: SetData,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl SetMetadataRequest {
    pub fn new(record: &SignedRecord, namespace: Option<&str>) -> Self {
        Self {
            pub_key_x: record.pub_key_x.clone(),
            pub_key_y: record.pub_key_y.clone(),
            set_data: record.set_data.clone(),
            signature: record.signature.clone(),
            namespace: namespace.map(str::to_string),
        }
    }

    pub fn into_record(self) -> (SignedRecord, Option<String>) {
        (
            SignedRecord {
                pub_key_x: self.pub_key_x,
                pub_key_y: self.pub_key_y,
                set_data: self.set_data,
                signature: self.signature,
            },
            self.namespace,
        )
    }
}

/// Body of `POST /get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetMetadataRequest {
    #[serde(rename = "pub_key_X")]
    pub pub_key_x: String,
    #[serde(rename = "pub_key_Y")]
    pub pub_key_y: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl GetMetadataRequest {
    pub fn new(pub_key: &PubKeyParams, namespace: Option<&str>) -> Self {
        Self {
            pub_key_x: pub_key.pub_key_x.clone(),
            pub_key_y: pub_key.pub_key_y.clone(),
            namespace: namespace.map(str::to_string),
        }
    }

    pub fn pub_key(&self) -> PubKeyParams {
        PubKeyParams {
            pub_key_x: self.pub_key_x.clone(),
            pub_key_y: self.pub_key_y.clone(),
        }
    }
}

/// Response body of both endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// A key-addressed metadata store.
///
/// `namespace: None` addresses the store's default namespace. Calls are not
/// cached and every call is one round trip.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Overwrite the slot named by the record's public key.
    ///
    /// Resending the same record is safe. Returns the store's message.
    async fn set_metadata(
        &self,
        record: &SignedRecord,
        namespace: Option<&str>,
    ) -> Result<String, StoreError>;

    /// Read a slot. `Ok("")` means nothing is stored there.
    async fn get_metadata(
        &self,
        pub_key: &PubKeyParams,
        namespace: Option<&str>,
    ) -> Result<String, StoreError>;

    /// Clock skew against the store, applied when stamping writes.
    fn server_time_offset_ms(&self) -> i64 {
        0
    }

    /// Sign `message` with `key`, stamped with the store-adjusted time.
    fn generate_metadata_params(
        &self,
        message: &str,
        key: &PrivateKey,
    ) -> Result<SignedRecord, CryptoError> {
        build_signed_record(message, key, self.server_time_offset_ms())
    }
}
