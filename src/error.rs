// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Errors returned by the share vault API.
//!
//! "Nothing stored" is never an error: reads return `Ok(None)`. Errors mean
//! the store could not be reached, or data exists but cannot be read.

use crate::crypto::CryptoError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// An envelope did not open with the supplied key.
    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),

    /// The stored map for this owner and namespace cannot be opened with
    /// the owner key. Retrying will not help.
    #[error("Vault {namespace} is corrupted: {reason}")]
    VaultCorrupted { namespace: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Crypto(CryptoError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ShareError {
    /// Transport failures are worth retrying (writes only after a re-read).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ShareError::Store(StoreError::Read(_)) | ShareError::Store(StoreError::Write(_))
        )
    }
}

impl From<CryptoError> for ShareError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidPrivateKey(msg) => ShareError::InvalidPrivateKey(msg),
            CryptoError::InvalidPublicKey(msg) => ShareError::InvalidPublicKey(msg),
            CryptoError::DecryptionFailure(msg) => ShareError::DecryptionFailure(msg),
            other => ShareError::Crypto(other),
        }
    }
}

impl From<serde_json::Error> for ShareError {
    fn from(e: serde_json::Error) -> Self {
        ShareError::Serialization(e.to_string())
    }
}
