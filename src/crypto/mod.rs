// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cryptographic primitives for the share vault.
//!
//! This module provides:
//! - secp256k1 key handling and wire coordinates (`keys`)
//! - Canonical signing of metadata writes (`signing`)
//! - Public-key envelope encryption, eccrypto compatible (`ecies`)

pub mod ecies;
pub mod keys;
pub mod signing;

pub use ecies::{decrypt_with, encrypt_to, Envelope, EnvelopeHex};
pub use keys::{PrivateKey, PubKeyParams, PublicKey};
pub use signing::{build_signed_record, build_signed_record_at, SetData, SignedRecord};

/// Errors that can occur in key handling, signing, or envelope operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailure(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),
}
