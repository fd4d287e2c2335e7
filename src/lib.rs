// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Share Vault - signed, encrypted share storage
//!
//! Stores small secret shares in a remote metadata store addressed by a
//! secp256k1 public key. Every write is signed by the owner key, and every
//! stored value is encrypted so the store only ever sees ciphertext.
//!
//! ## Modules
//!
//! - `crypto` - Keys, canonical signing, envelope encryption
//! - `store` - Metadata store client (HTTPS and in-memory)
//! - `vault` - Device and shared subspace vaults
//! - `resolver` - Public share API
//! - `config` - Store client configuration
//! - `logging` - tracing subscriber setup

pub mod config;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod store;
pub mod vault;

pub use config::MetadataConfig;
pub use crypto::{PrivateKey, PubKeyParams, PublicKey};
pub use error::ShareError;
pub use resolver::ShareResolver;
pub use store::{HttpMetadataStore, InMemoryMetadataStore, MetadataStore, StoreError};
pub use vault::VaultNamespace;
