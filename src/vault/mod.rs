// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Subspace vaults.
//!
//! One owner key and one namespace address a single store slot. The slot
//! holds a [`SubspaceMap`] encrypted to the owner's own public key. Writes
//! are a read-modify-write of the whole map:
//!
//! ```text
//! get slot -> decrypt with owner key -> map[label] = value
//!          -> encrypt to owner key -> sign -> set slot
//! ```
//!
//! There is no version token on the slot. Two writers touching the same
//! owner and namespace at once can lose one update (last write wins for the
//! whole map), so callers with overlapping writers must serialize them.
//!
//! ## Policies
//!
//! - [`DeviceVault`]: values stored as JSON inside the owner's map
//! - [`SharedVault`]: values encrypted to a recipient key before they enter
//!   the submitter's map, so reading needs both keys

mod device;
mod shared;

pub use device::DeviceVault;
pub use shared::SharedVault;

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::crypto::{
    decrypt_with, encrypt_to, CryptoError, Envelope, EnvelopeHex, PrivateKey, PublicKey,
};
use crate::error::ShareError;
use crate::store::MetadataStore;

/// Label -> value map stored in one slot.
///
/// Entries this client does not understand are carried through writes
/// untouched.
pub type SubspaceMap = BTreeMap<String, Value>;

/// Store namespaces used by the vaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VaultNamespace {
    /// Two-layer vault for shares deposited for another device.
    SharedShare,
    /// Single-layer vault readable only by its owner.
    DeviceShare,
}

impl VaultNamespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            VaultNamespace::SharedShare => "webauthn_torus_share",
            VaultNamespace::DeviceShare => "webauthn_device_share",
        }
    }
}

impl fmt::Display for VaultNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialize `data` to JSON and seal it to `recipient`.
///
/// Returns the JSON text of the hex envelope, ready to store.
pub fn encrypt_data<T>(recipient: &PublicKey, data: &T) -> Result<String, ShareError>
where
    T: Serialize + ?Sized,
{
    let envelope = seal_value(recipient, data)?;
    Ok(serde_json::to_string(&envelope)?)
}

/// Open a blob produced by [`encrypt_data`] and parse its JSON.
pub fn decrypt_data<T>(key: &PrivateKey, blob: &str) -> Result<T, ShareError>
where
    T: DeserializeOwned,
{
    let encoded: EnvelopeHex = serde_json::from_str(blob)
        .map_err(|e| CryptoError::InvalidEncoding(format!("envelope JSON: {e}")))?;
    open_value(key, &encoded)
}

/// Read and decrypt the slot `(key.public_key(), namespace)`.
///
/// `Ok(None)` when the slot is empty.
pub async fn get_and_decrypt_data<S, T>(
    store: &S,
    key: &PrivateKey,
    namespace: Option<&str>,
) -> Result<Option<T>, ShareError>
where
    S: MetadataStore + ?Sized,
    T: DeserializeOwned,
{
    let blob = store.get_metadata(&key.pub_key_params(), namespace).await?;
    if blob.is_empty() {
        return Ok(None);
    }
    decrypt_data(key, &blob).map(Some)
}

/// Encrypt `data` to the key's own public key, sign it, and overwrite the
/// slot `(key.public_key(), namespace)`.
pub async fn encrypt_and_set_data<S, T>(
    store: &S,
    key: &PrivateKey,
    data: &T,
    namespace: Option<&str>,
) -> Result<(), ShareError>
where
    S: MetadataStore + ?Sized,
    T: Serialize + ?Sized,
{
    let blob = encrypt_data(&key.public_key(), data)?;
    let record = store.generate_metadata_params(&blob, key)?;
    store.set_metadata(&record, namespace).await?;
    Ok(())
}

pub(crate) fn seal_value<T>(recipient: &PublicKey, data: &T) -> Result<EnvelopeHex, ShareError>
where
    T: Serialize + ?Sized,
{
    let plaintext = serde_json::to_vec(data)?;
    let envelope = encrypt_to(recipient, &plaintext)?;
    Ok(EnvelopeHex::from(&envelope))
}

pub(crate) fn open_value<T>(key: &PrivateKey, encoded: &EnvelopeHex) -> Result<T, ShareError>
where
    T: DeserializeOwned,
{
    let envelope = Envelope::try_from(encoded)?;
    let plaintext = decrypt_with(key, &envelope)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Read-modify-write access to one owner's map in one namespace.
pub struct SubspaceVault<'a, S: ?Sized> {
    store: &'a S,
    namespace: VaultNamespace,
}

impl<'a, S> SubspaceVault<'a, S>
where
    S: MetadataStore + ?Sized,
{
    pub fn new(store: &'a S, namespace: VaultNamespace) -> Self {
        Self { store, namespace }
    }

    pub fn namespace(&self) -> VaultNamespace {
        self.namespace
    }

    /// Current map, empty if the slot has never been written.
    ///
    /// A slot that exists but does not open with `owner` is
    /// [`ShareError::VaultCorrupted`].
    pub async fn load(&self, owner: &PrivateKey) -> Result<SubspaceMap, ShareError> {
        Ok(self.load_existing(owner).await?.unwrap_or_default())
    }

    /// Like [`load`](Self::load), but `None` for a slot never written.
    pub async fn load_existing(
        &self,
        owner: &PrivateKey,
    ) -> Result<Option<SubspaceMap>, ShareError> {
        let loaded =
            get_and_decrypt_data::<S, Value>(self.store, owner, Some(self.namespace.as_str()))
                .await
                .map_err(|e| self.corrupted(e))?;

        match loaded {
            None => Ok(None),
            Some(Value::Object(entries)) => Ok(Some(entries.into_iter().collect())),
            Some(other) => Err(ShareError::Serialization(format!(
                "{} vault is not a JSON object: {}",
                self.namespace,
                json_kind(&other)
            ))),
        }
    }

    /// Overwrite the slot with `map`.
    pub async fn save(&self, owner: &PrivateKey, map: &SubspaceMap) -> Result<(), ShareError> {
        encrypt_and_set_data(self.store, owner, map, Some(self.namespace.as_str())).await
    }

    /// Set `map[label] = value`, keeping every other entry.
    pub async fn upsert(
        &self,
        owner: &PrivateKey,
        label: &str,
        value: Value,
    ) -> Result<(), ShareError> {
        let mut map = self.load(owner).await?;
        let replaced = map.insert(label.to_string(), value).is_some();
        debug!(
            namespace = %self.namespace,
            subspace = label,
            replaced,
            entries = map.len(),
            "writing subspace"
        );
        self.save(owner, &map).await
    }

    /// Raw value stored at `label`, if any.
    pub async fn entry(
        &self,
        owner: &PrivateKey,
        label: &str,
    ) -> Result<Option<Value>, ShareError> {
        let mut map = self.load(owner).await?;
        Ok(map.remove(label))
    }

    fn corrupted(&self, error: ShareError) -> ShareError {
        match error {
            ShareError::DecryptionFailure(reason) => {
                warn!(
                    namespace = %self.namespace,
                    reason = %reason,
                    "vault does not open with owner key"
                );
                ShareError::VaultCorrupted {
                    namespace: self.namespace.as_str().to_string(),
                    reason,
                }
            }
            ShareError::Crypto(e) => {
                warn!(namespace = %self.namespace, error = %e, "vault envelope is malformed");
                ShareError::VaultCorrupted {
                    namespace: self.namespace.as_str().to_string(),
                    reason: e.to_string(),
                }
            }
            other => other,
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
