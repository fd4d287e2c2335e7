// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared vault: two encryption layers.
//!
//! A submitter deposits values for recipient devices. Each value is sealed
//! to its recipient's public key, and the resulting envelope is stored under
//! its label in the submitter's own sealed map. Reading an entry needs the
//! submitter key for the outer map and the recipient key for the entry.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{open_value, seal_value, SubspaceVault, VaultNamespace};
use crate::crypto::{EnvelopeHex, PrivateKey, PubKeyParams, PublicKey};
use crate::error::ShareError;
use crate::store::MetadataStore;

pub struct SharedVault<'a, S: ?Sized> {
    inner: SubspaceVault<'a, S>,
}

impl<'a, S> SharedVault<'a, S>
where
    S: MetadataStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self {
            inner: SubspaceVault::new(store, VaultNamespace::SharedShare),
        }
    }

    /// Seal `value` to `recipient` and store it under `label` in the
    /// submitter's map.
    pub async fn deposit<T>(
        &self,
        recipient: &PubKeyParams,
        submitter: &PrivateKey,
        label: &str,
        value: &T,
    ) -> Result<(), ShareError>
    where
        T: Serialize + ?Sized,
    {
        let recipient = PublicKey::from_params(recipient)?;
        let sealed = seal_value(&recipient, value)?;
        debug!(
            subspace = label,
            recipient_x = %recipient.x_hex(),
            "depositing shared entry"
        );
        self.inner
            .upsert(submitter, label, serde_json::to_value(sealed)?)
            .await
    }

    /// Open the entry at `label` deposited by `submitter`.
    ///
    /// `Ok(None)` when the slot or label is missing, or the entry is `null`
    /// or `""`. An entry sealed to a different recipient is
    /// [`ShareError::DecryptionFailure`].
    pub async fn open<T>(
        &self,
        recipient: &PrivateKey,
        submitter: &PrivateKey,
        label: &str,
    ) -> Result<Option<T>, ShareError>
    where
        T: DeserializeOwned,
    {
        let sealed = match self.inner.entry(submitter, label).await? {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::String(s)) if s.is_empty() => return Ok(None),
            Some(value) => value,
        };

        let encoded: EnvelopeHex = serde_json::from_value(sealed).map_err(|e| {
            ShareError::Serialization(format!("{label} is not an envelope: {e}"))
        })?;
        open_value(recipient, &encoded).map(Some)
    }
}
