// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Share resolver: the public entry point.
//!
//! Wraps one metadata store client and exposes the two vault policies as
//! named share operations. Each call performs one read (gets) or one read
//! followed by one write (sets). Nothing is cached between calls.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::crypto::{PrivateKey, PubKeyParams};
use crate::error::ShareError;
use crate::store::MetadataStore;
use crate::vault::{
    self, DeviceVault, SharedVault, SubspaceMap, SubspaceVault, VaultNamespace,
};

pub struct ShareResolver<S> {
    store: S,
}

impl<S> ShareResolver<S>
where
    S: MetadataStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Deposit `data` for the device holding `recipient_pub`, under the
    /// submitter's shared vault.
    pub async fn set_torus_share<T>(
        &self,
        recipient_pub: &PubKeyParams,
        submitter: &PrivateKey,
        subspace: &str,
        data: &T,
    ) -> Result<(), ShareError>
    where
        T: Serialize + ?Sized,
    {
        SharedVault::new(&self.store)
            .deposit(recipient_pub, submitter, subspace, data)
            .await?;
        info!(
            subspace,
            submitter_x = %submitter.public_key().x_hex(),
            "torus share stored"
        );
        Ok(())
    }

    /// Read a deposited share. Needs both the recipient and submitter keys.
    pub async fn get_torus_share<T>(
        &self,
        recipient: &PrivateKey,
        submitter: &PrivateKey,
        subspace: &str,
    ) -> Result<Option<T>, ShareError>
    where
        T: DeserializeOwned,
    {
        SharedVault::new(&self.store)
            .open(recipient, submitter, subspace)
            .await
    }

    pub async fn set_device_share<T>(
        &self,
        owner: &PrivateKey,
        subspace: &str,
        data: &T,
    ) -> Result<(), ShareError>
    where
        T: Serialize + ?Sized,
    {
        DeviceVault::new(&self.store)
            .set(owner, subspace, data)
            .await?;
        info!(
            subspace,
            owner_x = %owner.public_key().x_hex(),
            "device share stored"
        );
        Ok(())
    }

    pub async fn get_device_share<T>(
        &self,
        owner: &PrivateKey,
        subspace: &str,
    ) -> Result<Option<T>, ShareError>
    where
        T: DeserializeOwned,
    {
        DeviceVault::new(&self.store).get(owner, subspace).await
    }

    /// Whole decrypted map for `key` in `namespace`, `None` if never written.
    ///
    /// A slot that does not open with `key` is [`ShareError::VaultCorrupted`].
    pub async fn get_and_decrypt_data(
        &self,
        key: &PrivateKey,
        namespace: VaultNamespace,
    ) -> Result<Option<SubspaceMap>, ShareError> {
        SubspaceVault::new(&self.store, namespace)
            .load_existing(key)
            .await
    }

    /// Replace the whole map for `key` in `namespace`.
    pub async fn encrypt_and_set_data(
        &self,
        key: &PrivateKey,
        map: &SubspaceMap,
        namespace: VaultNamespace,
    ) -> Result<(), ShareError> {
        vault::encrypt_and_set_data(&self.store, key, map, Some(namespace.as_str())).await
    }
}
