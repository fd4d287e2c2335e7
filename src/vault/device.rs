// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device vault: one encryption layer, owner-only.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{SubspaceVault, VaultNamespace};
use crate::crypto::PrivateKey;
use crate::error::ShareError;
use crate::store::MetadataStore;

/// Values kept as plain JSON inside the owner's sealed map.
pub struct DeviceVault<'a, S: ?Sized> {
    inner: SubspaceVault<'a, S>,
}

impl<'a, S> DeviceVault<'a, S>
where
    S: MetadataStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self {
            inner: SubspaceVault::new(store, VaultNamespace::DeviceShare),
        }
    }

    pub async fn set<T>(
        &self,
        owner: &PrivateKey,
        label: &str,
        value: &T,
    ) -> Result<(), ShareError>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value)?;
        self.inner.upsert(owner, label, value).await
    }

    /// `Ok(None)` when the slot or the label is missing, or holds `null`.
    pub async fn get<T>(
        &self,
        owner: &PrivateKey,
        label: &str,
    ) -> Result<Option<T>, ShareError>
    where
        T: DeserializeOwned,
    {
        match self.inner.entry(owner, label).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryMetadataStore;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Credential {
        id: String,
        counter: u32,
    }

    #[tokio::test]
    async fn typed_values_round_trip() {
        let store = InMemoryMetadataStore::new();
        let vault = DeviceVault::new(&store);
        let owner = PrivateKey::generate();

        let credential = Credential {
            id: "cred-1".to_string(),
            counter: 7,
        };
        vault.set(&owner, "passkey", &credential).await.unwrap();
        vault.set(&owner, "count", &42u64).await.unwrap();

        let read: Option<Credential> = vault.get(&owner, "passkey").await.unwrap();
        assert_eq!(read, Some(credential));
        let count: Option<u64> = vault.get(&owner, "count").await.unwrap();
        assert_eq!(count, Some(42));
    }

    #[tokio::test]
    async fn stored_map_is_sealed_to_owner() {
        let store = InMemoryMetadataStore::new();
        let vault = DeviceVault::new(&store);
        let owner = PrivateKey::generate();

        vault.set(&owner, "label", "plaintext marker").await.unwrap();

        let raw = store
            .raw_slot(
                &owner.pub_key_params(),
                Some(VaultNamespace::DeviceShare.as_str()),
            )
            .await
            .unwrap();
        assert!(!raw.contains("plaintext marker"));
        assert!(!raw.contains("label"));
    }

    #[tokio::test]
    async fn null_reads_as_absent() {
        let store = InMemoryMetadataStore::new();
        let vault = DeviceVault::new(&store);
        let owner = PrivateKey::generate();

        vault.set(&owner, "gone", &Value::Null).await.unwrap();
        let read: Option<String> = vault.get(&owner, "gone").await.unwrap();
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn type_mismatch_is_a_serialization_error() {
        let store = InMemoryMetadataStore::new();
        let vault = DeviceVault::new(&store);
        let owner = PrivateKey::generate();

        vault.set(&owner, "n", "not a number").await.unwrap();
        let result: Result<Option<u32>, _> = vault.get(&owner, "n").await;
        assert!(matches!(result, Err(ShareError::Serialization(_))));
    }
}
