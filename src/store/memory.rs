// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-process metadata store.
//!
//! Holds the same contract as the remote service: writes must carry a
//! signature that recovers to the slot's public key, and missing slots read
//! back as `""`. Clones share state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{MetadataStore, StoreError};
use crate::crypto::{PubKeyParams, PublicKey, SignedRecord};

/// Slot address: normalized coordinates plus namespace.
type SlotKey = (String, String, Option<String>);

#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataStore {
    slots: Arc<RwLock<HashMap<SlotKey, String>>>,
    fail_writes: Arc<AtomicBool>,
    server_time_offset_ms: i64,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server_time_offset_ms(mut self, offset_ms: i64) -> Self {
        self.server_time_offset_ms = offset_ms;
        self
    }

    /// Make every subsequent `set_metadata` fail with [`StoreError::Write`].
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Stored slot contents, `None` if the slot was never written.
    pub async fn raw_slot(
        &self,
        pub_key: &PubKeyParams,
        namespace: Option<&str>,
    ) -> Option<String> {
        let key = slot_key(pub_key, namespace).ok()?;
        self.slots.read().await.get(&key).cloned()
    }

    /// Replace slot contents without a signature check.
    ///
    /// Stands in for a misbehaving server or an on-path attacker.
    pub async fn overwrite_raw(
        &self,
        pub_key: &PubKeyParams,
        namespace: Option<&str>,
        value: impl Into<String>,
    ) -> Result<(), StoreError> {
        let key = slot_key(pub_key, namespace).map_err(StoreError::Write)?;
        self.slots.write().await.insert(key, value.into());
        Ok(())
    }

    pub async fn slot_count(&self) -> usize {
        self.slots.read().await.len()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn set_metadata(
        &self,
        record: &SignedRecord,
        namespace: Option<&str>,
    ) -> Result<String, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("store is rejecting writes".to_string()));
        }

        record
            .verify()
            .map_err(|e| StoreError::Write(format!("rejected record: {e}")))?;

        let key = slot_key(&record.pub_key(), namespace).map_err(StoreError::Write)?;
        debug!(
            pub_key_x = %key.0,
            namespace = namespace.unwrap_or_default(),
            bytes = record.set_data.data.len(),
            "in-memory slot written"
        );
        self.slots
            .write()
            .await
            .insert(key, record.set_data.data.clone());
        Ok("success".to_string())
    }

    async fn get_metadata(
        &self,
        pub_key: &PubKeyParams,
        namespace: Option<&str>,
    ) -> Result<String, StoreError> {
        let key = slot_key(pub_key, namespace).map_err(StoreError::Read)?;
        Ok(self
            .slots
            .read()
            .await
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    fn server_time_offset_ms(&self) -> i64 {
        self.server_time_offset_ms
    }
}

/// Coordinates are re-encoded so unpadded or uppercase hex addresses the
/// same slot as the canonical form.
fn slot_key(pub_key: &PubKeyParams, namespace: Option<&str>) -> Result<SlotKey, String> {
    let point = PublicKey::from_params(pub_key).map_err(|e| e.to_string())?;
    Ok((point.x_hex(), point.y_hex(), namespace.map(str::to_string)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{build_signed_record_at, PrivateKey};

    #[tokio::test]
    async fn absent_slot_reads_empty() {
        let store = InMemoryMetadataStore::new();
        let key = PrivateKey::generate();
        assert_eq!(
            store.get_metadata(&key.pub_key_params(), None).await.unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn write_then_read_per_namespace() {
        let store = InMemoryMetadataStore::new();
        let key = PrivateKey::generate();
        let params = key.pub_key_params();

        let record = build_signed_record_at("one", &key, 1).unwrap();
        assert_eq!(store.set_metadata(&record, Some("a")).await.unwrap(), "success");

        assert_eq!(store.get_metadata(&params, Some("a")).await.unwrap(), "one");
        assert_eq!(store.get_metadata(&params, Some("b")).await.unwrap(), "");
        assert_eq!(store.get_metadata(&params, None).await.unwrap(), "");
    }

    #[tokio::test]
    async fn resending_a_record_is_idempotent() {
        let store = InMemoryMetadataStore::new();
        let key = PrivateKey::generate();
        let record = build_signed_record_at("same", &key, 1).unwrap();

        store.set_metadata(&record, None).await.unwrap();
        store.set_metadata(&record, None).await.unwrap();
        assert_eq!(store.slot_count().await, 1);
        assert_eq!(
            store.get_metadata(&key.pub_key_params(), None).await.unwrap(),
            "same"
        );
    }

    #[tokio::test]
    async fn forged_record_is_rejected() {
        let store = InMemoryMetadataStore::new();
        let owner = PrivateKey::generate();
        let attacker = PrivateKey::generate();

        let mut record = build_signed_record_at("forged", &attacker, 1).unwrap();
        let params = owner.pub_key_params();
        record.pub_key_x = params.pub_key_x.clone();
        record.pub_key_y = params.pub_key_y.clone();

        assert!(matches!(
            store.set_metadata(&record, None).await,
            Err(StoreError::Write(_))
        ));
        assert_eq!(store.get_metadata(&params, None).await.unwrap(), "");
    }

    #[tokio::test]
    async fn failing_writes_leave_slot_untouched() {
        let store = InMemoryMetadataStore::new();
        let key = PrivateKey::generate();
        store
            .set_metadata(&build_signed_record_at("before", &key, 1).unwrap(), None)
            .await
            .unwrap();

        store.set_fail_writes(true);
        assert!(matches!(
            store
                .set_metadata(&build_signed_record_at("after", &key, 2).unwrap(), None)
                .await,
            Err(StoreError::Write(_))
        ));
        assert_eq!(
            store.get_metadata(&key.pub_key_params(), None).await.unwrap(),
            "before"
        );

        store.set_fail_writes(false);
        store
            .set_metadata(&build_signed_record_at("after", &key, 2).unwrap(), None)
            .await
            .unwrap();
        assert_eq!(
            store.get_metadata(&key.pub_key_params(), None).await.unwrap(),
            "after"
        );
    }

    #[tokio::test]
    async fn unpadded_coordinates_address_the_same_slot() {
        let store = InMemoryMetadataStore::new();
        let key = PrivateKey::generate();
        store
            .set_metadata(&build_signed_record_at("v", &key, 1).unwrap(), None)
            .await
            .unwrap();

        let params = key.pub_key_params();
        let loose = PubKeyParams {
            pub_key_x: params.pub_key_x.trim_start_matches('0').to_uppercase(),
            pub_key_y: params.pub_key_y.trim_start_matches('0').to_uppercase(),
        };
        assert_eq!(store.get_metadata(&loose, None).await.unwrap(), "v");
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = InMemoryMetadataStore::new();
        let clone = store.clone();
        let key = PrivateKey::generate();

        clone
            .set_metadata(&build_signed_record_at("shared", &key, 1).unwrap(), None)
            .await
            .unwrap();
        assert_eq!(
            store.raw_slot(&key.pub_key_params(), None).await.as_deref(),
            Some("shared")
        );
    }
}
