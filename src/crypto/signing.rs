// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Canonical signing of metadata writes.
//!
//! Every write to the metadata store carries a [`SignedRecord`]: the payload
//! and a hex timestamp, signed by the owner key over
//! `keccak256(canonical_json({data, timestamp}))`.
//!
//! ## Wire Signature Layout
//!
//! ```text
//! r (32 bytes) || s (32 bytes) || recovery id (1 byte, 0 or 1)
//! ```
//!
//! base64 encoded (standard alphabet, padded). Libraries that emit the
//! recovery id first must be transcoded with [`recovery_first_to_wire`].

use base64ct::{Base64, Encoding};
use chrono::Utc;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};

use super::keys::{PrivateKey, PubKeyParams, PublicKey};
use super::CryptoError;

/// Length of the wire signature (r || s || v).
pub const WIRE_SIGNATURE_LEN: usize = 65;

/// The signed portion of a metadata write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetData {
    pub data: String,
    /// Lowercase hex Unix seconds, no prefix.
    pub timestamp: String,
}

impl SetData {
    /// Canonical byte string that the signature covers.
    pub fn canonical_json(&self) -> String {
        canonical_json(&json!({
            "data": self.data,
            "timestamp": self.timestamp,
        }))
    }

    pub fn message_hash(&self) -> [u8; 32] {
        keccak256(self.canonical_json().as_bytes())
    }
}

/// A fully signed metadata write, as sent to `/set`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRecord {
    #[serde(rename = "pub_key_X")]
    pub pub_key_x: String,
    #[serde(rename = "pub_key_Y")]
    pub pub_key_y: String,
    pub set_data: SetData,
    pub signature: String,
}

impl SignedRecord {
    pub fn pub_key(&self) -> PubKeyParams {
        PubKeyParams {
            pub_key_x: self.pub_key_x.clone(),
            pub_key_y: self.pub_key_y.clone(),
        }
    }

    /// Check that the signature recovers to the claimed public key.
    ///
    /// This is the check a conforming metadata store performs before
    /// accepting a write.
    pub fn verify(&self) -> Result<(), CryptoError> {
        let bytes = Base64::decode_vec(&self.signature)
            .map_err(|e| CryptoError::InvalidSignature(format!("Invalid base64: {e}")))?;
        let (signature, recovery_id) = decode_wire_signature(&bytes)?;

        let hash = self.set_data.message_hash();
        let recovered = VerifyingKey::recover_from_prehash(&hash, &signature, recovery_id)
            .map_err(|e| CryptoError::InvalidSignature(format!("Recovery failed: {e}")))?;

        let claimed = PublicKey::from_params(&self.pub_key())?;
        if PublicKey::from(k256::PublicKey::from(&recovered)) != claimed {
            return Err(CryptoError::InvalidSignature(
                "signature does not match public key".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build a signed record stamped with the current time.
///
/// `server_time_offset_ms` compensates for skew against the store's clock and
/// is added before flooring to seconds. No freshness check happens here.
pub fn build_signed_record(
    message: &str,
    key: &PrivateKey,
    server_time_offset_ms: i64,
) -> Result<SignedRecord, CryptoError> {
    let unix_seconds = adjusted_unix_seconds(Utc::now().timestamp_millis(), server_time_offset_ms);
    build_signed_record_at(message, key, unix_seconds)
}

/// Build a signed record for an explicit timestamp.
pub fn build_signed_record_at(
    message: &str,
    key: &PrivateKey,
    unix_seconds: u64,
) -> Result<SignedRecord, CryptoError> {
    let set_data = SetData {
        data: message.to_string(),
        timestamp: hex_timestamp(unix_seconds),
    };
    let wire = sign_message_hash(key, &set_data.message_hash())?;
    let params = key.pub_key_params();

    Ok(SignedRecord {
        pub_key_x: params.pub_key_x,
        pub_key_y: params.pub_key_y,
        set_data,
        signature: Base64::encode_string(&wire),
    })
}

/// Sign a 32-byte prehash and return the wire layout.
///
/// RFC 6979 deterministic, low-S normalized.
pub fn sign_message_hash(
    key: &PrivateKey,
    hash: &[u8; 32],
) -> Result<[u8; WIRE_SIGNATURE_LEN], CryptoError> {
    let signing_key = SigningKey::from(key.secret());
    let (signature, recovery_id) = signing_key
        .sign_prehash_recoverable(hash)
        .map_err(|e| CryptoError::InvalidSignature(format!("Signing failed: {e}")))?;
    Ok(encode_wire_signature(&signature, recovery_id))
}

pub fn encode_wire_signature(
    signature: &Signature,
    recovery_id: RecoveryId,
) -> [u8; WIRE_SIGNATURE_LEN] {
    let mut wire = [0u8; WIRE_SIGNATURE_LEN];
    wire[..64].copy_from_slice(&signature.to_bytes());
    wire[64] = recovery_id.to_byte();
    wire
}

pub fn decode_wire_signature(bytes: &[u8]) -> Result<(Signature, RecoveryId), CryptoError> {
    if bytes.len() != WIRE_SIGNATURE_LEN {
        return Err(CryptoError::InvalidSignature(format!(
            "expected {WIRE_SIGNATURE_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let signature = Signature::from_slice(&bytes[..64])
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    let recovery_id = RecoveryId::from_byte(bytes[64]).ok_or_else(|| {
        CryptoError::InvalidSignature(format!("invalid recovery id {}", bytes[64]))
    })?;
    Ok((signature, recovery_id))
}

/// Reorder a `v || r || s` signature into the wire layout `r || s || v`.
pub fn recovery_first_to_wire(native: &[u8; WIRE_SIGNATURE_LEN]) -> [u8; WIRE_SIGNATURE_LEN] {
    let mut wire = [0u8; WIRE_SIGNATURE_LEN];
    wire[..64].copy_from_slice(&native[1..]);
    wire[64] = native[0];
    wire
}

/// Unix seconds after applying a millisecond clock offset, floored.
pub fn adjusted_unix_seconds(now_ms: i64, server_time_offset_ms: i64) -> u64 {
    let seconds = now_ms.saturating_add(server_time_offset_ms).div_euclid(1000);
    u64::try_from(seconds).unwrap_or(0)
}

pub fn hex_timestamp(unix_seconds: u64) -> String {
    format!("{unix_seconds:x}")
}

pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    Keccak256::digest(bytes).into()
}

/// Key-sorted, whitespace-free JSON serialization.
///
/// String escaping follows serde_json, which matches `JSON.stringify` for
/// any valid Unicode input.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
