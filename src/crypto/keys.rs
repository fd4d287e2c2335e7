// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 key handling.
//!
//! Private keys are supplied by the caller and never persisted by this crate.
//! Public keys travel on the wire as two lowercase hex coordinates, each
//! zero-padded to 64 characters (`pub_key_X`, `pub_key_Y`).

use std::fmt;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::pkcs8::DecodePrivateKey;
use k256::SecretKey;
use serde::{Deserialize, Serialize};

use super::CryptoError;

/// Hex length of a 32-byte scalar or coordinate.
const HEX_WIDTH: usize = 64;

/// Public key coordinates as sent to the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PubKeyParams {
    #[serde(rename = "pub_key_X")]
    pub pub_key_x: String,
    #[serde(rename = "pub_key_Y")]
    pub pub_key_y: String,
}

/// A secp256k1 private scalar.
#[derive(Clone)]
pub struct PrivateKey {
    secret: SecretKey,
}

impl PrivateKey {
    /// Generate a fresh key from OS randomness.
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut rand::thread_rng()),
        }
    }

    /// Build a key from exactly 32 big-endian bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidPrivateKey(format!(
                "expected 32 bytes, got {}",
                bytes.len()
            )));
        }

        let secret = SecretKey::from_slice(bytes)
            .map_err(|_| CryptoError::InvalidPrivateKey("scalar out of range".to_string()))?;
        Ok(Self { secret })
    }

    /// Parse a hex scalar, left-padding with zeros to 64 characters.
    ///
    /// # Arguments
    /// * `hex_key` - Hex-encoded private key (no 0x prefix)
    pub fn from_hex(hex_key: &str) -> Result<Self, CryptoError> {
        let padded = pad_hex(hex_key.trim())
            .map_err(CryptoError::InvalidPrivateKey)?;
        let bytes = hex::decode(padded)
            .map_err(|e| CryptoError::InvalidPrivateKey(format!("Invalid hex: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a PEM-encoded key. The label selects the encoding: SEC1 for
    /// `EC PRIVATE KEY`, PKCS#8 for `PRIVATE KEY`.
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, CryptoError> {
        let block = pem::parse(pem_bytes)
            .map_err(|e| CryptoError::InvalidPrivateKey(format!("Invalid PEM: {e}")))?;

        let secret = match block.tag() {
            "EC PRIVATE KEY" => SecretKey::from_sec1_der(block.contents())
                .map_err(|e| CryptoError::InvalidPrivateKey(format!("Invalid SEC1 key: {e}")))?,
            "PRIVATE KEY" => SecretKey::from_pkcs8_der(block.contents())
                .map_err(|e| CryptoError::InvalidPrivateKey(format!("Invalid PKCS#8 key: {e}")))?,
            other => {
                return Err(CryptoError::InvalidPrivateKey(format!(
                    "Unsupported PEM label: {other}"
                )))
            }
        };

        Ok(Self { secret })
    }

    /// Lowercase hex of the scalar, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.secret.to_bytes())
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.secret.public_key())
    }

    /// Wire coordinates of the matching public key.
    pub fn pub_key_params(&self) -> PubKeyParams {
        self.public_key().to_params()
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_x", &self.public_key().x_hex())
            .finish_non_exhaustive()
    }
}

/// A validated secp256k1 public point.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(k256::PublicKey);

impl PublicKey {
    /// Parse a SEC1 encoded point (compressed or uncompressed).
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        k256::PublicKey::from_sec1_bytes(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey("point is not on secp256k1".to_string()))
    }

    /// Build a key from its affine coordinates.
    pub fn from_coordinates(x: &[u8; 32], y: &[u8; 32]) -> Result<Self, CryptoError> {
        let mut encoded = [0u8; 65];
        encoded[0] = 0x04;
        encoded[1..33].copy_from_slice(x);
        encoded[33..].copy_from_slice(y);
        Self::from_sec1_bytes(&encoded)
    }

    /// Build a key from wire coordinates, left-padding each to 64 hex characters.
    pub fn from_params(params: &PubKeyParams) -> Result<Self, CryptoError> {
        let x = decode_coordinate(&params.pub_key_x)?;
        let y = decode_coordinate(&params.pub_key_y)?;
        Self::from_coordinates(&x, &y)
    }

    /// 65-byte uncompressed SEC1 encoding (`0x04 || X || Y`).
    pub fn to_uncompressed(&self) -> [u8; 65] {
        let point = self.0.to_encoded_point(false);
        let mut out = [0u8; 65];
        out.copy_from_slice(point.as_bytes());
        out
    }

    pub fn x(&self) -> [u8; 32] {
        let mut x = [0u8; 32];
        x.copy_from_slice(&self.to_uncompressed()[1..33]);
        x
    }

    pub fn y(&self) -> [u8; 32] {
        let mut y = [0u8; 32];
        y.copy_from_slice(&self.to_uncompressed()[33..]);
        y
    }

    pub fn x_hex(&self) -> String {
        hex::encode(self.x())
    }

    pub fn y_hex(&self) -> String {
        hex::encode(self.y())
    }

    pub fn to_params(&self) -> PubKeyParams {
        PubKeyParams {
            pub_key_x: self.x_hex(),
            pub_key_y: self.y_hex(),
        }
    }

    pub(crate) fn as_curve_point(&self) -> &k256::PublicKey {
        &self.0
    }
}

impl From<k256::PublicKey> for PublicKey {
    fn from(point: k256::PublicKey) -> Self {
        Self(point)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("x", &self.x_hex())
            .field("y", &self.y_hex())
            .finish()
    }
}

fn pad_hex(value: &str) -> Result<String, String> {
    if value.len() > HEX_WIDTH {
        return Err(format!(
            "expected at most {HEX_WIDTH} hex characters, got {}",
            value.len()
        ));
    }
    Ok(format!("{value:0>HEX_WIDTH$}"))
}

fn decode_coordinate(value: &str) -> Result<[u8; 32], CryptoError> {
    let padded = pad_hex(value.trim()).map_err(CryptoError::InvalidPublicKey)?;
    let mut out = [0u8; 32];
    hex::decode_to_slice(padded, &mut out)
        .map_err(|e| CryptoError::InvalidPublicKey(format!("Invalid hex: {e}")))?;
    Ok(out)
}
