// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Public-key envelope encryption.
//!
//! Byte compatible with the eccrypto envelope format:
//!
//! ```text
//! shared   = X coordinate of ECDH(ephemeral, recipient)
//! keys     = SHA-512(shared)            -> enc_key = [0..32], mac_key = [32..64]
//! ct       = AES-256-CBC(enc_key, iv, PKCS#7(plaintext))
//! mac      = HMAC-SHA256(mac_key, iv || ephemeral_pub(65) || ct)
//! ```
//!
//! The MAC is checked in constant time before anything is decrypted, so a
//! tampered envelope never yields plaintext.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use k256::ecdh::diffie_hellman;
use k256::SecretKey;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use super::keys::{PrivateKey, PublicKey};
use super::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

const IV_LEN: usize = 16;

/// One value encrypted to exactly one recipient public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub iv: Vec<u8>,
    pub ephem_public_key: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub mac: Vec<u8>,
}

/// Hex form of an [`Envelope`] as embedded in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeHex {
    pub iv: String,
    #[serde(rename = "ephemPublicKey", alias = "ephemeralPublicKey")]
    pub ephem_public_key: String,
    pub ciphertext: String,
    pub mac: String,
}

impl From<&Envelope> for EnvelopeHex {
    fn from(envelope: &Envelope) -> Self {
        Self {
            iv: hex::encode(&envelope.iv),
            ephem_public_key: hex::encode(&envelope.ephem_public_key),
            ciphertext: hex::encode(&envelope.ciphertext),
            mac: hex::encode(&envelope.mac),
        }
    }
}

impl TryFrom<&EnvelopeHex> for Envelope {
    type Error = CryptoError;

    fn try_from(encoded: &EnvelopeHex) -> Result<Self, Self::Error> {
        Ok(Self {
            iv: decode_field("iv", &encoded.iv)?,
            ephem_public_key: decode_field("ephemPublicKey", &encoded.ephem_public_key)?,
            ciphertext: decode_field("ciphertext", &encoded.ciphertext)?,
            mac: decode_field("mac", &encoded.mac)?,
        })
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>, CryptoError> {
    hex::decode(value).map_err(|e| CryptoError::InvalidEncoding(format!("{name}: {e}")))
}

/// Encrypt `plaintext` to `recipient`.
///
/// A fresh ephemeral key and IV are generated on every call, so identical
/// inputs never produce identical envelopes.
pub fn encrypt_to(recipient: &PublicKey, plaintext: &[u8]) -> Result<Envelope, CryptoError> {
    let mut rng = rand::thread_rng();
    let ephemeral = SecretKey::random(&mut rng);
    let ephem_public_key = PublicKey::from(ephemeral.public_key()).to_uncompressed();

    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);

    let (enc_key, mac_key) = derive_keys(&ephemeral, recipient);

    let ciphertext = Aes256CbcEnc::new_from_slices(&enc_key, &iv)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mac = compute_mac(&mac_key, &iv, &ephem_public_key, &ciphertext)?
        .finalize()
        .into_bytes()
        .to_vec();

    Ok(Envelope {
        iv: iv.to_vec(),
        ephem_public_key: ephem_public_key.to_vec(),
        ciphertext,
        mac,
    })
}

/// Decrypt an envelope addressed to `key`.
///
/// Fails with [`CryptoError::DecryptionFailure`] when the MAC does not verify,
/// which covers both tampering and the wrong recipient key.
pub fn decrypt_with(key: &PrivateKey, envelope: &Envelope) -> Result<Vec<u8>, CryptoError> {
    let ephemeral = PublicKey::from_sec1_bytes(&envelope.ephem_public_key)
        .map_err(|_| CryptoError::DecryptionFailure("bad ephemeral public key".to_string()))?;

    let (enc_key, mac_key) = derive_keys(key.secret(), &ephemeral);

    compute_mac(
        &mac_key,
        &envelope.iv,
        &envelope.ephem_public_key,
        &envelope.ciphertext,
    )?
    .verify_slice(&envelope.mac)
    .map_err(|_| CryptoError::DecryptionFailure("bad MAC".to_string()))?;

    Aes256CbcDec::new_from_slices(&enc_key, &envelope.iv)
        .map_err(|e| CryptoError::DecryptionFailure(format!("bad IV: {e}")))?
        .decrypt_padded_vec_mut::<Pkcs7>(&envelope.ciphertext)
        .map_err(|_| CryptoError::DecryptionFailure("bad padding".to_string()))
}

fn derive_keys(secret: &SecretKey, peer: &PublicKey) -> ([u8; 32], [u8; 32]) {
    let shared = diffie_hellman(secret.to_nonzero_scalar(), peer.as_curve_point().as_affine());
    let hash = Sha512::digest(shared.raw_secret_bytes());

    let mut enc_key = [0u8; 32];
    let mut mac_key = [0u8; 32];
    enc_key.copy_from_slice(&hash[..32]);
    mac_key.copy_from_slice(&hash[32..]);
    (enc_key, mac_key)
}

fn compute_mac(
    mac_key: &[u8],
    iv: &[u8],
    ephem_public_key: &[u8],
    ciphertext: &[u8],
) -> Result<HmacSha256, CryptoError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    mac.update(iv);
    mac.update(ephem_public_key);
    mac.update(ciphertext);
    Ok(mac)
}
