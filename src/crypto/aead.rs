// SPDX-License-Identifier: MIT OR Apache-2.0

//! AEAD message framing: AES-256-CTR encryption authenticated with HMAC-SHA2-256.
//!
//! Encryption, authentication key and IV are derived from a single 256-bit message key with HKDF.
//! The Double Ratchet specification recommends AES-256-CBC here; CTR mode is used instead for
//! constant-length framing. The output layout is part of the wire contract:
//!
//! ```text
//! iv (16 bytes) || ciphertext (plaintext length) || mac (32 bytes)
//! ```
//!
//! The MAC covers `associated_data || iv || ciphertext` and is verified in constant time.
use ctr::cipher::{KeyIvInit, StreamCipher};
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::Zeroize;

use crate::crypto::hkdf::hkdf_sha2_256;
use crate::crypto::sha2::hmac_sha2_256;
use crate::keys::Key;

/// AES-256-CTR initialisation vector size.
pub const IV_SIZE: usize = 16;

/// HMAC-SHA2-256 authentication tag size.
pub const TAG_SIZE: usize = 32;

/// HKDF info string binding the derived encryption material to this AEAD construction.
const KDF_INFO: &[u8; 32] = b"pcwSByyx2CRdryCffXJwy7xgVZWtW5Sh";

const ENC_KEY_SIZE: usize = 32;

const AUTH_KEY_SIZE: usize = 32;

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// AEAD-encrypts `plaintext` under the message key, authenticating `associated_data`.
///
/// The associated data is covered by the MAC but not included in the returned ciphertext.
pub fn encrypt(mk: &Key, plaintext: &[u8], associated_data: &[u8]) -> Vec<u8> {
    let (mut enc_key, mut auth_key, iv) = derive_keys(mk);

    let mut out = Vec::with_capacity(IV_SIZE + plaintext.len() + TAG_SIZE);
    out.extend_from_slice(&iv);
    out.extend_from_slice(plaintext);
    let mut cipher = Aes256Ctr::new(&enc_key.into(), &iv.into());
    cipher.apply_keystream(&mut out[IV_SIZE..]);

    let tag = hmac_sha2_256(&auth_key, &[associated_data, &out]);
    out.extend_from_slice(&tag);

    enc_key.zeroize();
    auth_key.zeroize();

    out
}

/// Verifies and decrypts an AEAD ciphertext produced by [`encrypt`].
///
/// The tag is checked in constant time before any decryption takes place. Tampering with any part
/// of the ciphertext, or presenting different associated data, yields
/// [`AeadError::InvalidSignature`] without leaking timing information about the mismatch.
pub fn decrypt(mk: &Key, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, AeadError> {
    if ciphertext.len() < IV_SIZE + TAG_SIZE {
        return Err(AeadError::InvalidSignature);
    }
    let (body, tag) = ciphertext.split_at(ciphertext.len() - TAG_SIZE);

    let (mut enc_key, mut auth_key, _) = derive_keys(mk);
    let expected_tag = hmac_sha2_256(&auth_key, &[associated_data, body]);
    auth_key.zeroize();
    if !bool::from(expected_tag.ct_eq(tag)) {
        enc_key.zeroize();
        return Err(AeadError::InvalidSignature);
    }

    let iv: [u8; IV_SIZE] = body[..IV_SIZE].try_into().expect("body holds a full iv");
    let mut plaintext = body[IV_SIZE..].to_vec();
    let mut cipher = Aes256Ctr::new(&enc_key.into(), &iv.into());
    cipher.apply_keystream(&mut plaintext);
    enc_key.zeroize();

    Ok(plaintext)
}

/// Derives encryption key, authentication key and IV from a message key.
fn derive_keys(mk: &Key) -> ([u8; ENC_KEY_SIZE], [u8; AUTH_KEY_SIZE], [u8; IV_SIZE]) {
    let mut okm: [u8; ENC_KEY_SIZE + AUTH_KEY_SIZE + IV_SIZE] =
        hkdf_sha2_256(&[0; 32], mk.as_bytes(), KDF_INFO);

    let mut enc_key = [0u8; ENC_KEY_SIZE];
    let mut auth_key = [0u8; AUTH_KEY_SIZE];
    let mut iv = [0u8; IV_SIZE];
    enc_key.copy_from_slice(&okm[..ENC_KEY_SIZE]);
    auth_key.copy_from_slice(&okm[ENC_KEY_SIZE..ENC_KEY_SIZE + AUTH_KEY_SIZE]);
    iv.copy_from_slice(&okm[ENC_KEY_SIZE + AUTH_KEY_SIZE..]);
    okm.zeroize();

    (enc_key, auth_key, iv)
}

#[derive(Debug, Error)]
pub enum AeadError {
    #[error("invalid signature")]
    InvalidSignature,
}
