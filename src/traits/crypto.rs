// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

use crate::crypto::aead::AeadError;
use crate::crypto::x25519::{KeyPair, PublicKey};
use crate::crypto::RngError;
use crate::keys::Key;

/// Cryptographic primitives driving a ratchet session.
///
/// The recommended implementation is [`DefaultCrypto`](crate::DefaultCrypto). Implementations
/// must be deterministic in everything but [`generate_dh`](CryptoProvider::generate_dh): both
/// parties of a session need bit-exact key derivation and AEAD framing to interoperate.
pub trait CryptoProvider {
    /// Returns a fresh Diffie-Hellman key pair.
    fn generate_dh(&self) -> Result<KeyPair, CryptoError>;

    /// Returns the Diffie-Hellman output between our key pair and the public key of the other
    /// party.
    fn dh(&self, pair: &KeyPair, their_public_key: &PublicKey) -> Key;

    /// Root KDF: derives a new root key, a chain key and a next header key from the current root
    /// key and a Diffie-Hellman output.
    ///
    /// The plain (non-header-encrypted) protocol ignores the header key.
    fn kdf_rk(&self, rk: &Key, dh_out: &Key) -> (Key, Key, Key);

    /// Chain KDF: derives the next chain key and a message key from the current chain key.
    fn kdf_ck(&self, ck: &Key) -> (Key, Key);

    /// AEAD-encrypts `plaintext` with the message key, authenticating `associated_data`.
    fn encrypt(&self, mk: &Key, plaintext: &[u8], associated_data: &[u8]) -> Vec<u8>;

    /// AEAD-decrypts `ciphertext` with the message key, verifying `associated_data`.
    fn decrypt(
        &self,
        mk: &Key,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, AeadError>;
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error(transparent)]
    Rng(#[from] RngError),
}
