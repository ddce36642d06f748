// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recommended cryptographic primitives for ratchet sessions.
use zeroize::Zeroize;

use crate::crypto::aead::{self, AeadError};
use crate::crypto::hkdf::hkdf_sha2_256;
use crate::crypto::sha2::hmac_sha2_256;
use crate::crypto::x25519::{KeyPair, PublicKey};
use crate::crypto::Rng;
use crate::keys::{Key, KEY_SIZE};
use crate::traits::{CryptoError, CryptoProvider};

/// HKDF info string binding the root KDF output to this protocol.
const ROOT_KDF_INFO: &[u8; 32] = b"rsZUpEuXUqqwXBvSy3EcievAh4cMj6QL";

/// HMAC input deriving the next chain key in the chain KDF.
const CHAIN_KEY_INPUT: [u8; 1] = [0x0F];

/// HMAC input deriving the message key in the chain KDF.
const MESSAGE_KEY_INPUT: [u8; 1] = [0x10];

/// [`CryptoProvider`] with the primitives recommended by the Double Ratchet specification:
/// X25519 Diffie-Hellman, HKDF-SHA2-256 and HMAC-SHA2-256 key derivation and an
/// AES-256-CTR + HMAC-SHA2-256 AEAD.
///
/// Carries no state besides its random-number generator.
#[derive(Debug, Default)]
pub struct DefaultCrypto {
    rng: Rng,
}

#[cfg(any(test, feature = "test_utils"))]
impl DefaultCrypto {
    pub fn from_rng(rng: Rng) -> Self {
        Self { rng }
    }
}

impl CryptoProvider for DefaultCrypto {
    fn generate_dh(&self) -> Result<KeyPair, CryptoError> {
        Ok(KeyPair::from_rng(&self.rng)?)
    }

    fn dh(&self, pair: &KeyPair, their_public_key: &PublicKey) -> Key {
        Key::from_bytes(pair.secret().diffie_hellman(their_public_key))
    }

    fn kdf_rk(&self, rk: &Key, dh_out: &Key) -> (Key, Key, Key) {
        let mut okm: [u8; KEY_SIZE * 3] =
            hkdf_sha2_256(rk.as_bytes(), dh_out.as_bytes(), ROOT_KDF_INFO);

        let root_key = Key::from_bytes(okm[..KEY_SIZE].try_into().expect("okm split"));
        let chain_key =
            Key::from_bytes(okm[KEY_SIZE..KEY_SIZE * 2].try_into().expect("okm split"));
        let header_key = Key::from_bytes(okm[KEY_SIZE * 2..].try_into().expect("okm split"));
        okm.zeroize();

        (root_key, chain_key, header_key)
    }

    fn kdf_ck(&self, ck: &Key) -> (Key, Key) {
        let chain_key = Key::from_bytes(hmac_sha2_256(ck.as_bytes(), &[&CHAIN_KEY_INPUT]));
        let message_key = Key::from_bytes(hmac_sha2_256(ck.as_bytes(), &[&MESSAGE_KEY_INPUT]));
        (chain_key, message_key)
    }

    fn encrypt(&self, mk: &Key, plaintext: &[u8], associated_data: &[u8]) -> Vec<u8> {
        aead::encrypt(mk, plaintext, associated_data)
    }

    fn decrypt(
        &self,
        mk: &Key,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> Result<Vec<u8>, AeadError> {
        aead::decrypt(mk, ciphertext, associated_data)
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;
    use crate::keys::Key;
    use crate::traits::CryptoProvider;

    use super::DefaultCrypto;

    #[test]
    fn root_kdf_separates_outputs() {
        let crypto = DefaultCrypto::from_rng(Rng::from_seed([1; 32]));

        let rk = Key::from_bytes([1; 32]);
        let dh_out = Key::from_bytes([2; 32]);
        let (root_key, chain_key, header_key) = crypto.kdf_rk(&rk, &dh_out);

        assert_ne!(root_key, rk);
        assert_ne!(root_key, chain_key);
        assert_ne!(chain_key, header_key);
        assert_ne!(root_key, header_key);

        // Same inputs derive the same outputs.
        let (root_key_2, chain_key_2, header_key_2) = crypto.kdf_rk(&rk, &dh_out);
        assert_eq!(root_key, root_key_2);
        assert_eq!(chain_key, chain_key_2);
        assert_eq!(header_key, header_key_2);
    }

    #[test]
    fn chain_kdf_separates_outputs() {
        let crypto = DefaultCrypto::from_rng(Rng::from_seed([1; 32]));

        let ck = Key::from_bytes([3; 32]);
        let (chain_key, message_key) = crypto.kdf_ck(&ck);

        assert_ne!(chain_key, ck);
        assert_ne!(chain_key, message_key);
        assert_ne!(message_key, ck);
    }

    #[test]
    fn dh_is_commutative() {
        let crypto = DefaultCrypto::from_rng(Rng::from_seed([1; 32]));

        let alice = crypto.generate_dh().unwrap();
        let bob = crypto.generate_dh().unwrap();

        assert_eq!(
            crypto.dh(&alice, &bob.public()),
            crypto.dh(&bob, &alice.public())
        );
    }
}
