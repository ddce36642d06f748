// SPDX-License-Identifier: MIT OR Apache-2.0

//! X25519 elliptic-curve Diffie-Hellman key agreement.
//!
//! Secret keys are clamped Curve25519 scalars, public keys are points in the Montgomery
//! representation.
use std::fmt;

use curve25519_dalek::MontgomeryPoint;
use serde::{Deserialize, Serialize};

use crate::crypto::secret::Secret;
use crate::crypto::{Rng, RngError};

pub const SECRET_KEY_SIZE: usize = 32;

pub const PUBLIC_KEY_SIZE: usize = 32;

/// X25519 secret key.
///
/// The scalar is clamped on construction: the low three bits and the highest bit are cleared and
/// the second-highest bit is set, as required for Curve25519 scalar multiplication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(test, derive(Debug))]
pub struct SecretKey(Secret<SECRET_KEY_SIZE>);

impl SecretKey {
    pub fn from_bytes(mut bytes: [u8; SECRET_KEY_SIZE]) -> Self {
        bytes[0] &= 248;
        bytes[31] &= 127;
        bytes[31] |= 64;
        Self(Secret::from_bytes(bytes))
    }

    pub fn from_rng(rng: &Rng) -> Result<Self, RngError> {
        Ok(Self::from_bytes(rng.random_array()?))
    }

    pub fn as_bytes(&self) -> &[u8; SECRET_KEY_SIZE] {
        self.0.as_bytes()
    }

    /// Returns the public counter-part, the scalar-base multiplication of this secret.
    pub fn public_key(&self) -> PublicKey {
        let point = MontgomeryPoint::mul_base_clamped(self.0.to_bytes());
        PublicKey(point.to_bytes())
    }

    /// X25519 scalar multiplication with the public key of the other party.
    pub fn diffie_hellman(&self, their_public_key: &PublicKey) -> [u8; PUBLIC_KEY_SIZE] {
        let point = MontgomeryPoint(their_public_key.to_bytes()).mul_clamped(self.0.to_bytes());
        point.to_bytes()
    }
}

#[cfg(not(test))]
impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey").field("value", &"***").finish()
    }
}

/// X25519 public key (Montgomery u-coordinate).
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(#[serde(with = "serde_bytes")] [u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.as_bytes())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

/// X25519 key pair used for one Diffie-Hellman ratchet generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    pub fn new(secret: SecretKey) -> Self {
        let public = secret.public_key();
        Self { secret, public }
    }

    pub fn from_rng(rng: &Rng) -> Result<Self, RngError> {
        Ok(Self::new(SecretKey::from_rng(rng)?))
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    pub fn public(&self) -> PublicKey {
        self.public
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;

    use super::{KeyPair, SecretKey};

    #[test]
    fn secret_keys_are_clamped() {
        let rng = Rng::from_seed([1; 32]);
        for _ in 0..10 {
            let secret_key = SecretKey::from_rng(&rng).unwrap();
            let bytes = secret_key.as_bytes();
            assert_eq!(bytes[0] & 7, 0);
            assert_eq!(bytes[31] & 128, 0);
            assert_eq!(bytes[31] & 64, 64);
        }
    }

    #[test]
    fn shared_secrets_match() {
        let rng = Rng::from_seed([2; 32]);

        let alice = KeyPair::from_rng(&rng).unwrap();
        let bob = KeyPair::from_rng(&rng).unwrap();

        let alice_shared = alice.secret().diffie_hellman(&bob.public());
        let bob_shared = bob.secret().diffie_hellman(&alice.public());
        assert_eq!(alice_shared, bob_shared);
    }

    #[test]
    fn generated_pairs_are_unique() {
        let rng = Rng::from_seed([3; 32]);

        let pairs: Vec<KeyPair> = (0..10).map(|_| KeyPair::from_rng(&rng).unwrap()).collect();
        for (i, pair) in pairs.iter().enumerate() {
            for other in &pairs[i + 1..] {
                assert_ne!(pair.secret().as_bytes(), other.secret().as_bytes());
                assert_ne!(pair.public(), other.public());
            }
        }
    }
}
