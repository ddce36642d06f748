// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opaque 256-bit secrets flowing through the ratchet.
use std::hash::{Hash as StdHash, Hasher};

use serde::{Deserialize, Serialize};

use crate::crypto::Secret;

/// Size of every symmetric secret in the ratchet (root, chain, message and header keys).
pub const KEY_SIZE: usize = 32;

/// 256-bit opaque secret.
///
/// Used for the shared session secret, root keys, chain keys, message keys and header keys.
/// Compared in constant time, zeroised on drop and masked in debug output.
///
/// Header keys index skipped message keys in the header-encrypted protocol variant, which is why
/// this type is hashable.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(test, derive(Debug))]
pub struct Key(Secret<KEY_SIZE>);

impl Key {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(Secret::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        self.0.as_bytes()
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl StdHash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl From<[u8; KEY_SIZE]> for Key {
    fn from(bytes: [u8; KEY_SIZE]) -> Self {
        Self::from_bytes(bytes)
    }
}

#[cfg(not(test))]
impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key").field("value", &"***").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Key;

    #[test]
    fn zero_detection() {
        assert!(Key::from_bytes([0; 32]).is_zero());
        assert!(!Key::from_bytes([1; 32]).is_zero());
    }

    #[test]
    fn equality_over_bytes() {
        assert_eq!(Key::from_bytes([7; 32]), Key::from_bytes([7; 32]));
        assert_ne!(Key::from_bytes([7; 32]), Key::from_bytes([8; 32]));
    }
}
