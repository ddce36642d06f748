// SPDX-License-Identifier: MIT OR Apache-2.0

//! Container for secret key material.
use std::fmt;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::ZeroizeOnDrop;

/// Fixed-size secret bytes, handled with care:
///
/// - memory is zeroised when the value is dropped,
/// - equality checks run in constant time,
/// - debug output never contains the value,
/// - the all-zero value (a rejected shared secret) is detectable without branching on
///   individual bytes.
///
/// Side-channel resistance remains best-effort: it is a property of the deployed system
/// including its hardware, not of this container alone.
#[derive(Clone, Eq, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct Secret<const N: usize>(#[serde(with = "serde_bytes")] [u8; N]);

impl<const N: usize> Secret<N> {
    pub(crate) fn from_bytes(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    /// Returns an owned copy of the secret bytes, for primitives which consume their input
    /// (the X25519 scalar multiplications).
    ///
    /// The copy is not tracked by this container; callers must not let it outlive the
    /// operation it feeds.
    pub(crate) fn to_bytes(&self) -> [u8; N] {
        self.0
    }

    /// Constant-time check against the all-zero value.
    pub(crate) fn is_zero(&self) -> bool {
        bool::from(self.0.ct_eq(&[0; N]))
    }
}

impl<const N: usize> PartialEq for Secret<N> {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time comparison.
        bool::from(self.0.ct_eq(&other.0))
    }
}

impl<const N: usize> fmt::Debug for Secret<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never reveal the value, not even in test builds.
        write!(f, "Secret<{N}>(***)")
    }
}
