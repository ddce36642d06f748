// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core cryptographic algorithms and random number generator.
//!
//! Algorithms:
//! - X25519 Diffie-Hellman key agreement
//! - SHA256 HKDF and HMAC key derivation
//! - AES-256-CTR + HMAC-SHA256 AEAD
//!
//! Random Number Generator:
//! - ChaCha20 stream cipher, seeded via `getrandom`
pub mod aead;
pub mod default;
mod hkdf;
mod rng;
mod secret;
mod sha2;
pub mod x25519;

pub use rng::{Rng, RngError};
pub use secret::Secret;
