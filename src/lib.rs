// SPDX-License-Identifier: MIT OR Apache-2.0

//! `double-ratchet` provides Double Ratchet messaging sessions with forward secrecy and
//! post-compromise security between two parties.
//!
//! Starting from a shared secret (established by a key-agreement protocol like X3DH, which is
//! out of scope here), two parties exchange a continuous stream of encrypted messages. Every
//! message advances a symmetric KDF chain, so a stolen key reveals nothing about earlier
//! messages (forward secrecy). Whenever a party observes a fresh ratchet public key of the other
//! side, a Diffie-Hellman ratchet step mixes new key material into all chains, so the session
//! heals from a compromise as soon as both parties exchanged another round of messages
//! (post-compromise security).
//!
//! ## Sessions
//!
//! [`Session`] implements the plain protocol: every message carries a readable header with the
//! sender's ratchet public key and two message counters. [`SessionHE`] implements the
//! header-encryption variant which additionally conceals this metadata by encrypting headers
//! under dedicated header keys that rotate with each ratchet step.
//!
//! The party sending the first message constructs its session with `new_initiator`, the party
//! receiving it with `new_responder`. Messages may be lost or arrive out of order: the receiver
//! derives and stores the keys of skipped-over messages and picks them up when the messages
//! eventually arrive, within the limits set by [`SessionConfig`].
//!
//! A session is a single-owner object. Operations never block, spawn tasks or perform I/O
//! (unless a pluggable storage does); concurrent mutation of one session is the caller's
//! responsibility to prevent.
//!
//! ## Pluggable collaborators
//!
//! Cryptographic primitives and skipped-key storage sit behind the
//! [`CryptoProvider`](traits::CryptoProvider) and [`KeysStorage`](traits::KeysStorage)
//! contracts. [`DefaultCrypto`] (X25519, HKDF- and HMAC-SHA256, AES-256-CTR with an
//! encrypt-then-MAC AEAD) and [`InMemoryKeysStorage`] are the recommended implementations.
//! Sessions can be serialized into [`SessionSnapshot`]s and persisted through the
//! [`SessionStorage`](traits::SessionStorage) contract.
//!
//! ## Security
//!
//! All secret material is zeroised on drop and compared in constant time; failed decryptions
//! leave a session byte-for-byte unchanged. Nonetheless encryption alone never guarantees full
//! security: deployments must still authenticate the initial key agreement and protect endpoint
//! devices.
mod cbor;
mod chains;
mod crypto;
mod keys;
mod keys_storage;
mod message;
mod session;
mod session_he;
mod session_storage;
mod state;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod traits;

pub use crypto::aead::{AeadError, IV_SIZE, TAG_SIZE};
pub use crypto::default::DefaultCrypto;
pub use crypto::x25519::{KeyPair, PUBLIC_KEY_SIZE, PublicKey, SECRET_KEY_SIZE, SecretKey};
pub use crypto::{Rng, RngError};
pub use keys::{KEY_SIZE, Key};
pub use keys_storage::InMemoryKeysStorage;
pub use message::{HEADER_SIZE, HeaderError, Message, MessageHE, MessageHeader};
pub use session::{Session, SessionConfig, SessionError};
pub use session_he::SessionHE;
pub use session_storage::{InMemorySessionStorage, SessionSnapshot};
