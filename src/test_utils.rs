// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic fixtures for tests.
use crate::crypto::Rng;
use crate::crypto::default::DefaultCrypto;
use crate::crypto::x25519::PublicKey;
use crate::keys::Key;
use crate::keys_storage::InMemoryKeysStorage;
use crate::session::{Session, SessionConfig};
use crate::session_he::SessionHE;
use crate::traits::CryptoProvider;

/// Returns a [`DefaultCrypto`] with a deterministic random-number generator.
pub fn seeded_crypto(seed: u8) -> DefaultCrypto {
    DefaultCrypto::from_rng(Rng::from_seed([seed; 32]))
}

/// Builds a connected initiator/responder pair of plain sessions over the given shared secret.
pub fn session_pair(
    shared_key: [u8; 32],
    config: SessionConfig,
) -> (
    Session<DefaultCrypto, InMemoryKeysStorage<PublicKey>>,
    Session<DefaultCrypto, InMemoryKeysStorage<PublicKey>>,
) {
    let alice_crypto = seeded_crypto(101);
    let bob_crypto = seeded_crypto(102);

    let bob_pair = bob_crypto.generate_dh().expect("seeded rng delivers");
    let remote_public_key = bob_pair.public();

    let bob = Session::new_responder(
        b"bob".to_vec(),
        Key::from_bytes(shared_key),
        bob_pair,
        bob_crypto,
        InMemoryKeysStorage::new(),
        config.clone(),
    )
    .expect("responder construction");
    let alice = Session::new_initiator(
        b"alice".to_vec(),
        Key::from_bytes(shared_key),
        remote_public_key,
        alice_crypto,
        InMemoryKeysStorage::new(),
        config,
    )
    .expect("initiator construction");

    (alice, bob)
}

/// Builds a connected initiator/responder pair of header-encrypted sessions.
pub fn session_pair_he(
    shared_key: [u8; 32],
    shared_hka: [u8; 32],
    shared_nhkb: [u8; 32],
    config: SessionConfig,
) -> (
    SessionHE<DefaultCrypto, InMemoryKeysStorage<Key>>,
    SessionHE<DefaultCrypto, InMemoryKeysStorage<Key>>,
) {
    let alice_crypto = seeded_crypto(103);
    let bob_crypto = seeded_crypto(104);

    let bob_pair = bob_crypto.generate_dh().expect("seeded rng delivers");
    let remote_public_key = bob_pair.public();

    let bob = SessionHE::new_responder(
        b"bob".to_vec(),
        Key::from_bytes(shared_key),
        bob_pair,
        Key::from_bytes(shared_hka),
        Key::from_bytes(shared_nhkb),
        bob_crypto,
        InMemoryKeysStorage::new(),
        config.clone(),
    )
    .expect("responder construction");
    let alice = SessionHE::new_initiator(
        b"alice".to_vec(),
        Key::from_bytes(shared_key),
        remote_public_key,
        Key::from_bytes(shared_hka),
        Key::from_bytes(shared_nhkb),
        alice_crypto,
        InMemoryKeysStorage::new(),
        config,
    )
    .expect("initiator construction");

    (alice, bob)
}
