// SPDX-License-Identifier: MIT OR Apache-2.0

//! HKDF key-derivation function (SHA2-256 based).
use hkdf::Hkdf;
use sha2::Sha256;

/// HKDF-SHA2-256 deriving a fixed-size output from input key material.
///
/// The requested output sizes in this crate (64, 80 and 96 bytes) are far below the HKDF expansion
/// limit of 255 hash lengths, so expansion never fails.
pub fn hkdf_sha2_256<const N: usize>(salt: &[u8], ikm: &[u8], info: &[u8]) -> [u8; N] {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = [0u8; N];
    hkdf.expand(info, &mut okm)
        .expect("output length within hkdf expansion limit");
    okm
}

#[cfg(test)]
mod tests {
    use super::hkdf_sha2_256;

    #[test]
    fn deterministic_expansion() {
        let okm_1: [u8; 64] = hkdf_sha2_256(&[0; 32], &[1; 32], b"info");
        let okm_2: [u8; 64] = hkdf_sha2_256(&[0; 32], &[1; 32], b"info");
        assert_eq!(okm_1, okm_2);
    }

    #[test]
    fn inputs_bind_output() {
        let okm: [u8; 32] = hkdf_sha2_256(&[0; 32], &[1; 32], b"info");
        let other_salt: [u8; 32] = hkdf_sha2_256(&[9; 32], &[1; 32], b"info");
        let other_ikm: [u8; 32] = hkdf_sha2_256(&[0; 32], &[2; 32], b"info");
        let other_info: [u8; 32] = hkdf_sha2_256(&[0; 32], &[1; 32], b"other");
        assert_ne!(okm, other_salt);
        assert_ne!(okm, other_ikm);
        assert_ne!(okm, other_info);
    }
}
