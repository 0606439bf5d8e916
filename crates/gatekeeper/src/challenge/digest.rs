//! Salted, peppered challenge digests.
//!
//! `digest = SHA3-512(salt || code || pepper)` where `code` is ASCII. The
//! order is fixed; the verifier rebuilds it byte for byte.

use gatekeeper_common::constants::DIGEST_LEN;
use gatekeeper_common::{Digest, GatekeeperError};
use sha3::{Digest as _, Sha3_512};
use subtle::ConstantTimeEq;

/// Digest a code with the given salt and pepper
pub fn digest(code: &str, salt: &[u8], pepper: &[u8]) -> Result<Digest, GatekeeperError> {
    if !code.is_ascii() {
        return Err(GatekeeperError::Encoding(
            "code contains non-ASCII characters".into(),
        ));
    }

    let mut hasher = Sha3_512::new();
    hasher.update(salt);
    hasher.update(code.as_bytes());
    hasher.update(pepper);

    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(&hasher.finalize());
    Ok(out)
}

/// Recompute the digest of `code` and compare it to `candidate` in constant time
pub fn verify_digest(
    candidate: &[u8],
    code: &str,
    salt: &[u8],
    pepper: &[u8],
) -> Result<bool, GatekeeperError> {
    let computed = digest(code, salt, pepper)?;
    Ok(computed.as_slice().ct_eq(candidate).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEPPER: &[u8] = b"test-pepper-bytes";

    #[test]
    fn test_deterministic() {
        let salt = [7u8; 32];
        assert_eq!(
            digest("aB3@", &salt, PEPPER).unwrap(),
            digest("aB3@", &salt, PEPPER).unwrap()
        );
    }

    #[test]
    fn test_input_order() {
        use sha3::Digest as _;

        let salt = b"salt";
        let expected = Sha3_512::digest(b"saltcodepepper");
        assert_eq!(digest("code", salt, b"pepper").unwrap().as_slice(), expected.as_slice());
    }

    #[test]
    fn test_distinct_salts_distinct_digests() {
        use rand::RngCore;

        let mut rng = rand::rng();
        for _ in 0..100 {
            let mut s1 = [0u8; 32];
            let mut s2 = [0u8; 32];
            rng.fill_bytes(&mut s1);
            rng.fill_bytes(&mut s2);
            assert_ne!(s1, s2);
            assert_ne!(
                digest("aB3@", &s1, PEPPER).unwrap(),
                digest("aB3@", &s2, PEPPER).unwrap()
            );
        }
    }

    #[test]
    fn test_pepper_changes_digest() {
        let salt = [1u8; 32];
        assert_ne!(
            digest("code", &salt, b"pepper-a").unwrap(),
            digest("code", &salt, b"pepper-b").unwrap()
        );
    }

    #[test]
    fn test_verify_digest() {
        let salt = [3u8; 32];
        let stored = digest("Xy9#", &salt, PEPPER).unwrap();

        assert!(verify_digest(&stored, "Xy9#", &salt, PEPPER).unwrap());
        assert!(!verify_digest(&stored, "xy9#", &salt, PEPPER).unwrap());
        assert!(!verify_digest(&stored, "Xy9#", &[4u8; 32], PEPPER).unwrap());
        assert!(!verify_digest(&stored[..63], "Xy9#", &salt, PEPPER).unwrap());
    }

    #[test]
    fn test_non_ascii_rejected() {
        let err = digest("caf\u{e9}", b"salt", PEPPER).unwrap_err();
        assert!(matches!(err, GatekeeperError::Encoding(_)));
        assert!(verify_digest(&[0u8; DIGEST_LEN], "\u{1f600}", b"salt", PEPPER).is_err());
    }
}
