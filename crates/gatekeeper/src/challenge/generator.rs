//! Challenge code generation.
//!
//! The random source is a parameter so tests can replay a fixed tape; the
//! `CryptoRng` bound keeps non-cryptographic generators out.

use std::ops::RangeInclusive;

use gatekeeper_common::GatekeeperError;
use rand::{CryptoRng, Rng};

/// Draw a code from `charset`.
///
/// Length is `explicit_length` if given, otherwise uniform over `lengths`
/// (both ends inclusive). Characters are drawn independently with replacement.
pub fn generate_code<R: CryptoRng + ?Sized>(
    rng: &mut R,
    charset: &str,
    lengths: RangeInclusive<usize>,
    explicit_length: Option<usize>,
) -> Result<String, GatekeeperError> {
    if charset.is_empty() || !charset.is_ascii() {
        return Err(GatekeeperError::Config(
            "charset must be non-empty ASCII".into(),
        ));
    }

    let length = match explicit_length {
        Some(0) => {
            return Err(GatekeeperError::InvalidInput(
                "code length must be at least 1".into(),
            ));
        }
        Some(n) => n,
        None => {
            if *lengths.start() == 0 || lengths.is_empty() {
                return Err(GatekeeperError::Config(format!(
                    "invalid code length range {}..={}",
                    lengths.start(),
                    lengths.end()
                )));
            }
            rng.random_range(lengths)
        }
    };

    let alphabet = charset.as_bytes();
    let code = (0..length)
        .map(|_| alphabet[rng.random_range(0..alphabet.len())] as char)
        .collect();

    Ok(code)
}
