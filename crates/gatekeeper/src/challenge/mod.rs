//! Challenge digest protocol.
//!
//! Codes are generated, bound to a fresh salt and the pepper, and only their
//! digest is stored. Verification recomputes the digest with the stored salt.

mod clock;
mod digest;
mod generator;
mod verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use digest::{digest, verify_digest};
pub use generator::generate_code;
pub use verifier::Verifier;
