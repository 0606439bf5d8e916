//! # Gatekeeper
//!
//! Issues short-lived human-verification codes and checks submitted answers
//! without keeping the plaintext code.
//!
//! ## Flow
//! ```text
//! generate_code → digest(salt || code || pepper) → SessionStore
//!                                                     ↓
//!             verify: expiry check → consume → constant-time compare
//! ```
//!
//! Rendering the code and wiring it into a web framework is left to the host.

pub mod challenge;
pub mod config;
pub mod secret;
pub mod session;

pub use challenge::{Clock, ManualClock, SystemClock, Verifier};
pub use config::{AppConfig, CaptchaConfig};
pub use gatekeeper_common::{
    ChallengeRecord, GatekeeperError, IssuedChallenge, RejectReason, VerifyOutcome,
};
pub use secret::{Pepper, load_or_create};
pub use session::{ChallengeSession, MemoryStore, RedisStore, SessionStore};
