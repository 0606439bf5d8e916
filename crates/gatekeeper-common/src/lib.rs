//! # Gatekeeper Common
//!
//! Shared types, errors, and constants used across Gatekeeper components.
//!
//! ## Modules
//! - `types` - Challenge records and verification outcomes
//! - `error` - Common error types
//! - `constants` - Protocol defaults and storage key layout

pub mod constants;
pub mod error;
pub mod types;

pub use error::GatekeeperError;
pub use types::*;
