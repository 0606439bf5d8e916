//! Shared constants for Gatekeeper components.

/// Default salt length in bytes
pub const DEFAULT_SALT_LEN: usize = 32;

/// Default challenge character set: ASCII letters, digits and `@#%?`
pub const DEFAULT_CHARSET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789@#%?";

/// Default shortest generated code
pub const DEFAULT_MIN_CODE_LEN: usize = 4;

/// Default longest generated code
pub const DEFAULT_MAX_CODE_LEN: usize = 8;

/// Default pepper size in bytes (only used when the pepper file is created)
pub const DEFAULT_PEPPER_SIZE: usize = 2048;

/// Default pepper file location
pub const DEFAULT_PEPPER_FILE: &str = "captcha_pepper";

/// Default storage namespace (slot name) for challenge records
pub const DEFAULT_NAMESPACE: &str = "captcha";

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Longest configurable challenge lifetime (100 years)
pub const MAX_EXPIRY_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// SHA3-512 output length
pub const DIGEST_LEN: usize = 64;

/// Current `ChallengeRecord` encoding version
pub const RECORD_VERSION: u8 = 1;

/// Storage keys
pub mod keys {
    /// Separator between namespace and caller identity: {namespace}:{identity}
    pub const SEPARATOR: char = ':';
}
