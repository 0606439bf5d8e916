//! Core types shared across Gatekeeper components.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{DIGEST_LEN, RECORD_VERSION};
use crate::error::GatekeeperError;

/// SHA3-512 digest of `salt || code || pepper`
pub type Digest = [u8; DIGEST_LEN];

/// The single outstanding challenge for a caller identity.
///
/// Only the digest of the code is kept. A record is always verified with its
/// own salt and timestamp.
#[derive(Clone, PartialEq, Eq)]
pub struct ChallengeRecord {
    pub digest: Digest,
    pub salt: Vec<u8>,
    pub issued_at: DateTime<Utc>,
}

/// Versioned wire form of a [`ChallengeRecord`].
///
/// `sealed` is base64(`salt || digest`); `salt_len` tells where to split it.
#[derive(Debug, Serialize, Deserialize)]
struct WireRecord {
    v: u8,
    issued_at: i64,
    salt_len: usize,
    sealed: String,
}

impl ChallengeRecord {
    pub fn new(digest: Digest, salt: Vec<u8>, issued_at: DateTime<Utc>) -> Self {
        Self {
            digest,
            salt,
            issued_at,
        }
    }

    /// Encode as compact JSON: `{"v":1,"issued_at":<ms>,"salt_len":n,"sealed":"<b64>"}`
    pub fn encode(&self) -> Result<Vec<u8>, GatekeeperError> {
        let wire = WireRecord {
            v: RECORD_VERSION,
            issued_at: self.issued_at.timestamp_millis(),
            salt_len: self.salt.len(),
            sealed: STANDARD.encode(combine(&self.salt, &self.digest)),
        };
        serde_json::to_vec(&wire).map_err(|e| GatekeeperError::Codec(e.to_string()))
    }

    /// Decode a record produced by [`ChallengeRecord::encode`]
    pub fn decode(bytes: &[u8]) -> Result<Self, GatekeeperError> {
        let wire: WireRecord =
            serde_json::from_slice(bytes).map_err(|e| GatekeeperError::Codec(e.to_string()))?;

        if wire.v != RECORD_VERSION {
            return Err(GatekeeperError::Codec(format!(
                "unsupported record version {} (expected {})",
                wire.v, RECORD_VERSION
            )));
        }

        let sealed = STANDARD
            .decode(wire.sealed.as_bytes())
            .map_err(|e| GatekeeperError::Codec(format!("invalid base64: {}", e)))?;
        let (salt, digest) = split(&sealed, wire.salt_len)?;

        let issued_at = DateTime::from_timestamp_millis(wire.issued_at).ok_or_else(|| {
            GatekeeperError::Codec(format!("timestamp out of range: {}", wire.issued_at))
        })?;

        Ok(Self {
            digest,
            salt,
            issued_at,
        })
    }
}

impl std::fmt::Debug for ChallengeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeRecord")
            .field("salt_len", &self.salt.len())
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

/// Pack a salt and digest as `salt || digest`
pub fn combine(salt: &[u8], digest: &Digest) -> Vec<u8> {
    let mut out = Vec::with_capacity(salt.len() + DIGEST_LEN);
    out.extend_from_slice(salt);
    out.extend_from_slice(digest);
    out
}

/// Inverse of [`combine`]
pub fn split(blob: &[u8], salt_len: usize) -> Result<(Vec<u8>, Digest), GatekeeperError> {
    if salt_len == 0 || blob.len() != salt_len + DIGEST_LEN {
        return Err(GatekeeperError::Codec(format!(
            "sealed length {} does not match salt length {} + digest length {}",
            blob.len(),
            salt_len,
            DIGEST_LEN
        )));
    }

    let (salt, digest_bytes) = blob.split_at(salt_len);
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(digest_bytes);
    Ok((salt.to_vec(), digest))
}

/// A freshly issued challenge, handed to the host for rendering
#[derive(Clone, Serialize)]
pub struct IssuedChallenge {
    /// Plaintext code; the only copy that ever leaves the verifier
    pub code: String,

    /// When the record was stored
    pub issued_at: DateTime<Utc>,

    /// When the record stops verifying (none = never)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for IssuedChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedChallenge")
            .field("code_len", &self.code.len())
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Why a submission was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectReason {
    /// No challenge stored for this identity
    Absent,
    /// Nothing was submitted; the challenge is kept for a retry
    Empty,
    /// The challenge outlived its expiry window
    Expired,
    /// The submitted code does not match
    Mismatch,
    /// The submitted code is not ASCII
    Encoding,
    /// The stored record could not be decoded
    Malformed,
}

/// Result of a verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum VerifyOutcome {
    Verified,
    Rejected(RejectReason),
}

impl VerifyOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }

    /// Rejection reason, if any
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Verified => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }
}

impl From<VerifyOutcome> for bool {
    fn from(outcome: VerifyOutcome) -> Self {
        outcome.is_verified()
    }
}
