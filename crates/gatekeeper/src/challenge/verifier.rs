//! Challenge issuance and verification.
//!
//! Per identity: `NoChallenge` → `issue` → `ChallengeIssued` → `verify` →
//! consumed → `NoChallenge`. Expiry is always checked before the digest
//! comparison, and with `auto_expire` the record is removed before comparing,
//! so a code verifies at most once.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Duration, Utc};
use gatekeeper_common::{
    ChallengeRecord, GatekeeperError, IssuedChallenge, RejectReason, VerifyOutcome,
};
use rand::RngCore;

use super::clock::{Clock, SystemClock};
use super::digest::{digest, verify_digest};
use super::generator::generate_code;
use crate::config::CaptchaConfig;
use crate::secret::{self, Pepper};
use crate::session::{ChallengeSession, SessionStore};

/// Challenge verifier service
pub struct Verifier<S, C = SystemClock> {
    config: CaptchaConfig,
    store: S,
    clock: C,
    pepper: OnceLock<Arc<Pepper>>,
}

impl<S: SessionStore> Verifier<S> {
    pub fn new(config: CaptchaConfig, store: S) -> Result<Self, GatekeeperError> {
        Self::with_clock(config, store, SystemClock)
    }
}

impl<S: SessionStore, C: Clock> Verifier<S, C> {
    pub fn with_clock(config: CaptchaConfig, store: S, clock: C) -> Result<Self, GatekeeperError> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            clock,
            pepper: OnceLock::new(),
        })
    }

    /// Load (or create) the configured pepper file. Idempotent.
    pub fn init(&self) -> Result<(), GatekeeperError> {
        if self.pepper.get().is_some() {
            return Ok(());
        }

        let pepper = secret::load_or_create(&self.config.pepper_file, self.config.pepper_size)?;
        // A concurrent init read the same file; either copy will do
        let _ = self.pepper.set(Arc::new(pepper));

        tracing::info!(namespace = %self.config.namespace, "Verifier initialized");
        Ok(())
    }

    /// Use an already loaded pepper instead of the configured file
    pub fn install_pepper(&self, pepper: Arc<Pepper>) -> Result<(), GatekeeperError> {
        if pepper.is_empty() {
            return Err(GatekeeperError::InvalidInput("pepper must not be empty".into()));
        }
        self.pepper
            .set(pepper)
            .map_err(|_| GatekeeperError::Config("pepper already initialized".into()))
    }

    pub fn is_initialized(&self) -> bool {
        self.pepper.get().is_some()
    }

    pub fn config(&self) -> &CaptchaConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn pepper(&self) -> Result<&Pepper, GatekeeperError> {
        self.pepper
            .get()
            .map(|p| p.as_ref())
            .ok_or_else(|| GatekeeperError::NotInitialized("pepper not loaded, call init()".into()))
    }

    /// Challenge slot for `identity`
    pub fn session(&self, identity: &str) -> Result<ChallengeSession<'_, S>, GatekeeperError> {
        ChallengeSession::new(&self.store, &self.config.namespace, identity)
    }

    /// Generate a code without storing anything
    pub fn random_code(&self, length: Option<usize>) -> Result<String, GatekeeperError> {
        generate_code(
            &mut rand::rng(),
            &self.config.charset,
            self.config.min_length..=self.config.max_length,
            length,
        )
    }

    /// Digest `code` with a fresh salt, stamped with the current time
    pub fn seal(&self, code: &str) -> Result<ChallengeRecord, GatekeeperError> {
        let pepper = self.pepper()?;

        let mut salt = vec![0u8; self.config.salt_len];
        rand::rng().fill_bytes(&mut salt);

        let digest = digest(code, &salt, pepper.as_bytes())?;
        Ok(ChallengeRecord::new(digest, salt, self.clock.now()))
    }

    /// Issue a new challenge for `identity`, replacing any outstanding one.
    ///
    /// Uses `code` if given, otherwise generates one (of `length` if given).
    /// The returned plaintext code is meant for rendering only.
    pub async fn issue(
        &self,
        identity: &str,
        code: Option<&str>,
        length: Option<usize>,
    ) -> Result<IssuedChallenge, GatekeeperError> {
        self.pepper()?;
        let session = self.session(identity)?;

        let code = match code {
            Some("") => {
                return Err(GatekeeperError::InvalidInput("code must not be empty".into()));
            }
            Some(code) => code.to_string(),
            None => self.random_code(length)?,
        };

        let record = self.seal(&code)?;
        session.put(&record, self.config.expiry()).await?;

        let expires_at = self
            .expiry_delta()
            .and_then(|e| record.issued_at.checked_add_signed(e));

        tracing::debug!(
            identity = %identity,
            code_len = code.len(),
            expires_at = ?expires_at,
            "Issued challenge"
        );

        Ok(IssuedChallenge {
            code,
            issued_at: record.issued_at,
            expires_at,
        })
    }

    /// The outstanding record for `identity`, if any
    pub async fn current(&self, identity: &str) -> Result<Option<ChallengeRecord>, GatekeeperError> {
        self.session(identity)?.get().await
    }

    /// Check `submitted` against the outstanding challenge, consuming it
    pub async fn verify(
        &self,
        identity: &str,
        submitted: Option<&str>,
    ) -> Result<bool, GatekeeperError> {
        Ok(self.verify_outcome(identity, submitted, true).await?.is_verified())
    }

    /// Check `submitted` and report why it was rejected.
    ///
    /// With `auto_expire` off, a live challenge survives a failed (or
    /// successful) comparison; expired challenges are always removed.
    pub async fn verify_outcome(
        &self,
        identity: &str,
        submitted: Option<&str>,
        auto_expire: bool,
    ) -> Result<VerifyOutcome, GatekeeperError> {
        let pepper = self.pepper()?;
        let session = self.session(identity)?;

        let Some(submitted) = submitted.filter(|code| !code.is_empty()) else {
            // Nothing to check; leave any challenge in place for a retry
            let reason = match session.get().await {
                Ok(None) => RejectReason::Absent,
                Ok(Some(_)) => RejectReason::Empty,
                Err(GatekeeperError::Codec(e)) => return self.discard(&session, identity, &e).await,
                Err(e) => return Err(e),
            };
            return Ok(self.rejected(identity, reason));
        };

        // Single use: take the record in one step so concurrent verifies
        // can't both see it
        let fetched = if auto_expire {
            session.take().await
        } else {
            session.get().await
        };

        let record = match fetched {
            Ok(Some(record)) => record,
            Ok(None) => return Ok(self.rejected(identity, RejectReason::Absent)),
            Err(GatekeeperError::Codec(e)) => return self.discard(&session, identity, &e).await,
            Err(e) => return Err(e),
        };

        if self.is_expired(record.issued_at, self.clock.now()) {
            if !auto_expire {
                session.clear().await?;
            }
            return Ok(self.rejected(identity, RejectReason::Expired));
        }

        match verify_digest(&record.digest, submitted, &record.salt, pepper.as_bytes()) {
            Ok(true) => {
                tracing::info!(identity = %identity, "Challenge verified");
                Ok(VerifyOutcome::Verified)
            }
            Ok(false) => Ok(self.rejected(identity, RejectReason::Mismatch)),
            Err(GatekeeperError::Encoding(_)) => Ok(self.rejected(identity, RejectReason::Encoding)),
            Err(e) => Err(e),
        }
    }

    /// Drop the outstanding challenge, if any
    pub async fn expire_now(&self, identity: &str) -> Result<(), GatekeeperError> {
        self.session(identity)?.clear().await?;
        tracing::debug!(identity = %identity, "Challenge expired on request");
        Ok(())
    }

    /// Elapsed time outside `[0, expiry)` is expired; no expiry never is
    fn is_expired(&self, issued_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let Some(expiry) = self.expiry_delta() else {
            return false;
        };
        let elapsed = now - issued_at;
        elapsed < Duration::zero() || elapsed >= expiry
    }

    fn expiry_delta(&self) -> Option<Duration> {
        self.config
            .expiry()
            .map(|e| Duration::from_std(e).unwrap_or(Duration::MAX))
    }

    async fn discard(
        &self,
        session: &ChallengeSession<'_, S>,
        identity: &str,
        error: &str,
    ) -> Result<VerifyOutcome, GatekeeperError> {
        tracing::warn!(identity = %identity, error = %error, "Discarding undecodable challenge");
        session.clear().await?;
        Ok(self.rejected(identity, RejectReason::Malformed))
    }

    fn rejected(&self, identity: &str, reason: RejectReason) -> VerifyOutcome {
        tracing::debug!(identity = %identity, reason = ?reason, "Challenge rejected");
        VerifyOutcome::Rejected(reason)
    }
}
