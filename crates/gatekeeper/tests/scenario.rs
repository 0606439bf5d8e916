//! End-to-end challenge scenarios over the in-memory store.

use std::sync::Arc;

use chrono::Duration;
use gatekeeper::{
    CaptchaConfig, ManualClock, MemoryStore, RejectReason, Verifier, load_or_create,
};

fn config(dir: &tempfile::TempDir) -> CaptchaConfig {
    CaptchaConfig {
        salt_len: 32,
        min_length: 4,
        max_length: 8,
        expiry_secs: Some(60),
        pepper_file: dir.path().join("captcha_pepper"),
        ..Default::default()
    }
}

#[tokio::test]
async fn issue_verify_replay_expire() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::default());
    let verifier = Verifier::with_clock(config(&dir), MemoryStore::new(), clock.clone()).unwrap();
    verifier.init().unwrap();

    let challenge = verifier.issue("session-1", None, None).await.unwrap();
    assert!((4..=8).contains(&challenge.code.len()));

    // Correct code once, then it's gone
    assert!(verifier.verify("session-1", Some(&challenge.code)).await.unwrap());
    let replay = verifier
        .verify_outcome("session-1", Some(&challenge.code), true)
        .await
        .unwrap();
    assert_eq!(replay.reason(), Some(RejectReason::Absent));

    // Correct code after 61 simulated seconds is expired
    let challenge = verifier.issue("session-1", None, None).await.unwrap();
    clock.advance(Duration::seconds(61));
    let late = verifier
        .verify_outcome("session-1", Some(&challenge.code), true)
        .await
        .unwrap();
    assert_eq!(late.reason(), Some(RejectReason::Expired));
}

#[tokio::test]
async fn fixed_code_round() {
    let dir = tempfile::tempdir().unwrap();
    let verifier = Verifier::new(config(&dir), MemoryStore::new()).unwrap();
    verifier.init().unwrap();

    let challenge = verifier.issue("session-1", Some("aB3@"), None).await.unwrap();
    assert_eq!(challenge.code, "aB3@");

    assert!(verifier.verify("session-1", Some("aB3@")).await.unwrap());
    assert!(!verifier.verify("session-1", Some("aB3@")).await.unwrap());
}

#[tokio::test]
async fn pepper_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("captcha_pepper");
    assert!(!path.exists());

    // First process issues a challenge
    let store = Arc::new(MemoryStore::new());
    let first = Verifier::new(config(&dir), store.clone()).unwrap();
    first.init().unwrap();
    assert_eq!(std::fs::read(&path).unwrap().len(), 2048);
    let challenge = first.issue("session-1", None, None).await.unwrap();
    drop(first);

    // A restarted process reads the same pepper and accepts the code
    let written = std::fs::read(&path).unwrap();
    assert_eq!(load_or_create(&path, 2048).unwrap().as_bytes(), written.as_slice());

    let second = Verifier::new(config(&dir), store).unwrap();
    second.init().unwrap();
    assert!(second.verify("session-1", Some(&challenge.code)).await.unwrap());
}

#[tokio::test]
async fn concurrent_identities() {
    let dir = tempfile::tempdir().unwrap();
    let verifier = Arc::new(Verifier::new(config(&dir), MemoryStore::new()).unwrap());
    verifier.init().unwrap();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let verifier = verifier.clone();
            tokio::spawn(async move {
                let identity = format!("session-{i}");
                let challenge = verifier.issue(&identity, None, None).await.unwrap();
                verifier.verify(&identity, Some(&challenge.code)).await.unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap());
    }
    assert!(verifier.store().is_empty().await);
}
