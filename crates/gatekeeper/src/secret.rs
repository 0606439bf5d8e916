//! Pepper lifecycle: created once, reused across restarts.
//!
//! The pepper keys every challenge digest. It is never logged, never part of
//! an error message, and never stored next to a challenge record.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use gatekeeper_common::GatekeeperError;
use rand::RngCore;

/// Server-held secret mixed into every digest
pub struct Pepper(Vec<u8>);

impl Pepper {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for Pepper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pepper([REDACTED; {}])", self.0.len())
    }
}

/// Load the pepper at `path`, creating it with `size` random bytes if absent.
///
/// Never regenerates an existing pepper. Only "not found" triggers creation;
/// every other I/O failure is returned.
pub fn load_or_create(path: &Path, size: usize) -> Result<Pepper, GatekeeperError> {
    match fs::read(path) {
        Ok(bytes) => return loaded(path, bytes, size),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(GatekeeperError::io(path, e)),
    }

    if size == 0 {
        return Err(GatekeeperError::Config("pepper_size must be at least 1".into()));
    }

    let mut bytes = vec![0u8; size];
    rand::rng().fill_bytes(&mut bytes);

    match create_exclusive(path, &bytes) {
        Ok(()) => {
            tracing::info!(path = %path.display(), bytes = size, "Created pepper file");
            Ok(Pepper(bytes))
        }
        // Another process created it first; theirs wins
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let bytes = fs::read(path).map_err(|e| GatekeeperError::io(path, e))?;
            loaded(path, bytes, size)
        }
        Err(e) => Err(GatekeeperError::io(path, e)),
    }
}

fn loaded(path: &Path, bytes: Vec<u8>, expected: usize) -> Result<Pepper, GatekeeperError> {
    if bytes.is_empty() {
        return Err(GatekeeperError::io(
            path,
            std::io::Error::new(ErrorKind::InvalidData, "pepper file is empty"),
        ));
    }

    if bytes.len() != expected {
        tracing::warn!(
            path = %path.display(),
            bytes = bytes.len(),
            configured = expected,
            "Pepper size differs from configuration, using existing file"
        );
    }

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Loaded pepper file");
    Ok(Pepper(bytes))
}

fn create_exclusive(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    if let Err(e) = file.write_all(bytes).and_then(|()| file.sync_all()) {
        // Don't leave a truncated pepper behind for the next start to trust
        let _ = fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_then_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captcha_pepper");

        let first = load_or_create(&path, 2048).unwrap();
        assert_eq!(first.len(), 2048);
        assert_eq!(fs::read(&path).unwrap(), first.as_bytes());

        // Simulated restart
        let second = load_or_create(&path, 2048).unwrap();
        assert_eq!(second.as_bytes(), first.as_bytes());
    }

    #[test]
    fn test_existing_file_read_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pepper");
        fs::write(&path, b"provisioned-elsewhere").unwrap();

        // Configured size only matters on creation
        let pepper = load_or_create(&path, 2048).unwrap();
        assert_eq!(pepper.as_bytes(), b"provisioned-elsewhere");
    }

    #[test]
    fn test_empty_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pepper");
        fs::write(&path, b"").unwrap();

        let err = load_or_create(&path, 2048).unwrap_err();
        assert!(matches!(err, GatekeeperError::Io { .. }));
    }

    #[test]
    fn test_unwritable_location_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("pepper");

        let err = load_or_create(&path, 64).unwrap_err();
        assert!(matches!(err, GatekeeperError::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_or_create(dir.path(), 64).unwrap_err();
        assert!(matches!(err, GatekeeperError::Io { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_created_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pepper");
        load_or_create(&path, 32).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_debug_redacts() {
        let pepper = Pepper::from_bytes(b"super-secret".to_vec());
        let rendered = format!("{:?}", pepper);
        assert_eq!(rendered, "Pepper([REDACTED; 12])");
    }
}
