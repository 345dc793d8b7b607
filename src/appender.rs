/// Append-only writer for grumble log files
///
/// One append = one record. The record is written as a single buffer while the
/// sibling lock file is held, so concurrent writers never interleave.
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::errors::GrumbleResult;
use crate::lock::FileLock;
use crate::paths::lock_path_for;

#[derive(Debug, Clone, Default)]
pub struct LogAppender {
    lock: FileLock,
}

impl LogAppender {
    pub fn new(lock: FileLock) -> Self {
        Self { lock }
    }

    /// Append `header`, a newline and `body` to `path`
    ///
    /// Creates the file if needed but never its directory. Storage errors are
    /// returned as-is; only lock contention is retried.
    pub fn append(&self, path: &Path, header: &str, body: &str) -> GrumbleResult<()> {
        let mut record = String::with_capacity(header.len() + body.len() + 1);
        record.push_str(header);
        record.push('\n');
        record.push_str(body);

        let lock_path = lock_path_for(path);

        self.lock.with_lock(&lock_path, || -> GrumbleResult<()> {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(record.as_bytes())?;
            file.flush()?;
            Ok(())
        })?;

        log::debug!("appended {} bytes to {}", record.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GrumbleError;

    #[test]
    fn test_append_creates_file_and_writes_header_then_body() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grumble-app-1.log");

        LogAppender::default().append(&path, "HEADER", "body\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "HEADER\nbody\n");
        assert!(!lock_path_for(&path).exists());
    }

    #[test]
    fn test_append_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grumble-app-1.log");
        std::fs::write(&path, "earlier\n").unwrap();

        let appender = LogAppender::default();
        appender.append(&path, "one", "1\n").unwrap();
        appender.append(&path, "two", "2\n").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "earlier\none\n1\ntwo\n2\n"
        );
    }

    #[test]
    fn test_missing_directory_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("grumble-app-1.log");

        let err = LogAppender::default().append(&path, "h", "b").unwrap_err();

        assert!(matches!(err, GrumbleError::Storage(_)));
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_unwritable_log_file_is_a_storage_error_and_lock_is_cleaned() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grumble-app-1.log");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444)).unwrap();

        // root ignores permission bits; nothing to assert there
        if OpenOptions::new().append(true).open(&path).is_ok() {
            return;
        }

        let err = LogAppender::default().append(&path, "h", "b").unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::PermissionDenied));
        assert!(!lock_path_for(&path).exists());
    }
}
