//! Cross-process advisory locking on a sibling lock file
//!
//! The protocol, per attempt:
//! 1. Open (or create) the lock file
//! 2. Try a non-blocking exclusive lock on it
//! 3. Check the path still names the file we locked
//! 4. Run the action
//! 5. Delete the lock file, then release the lock
//!
//! Any failed attempt closes the handle, pauses for a fixed interval and
//! starts over. There is no timeout and no retry limit.
//!
//! Deleting before releasing matters: a writer that opened the old file and
//! gets the lock afterwards fails step 3 and retries on the new file instead
//! of running alongside its owner.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Pause between lock attempts
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Non-blocking exclusive lock on an open file
///
/// `try_lock_exclusive` returning an error of any kind counts as contention.
pub trait AdvisoryLock: Send + Sync {
    fn try_lock_exclusive(&self, file: &File) -> io::Result<()>;
    fn unlock(&self, file: &File) -> io::Result<()>;
}

/// `flock`/`LockFileEx` through fs2
#[derive(Debug, Default, Clone, Copy)]
pub struct Fs2Lock;

impl AdvisoryLock for Fs2Lock {
    fn try_lock_exclusive(&self, file: &File) -> io::Result<()> {
        fs2::FileExt::try_lock_exclusive(file)
    }

    fn unlock(&self, file: &File) -> io::Result<()> {
        fs2::FileExt::unlock(file)
    }
}

/// Called with the retry interval after each failed attempt
pub type PauseFn = Arc<dyn Fn(Duration) + Send + Sync>;

#[derive(Clone)]
pub struct FileLock {
    primitive: Arc<dyn AdvisoryLock>,
    retry_interval: Duration,
    pause: PauseFn,
}

impl std::fmt::Debug for FileLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLock")
            .field("retry_interval", &self.retry_interval)
            .finish_non_exhaustive()
    }
}

impl Default for FileLock {
    fn default() -> Self {
        Self::new()
    }
}

impl FileLock {
    pub fn new() -> Self {
        Self {
            primitive: Arc::new(Fs2Lock),
            retry_interval: DEFAULT_RETRY_INTERVAL,
            pause: Arc::new(std::thread::sleep),
        }
    }

    pub fn with_primitive(mut self, primitive: Arc<dyn AdvisoryLock>) -> Self {
        self.primitive = primitive;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_pause(mut self, pause: PauseFn) -> Self {
        self.pause = pause;
        self
    }

    /// Run `action` while holding the lock at `lock_path`
    ///
    /// Blocks until the lock is obtained. Fails without retrying only when the
    /// lock file cannot be opened; errors from `action` are returned after the
    /// lock is released and the lock file removed.
    pub fn with_lock<T, E, F>(&self, lock_path: &Path, action: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<io::Error>,
    {
        let mut attempts: u64 = 0;

        let guard = loop {
            attempts += 1;

            let file = open_lock_file(lock_path)?;

            match self.try_acquire(lock_path, file) {
                Some(guard) => break guard,
                None => {
                    log::trace!(
                        "lock {} busy (attempt {}), retrying in {:?}",
                        lock_path.display(),
                        attempts,
                        self.retry_interval
                    );
                    (self.pause)(self.retry_interval);
                }
            }
        };

        if attempts > 1 {
            log::debug!("lock {} acquired after {} attempts", lock_path.display(), attempts);
        }

        let result = action();
        guard.release();
        result
    }

    /// One attempt; `None` means contention, whatever the cause
    fn try_acquire(&self, lock_path: &Path, file: File) -> Option<LockGuard> {
        if let Err(e) = self.primitive.try_lock_exclusive(&file) {
            if e.kind() != io::ErrorKind::WouldBlock {
                log::trace!("lock {} attempt failed: {}", lock_path.display(), e);
            }
            return None;
        }

        let guard = LockGuard {
            path: lock_path.to_path_buf(),
            file: Some(file),
            primitive: self.primitive.clone(),
        };

        if guard.still_linked() {
            Some(guard)
        } else {
            // Someone deleted and recreated the lock file under us; the guard
            // drops here without touching the new file.
            guard.abandon();
            None
        }
    }
}

fn open_lock_file(lock_path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(lock_path)
}

// =============================================================================
// LOCK GUARD
// =============================================================================

/// Exclusive hold on one lock file
///
/// Released on `release()` or on drop, so a panicking action still frees the
/// lock for other writers.
pub struct LockGuard {
    path: PathBuf,
    file: Option<File>,
    primitive: Arc<dyn AdvisoryLock>,
}

impl LockGuard {
    /// True when `path` still names the file this guard has locked
    fn still_linked(&self) -> bool {
        let Some(file) = &self.file else {
            return false;
        };
        same_file(file, &self.path)
    }

    /// Delete the lock file, then unlock
    pub fn release(mut self) {
        self.release_inner(true);
    }

    /// Unlock without deleting (the path no longer belongs to us)
    fn abandon(mut self) {
        self.release_inner(false);
    }

    fn release_inner(&mut self, remove: bool) {
        let Some(file) = self.file.take() else {
            return;
        };

        if remove {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != io::ErrorKind::NotFound {
                    log::debug!("failed to remove lock file {}: {}", self.path.display(), e);
                }
            }
        }

        if let Err(e) = self.primitive.unlock(&file) {
            log::debug!("failed to unlock {}: {}", self.path.display(), e);
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release_inner(true);
    }
}

#[cfg(unix)]
fn same_file(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), std::fs::metadata(path)) {
        (Ok(held), Ok(on_disk)) => held.dev() == on_disk.dev() && held.ino() == on_disk.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(_file: &File, path: &Path) -> bool {
    // Open handles block deletion on Windows, so existence is enough.
    path.exists()
}
