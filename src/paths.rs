//! Log file path resolution for grumble
//!
//! Every call maps to one log stream, identified by process, thread and an
//! optional tag. The stream decides the file name; the settings decide the
//! directory.
//!
//! ## File Naming
//!
//! ```text
//! grumble-<process>-<pid>[-<thread>-<thread-id>][-<tag>].log
//! grumble-<process>-<pid>[-<thread>-<thread-id>][-<tag>].log.lock   (transient)
//! ```
//!
//! The thread segment is left out on the main thread.
//!
//! ## Directory Strategy
//!
//! - `GRUMBLE_LOG_DIR` when set (re-read on every call)
//! - otherwise the working directory captured at startup (cached once)

use once_cell::sync::Lazy;
use std::cell::Cell;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::Settings;

/// File name prefix shared by every log file
pub const LOG_FILE_PREFIX: &str = "grumble";

/// Separator between file name segments
pub const SEGMENT_SEPARATOR: &str = "-";

/// Log file extension
pub const LOG_FILE_EXTENSION: &str = "log";

/// Suffix appended to a log path to form its lock path
pub const LOCK_SUFFIX: &str = ".lock";

/// Name Rust gives the thread running `main`
const MAIN_THREAD_NAME: &str = "main";

/// Name used for threads spawned without one
const UNNAMED_THREAD: &str = "thread";

// =============================================================================
// STARTUP DIRECTORY RESOLUTION
// =============================================================================

/// Working directory at first use (thread-safe, never refreshed)
static STARTUP_DIRECTORY: Lazy<PathBuf> =
  Lazy::new(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

/// Process name, resolved once
static PROCESS_NAME: Lazy<String> = Lazy::new(resolve_process_name);

/// Source of process-unique thread numbers
static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
  static THREAD_ID: Cell<u64> = const { Cell::new(0) };
}

/// Capture the working directory now
///
/// The directory is otherwise captured lazily on first use, so binaries should
/// call this early in `main`, before anything changes the working directory.
/// Later calls return the first capture.
pub fn capture_startup_directory() -> PathBuf {
  STARTUP_DIRECTORY.clone()
}

/// Returns the working directory captured at startup
pub fn startup_directory() -> &'static Path {
  STARTUP_DIRECTORY.as_path()
}

/// Returns the directory log files go to under the given settings
pub fn log_directory(settings: &Settings) -> PathBuf {
  match &settings.log_dir {
    Some(dir) => dir.clone(),
    None => STARTUP_DIRECTORY.clone(),
  }
}

// =============================================================================
// PROCESS AND THREAD IDENTITY
// =============================================================================

/// Program name from argv[0], falling back to the executable's file name
fn resolve_process_name() -> String {
  let from_args = std::env::args_os()
    .next()
    .and_then(|arg| file_name_of(Path::new(&arg)));

  from_args
    .or_else(executable_name)
    .unwrap_or_else(|| "unknown".to_string())
}

fn executable_name() -> Option<String> {
  std::env::current_exe()
    .ok()
    .and_then(|exe| file_name_of(&exe))
}

fn file_name_of(path: &Path) -> Option<String> {
  path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .filter(|name| !name.is_empty())
}

/// Process-unique number for the calling thread, assigned on first use
pub fn current_thread_id() -> u64 {
  THREAD_ID.with(|id| {
    if id.get() == 0 {
      id.set(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed));
    }
    id.get()
  })
}

// =============================================================================
// LOG STREAM KEY
// =============================================================================

/// Identifies the single log file a call appends to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogStreamKey {
  pub process_name: String,
  pub process_id: u32,
  pub thread_name: String,
  /// `None` on the main thread
  pub thread_id: Option<u64>,
  pub tag: Option<String>,
}

impl LogStreamKey {
  /// Key for the calling thread, derived fresh from ambient context
  pub fn current(tag: Option<&str>) -> Self {
    let thread = std::thread::current();
    let thread_name = thread.name().unwrap_or(UNNAMED_THREAD).to_string();
    let thread_id = if thread_name == MAIN_THREAD_NAME {
      None
    } else {
      Some(current_thread_id())
    };

    Self {
      process_name: PROCESS_NAME.clone(),
      process_id: std::process::id(),
      thread_name,
      thread_id,
      tag: tag.filter(|t| !t.is_empty()).map(str::to_string),
    }
  }

  /// Key for the main thread of a given process
  pub fn for_process(process_name: &str, process_id: u32) -> Self {
    Self {
      process_name: process_name.to_string(),
      process_id,
      thread_name: MAIN_THREAD_NAME.to_string(),
      thread_id: None,
      tag: None,
    }
  }

  pub fn with_thread(mut self, thread_name: &str, thread_id: u64) -> Self {
    self.thread_name = thread_name.to_string();
    self.thread_id = Some(thread_id);
    self
  }

  pub fn with_tag(mut self, tag: &str) -> Self {
    self.tag = Some(tag.to_string()).filter(|t| !t.is_empty());
    self
  }

  /// File name for this stream
  ///
  /// Segments are used verbatim. A `/` in a thread name or tag therefore
  /// points into a subdirectory, which is not created, so appends fail.
  pub fn file_name(&self) -> String {
    let process_name = if self.process_name.is_empty() {
      executable_name().unwrap_or_else(|| "unknown".to_string())
    } else {
      self.process_name.clone()
    };

    let mut parts = vec![
      LOG_FILE_PREFIX.to_string(),
      process_name,
      self.process_id.to_string(),
    ];

    if let Some(thread_id) = self.thread_id {
      parts.push(self.thread_name.clone());
      parts.push(thread_id.to_string());
    }

    if let Some(tag) = &self.tag {
      parts.push(tag.clone());
    }

    format!("{}.{}", parts.join(SEGMENT_SEPARATOR), LOG_FILE_EXTENSION)
  }
}

// =============================================================================
// PATH HELPERS
// =============================================================================

/// Full path of the log file for `key` inside `base_dir`
pub fn resolve(base_dir: &Path, key: &LogStreamKey) -> PathBuf {
  base_dir.join(key.file_name())
}

/// Lock file path guarding `log_path`
pub fn lock_path_for(log_path: &Path) -> PathBuf {
  let mut lock: OsString = log_path.as_os_str().to_owned();
  lock.push(LOCK_SUFFIX);
  PathBuf::from(lock)
}

/// Path as shown on the console
///
/// Relative to the startup directory when `log_dir` lives under it, absolute
/// otherwise.
pub fn display_path(log_path: &Path, log_dir: &Path) -> String {
  display_path_from(log_path, log_dir, startup_directory())
}

fn display_path_from(log_path: &Path, log_dir: &Path, startup_dir: &Path) -> String {
  if log_dir.starts_with(startup_dir) {
    if let Ok(relative) = log_path.strip_prefix(startup_dir) {
      return relative.display().to_string();
    }
  }
  log_path.display().to_string()
}

// =============================================================================
// TESTS
// =============================================================================
