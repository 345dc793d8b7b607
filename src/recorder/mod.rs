//! Grumble recording: a `print` replacement that leaves a paper trail
//!
//! Each call prints one recognisable line and appends a full record to a log
//! file named after the process, thread and optional tag:
//! - A fingerprint matching the console line
//! - Timestamp, category and message
//! - Caller-supplied state
//! - The error being handled, if any
//! - Stack trace and a snapshot of named locals
//!
//! ## Usage
//!
//! ```rust,no_run
//! use grumble::recorder::{self, CallContext, Grumble};
//!
//! let retries = 3;
//! let entry = Grumble::new("cache miss")
//!     .category("cache")
//!     .state(&serde_json::json!({"key": "user:42"}))?
//!     .context(grumble::call_context!(retries)?);
//!
//! recorder::grumble(&entry)?;
//! # Ok::<(), grumble::errors::GrumbleError>(())
//! ```
//!
//! Workers that prefer explicit state own a `ThreadContext` and call
//! `GrumbleRecorder::record` directly.

mod core;
mod entry;
mod format;

use once_cell::sync::Lazy;
use std::cell::RefCell;

// Re-export public types
pub use self::core::{ClockFn, GrumbleRecorder, Recorded};
pub use entry::{CallContext, ContextSnapshot, ErrorSnapshot, Grumble, INTERNAL_NAME_PREFIX};
pub use format::{
    build_body, build_header, build_summary, format_timestamp, prefix_lines, render_value,
    HeaderFields, DISK_MARKER, TIMESTAMP_FORMAT,
};

use crate::errors::GrumbleResult;
use crate::identity::ThreadContext;

/// Process-wide recorder used by `grumble()`
static DEFAULT_RECORDER: Lazy<GrumbleRecorder> = Lazy::new(GrumbleRecorder::new);

thread_local! {
    static THREAD_CONTEXT: RefCell<ThreadContext> = RefCell::new(ThreadContext::new());
}

/// Returns the recorder behind `grumble()`
pub fn default_recorder() -> &'static GrumbleRecorder {
    &DEFAULT_RECORDER
}

/// Record an entry with the default recorder and this thread's counters
///
/// Settings come from `GRUMBLE_LOG_DIR` / `GRUMBLE_OUT`, read on every call.
///
/// Without `GRUMBLE_LOG_DIR`, files go to the working directory as it was on
/// the first grumble or the first `paths::capture_startup_directory()` call,
/// whichever came first. Programs that change directory should capture it
/// before doing so.
pub fn grumble(entry: &Grumble) -> GrumbleResult<Recorded> {
    record_with(default_recorder(), entry)
}

/// Record with any recorder, using this thread's counters
pub fn record_with(recorder: &GrumbleRecorder, entry: &Grumble) -> GrumbleResult<Recorded> {
    THREAD_CONTEXT.with(|ctx| recorder.record(&mut ctx.borrow_mut(), entry))
}

/// Shorthand for `grumble(&Grumble::new(message))`
pub fn say(message: &str) -> GrumbleResult<Recorded> {
    grumble(&Grumble::new(message))
}
