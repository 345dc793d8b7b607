//! grumble: a `print` replacement that leaves a diagnostic paper trail
//!
//! - `identity`: sequence numbers, fingerprints, mood and clock symbols
//! - `paths`: log stream keys and file locations
//! - `lock`: cross-process advisory lock on a sibling lock file
//! - `appender`: locked, all-or-nothing appends
//! - `recorder`: builds records and ties everything together

pub mod appender;
pub mod config;
pub mod console;
pub mod errors; // Typed errors for storage, render and console failures
pub mod identity;
pub mod lock;
pub mod paths;
pub mod recorder;

pub use errors::{GrumbleError, GrumbleResult};
pub use recorder::{grumble, say, CallContext, ErrorSnapshot, Grumble, GrumbleRecorder, Recorded};
