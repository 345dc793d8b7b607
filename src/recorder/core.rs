/// Core recording flow
///
/// `record` does, in order:
/// 1. Resolve the log path and take the call's identity and mood symbol
/// 2. Pick the clock symbol for now
/// 3. Build header and body
/// 4. Console-only: print both and stop; otherwise append, then print the
///    one-line summary
///
/// Failures propagate; a failed append prints nothing.
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::Arc;

use super::entry::Grumble;
use super::format::{build_body, build_header, build_summary, format_timestamp, HeaderFields};
use crate::appender::LogAppender;
use crate::config::SettingsSource;
use crate::console::{ConsoleSink, StdoutConsole};
use crate::errors::GrumbleResult;
use crate::identity::{clock_symbol, ThreadContext};
use crate::lock::FileLock;
use crate::paths::{self, LogStreamKey};

/// Source of "now"
pub type ClockFn = fn() -> DateTime<Local>;

/// What happened to one entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub sequence_number: u64,
    pub fingerprint: String,
    /// Log file written, `None` in console-only mode
    pub log_path: Option<PathBuf>,
}

pub struct GrumbleRecorder {
    settings: SettingsSource,
    appender: LogAppender,
    console: Arc<dyn ConsoleSink>,
    clock: ClockFn,
}

impl std::fmt::Debug for GrumbleRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrumbleRecorder")
            .field("settings", &self.settings)
            .field("appender", &self.appender)
            .finish_non_exhaustive()
    }
}

impl Default for GrumbleRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrumbleRecorder {
    /// Environment settings, stdout, system clock, fs2 locking
    pub fn new() -> Self {
        Self {
            settings: SettingsSource::Environment,
            appender: LogAppender::default(),
            console: Arc::new(StdoutConsole),
            clock: Local::now,
        }
    }

    pub fn with_settings(mut self, settings: SettingsSource) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_console(mut self, console: Arc<dyn ConsoleSink>) -> Self {
        self.console = console;
        self
    }

    pub fn with_lock(mut self, lock: FileLock) -> Self {
        self.appender = LogAppender::new(lock);
        self
    }

    pub fn with_clock(mut self, clock: ClockFn) -> Self {
        self.clock = clock;
        self
    }

    /// Record one entry for the thread owning `ctx`
    pub fn record(&self, ctx: &mut ThreadContext, entry: &Grumble) -> GrumbleResult<Recorded> {
        let settings = self.settings.current();
        let log_dir = paths::log_directory(&settings);
        let key = LogStreamKey::current(entry.tag.as_deref());
        let log_path = paths::resolve(&log_dir, &key);

        let identity = ctx.next_identity();
        let mood = ctx.next_mood_symbol();

        let now = (self.clock)();
        let clock = clock_symbol(&now);
        let timestamp = format_timestamp(&now);

        let fields = HeaderFields {
            mood,
            fingerprint: &identity.fingerprint,
            clock,
            timestamp: &timestamp,
        };

        let header = build_header(&fields, entry);
        let body = build_body(entry)?;

        if settings.console_only {
            self.console.emit(&header)?;
            self.console.emit(&body)?;

            return Ok(Recorded {
                sequence_number: identity.sequence_number,
                fingerprint: identity.fingerprint,
                log_path: None,
            });
        }

        self.appender.append(&log_path, &header, &body)?;

        let shown_path = paths::display_path(&log_path, &log_dir);
        let summary = build_summary(&fields, entry, &shown_path, self.console.supports_color());
        self.console.emit(&summary)?;

        Ok(Recorded {
            sequence_number: identity.sequence_number,
            fingerprint: identity.fingerprint,
            log_path: Some(log_path),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::console::MemoryConsole;
    use crate::errors::GrumbleError;
    use crate::identity::MOOD_SYMBOLS;
    use chrono::TimeZone;

    fn half_past_one() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 13, 31, 0).unwrap()
    }

    fn recorder(settings: Settings) -> (GrumbleRecorder, Arc<MemoryConsole>) {
        let console = Arc::new(MemoryConsole::new());
        let recorder = GrumbleRecorder::new()
            .with_settings(SettingsSource::Fixed(settings))
            .with_console(console.clone())
            .with_clock(half_past_one);
        (recorder, console)
    }

    #[test]
    fn test_record_appends_and_prints_summary() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, console) = recorder(Settings::default().with_log_dir(dir.path()));
        let mut ctx = ThreadContext::new();

        let recorded = recorder
            .record(&mut ctx, &Grumble::new("cache miss").category("cache"))
            .unwrap();

        let path = recorded.log_path.clone().unwrap();
        assert!(path.starts_with(dir.path()));
        assert_eq!(recorded.sequence_number, 0);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("😶\n😶  Grumble ID:  b6589fc6ab0dc82cf12099d1c2d40ab994e8410c\n"));
        assert!(contents.contains("😶   Timestamp:  🕜 2024-03-05 13:31:00\n"));
        assert!(contents.contains("😶    Category:  cache\n"));
        assert!(contents.contains("😶     Message:  cache miss\n"));
        assert!(contents.ends_with("\n\n\n"));

        let lines = console.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("😶 [cache] cache miss   🕜 2024-03-05 13:31:00  💾 "));
        assert!(lines[0].ends_with(&format!("[{}]", recorded.fingerprint)));
        assert!(lines[0].contains(&path.file_name().unwrap().to_string_lossy().to_string()));
    }

    #[test]
    fn test_consecutive_records_share_file_and_advance_identity() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, _console) = recorder(Settings::default().with_log_dir(dir.path()));
        let mut ctx = ThreadContext::new();

        let first = recorder.record(&mut ctx, &Grumble::new("one")).unwrap();
        let second = recorder.record(&mut ctx, &Grumble::new("two")).unwrap();

        assert_eq!(first.log_path, second.log_path);
        assert_eq!(second.sequence_number, 1);
        assert_ne!(first.fingerprint, second.fingerprint);

        let contents = std::fs::read_to_string(first.log_path.unwrap()).unwrap();
        assert!(contents.contains(&format!("{}     Message:  one", MOOD_SYMBOLS[0])));
        assert!(contents.contains(&format!("{}     Message:  two", MOOD_SYMBOLS[1])));
    }

    #[test]
    fn test_tag_selects_separate_file() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, _console) = recorder(Settings::default().with_log_dir(dir.path()));
        let mut ctx = ThreadContext::new();

        let plain = recorder.record(&mut ctx, &Grumble::new("a")).unwrap();
        let tagged = recorder.record(&mut ctx, &Grumble::new("b").tag("diff")).unwrap();

        let plain = plain.log_path.unwrap();
        let tagged = tagged.log_path.unwrap();
        assert_ne!(plain, tagged);
        assert!(tagged.to_string_lossy().ends_with("-diff.log"));
    }

    #[test]
    fn test_console_only_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::default()
            .with_log_dir(dir.path())
            .with_console_only(true);
        let (recorder, console) = recorder(settings);
        let mut ctx = ThreadContext::new();

        let recorded = recorder.record(&mut ctx, &Grumble::new("to the screen")).unwrap();

        assert_eq!(recorded.log_path, None);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let lines = console.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Message:  to the screen"));
        assert_eq!(lines[1], "\n\n");
    }

    #[test]
    fn test_console_only_leaves_existing_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let (file_recorder, _) = recorder(Settings::default().with_log_dir(dir.path()));
        let (console_recorder, _) = recorder(
            Settings::default()
                .with_log_dir(dir.path())
                .with_console_only(true),
        );
        let mut ctx = ThreadContext::new();

        let path = file_recorder
            .record(&mut ctx, &Grumble::new("on disk"))
            .unwrap()
            .log_path
            .unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        console_recorder.record(&mut ctx, &Grumble::new("not on disk")).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_storage_failure_propagates_without_summary() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let (recorder, console) = recorder(Settings::default().with_log_dir(&missing));
        let mut ctx = ThreadContext::new();

        let err = recorder.record(&mut ctx, &Grumble::new("lost")).unwrap_err();

        assert!(matches!(err, GrumbleError::Storage(_)));
        assert!(console.lines().is_empty());
        assert!(!missing.exists());
        // the call still consumed its identity
        assert_eq!(ctx.calls_made(), 1);
    }

    #[test]
    fn test_tag_with_separator_fails_as_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let (recorder, console) = recorder(Settings::default().with_log_dir(dir.path()));
        let mut ctx = ThreadContext::new();

        let err = recorder
            .record(&mut ctx, &Grumble::new("nested").tag("before/after"))
            .unwrap_err();

        assert!(err.is_storage());
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
        assert!(console.lines().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_settings_are_read_on_every_call() {
        let first_dir = tempfile::tempdir().unwrap();
        let second_dir = tempfile::tempdir().unwrap();
        let mut ctx = ThreadContext::new();

        let (recorder, _) = recorder(Settings::default().with_log_dir(first_dir.path()));
        let a = recorder.record(&mut ctx, &Grumble::new("a")).unwrap();

        let recorder = recorder.with_settings(SettingsSource::Fixed(
            Settings::default().with_log_dir(second_dir.path()),
        ));
        let b = recorder.record(&mut ctx, &Grumble::new("b")).unwrap();

        assert!(a.log_path.unwrap().starts_with(first_dir.path()));
        assert!(b.log_path.unwrap().starts_with(second_dir.path()));
    }
}
