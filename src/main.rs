use anyhow::{Context, Result};
use clap::Parser;
use grumble::{
    config::{Settings, SettingsSource},
    paths,
    recorder::{self, CallContext, Grumble, GrumbleRecorder},
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "grumble")]
#[command(about = "Print a grumble line and append the full record to a log file", long_about = None)]
struct Args {
    /// Message to show and record
    message: Option<String>,

    /// Category shown in brackets before the message
    #[arg(short, long)]
    category: Option<String>,

    /// Extra segment for the log file name
    #[arg(short, long)]
    tag: Option<String>,

    /// State to attach, as JSON
    #[arg(short, long)]
    state: Option<String>,

    /// Write logs here instead of $GRUMBLE_LOG_DIR / the current directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Print the full record instead of writing a log file
    #[arg(long)]
    stdout: bool,
}

/// Flags win over the environment; without flags the environment is read live
fn settings_source(args: &Args) -> SettingsSource {
    if args.log_dir.is_none() && !args.stdout {
        return SettingsSource::Environment;
    }

    let mut settings = Settings::from_env();
    if let Some(dir) = &args.log_dir {
        settings = settings.with_log_dir(dir);
    }
    if args.stdout {
        settings = settings.with_console_only(true);
    }
    SettingsSource::Fixed(settings)
}

fn build_entry(args: &Args) -> Result<Grumble> {
    let mut entry = Grumble::empty();
    if let Some(message) = &args.message {
        entry = entry.message(message.as_str());
    }
    if let Some(category) = &args.category {
        entry = entry.category(category.as_str());
    }
    if let Some(tag) = &args.tag {
        entry = entry.tag(tag.as_str());
    }
    if let Some(raw) = &args.state {
        let state: serde_json::Value =
            serde_json::from_str(raw).context("--state must be valid JSON")?;
        entry = entry.state(&state)?;
    }

    let context = CallContext::capture().local(
        "args",
        &serde_json::json!({
            "message": args.message,
            "category": args.category,
            "tag": args.tag,
            "log_dir": args.log_dir,
            "stdout": args.stdout,
        }),
    )?;

    Ok(entry.context(context))
}

fn main() -> Result<()> {
    paths::capture_startup_directory();

    #[cfg(feature = "logging")]
    env_logger::init();

    let args = Args::parse();
    let entry = build_entry(&args)?;
    let recorder = GrumbleRecorder::new().with_settings(settings_source(&args));

    let recorded = recorder::record_with(&recorder, &entry).context("failed to record grumble")?;
    log::debug!(
        "recorded #{} [{}] to {:?}",
        recorded.sequence_number,
        recorded.fingerprint,
        recorded.log_path
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_no_flags_reads_environment() {
        let args = parse(&["grumble", "hello"]);
        assert!(matches!(settings_source(&args), SettingsSource::Environment));
    }

    #[test]
    fn test_log_dir_flag_fixes_directory() {
        let args = parse(&["grumble", "hello", "--log-dir", "/tmp/grumbles"]);
        match settings_source(&args) {
            SettingsSource::Fixed(settings) => {
                assert_eq!(settings.log_dir, Some(PathBuf::from("/tmp/grumbles")));
            }
            other => panic!("expected fixed settings, got {:?}", other),
        }
    }

    #[test]
    fn test_stdout_flag_enables_console_only() {
        let args = parse(&["grumble", "--stdout"]);
        match settings_source(&args) {
            SettingsSource::Fixed(settings) => assert!(settings.console_only),
            other => panic!("expected fixed settings, got {:?}", other),
        }
    }

    #[test]
    fn test_entry_from_all_flags() {
        let args = parse(&[
            "grumble",
            "cache miss",
            "-c",
            "cache",
            "-t",
            "diff",
            "-s",
            r#"{"key": "user:42"}"#,
        ]);
        let entry = build_entry(&args).unwrap();

        assert_eq!(entry.message.as_deref(), Some("cache miss"));
        assert_eq!(entry.category.as_deref(), Some("cache"));
        assert_eq!(entry.tag.as_deref(), Some("diff"));
        assert_eq!(entry.state, Some(json!({"key": "user:42"})));

        let context = entry.context.unwrap();
        assert_eq!(context.locals.visible()["args"]["message"], json!("cache miss"));
    }

    #[test]
    fn test_invalid_state_json_is_rejected() {
        let args = parse(&["grumble", "oops", "--state", "{not json"]);
        let err = build_entry(&args).unwrap_err();
        assert!(err.to_string().contains("--state must be valid JSON"));
    }

    #[test]
    fn test_entry_without_message() {
        let entry = build_entry(&parse(&["grumble"])).unwrap();
        assert_eq!(entry.message, None);
        assert_eq!(entry.state, None);
        assert!(entry.context.is_some());
    }
}
