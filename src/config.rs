/// Runtime settings for grumble
///
/// Two knobs, both read live on every call so they can change while the
/// process runs:
/// - `GRUMBLE_LOG_DIR`: directory for log files (default: startup directory)
/// - `GRUMBLE_OUT=1`: print records to the console instead of writing files
use std::env;
use std::path::PathBuf;

/// Environment variable overriding the log directory
pub const LOG_DIR_ENV: &str = "GRUMBLE_LOG_DIR";

/// Environment variable enabling console-only output when set to "1"
pub const CONSOLE_ONLY_ENV: &str = "GRUMBLE_OUT";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Log directory override; `None` means the startup directory
    pub log_dir: Option<PathBuf>,
    /// Skip the log file and print the full record to the console
    pub console_only: bool,
}

impl Settings {
    /// Snapshot the current environment
    pub fn from_env() -> Self {
        let log_dir = env::var_os(LOG_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        let console_only = env::var(CONSOLE_ONLY_ENV)
            .map(|value| value == "1")
            .unwrap_or(false);

        Self { log_dir, console_only }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_console_only(mut self, console_only: bool) -> Self {
        self.console_only = console_only;
        self
    }
}

/// Where a recorder gets its settings from
#[derive(Debug, Clone, Default)]
pub enum SettingsSource {
    /// Re-read the environment on every call
    #[default]
    Environment,
    /// Fixed values, for tests and embedding
    Fixed(Settings),
}

impl SettingsSource {
    pub fn current(&self) -> Settings {
        match self {
            SettingsSource::Environment => Settings::from_env(),
            SettingsSource::Fixed(settings) => settings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_dir, None);
        assert!(!settings.console_only);
    }

    #[test]
    fn test_fixed_source_returns_its_settings() {
        let settings = Settings::default()
            .with_log_dir("/tmp/grumbles")
            .with_console_only(true);
        let source = SettingsSource::Fixed(settings.clone());
        assert_eq!(source.current(), settings);
    }
}
