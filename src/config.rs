use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub matcher: MatcherSettings,
    #[serde(default)]
    pub demo: DemoSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// What the scheduler does after a cycle fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log the failure and keep ticking
    #[default]
    Resume,
    /// Log the failure and stop issuing cycles
    Halt,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatcherSettings {
    #[serde(default = "default_cycle_delay_ms")]
    pub cycle_delay_ms: u64,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            cycle_delay_ms: default_cycle_delay_ms(),
            on_error: ErrorPolicy::default(),
            seed: None,
        }
    }
}

fn default_cycle_delay_ms() -> u64 { 1000 }

/// Synthetic workload for the demo binary
#[derive(Debug, Clone, Deserialize)]
pub struct DemoSettings {
    #[serde(default = "default_participants")]
    pub participants: usize,
    #[serde(default = "default_run_secs")]
    pub run_secs: u64,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            participants: default_participants(),
            run_secs: default_run_secs(),
        }
    }
}

fn default_participants() -> usize { 200 }
fn default_run_secs() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with GROUPMATCH)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., GROUPMATCH__MATCHER__CYCLE_DELAY_MS -> matcher.cycle_delay_ms
            .add_source(
                Environment::with_prefix("GROUPMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("GROUPMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_matcher_settings() {
        let settings = MatcherSettings::default();
        assert_eq!(settings.cycle_delay_ms, 1000);
        assert_eq!(settings.on_error, ErrorPolicy::Resume);
        assert_eq!(settings.seed, None);
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("group-matcher-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[matcher]\ncycle_delay_ms = 250\non_error = \"halt\"\nseed = 9").unwrap();
        drop(file);

        let settings = Settings::load_from(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.matcher.cycle_delay_ms, 250);
        assert_eq!(settings.matcher.on_error, ErrorPolicy::Halt);
        assert_eq!(settings.matcher.seed, Some(9));
        assert_eq!(settings.demo.participants, 200);
        assert_eq!(settings.logging.format, "json");
    }
}
