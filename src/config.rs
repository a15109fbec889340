use crate::{cli::Cli, error::CacheResult};
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::Level;

const TRACE_LEVELS: [&'static str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const ENV_PREFIX: &str = "POS_";

// All settings may be configured via environment variables. Example:
// POS_COOLDOWN_HOURS=12 would set cooldown_hours to 12.
// Precedence, lowest first: defaults, yaml file, environment, command line.
#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_trace_level")]
    trace_level: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    // Memory store instead of the sled database, nothing survives a restart.
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default = "default_leaderboard_base_url")]
    pub leaderboard_base_url: String,
    #[serde(default = "default_api_timeout_sec")]
    pub api_timeout_sec: u64,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_cooldown_hours")]
    pub cooldown_hours: i64,
    #[serde(default = "default_refresh_schedule")]
    pub refresh_schedule: String,
    #[serde(default = "default_heartbeat_schedule")]
    pub heartbeat_schedule: String,
    #[serde(default)]
    pub refresh_on_start: bool,
}

impl Settings {
    pub fn new(cli: &Cli) -> CacheResult<Self> {
        let figment = Figment::new().merge(Yaml::file(&cli.config));
        let figment = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(cli));
        Settings::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> CacheResult<Self> {
        Ok(figment.extract()?)
    }

    pub fn get_trace_level(&self) -> Level {
        get_trace_level(&self.trace_level)
    }
}

fn get_trace_level(level_str: &str) -> Level {
    match level_str.to_uppercase().as_str() {
        level if level == TRACE_LEVELS[0] => Level::TRACE,
        level if level == TRACE_LEVELS[1] => Level::DEBUG,
        level if level == TRACE_LEVELS[2] => Level::INFO,
        level if level == TRACE_LEVELS[3] => Level::WARN,
        level if level == TRACE_LEVELS[4] => Level::ERROR,
        // Default trace level
        _ => Level::INFO,
    }
}

fn default_trace_level() -> String {
    "INFO".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("pos-data")
}

fn default_leaderboard_base_url() -> String {
    "https://www.succinct-stats.xyz/api".to_string()
}

fn default_api_timeout_sec() -> u64 {
    30
}

fn default_page_size() -> usize {
    100
}

fn default_max_entries() -> usize {
    25_000
}

fn default_page_delay_ms() -> u64 {
    1_000
}

fn default_cooldown_hours() -> i64 {
    24
}

// Every day at 00:00 UTC.
fn default_refresh_schedule() -> String {
    "0 0 0 * * *".to_string()
}

// Every hour, on the hour.
fn default_heartbeat_schedule() -> String {
    "0 0 * * * *".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_figment(Figment::new()).unwrap();
        assert_eq!(settings.page_size, 100);
        assert_eq!(settings.max_entries, 25_000);
        assert_eq!(settings.page_delay_ms, 1_000);
        assert_eq!(settings.cooldown_hours, 24);
        assert_eq!(settings.api_timeout_sec, 30);
        assert_eq!(settings.refresh_schedule, "0 0 0 * * *");
        assert!(!settings.ephemeral);
        assert!(!settings.refresh_on_start);
        assert_eq!(settings.get_trace_level(), Level::INFO);
    }

    #[test]
    fn test_cli_flags_override_other_sources() {
        let cli = Cli {
            ephemeral: true,
            trace_level: Some("debug".to_string()),
            ..Cli::default()
        };
        let figment = Figment::new()
            .merge(Serialized::defaults(json!({"cooldown_hours": 1, "ephemeral": false})))
            .merge(Serialized::defaults(&cli));
        let settings = Settings::from_figment(figment).unwrap();
        assert!(settings.ephemeral);
        assert_eq!(settings.cooldown_hours, 1);
        assert_eq!(settings.get_trace_level(), Level::DEBUG);
        // Flags left unset do not clobber anything.
        assert_eq!(settings.data_dir, PathBuf::from("pos-data"));
    }

    #[test]
    fn test_invalid_value_is_a_config_error() {
        let figment =
            Figment::new().merge(Serialized::defaults(json!({"page_size": "a hundred"})));
        assert!(matches!(
            Settings::from_figment(figment),
            Err(crate::error::CacheError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_trace_level_falls_back_to_info() {
        assert_eq!(get_trace_level("LOUD"), Level::INFO);
        assert_eq!(get_trace_level("warn"), Level::WARN);
    }
}
