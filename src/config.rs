//! Application-level configuration loading: session timing, scoring and leaderboard limits.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::scoring::ScoringPolicy;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "WISDOM_WARFARE_CONFIG_PATH";
/// Environment variable overriding the answer window length in milliseconds.
const QUESTION_TIMEOUT_ENV: &str = "QUESTION_TIMEOUT_MS";
/// Environment variable overriding the delay before the first question in milliseconds.
const START_DELAY_ENV: &str = "GAME_START_DELAY_MS";

const DEFAULT_QUESTION_WINDOW_MS: u64 = 30_000;
const DEFAULT_START_DELAY_MS: u64 = 15_000;

#[derive(Debug, Clone, PartialEq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// How long each question accepts answers.
    pub question_window: Duration,
    /// Delay between catalog load and the first question.
    pub start_delay: Duration,
    /// Point values for correct answers.
    pub scoring: ScoringPolicy,
    /// Leaderboard sizes.
    pub leaderboard: LeaderboardConfig,
    /// Join code generation settings.
    pub game_codes: GameCodeConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
/// Leaderboard sizes for queries and broadcasts.
pub struct LeaderboardConfig {
    /// Entries returned when the caller does not specify a limit.
    pub default_limit: usize,
    /// Entries included in broadcast snapshots.
    pub broadcast_limit: usize,
    /// Upper bound for caller-provided limits.
    pub max_limit: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            broadcast_limit: 20,
            max_limit: 100,
        }
    }
}

impl LeaderboardConfig {
    /// Resolve a caller-provided limit against the configured default and bound.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|limit| *limit > 0)
            .unwrap_or(self.default_limit)
            .min(self.max_limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
/// Settings for game session join codes.
pub struct GameCodeConfig {
    /// Number of characters in a random code.
    pub length: usize,
    /// Random candidates tried before falling back to a timestamp-derived code.
    pub max_attempts: u32,
}

impl Default for GameCodeConfig {
    fn default() -> Self {
        Self {
            length: 6,
            max_attempts: 20,
        }
    }
}

impl AppConfig {
    /// Load the configuration from disk and the environment, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        window_ms = app_config.question_window.as_millis() as u64,
                        "loaded configuration file"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        config.with_overrides(|key| env::var(key).ok())
    }

    /// Apply the timing overrides found through `lookup`, ignoring unparsable values.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(window) = duration_override(&lookup, QUESTION_TIMEOUT_ENV) {
            self.question_window = window;
        }
        if let Some(delay) = duration_override(&lookup, START_DELAY_ENV) {
            self.start_delay = delay;
        }
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    question_window_ms: Option<u64>,
    start_delay_ms: Option<u64>,
    scoring: ScoringPolicy,
    leaderboard: LeaderboardConfig,
    game_codes: GameCodeConfig,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            question_window: Duration::from_millis(
                value.question_window_ms.unwrap_or(DEFAULT_QUESTION_WINDOW_MS),
            ),
            start_delay: Duration::from_millis(
                value.start_delay_ms.unwrap_or(DEFAULT_START_DELAY_MS),
            ),
            scoring: value.scoring,
            leaderboard: value.leaderboard,
            game_codes: value.game_codes,
        }
    }
}

fn duration_override(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(ms) => Some(Duration::from_millis(ms)),
        Err(err) => {
            warn!(key, value = %raw, error = %err, "ignoring invalid duration override");
            None
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classroom_timing() {
        let config = AppConfig::default();
        assert_eq!(config.question_window, Duration::from_secs(30));
        assert_eq!(config.start_delay, Duration::from_secs(15));
        assert_eq!(config.scoring, ScoringPolicy::default());
        assert_eq!(config.game_codes.length, 6);
        assert_eq!(config.game_codes.max_attempts, 20);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "question_window_ms": 5000, "scoring": { "first_correct_bonus": 3 } }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.question_window, Duration::from_secs(5));
        assert_eq!(config.start_delay, Duration::from_secs(15));
        assert_eq!(config.scoring.base_points, 10);
        assert_eq!(config.scoring.first_correct_bonus, 3);
        assert_eq!(config.leaderboard, LeaderboardConfig::default());
    }

    #[test]
    fn environment_overrides_timing() {
        let config = AppConfig::default().with_overrides(|key| match key {
            QUESTION_TIMEOUT_ENV => Some("1200".into()),
            START_DELAY_ENV => Some("not-a-number".into()),
            _ => None,
        });

        assert_eq!(config.question_window, Duration::from_millis(1200));
        assert_eq!(config.start_delay, Duration::from_secs(15));
    }

    #[test]
    fn leaderboard_limit_is_clamped() {
        let limits = LeaderboardConfig::default();
        assert_eq!(limits.resolve(None), 10);
        assert_eq!(limits.resolve(Some(0)), 10);
        assert_eq!(limits.resolve(Some(3)), 3);
        assert_eq!(limits.resolve(Some(500)), 100);
    }
}
