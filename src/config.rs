//! Application-level configuration loading: reconciliation tunables, provider access,
//! team composition rules and group/contest defaults.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use tracing::{info, warn};

use crate::services::reconciliation::ReconcileSettings;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "FANTASY_CRICKET_CONFIG_PATH";
/// Environment variable carrying the CricAPI key.
const PROVIDER_KEY_ENV: &str = "CRICAPI_KEY";
/// Environment variable carrying the admin token expected in `X-Admin-Token`.
const ADMIN_TOKEN_ENV: &str = "ADMIN_TOKEN";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    pub reconcile: ReconcileConfig,
    pub provider: ProviderConfig,
    pub team_rules: TeamRules,
    pub groups: GroupDefaults,
    pub contests: ContestDefaults,
    /// Token guarding the admin routes. Admin routes reject every call while unset.
    #[serde(skip)]
    pub admin_token: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// Scheduling and budget of reconciliation ticks.
pub struct ReconcileConfig {
    /// Whether the recurring scheduler runs. On-demand ticks work regardless.
    pub enabled: bool,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub interval: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub tick_timeout: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub lease_ttl: Duration,
    pub max_in_flight: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        let settings = ReconcileSettings::default();
        Self {
            enabled: true,
            interval: Duration::from_secs(120),
            tick_timeout: settings.tick_timeout,
            lease_ttl: settings.lease_ttl,
            max_in_flight: settings.max_in_flight,
        }
    }
}

impl ReconcileConfig {
    /// Tick tunables handed to the reconciler.
    pub fn settings(&self) -> ReconcileSettings {
        ReconcileSettings {
            tick_timeout: self.tick_timeout,
            lease_ttl: self.lease_ttl,
            max_in_flight: self.max_in_flight.max(1),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// Upstream match feed access.
pub struct ProviderConfig {
    pub base_url: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub request_timeout: Duration,
    /// Read from the environment only, never from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cricapi.com/v1".into(),
            request_timeout: Duration::from_secs(15),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// Composition rules a drafted team must satisfy.
pub struct TeamRules {
    pub max_players: usize,
    pub min_wicket_keepers: usize,
    pub min_batsmen: usize,
    pub min_all_rounders: usize,
    pub min_bowlers: usize,
}

impl Default for TeamRules {
    fn default() -> Self {
        Self {
            max_players: 11,
            min_wicket_keepers: 1,
            min_batsmen: 3,
            min_all_rounders: 1,
            min_bowlers: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// Defaults applied when a group is created without explicit limits.
pub struct GroupDefaults {
    pub default_max_members: u32,
}

impl Default for GroupDefaults {
    fn default() -> Self {
        Self {
            default_max_members: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
/// Defaults applied when a contest is created without explicit limits.
pub struct ContestDefaults {
    pub default_max_participants: u32,
}

impl Default for ContestDefaults {
    fn default() -> Self {
        Self {
            default_max_participants: 10,
        }
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults,
    /// then apply secrets from the environment.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        interval_secs = config.reconcile.interval.as_secs(),
                        "loaded configuration"
                    );
                    config
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

        config.with_env_secrets()
    }

    /// Parse a JSON document; missing sections and fields take their defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    fn with_env_secrets(mut self) -> Self {
        self.provider.api_key = non_empty_env(PROVIDER_KEY_ENV);
        self.admin_token = non_empty_env(ADMIN_TOKEN_ENV);

        if self.provider.api_key.is_none() {
            warn!("{PROVIDER_KEY_ENV} not set; match feed requests will fail");
        }
        if self.admin_token.is_none() {
            warn!("{ADMIN_TOKEN_ENV} not set; admin routes are disabled");
        }
        self
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var).ok().filter(|value| !value.trim().is_empty())
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
    fn empty_document_yields_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.reconcile.interval, Duration::from_secs(120));
        assert_eq!(config.reconcile.tick_timeout, Duration::from_secs(90));
        assert_eq!(config.reconcile.lease_ttl, Duration::from_secs(300));
        assert_eq!(config.reconcile.max_in_flight, 8);
        assert_eq!(config.team_rules.max_players, 11);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = AppConfig::from_json(
            r#"{
                "reconcile": {"interval": 30, "max_in_flight": 0},
                "team_rules": {"min_bowlers": 4},
                "provider": {"api_key": "ignored"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.reconcile.interval, Duration::from_secs(30));
        assert_eq!(config.reconcile.tick_timeout, Duration::from_secs(90));
        assert_eq!(config.reconcile.settings().max_in_flight, 1);
        assert_eq!(config.team_rules.min_bowlers, 4);
        assert_eq!(config.team_rules.min_batsmen, 3);
        assert_eq!(config.provider.api_key, None);
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let config = AppConfig::from_json(include_str!("../config/app.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn malformed_durations_are_rejected() {
        assert!(AppConfig::from_json(r#"{"reconcile": {"interval": "soon"}}"#).is_err());
    }
}
