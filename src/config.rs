use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use expkit_experiment::SimulationConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_CONFIG_FILE: &str = "expkit.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` wins when set.
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Sleep through trial timings on the wall clock instead of virtual time.
    pub realtime: bool,
    pub seed: Option<u64>,
    pub case_sensitive_responses: bool,
    pub post_trial_gap_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignsConfig {
    /// Base url or directory holding `design_{n}/` folders.
    pub base: String,
}

impl Default for DesignsConfig {
    fn default() -> Self {
        Self {
            base: "designs".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub run: RunConfig,
    pub simulation: SimulationConfig,
    pub designs: DesignsConfig,
}

impl AppConfig {
    /// Defaults, then the config file, then `EXPKIT_*` environment overrides.
    ///
    /// An explicit `path` must exist; otherwise `./expkit.toml` is read if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(&fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("EXPKIT_REALTIME") {
            self.run.realtime = parse_flag(&value)
                .with_context(|| format!("EXPKIT_REALTIME must be a boolean, got `{value}`"))?;
        }
        if let Some(value) = lookup("EXPKIT_SEED") {
            let seed = value
                .trim()
                .parse::<u64>()
                .with_context(|| format!("EXPKIT_SEED must be an integer, got `{value}`"))?;
            self.run.seed = Some(seed);
        }
        if let Some(value) = lookup("EXPKIT_DESIGN_BASE") {
            self.designs.base = value;
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.designs.base, "designs");
        assert!(!config.run.realtime);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [run]
            seed = 42
            post_trial_gap_ms = 250

            [simulation]
            mu_ms = 420.0
            "#,
        )
        .unwrap();
        assert_eq!(config.run.seed, Some(42));
        assert_eq!(config.run.post_trial_gap_ms, 250);
        assert_eq!(config.simulation.mu_ms, 420.0);
        assert_eq!(config.simulation.tau_ms, SimulationConfig::default().tau_ms);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn mistyped_values_are_rejected() {
        assert!(AppConfig::from_toml("[run]\nrealtime = \"sometimes\"").is_err());
    }

    #[test]
    fn environment_overrides_file() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("EXPKIT_REALTIME", "TRUE"),
            ("EXPKIT_SEED", " 7 "),
            ("EXPKIT_DESIGN_BASE", "https://example.org/designs"),
        ]);
        let mut config = AppConfig::from_toml("[run]\nseed = 1").unwrap();
        config
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert!(config.run.realtime);
        assert_eq!(config.run.seed, Some(7));
        assert_eq!(config.designs.base, "https://example.org/designs");
    }

    #[test]
    fn bad_override_is_an_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(|name| (name == "EXPKIT_SEED").then(|| "soon".to_owned()))
            .unwrap_err();
        assert!(err.to_string().contains("EXPKIT_SEED"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(AppConfig::load(Some(Path::new("/nonexistent/expkit.toml"))).is_err());
    }
}
