use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::db::Database;

/// Artificial waits around the content generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedLatency {
    pub cv_fix: Duration,
    pub generation: Duration,
}

impl SimulatedLatency {
    pub const NONE: SimulatedLatency = SimulatedLatency {
        cv_fix: Duration::ZERO,
        generation: Duration::ZERO,
    };
}

impl Default for SimulatedLatency {
    fn default() -> Self {
        Self {
            cv_fix: Duration::from_millis(2000),
            generation: Duration::from_millis(1500),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub latency: SimulatedLatency,
    pub verify_passwords: bool,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = SimulatedLatency::default();
        Ok(Config {
            db_path: lookup("FLOWJOB_DB")
                .map(PathBuf::from)
                .unwrap_or_else(Database::default_path),
            latency: SimulatedLatency {
                cv_fix: parse_millis(&lookup, "FLOWJOB_CV_FIX_DELAY_MS")?.unwrap_or(defaults.cv_fix),
                generation: parse_millis(&lookup, "FLOWJOB_GENERATION_DELAY_MS")?
                    .unwrap_or(defaults.generation),
            },
            verify_passwords: match lookup("FLOWJOB_VERIFY_PASSWORDS") {
                Some(raw) => parse_bool(&raw)
                    .with_context(|| format!("FLOWJOB_VERIFY_PASSWORDS must be a boolean, got '{raw}'"))?,
                None => true,
            },
            log_filter: lookup("RUST_LOG").unwrap_or_else(|| "flowjob=warn".to_string()),
        })
    }
}

fn parse_millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<Duration>> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .with_context(|| format!("{key} must be a number of milliseconds, got '{raw}'"))
        })
        .transpose()
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("unrecognized boolean '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.latency, SimulatedLatency::default());
        assert!(config.verify_passwords);
        assert_eq!(config.log_filter, "flowjob=warn");
        assert!(config.db_path.ends_with("flowjob.db"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("FLOWJOB_DB", "/tmp/fj.db"),
            ("FLOWJOB_CV_FIX_DELAY_MS", "0"),
            ("FLOWJOB_GENERATION_DELAY_MS", "25"),
            ("FLOWJOB_VERIFY_PASSWORDS", "off"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/fj.db"));
        assert_eq!(config.latency.cv_fix, Duration::ZERO);
        assert_eq!(config.latency.generation, Duration::from_millis(25));
        assert!(!config.verify_passwords);
    }

    #[test]
    fn test_bad_values_name_the_variable() {
        let err = Config::from_lookup(lookup_from(&[("FLOWJOB_CV_FIX_DELAY_MS", "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains("FLOWJOB_CV_FIX_DELAY_MS"));

        let err = Config::from_lookup(lookup_from(&[("FLOWJOB_VERIFY_PASSWORDS", "maybe")]))
            .unwrap_err();
        assert!(err.to_string().contains("FLOWJOB_VERIFY_PASSWORDS"));
    }
}
