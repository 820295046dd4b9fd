use std::{path::PathBuf, str::FromStr, time::Duration};

use anyhow::{bail, Context, Result};

use crate::store::Retention;

const DEFAULT_TICK_TIMEOUT_MS: u64 = 10_000;

/// Process-level configuration read from `SURFACESCAN_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// JSON file with initial settings. Read once, never written.
    pub settings_path: Option<PathBuf>,
    pub tick_timeout: Duration,
    pub retention: Retention,
    /// How long the binary runs before shutting down; `None` runs until Ctrl-C.
    pub run_for: Option<Duration>,
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settings_path: None,
            tick_timeout: Duration::from_millis(DEFAULT_TICK_TIMEOUT_MS),
            retention: Retention::unbounded(),
            run_for: None,
            debug: false,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let settings_path = lookup("SURFACESCAN_SETTINGS")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let tick_timeout = parse::<u64>(&lookup, "SURFACESCAN_TICK_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.tick_timeout);
        let max_entries = parse::<usize>(&lookup, "SURFACESCAN_MAX_HISTORY")?;
        if max_entries == Some(0) {
            bail!("SURFACESCAN_MAX_HISTORY must be at least 1; unset it for unbounded history");
        }
        let retention = Retention { max_entries };
        let run_for = parse::<u64>(&lookup, "SURFACESCAN_RUN_SECS")?.map(Duration::from_secs);
        let debug = lookup("SURFACESCAN_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            settings_path,
            tick_timeout,
            retention,
            run_for,
            debug,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("invalid value '{value}' for {key}"))
        })
        .transpose()
}
