//! Layered settings.
//!
//! Lowest to highest precedence: built-in defaults, an optional file given
//! with `--config`, `FLOWWATCH_*` environment variables, command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::format::parse_duration;

const ENV_PREFIX: &str = "FLOWWATCH";

/// Raw settings as read from the layered sources.
#[derive(Debug, Clone, Deserialize)]
struct RawSettings {
    base_url: String,
    refresh_interval: String,
    auto_refresh: bool,
    trace_limit: usize,
    request_timeout: String,
    export_dir: PathBuf,
    #[serde(default)]
    log_file: Option<PathBuf>,
    #[serde(default)]
    replay_file: Option<PathBuf>,
}

/// Command-line values that take precedence over every other layer.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub refresh_interval: Option<String>,
    pub auto_refresh: Option<bool>,
    pub trace_limit: Option<usize>,
    pub request_timeout: Option<String>,
    pub export_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub replay_file: Option<PathBuf>,
}

/// Validated settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Origin of the telemetry API.
    pub base_url: String,
    pub refresh_interval: Duration,
    pub auto_refresh: bool,
    /// `limit` sent with trace list requests.
    pub trace_limit: usize,
    pub request_timeout: Duration,
    pub export_dir: PathBuf,
    pub log_file: Option<PathBuf>,
    /// Replay an export document instead of calling the API.
    pub replay_file: Option<PathBuf>,
}

impl Settings {
    /// Load settings from defaults, an optional file, the environment and overrides.
    pub fn load(config_file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("base_url", "http://localhost:8000")?
            .set_default("refresh_interval", "10s")?
            .set_default("auto_refresh", true)?
            .set_default("trace_limit", 50_i64)?
            .set_default("request_timeout", "10s")?
            .set_default("export_dir", ".")?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .set_override_option("base_url", overrides.base_url.clone())?
            .set_override_option("refresh_interval", overrides.refresh_interval.clone())?
            .set_override_option("auto_refresh", overrides.auto_refresh)?
            .set_override_option("trace_limit", overrides.trace_limit.map(|n| n as i64))?
            .set_override_option("request_timeout", overrides.request_timeout.clone())?
            .set_override_option("export_dir", path_string(&overrides.export_dir))?
            .set_override_option("log_file", path_string(&overrides.log_file))?
            .set_override_option("replay_file", path_string(&overrides.replay_file))?
            .build()
            .context("reading configuration")?;

        let raw: RawSettings = config
            .try_deserialize()
            .context("invalid configuration")?;
        Self::validate(raw)
    }

    fn validate(raw: RawSettings) -> Result<Self> {
        let refresh_interval = parse_duration(&raw.refresh_interval)
            .with_context(|| format!("refresh_interval {:?}", raw.refresh_interval))?;
        if refresh_interval.is_zero() {
            bail!("refresh_interval must be greater than zero");
        }

        let request_timeout = parse_duration(&raw.request_timeout)
            .with_context(|| format!("request_timeout {:?}", raw.request_timeout))?;
        if request_timeout.is_zero() {
            bail!("request_timeout must be greater than zero");
        }

        if raw.trace_limit == 0 {
            bail!("trace_limit must be at least 1");
        }

        let base_url = raw.base_url.trim().to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!("base_url must start with http:// or https://, got {:?}", base_url);
        }

        Ok(Self {
            base_url,
            refresh_interval,
            auto_refresh: raw.auto_refresh,
            trace_limit: raw.trace_limit,
            request_timeout,
            export_dir: raw.export_dir,
            log_file: raw.log_file,
            replay_file: raw.replay_file,
        })
    }
}

fn path_string(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::load(None, &Overrides::default()).unwrap();
        assert_eq!(settings.base_url, "http://localhost:8000");
        assert_eq!(settings.refresh_interval, Duration::from_secs(10));
        assert!(settings.auto_refresh);
        assert_eq!(settings.trace_limit, 50);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.export_dir, PathBuf::from("."));
        assert!(settings.replay_file.is_none());
    }

    #[test]
    fn test_file_then_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "base_url = \"http://telemetry.internal:9000\"\nrefresh_interval = \"30s\"\ntrace_limit = 20"
        )
        .unwrap();

        let overrides = Overrides {
            trace_limit: Some(5),
            auto_refresh: Some(false),
            ..Overrides::default()
        };
        let settings = Settings::load(Some(file.path()), &overrides).unwrap();
        assert_eq!(settings.base_url, "http://telemetry.internal:9000");
        assert_eq!(settings.refresh_interval, Duration::from_secs(30));
        assert_eq!(settings.trace_limit, 5);
        assert!(!settings.auto_refresh);
    }

    #[test]
    fn test_rejects_zero_interval() {
        let overrides = Overrides {
            refresh_interval: Some("0s".to_string()),
            ..Overrides::default()
        };
        let err = Settings::load(None, &overrides).unwrap_err();
        assert!(err.to_string().contains("refresh_interval"));
    }

    #[test]
    fn test_rejects_unparseable_interval_and_zero_limit() {
        let overrides = Overrides {
            refresh_interval: Some("often".to_string()),
            ..Overrides::default()
        };
        assert!(Settings::load(None, &overrides).is_err());

        let overrides = Overrides {
            trace_limit: Some(0),
            ..Overrides::default()
        };
        assert!(Settings::load(None, &overrides).is_err());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let overrides = Overrides {
            base_url: Some("localhost:8000".to_string()),
            ..Overrides::default()
        };
        assert!(Settings::load(None, &overrides).is_err());
    }
}
