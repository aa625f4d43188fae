//! Configuration loading (SPEC_FULL.md §4.I). Mirrors the original
//! implementation's layered file search: try a short list of well-known
//! paths in order, parse the first one that exists, and merge it over
//! documented defaults. A malformed file is logged and skipped in favour of
//! the next path, exactly as the original does — it is not a fatal error.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use log::{error, info, warn};
use serde::Deserialize;

/// Search order for the config file, local-first then system-wide, as in
/// the original `metrolinkTimes.conf` lookup.
pub fn default_search_path() -> Vec<PathBuf> {
    vec![
        PathBuf::from("config/metrolinkTimes.conf"),
        PathBuf::from("metrolinkTimes.conf"),
        PathBuf::from("/etc/metrolinkTimes/metrolinkTimes.conf"),
    ]
}

/// The raw, partially-specified shape a config file may take on disk; every
/// field is optional so a file only needs to override what it cares about.
#[derive(Debug, Clone, Default, Deserialize)]
struct RawConfig {
    #[serde(rename = "Ocp-Apim-Subscription-Key")]
    subscription_key: Option<String>,
    #[serde(rename = "Access-Control-Allow-Origin")]
    cors_origin: Option<String>,
    polling_enabled: Option<bool>,
    dwell_cap: Option<usize>,
    transit_cap: Option<usize>,
    tick_interval_secs: Option<u64>,
    departed_retention_floor_secs: Option<u64>,
    host: Option<String>,
    port: Option<u16>,
}

/// The fully-resolved configuration object the rest of the system consumes
/// (SPEC_FULL.md §3's "(new) Configuration object").
#[derive(Debug, Clone)]
pub struct Config {
    pub subscription_key: Option<String>,
    pub cors_origin: String,
    pub polling_enabled: bool,
    pub dwell_cap: usize,
    pub transit_cap: usize,
    pub tick_interval: StdDuration,
    pub departed_retention_floor: StdDuration,
    pub bind_host: String,
    pub bind_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            subscription_key: None,
            cors_origin: "*".to_owned(),
            polling_enabled: true,
            dwell_cap: metrolink_learning_defaults::DWELL_CAP,
            transit_cap: metrolink_learning_defaults::TRANSIT_CAP,
            tick_interval: StdDuration::from_secs(1),
            departed_retention_floor: StdDuration::from_secs(120),
            bind_host: "0.0.0.0".to_owned(),
            bind_port: 8080,
        }
    }
}

/// `metrolink-config` deliberately avoids depending on `metrolink-learning`
/// (config is the ambient-most crate in the workspace) but still needs to
/// state the same defaults. Kept in one place so the two can't drift.
mod metrolink_learning_defaults {
    pub const DWELL_CAP: usize = 32;
    pub const TRANSIT_CAP: usize = 32;
}

impl RawConfig {
    fn merge_into(self, config: &mut Config) {
        if let Some(key) = self.subscription_key {
            config.subscription_key = Some(key);
        }
        if let Some(origin) = self.cors_origin {
            config.cors_origin = origin;
        }
        if let Some(enabled) = self.polling_enabled {
            config.polling_enabled = enabled;
        }
        if let Some(cap) = self.dwell_cap {
            config.dwell_cap = cap;
        }
        if let Some(cap) = self.transit_cap {
            config.transit_cap = cap;
        }
        if let Some(secs) = self.tick_interval_secs {
            config.tick_interval = StdDuration::from_secs(secs);
        }
        if let Some(secs) = self.departed_retention_floor_secs {
            config.departed_retention_floor = StdDuration::from_secs(secs);
        }
        if let Some(host) = self.host {
            config.bind_host = host;
        }
        if let Some(port) = self.port {
            config.bind_port = port;
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "could not read config file: {e}"),
            Self::Json(e) => write!(f, "invalid JSON in config file: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Walks `search_path` in order, returning the first file that parses, or
/// [`Config::default`] (with a warning) if none of them do.
pub fn load(search_path: &[PathBuf]) -> Config {
    let mut config = Config::default();

    for path in search_path {
        match try_load(path) {
            Ok(Some(raw)) => {
                info!("loaded config from {}", path.display());
                raw.merge_into(&mut config);
                return config;
            }
            Ok(None) => continue,
            Err(err) => {
                error!("could not parse config file {}: {err}", path.display());
                continue;
            }
        }
    }

    warn!(
        "no config file found, checked: {}",
        search_path
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("using default configuration");
    config
}

fn try_load(path: &Path) -> Result<Option<RawConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let raw: RawConfig = serde_json::from_str(&contents).map_err(ConfigError::Json)?;
    Ok(Some(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_apply_when_no_file_exists() {
        let config = load(&[PathBuf::from("/nonexistent/metrolinkTimes.conf")]);
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.cors_origin, "*");
        assert!(config.subscription_key.is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = std::env::temp_dir().join(format!(
            "metrolink-config-test-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("metrolinkTimes.conf");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{ "Ocp-Apim-Subscription-Key": "abc123", "port": 9090 }}"#
        )
        .unwrap();

        let config = load(&[path]);
        assert_eq!(config.subscription_key.as_deref(), Some("abc123"));
        assert_eq!(config.bind_port, 9090);
        assert_eq!(config.cors_origin, "*", "unset fields keep their default");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn malformed_json_is_skipped_in_favour_of_the_next_path() {
        let dir = std::env::temp_dir().join(format!(
            "metrolink-config-test-bad-{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).unwrap();
        let bad_path = dir.join("bad.conf");
        fs::write(&bad_path, "not json").unwrap();
        let good_path = dir.join("good.conf");
        fs::write(&good_path, r#"{ "port": 7070 }"#).unwrap();

        let config = load(&[bad_path, good_path]);
        assert_eq!(config.bind_port, 7070);

        fs::remove_dir_all(&dir).ok();
    }
}
