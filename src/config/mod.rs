//! Configuration management for `bug_trends`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`BT_*`)
//! 3. YAML file (`--config`, `BT_CONFIG`, or `./bt.yaml`)
//! 4. Defaults
//!
//! Releases and the blocker keyword list come from the YAML file; scalar
//! settings may be overridden by any higher layer. The loaded
//! [`TrendsConfig`] is passed explicitly to everything that needs it.

use crate::error::{Result, TrendsError};
use crate::model::{DEFAULT_CUSTOMER_TRACKER_ID, Release};
use crate::storage::StoreOptions;
use crate::storage::pool::DEFAULT_POOL_SIZE;
use crate::util::DateSpec;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default database filename, relative to the working directory.
const DEFAULT_DB_FILENAME: &str = "bug_trends.db";
/// Config file picked up from the working directory when present.
const DEFAULT_CONFIG_FILENAME: &str = "bt.yaml";
/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "BT_CONFIG";
const ENV_PREFIX: &str = "BT_";

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    /// Releases in reporting order.
    #[serde(alias = "Releases")]
    pub releases: Vec<Release>,
    /// Keywords that mark an issue as a blocker.
    #[serde(alias = "Blockers", alias = "blocker_keywords")]
    pub blockers: Vec<String>,
    /// External tracker id that marks a customer case.
    pub customer_tracker_id: i64,
    /// Snapshot database path.
    #[serde(alias = "db")]
    pub database: PathBuf,
    /// Maximum concurrent read connections per request.
    pub read_pool_size: usize,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            releases: Vec::new(),
            blockers: Vec::new(),
            customer_tracker_id: DEFAULT_CUSTOMER_TRACKER_ID,
            database: PathBuf::from(DEFAULT_DB_FILENAME),
            read_pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl TrendsConfig {
    /// Parse a YAML config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            TrendsError::config(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse YAML config text. An empty document yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Apply scalar overrides from a merged layer.
    ///
    /// # Errors
    ///
    /// Returns an error if an override value has the wrong type.
    pub fn apply_layer(&mut self, layer: &ConfigLayer) -> Result<()> {
        if let Some(db) = layer.get(&["database", "db"]) {
            let trimmed = db.trim();
            if !trimmed.is_empty() {
                self.database = PathBuf::from(trimmed);
            }
        }
        if let Some(size) = layer.get(&["read-pool-size", "pool-size"]) {
            self.read_pool_size = parse_scalar(size, "read-pool-size")?;
        }
        if let Some(id) = layer.get(&["customer-tracker-id"]) {
            self.customer_tracker_id = parse_scalar(id, "customer-tracker-id")?;
        }
        if let Some(blockers) = layer.get(&["blockers"]) {
            self.blockers = split_list(blockers);
        }
        Ok(())
    }

    /// Check invariants that would otherwise surface as confusing query errors.
    ///
    /// # Errors
    ///
    /// Returns `Config` for empty or duplicate release names, a zero pool
    /// size, and `InvalidDate` for malformed milestone values.
    pub fn validate(&self) -> Result<()> {
        if self.read_pool_size == 0 {
            return Err(TrendsError::config("read_pool_size must be at least 1"));
        }

        let mut seen = HashSet::new();
        for release in &self.releases {
            let name = release.name.trim();
            if name.is_empty() {
                return Err(TrendsError::config("release with empty name"));
            }
            if !seen.insert(name) {
                return Err(TrendsError::config(format!("duplicate release '{name}'")));
            }
            let m = &release.milestones;
            for value in [&m.start, &m.feature_complete, &m.code_freeze, &m.ga] {
                DateSpec::parse(value)?;
            }
            if release.targets.is_empty() {
                warn!(release = name, "Release has no targets; its window start falls back");
            }
        }

        if self.blockers.is_empty() {
            warn!("No blocker keywords configured; blocker counts equal all counts");
        }
        Ok(())
    }

    /// Release by name.
    ///
    /// # Errors
    ///
    /// `ReleaseNotFound` for an unknown name.
    pub fn release(&self, name: &str) -> Result<&Release> {
        self.releases
            .iter()
            .find(|release| release.name == name)
            .ok_or_else(|| TrendsError::ReleaseNotFound {
                name: name.to_string(),
            })
    }

    /// Store tuning derived from this configuration.
    #[must_use]
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            read_pool_size: self.read_pool_size,
            customer_tracker_id: self.customer_tracker_id,
            ..StoreOptions::default()
        }
    }
}

/// Flat key/value settings from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `BT_*` variables.
    #[must_use]
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (key, value) in vars {
            if key == CONFIG_ENV {
                continue;
            }
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layer.insert(stripped, value);
            }
        }
        layer
    }

    pub fn insert(&mut self, key: &str, value: String) {
        self.values.insert(normalize_key(key), value);
    }

    fn get(&self, keys: &[&str]) -> Option<&String> {
        keys.iter()
            .find_map(|key| self.values.get(&normalize_key(key)))
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub read_pool_size: Option<usize>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(path) = &self.db {
            layer.insert("database", path.to_string_lossy().to_string());
        }
        if let Some(size) = self.read_pool_size {
            layer.insert("read-pool-size", size.to_string());
        }

        layer
    }
}

/// Pick the config file: CLI flag, then `BT_CONFIG`, then `./bt.yaml` if it exists.
///
/// Returns the path and whether it was named explicitly.
#[must_use]
pub fn config_path(cli: &CliOverrides, env_value: Option<String>) -> Option<(PathBuf, bool)> {
    if let Some(path) = &cli.config {
        return Some((path.clone(), true));
    }
    if let Some(path) = env_value.filter(|v| !v.trim().is_empty()) {
        return Some((PathBuf::from(path), true));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILENAME);
    default.exists().then_some((default, false))
}

/// Load configuration with the documented precedence order.
///
/// # Errors
///
/// Returns an error if an explicitly named config file is missing, any file
/// cannot be parsed, an override is malformed, or validation fails.
pub fn load_config(cli: &CliOverrides) -> Result<TrendsConfig> {
    load_config_from(cli, ConfigLayer::from_env(), env::var(CONFIG_ENV).ok())
}

/// [`load_config`] with the environment supplied by the caller.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_from(
    cli: &CliOverrides,
    env_layer: ConfigLayer,
    env_config: Option<String>,
) -> Result<TrendsConfig> {
    let mut config = match config_path(cli, env_config) {
        Some((path, explicit)) => {
            if explicit && !path.exists() {
                return Err(TrendsError::config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "Loading config file");
            TrendsConfig::from_yaml(&path)?
        }
        None => TrendsConfig::default(),
    };

    let overrides = ConfigLayer::merge_layers(&[env_layer, cli.as_layer()]);
    config.apply_layer(&overrides)?;
    config.validate()?;
    Ok(config)
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_scalar<T: std::str::FromStr>(value: &str, key: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TrendsError::config(format!("invalid value for {key}: '{value}'")))
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
Releases:
  - name: "4.10"
    targets: ["4.10.0", "4.10.z"]
    milestones:
      start: "2023-01-10"
      feature_complete: "2023-02-15"
      code_freeze: ""
      ga: "_latest"
  - name: "4.11"
    targets: ["4.11.0"]
blockers: [TestBlocker, UpgradeBlocker]
"#;

    fn vars(pairs: &[(&str, &str)]) -> ConfigLayer {
        ConfigLayer::from_vars(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        )
    }

    #[test]
    fn test_parse_sample() {
        let config = TrendsConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.releases.len(), 2);
        assert_eq!(config.releases[0].milestones.feature_complete, "2023-02-15");
        assert_eq!(config.releases[1].milestones.ga, "");
        assert_eq!(config.blockers, vec!["TestBlocker", "UpgradeBlocker"]);
        assert_eq!(config.customer_tracker_id, 60);
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(
            TrendsConfig::from_yaml_str("  \n").unwrap(),
            TrendsConfig::default()
        );
    }

    #[test]
    fn test_validate_duplicate_release() {
        let mut config = TrendsConfig::from_yaml_str(SAMPLE).unwrap();
        config.releases[1].name = "4.10".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate release '4.10'"));
    }

    #[test]
    fn test_validate_bad_milestone() {
        let mut config = TrendsConfig::from_yaml_str(SAMPLE).unwrap();
        config.releases[0].milestones.code_freeze = "next week".to_string();
        assert!(matches!(
            config.validate(),
            Err(TrendsError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_precedence_file_env_cli() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bt.yaml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "database: from-file.db\nread_pool_size: 2\n{SAMPLE}").unwrap();

        let cli = CliOverrides {
            config: Some(path.clone()),
            ..CliOverrides::default()
        };
        let config = load_config_from(&cli, ConfigLayer::default(), None).unwrap();
        assert_eq!(config.database, PathBuf::from("from-file.db"));
        assert_eq!(config.read_pool_size, 2);

        let env_layer = vars(&[("BT_DATABASE", "from-env.db"), ("BT_READ_POOL_SIZE", "6")]);
        let config = load_config_from(&cli, env_layer.clone(), None).unwrap();
        assert_eq!(config.database, PathBuf::from("from-env.db"));
        assert_eq!(config.read_pool_size, 6);

        let cli = CliOverrides {
            config: Some(path),
            db: Some(PathBuf::from("from-cli.db")),
            read_pool_size: None,
        };
        let config = load_config_from(&cli, env_layer, None).unwrap();
        assert_eq!(config.database, PathBuf::from("from-cli.db"));
        assert_eq!(config.read_pool_size, 6);
    }

    #[test]
    fn test_env_config_path_must_exist() {
        let err = load_config_from(
            &CliOverrides::default(),
            ConfigLayer::default(),
            Some("/nonexistent/bt.yaml".to_string()),
        )
        .unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn test_bad_override_value() {
        let mut config = TrendsConfig::default();
        let err = config
            .apply_layer(&vars(&[("BT_CUSTOMER_TRACKER_ID", "portal")]))
            .unwrap_err();
        assert!(err.to_string().contains("customer-tracker-id"));
    }

    #[test]
    fn test_release_lookup() {
        let config = TrendsConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.release("4.11").unwrap().targets, vec!["4.11.0"]);
        assert!(matches!(
            config.release("9.9"),
            Err(TrendsError::ReleaseNotFound { .. })
        ));
    }
}
