use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ProcessingError, Result};
use crate::utils::constants::{
    CONFIG_FILE, DEFAULT_CHECKPOINT_INTERVAL_SECS, DEFAULT_PROGRESS_EVERY_ROUTES,
    DEFAULT_ROUTING_DELAY_MS, DEFAULT_ROUTING_TIMEOUT_SECS, DEFAULT_SCHEME_A_TABLE,
    DEFAULT_SCHEME_B_TABLE, MIN_DISTANCE_KM,
};

/// Environment variable prefix; `FREIGHT__ROUTING__API_KEY` sets `routing.api_key`
pub const ENV_PREFIX: &str = "FREIGHT";

/// How a checkpoint is matched against the current route list on resume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
    /// Checkpointed route codes must equal the input prefix
    #[default]
    VerifyPrefix,
    /// Skip as many routes as the checkpoint holds without comparing them
    TrustPrefix,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ReferencePaths {
    pub postal_coordinates: PathBuf,
    pub scheme_a_postal: PathBuf,
    pub scheme_b_postal: PathBuf,
    pub cross_scheme_index: PathBuf,
}

impl Default for ReferencePaths {
    fn default() -> Self {
        Self {
            postal_coordinates: PathBuf::from("data/postal_coordinates.geojson"),
            scheme_a_postal: PathBuf::from("data/scheme_a_postal.json"),
            scheme_b_postal: PathBuf::from("data/scheme_b_postal.json"),
            cross_scheme_index: PathBuf::from("data/cross_scheme_index.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RoutingConfig {
    pub enabled: bool,

    /// Overrides the regional endpoint derived from `region`
    pub base_url: Option<String>,

    #[validate(length(min = 1))]
    pub region: String,

    pub api_key: Option<String>,

    #[validate(range(min = 1, max = 120))]
    pub timeout_secs: u64,

    #[validate(range(max = 60000))]
    pub request_delay_ms: u64,
}

impl RoutingConfig {
    /// Routing is attempted only when enabled and a key is configured
    pub fn is_active(&self) -> bool {
        self.enabled && self.api_key.as_deref().map_or(false, |k| !k.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            region: "eu-central-1".to_string(),
            api_key: None,
            timeout_secs: DEFAULT_ROUTING_TIMEOUT_SECS,
            request_delay_ms: DEFAULT_ROUTING_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: PathBuf,

    #[validate(length(min = 1))]
    pub scheme_a_table: String,

    #[validate(length(min = 1))]
    pub scheme_b_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/rates.db"),
            scheme_a_table: DEFAULT_SCHEME_A_TABLE.to_string(),
            scheme_b_table: DEFAULT_SCHEME_B_TABLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BatchConfig {
    #[validate(range(min = 0.0))]
    pub min_distance_km: f64,

    #[validate(range(min = 1))]
    pub checkpoint_interval_secs: u64,

    #[validate(range(min = 1))]
    pub checkpoint_every_routes: Option<usize>,

    #[validate(range(min = 1))]
    pub progress_every_routes: usize,

    pub resume_policy: ResumePolicy,
}

impl BatchConfig {
    pub fn checkpoint_interval(&self) -> Duration {
        Duration::from_secs(self.checkpoint_interval_secs)
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            min_distance_km: MIN_DISTANCE_KM,
            checkpoint_interval_secs: DEFAULT_CHECKPOINT_INTERVAL_SECS,
            checkpoint_every_routes: None,
            progress_every_routes: DEFAULT_PROGRESS_EVERY_ROUTES,
            resume_policy: ResumePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub reference: ReferencePaths,

    #[validate(nested)]
    pub routing: RoutingConfig,

    #[validate(nested)]
    pub store: StoreConfig,

    #[validate(nested)]
    pub batch: BatchConfig,
}

impl AppConfig {
    /// Defaults, then the TOML file, then `FREIGHT__*` environment variables
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_source = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ProcessingError::Config(format!(
                        "config file not found: {}",
                        path.display()
                    )));
                }
                config::File::from(path.to_path_buf()).required(true)
            }
            None => config::File::with_name(CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file_source)
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without consulting files or the environment
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch.min_distance_km, 150.0);
        assert_eq!(config.batch.checkpoint_interval(), Duration::from_secs(300));
        assert_eq!(config.batch.resume_policy, ResumePolicy::VerifyPrefix);
        assert_eq!(config.routing.timeout(), Duration::from_secs(10));
        assert!(!config.routing.is_active());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [routing]
            api_key = "abc"
            request_delay_ms = 0

            [batch]
            checkpoint_every_routes = 50
            resume_policy = "trust_prefix"
            "#,
        )
        .unwrap();

        assert!(config.routing.is_active());
        assert_eq!(config.routing.region, "eu-central-1");
        assert_eq!(config.batch.checkpoint_every_routes, Some(50));
        assert_eq!(config.batch.resume_policy, ResumePolicy::TrustPrefix);
        assert_eq!(config.store.scheme_a_table, "scheme_a_offers");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AppConfig::from_toml_str("[routing]\ntimeout_secs = 0\n").is_err());
        assert!(AppConfig::from_toml_str("[batch]\nprogress_every_routes = 0\n").is_err());
        assert!(AppConfig::from_toml_str("[batch]\nresume_policy = \"guess\"\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[store]\ndatabase_path = \"/tmp/rates.db\"").unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.store.database_path, PathBuf::from("/tmp/rates.db"));

        assert!(AppConfig::load(Some(Path::new("/definitely/missing.toml"))).is_err());
    }

    #[test]
    fn test_disabled_routing_is_inactive() {
        let config =
            AppConfig::from_toml_str("[routing]\nenabled = false\napi_key = \"abc\"\n").unwrap();
        assert!(!config.routing.is_active());
    }
}
