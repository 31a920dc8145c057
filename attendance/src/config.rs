//! Kiosk configuration.
//!
//! Stored as YAML at `~/.kiosk/config.yaml` unless a path is given.
//! Zero or empty fields fall back to their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use kiosk_bitindex::Projector;
use kiosk_signature::GeneratorConfig;
use serde::{Deserialize, Serialize};

use crate::error::KioskError;
use crate::retry::RetryPolicy;
use crate::strategy::StrategyKind;

/// Default configuration directory name under the home directory.
pub const DEFAULT_BASE_DIR: &str = ".kiosk";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

const DEFAULT_BITS: usize = 128;
const DEFAULT_MAX_DISTANCE: u32 = 40;
const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "match", default)]
    pub matching: MatchConfig,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorSection>,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Load a native distance kernel on first query.
    #[serde(default = "default_true")]
    pub acceleration: bool,

    /// Needed only when embeddings are not `bits` long.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projector: Option<ProjectorConfig>,

    #[serde(skip)]
    config_path: PathBuf,
}

/// Matching parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Vector width in bits.
    #[serde(default)]
    pub bits: usize,

    /// Embedding components strictly above this become 1 bits.
    #[serde(default)]
    pub binarize_threshold: f32,

    /// Largest accepted Hamming distance. Needs calibrating per model.
    #[serde(default = "default_max_distance")]
    pub max_distance: u32,

    /// Candidates returned by recognition.
    #[serde(default)]
    pub top_k: usize,

    /// How probes are ranked against the index.
    #[serde(default)]
    pub strategy: StrategyKind,
}

/// Remote signature generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSection {
    pub base_url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tool: String,

    /// API key, or `$NAME` to read it from the environment.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Per-attempt deadline. 0 means 300.
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub timeout_secs: u64,

    /// Retries after the first attempt. Unset means 2.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// First backoff delay. 0 means 1000.
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub backoff_ms: u64,
}

/// Random-hyperplane projector for embeddings of another dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectorConfig {
    /// Embedding dimension.
    pub dim: usize,

    #[serde(default)]
    pub seed: u64,

    /// JSON planes written by `Projector::to_json`. Takes precedence over
    /// `seed`, and keeps vectors comparable across builds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planes_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_max_distance() -> u32 {
    DEFAULT_MAX_DISTANCE
}

fn is_zero_u64(n: &u64) -> bool {
    *n == 0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            matching: MatchConfig::default(),
            generator: None,
            retry: RetryConfig::default(),
            acceleration: true,
            projector: None,
            config_path: PathBuf::new(),
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            bits: DEFAULT_BITS,
            binarize_threshold: 0.0,
            max_distance: DEFAULT_MAX_DISTANCE,
            top_k: DEFAULT_TOP_K,
            strategy: StrategyKind::Hamming,
        }
    }
}

impl MatchConfig {
    /// Replaces zero `bits` and `top_k` with their defaults.
    pub fn with_defaults(mut self) -> Self {
        if self.bits == 0 {
            self.bits = DEFAULT_BITS;
        }
        if self.top_k == 0 {
            self.top_k = DEFAULT_TOP_K;
        }
        self
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        let d = RetryPolicy::default();
        RetryPolicy {
            timeout: if self.timeout_secs == 0 {
                d.timeout
            } else {
                Duration::from_secs(self.timeout_secs)
            },
            max_retries: self.max_retries.unwrap_or(d.max_retries),
            backoff: if self.backoff_ms == 0 {
                d.backoff
            } else {
                Duration::from_millis(self.backoff_ms)
            },
        }
    }
}

impl GeneratorSection {
    /// Client configuration, with `$NAME` API keys resolved.
    pub fn client_config(&self, timeout: Duration) -> GeneratorConfig {
        GeneratorConfig::new(&self.base_url)
            .with_tool(&self.tool)
            .with_api_key(&expand_env(&self.api_key))
            .with_timeout(timeout)
    }
}

impl ProjectorConfig {
    pub fn build(&self, bits: usize) -> Result<Projector, KioskError> {
        let projector = match &self.planes_file {
            Some(path) => {
                let data = std::fs::read(path)
                    .map_err(|e| KioskError::Config(format!("read {}: {e}", path.display())))?;
                Projector::from_json(&data)?
            }
            None => Projector::new(self.dim, bits, self.seed)?,
        };
        if projector.dim() != self.dim || projector.bits() != bits {
            return Err(KioskError::Config(format!(
                "projector is {}x{}, want {}x{}",
                projector.dim(),
                projector.bits(),
                self.dim,
                bits
            )));
        }
        Ok(projector)
    }
}

/// `$NAME` is replaced by the variable's value (empty if unset).
fn expand_env(value: &str) -> String {
    match value.strip_prefix('$') {
        Some(name) if !name.is_empty() => std::env::var(name).unwrap_or_default(),
        _ => value.to_string(),
    }
}

impl Config {
    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(DEFAULT_CONFIG_FILE))
    }

    /// Loads the config from `custom_path` or the default location.
    /// A missing file yields the defaults; nothing is written.
    pub fn load(custom_path: Option<&Path>) -> Result<Self, KioskError> {
        let config_path = match custom_path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path()
                .ok_or_else(|| KioskError::Config("cannot determine config path".into()))?,
        };

        let mut cfg: Config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| KioskError::Config(format!("read {}: {e}", config_path.display())))?;
            serde_yaml::from_str(&content)
                .map_err(|e| KioskError::Config(format!("parse {}: {e}", config_path.display())))?
        } else {
            Config::default()
        };

        cfg.matching = cfg.matching.with_defaults();
        cfg.config_path = config_path;
        Ok(cfg)
    }

    /// Writes the config to its path, creating the directory.
    pub fn save(&self) -> Result<(), KioskError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| KioskError::Config(format!("create {}: {e}", parent.display())))?;
        }
        let content = self.to_yaml()?;
        std::fs::write(&self.config_path, content)
            .map_err(|e| KioskError::Config(format!("write {}: {e}", self.config_path.display())))
    }

    pub fn to_yaml(&self) -> Result<String, KioskError> {
        serde_yaml::to_string(self).map_err(|e| KioskError::Config(e.to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.config_path = path.into();
    }
}
