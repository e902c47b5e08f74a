//! Configuration management for the compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (yangc.toml)
//! - Environment variables (YANGC__*)
//!
//! ## Example config file (yangc.toml):
//! ```toml
//! [parser]
//! parallel = true
//! max_threads = 4
//!
//! [xpath]
//! math_mode = "exact"
//!
//! [reactor]
//! supported_features = ["example-module:fast-path"]
//!
//! [loader]
//! extensions = ["yang"]
//! skip_prefixes = ["."]
//! ```

use crate::xpath::MathMode;
use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for one compiler run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Source parsing settings
    #[serde(default)]
    pub parser: ParserConfig,

    /// Expression settings
    #[serde(default)]
    pub xpath: XPathConfig,

    /// Reactor settings
    #[serde(default)]
    pub reactor: ReactorConfig,

    /// Directory loading settings
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// Parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Parse sources on worker threads
    #[serde(default = "default_true")]
    pub parallel: bool,

    /// Upper bound on parser threads
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
}

/// XPath configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XPathConfig {
    /// Arithmetic used when folding numeric constants
    #[serde(default)]
    pub math_mode: MathMode,
}

/// Reactor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReactorConfig {
    /// Hard cap on declaration passes; the statement count bounds it otherwise
    #[serde(default)]
    pub max_iterations: Option<usize>,

    /// Features treated as supported, as `module:feature`. When unset every
    /// feature is supported and nothing is pruned.
    #[serde(default)]
    pub supported_features: Option<Vec<String>>,
}

/// Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// File extensions picked up when walking a directory
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// File or directory name prefixes to skip
    #[serde(default)]
    pub skip_prefixes: Vec<String>,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_max_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn default_extensions() -> Vec<String> {
    vec!["yang".to_string()]
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_threads: default_max_threads(),
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            skip_prefixes: Vec::new(),
        }
    }
}

impl CompilerConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["yangc.toml", ".yangc.toml", "config/yangc.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("org", "yang", "yangc") {
            let xdg_config = config_dir.config_dir().join("yangc.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (YANGC__*)
        builder = builder.add_source(
            Environment::with_prefix("YANGC")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Whether `module:feature` is supported under this configuration
    pub fn feature_supported(&self, module: &str, feature: &str) -> bool {
        match &self.reactor.supported_features {
            None => true,
            Some(list) => list
                .iter()
                .any(|entry| entry.split_once(':') == Some((module, feature))),
        }
    }
}
