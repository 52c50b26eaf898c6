use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::metadata::METADATA_ASSET;
use crate::model::TractLoader;
use crate::preprocess::{DEFAULT_INPUT_SIZE, Preprocessor};
use crate::source::{AssetSource, source_for};

pub const CONFIG_ENV: &str = "CLASSIFY_CONFIG";
pub const CONFIG_FILE: &str = "classify.toml";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Directory or base url holding the model assets.
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_metadata")]
    pub metadata: String,
    #[serde(default = "default_model_file")]
    pub model_file: String,
    #[serde(default = "default_input_size")]
    pub input_size: usize,
    /// Address the asset server binds to.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            model: default_model(),
            metadata: default_metadata(),
            model_file: default_model_file(),
            input_size: default_input_size(),
            listen: default_listen(),
        }
    }
}

fn default_model() -> String {
    "model".to_string()
}

fn default_metadata() -> String {
    METADATA_ASSET.to_string()
}

fn default_model_file() -> String {
    "model.onnx".to_string()
}

fn default_input_size() -> usize {
    DEFAULT_INPUT_SIZE
}

fn default_listen() -> String {
    "127.0.0.1:5000".to_string()
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.input_size > 0, "input_size must be at least 1, got {}", self.input_size);
        ensure!(!self.model_file.is_empty(), "model_file can not be empty");
        Ok(())
    }

    pub fn source(&self) -> Result<Box<dyn AssetSource>> {
        source_for(&self.model)
    }

    pub fn preprocessor(&self) -> Preprocessor {
        Preprocessor::new(self.input_size)
    }

    pub fn loader(&self) -> TractLoader {
        TractLoader {
            model_file: self.model_file.clone(),
            input_shape: self.preprocessor().input_shape(),
        }
    }
}

/// `$CLASSIFY_CONFIG` if set, else `classify.toml` in the working directory
/// if present.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(c) = std::env::var(CONFIG_ENV) {
        Some(PathBuf::from(c))
    } else if Path::new(CONFIG_FILE).exists() {
        Some(PathBuf::from(CONFIG_FILE))
    } else {
        None
    }
}

pub fn read_config(path: impl AsRef<Path>) -> Result<Config> {
    let text = fs_err::read_to_string(&path)
        .with_context(|| format!("Opening config {:?}", path.as_ref()))?;
    let config: Config = toml::from_str(&text)
        .with_context(|| format!("Parsing configuration file {:?}", path.as_ref()))?;
    config
        .validate()
        .with_context(|| format!("Checking configuration file {:?}", path.as_ref()))?;
    Ok(config)
}

/// Read the explicit path, or the discovered one, or fall back to defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit.map(Path::to_path_buf).or_else(config_path) {
        Some(path) => {
            debug!("Reading configuration from {:?}", path);
            read_config(path)
        }
        None => Ok(Config::default()),
    }
}
