use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DEFAULT_LABEL_SCALE, DETECTION_INTERVAL, MAX_IMAGE_BYTES, MIN_EXPRESSION_PROBABILITY,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for the detection pipeline, loadable from a JSON file.
///
/// Every field is optional in the file; missing fields take the defaults
/// below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub interval_ms: u64,
    pub min_expression_probability: f64,
    pub box_color: [u8; 4],
    pub text_color: [u8; 4],
    pub label_scale: f32,
    pub max_image_bytes: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            interval_ms: DETECTION_INTERVAL.as_millis() as u64,
            min_expression_probability: MIN_EXPRESSION_PROBABILITY,
            box_color: [0, 0, 255, 255],
            text_color: [255, 255, 255, 255],
            label_scale: DEFAULT_LABEL_SCALE,
            max_image_bytes: MAX_IMAGE_BYTES,
        }
    }
}

impl DetectorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DetectorConfig =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Invalid("interval_ms must be > 0".into()));
        }
        if !(0.0..=1.0).contains(&self.min_expression_probability) {
            return Err(ConfigError::Invalid(format!(
                "min_expression_probability must be between 0.0 and 1.0, got {}",
                self.min_expression_probability
            )));
        }
        if self.label_scale <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "label_scale must be positive, got {}",
                self.label_scale
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
