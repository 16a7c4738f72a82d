use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The watermark text applied when the caller supplies none.
pub const DEFAULT_WATERMARK_TEXT: &str = "StudyBoards - Confidential";

/// Failures while loading a watermark configuration file.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read the configuration file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse the configuration file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Caller-side watermark configuration.
///
/// The compositor itself never invents a watermark text: resolving an absent
/// or empty request against the configured default happens here, once, at the
/// request boundary, and the compositor always receives the already-resolved
/// string.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkConfiguration {
    pub default_watermark_text: String,
}

impl Default for WatermarkConfiguration {
    fn default() -> Self {
        WatermarkConfiguration {
            default_watermark_text: DEFAULT_WATERMARK_TEXT.into(),
        }
    }
}

impl WatermarkConfiguration {
    pub fn from_path(configuration_file_path: &Path) -> Result<Self, ConfigurationError> {
        let configuration_file_contents = std::fs::read_to_string(configuration_file_path)
            .map_err(|error| ConfigurationError::Read {
                path: configuration_file_path.to_path_buf(),
                source: error,
            })?;
        let configuration: WatermarkConfiguration =
            serde_json::from_str(&configuration_file_contents).map_err(|error| {
                ConfigurationError::Parse {
                    path: configuration_file_path.to_path_buf(),
                    source: error,
                }
            })?;

        Ok(configuration)
    }

    /// Resolves the watermark text for one request: the requested text when
    /// present and non-empty, the configured default otherwise.
    pub fn resolve_text<'a>(&'a self, requested_text: Option<&'a str>) -> &'a str {
        match requested_text {
            Some(text) if !text.is_empty() => text,
            _ => &self.default_watermark_text,
        }
    }
}
