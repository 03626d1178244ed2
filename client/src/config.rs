//! On-disk settings layered under the command line.

use std::path::{Path, PathBuf};

use bevy::prelude::Resource;
use scene_sync::{GridConfig, VisualConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// STL file names, relative to the asset directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetFiles {
    pub hull: String,
    pub wing: String,
    pub rear_wing: String,
}

impl Default for AssetFiles {
    fn default() -> Self {
        Self {
            hull: "RBird_Hull_Remesh.stl".to_string(),
            wing: "Wing_Applied_Low_Poly.stl".to_string(),
            rear_wing: "Rear_Wing_Applied_Low_Poly.stl".to_string(),
        }
    }
}

#[derive(Resource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub visuals: VisualConfig,
    pub grid: GridConfig,
    pub assets: AssetFiles,
}

impl ClientConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path` if given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        tracing::info!(path = %path.display(), "Reading config file");
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let text = r##"
            [visuals]
            force_scale = 0.002
            force_color = "#ff0000"

            [grid]
            iterations = 3
        "##;
        let config = ClientConfig::from_toml(text, Path::new("test.toml")).unwrap();
        assert_eq!(config.visuals.force_scale, 0.002);
        assert_eq!(config.visuals.moment_scale, VisualConfig::default().moment_scale);
        assert_eq!(config.grid.iterations, 3);
        assert_eq!(config.grid.tile_count(), 49);
        assert_eq!(config.assets, AssetFiles::default());
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let path = std::env::temp_dir().join("foilsync-missing-config-nope.toml");
        let err = ClientConfig::load(Some(path.as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = ClientConfig::from_toml("[visuals\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
