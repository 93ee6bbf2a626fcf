use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::map::{DEFAULT_MAP_HEIGHT, DEFAULT_MAP_WIDTH};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seed: u64,
    pub map_width: i32,
    pub map_height: i32,
    pub base_fov_radius: i32,
    pub max_inventory: usize,
    /// Message lines the front end keeps on screen.
    pub log_capacity: usize,
    pub corruption_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            map_width: DEFAULT_MAP_WIDTH,
            map_height: DEFAULT_MAP_HEIGHT,
            base_fov_radius: 8,
            max_inventory: 12,
            log_capacity: 4,
            corruption_enabled: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.map_width < 3 || self.map_height < 3 {
            return Err(EngineError::Invalid(format!(
                "map must be at least 3x3, got {}x{}",
                self.map_width, self.map_height
            )));
        }
        if self.base_fov_radius < 0 {
            return Err(EngineError::Invalid("negative FOV radius".into()));
        }
        Ok(())
    }

    pub fn map_size(&self) -> (i32, i32) {
        (self.map_width, self.map_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = EngineConfig::from_json_str(r#"{"seed": 99}"#).unwrap();
        assert_eq!(config.seed, 99);
        assert_eq!(config.map_size(), (80, 40));
        assert!(config.corruption_enabled);
    }

    #[test]
    fn degenerate_maps_are_rejected() {
        let err = EngineConfig::from_json_str(r#"{"map_width": 0}"#).unwrap_err();
        assert!(matches!(err, EngineError::Invalid(_)));
    }

    #[test]
    fn bad_json_is_a_json_error() {
        assert!(matches!(
            EngineConfig::from_json_str("{seed"),
            Err(EngineError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            EngineConfig::from_path("/definitely/not/here.json"),
            Err(EngineError::Io { .. })
        ));
    }
}
