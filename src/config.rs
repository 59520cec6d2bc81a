use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::camera::Facing;
use crate::model::ModelConfig;
use crate::remap::{table_by_name, LandmarkTable};

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub video: VideoConfig,
    pub model: ModelConfig,
    pub landmarks: LandmarkConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub facing: Facing,
    /// Device index per facing direction; platform-dependent.
    pub forward_index: u32,
    pub backward_index: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkConfig {
    /// Built-in table name ("basic" or "composite").
    pub variant: String,
    /// Extra rows appended to the selected table.
    pub custom: LandmarkTable,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub overlay: bool,
    pub max_consecutive_failures: u32,
    pub tick_rate_hz: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 300,
            height: 250,
            facing: Facing::Forward,
            forward_index: 0,
            backward_index: 1,
        }
    }
}

impl Default for LandmarkConfig {
    fn default() -> Self {
        Self {
            variant: "basic".to_string(),
            custom: Vec::new(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            overlay: false,
            max_consecutive_failures: 30,
            tick_rate_hz: 60,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            video: VideoConfig::default(),
            model: ModelConfig::default(),
            landmarks: LandmarkConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl AppConfig {
    pub const PATH: &'static str = "facebridge.json";

    pub fn load() -> Result<Self> {
        Self::load_from(Self::PATH)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let config = if Path::new(path).exists() {
            let content = fs::read_to_string(path)?;
            // Missing fields fall back to defaults via #[serde(default)].
            match serde_json::from_str::<AppConfig>(&content) {
                Ok(c) => {
                    println!("Loaded configuration from {}", path);
                    c
                }
                Err(e) => {
                    println!("Error parsing config: {}. Loading defaults.", e);
                    Self::default()
                }
            }
        } else {
            println!("Configuration file not found. Creating default at {}", path);
            Self::default()
        };

        // Always save back so new fields show up in the file.
        config.save_to(path)?;

        Ok(config)
    }

    pub fn save_to(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Selected built-in variant plus any custom rows. Unknown variant
    /// names fall back to the basic table.
    pub fn landmark_table(&self) -> LandmarkTable {
        let mut table =
            table_by_name(&self.landmarks.variant).unwrap_or_else(crate::remap::face_basic);
        table.extend(self.landmarks.custom.iter().cloned());
        table
    }

    pub fn device_index(&self, facing: Facing) -> u32 {
        match facing {
            Facing::Forward => self.video.forward_index,
            Facing::Backward => self.video.backward_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remap::{LandmarkSource, LandmarkSpec};

    #[test]
    fn defaults_match_original_page_geometry() {
        let config = AppConfig::default();
        assert_eq!(config.video.width, 300);
        assert_eq!(config.video.height, 250);
        assert_eq!(config.model.max_faces, 1);
        assert_eq!(config.landmarks.variant, "basic");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"video": {"width": 640}}"#).unwrap();
        assert_eq!(config.video.width, 640);
        assert_eq!(config.video.height, 250);
        assert_eq!(config.runtime.tick_rate_hz, 60);
    }

    #[test]
    fn custom_rows_extend_the_variant_table() {
        let mut config = AppConfig::default();
        config.landmarks.custom.push(LandmarkSpec::mesh("noseBridge", 6, 0.0, 0.0));
        let table = config.landmark_table();
        assert_eq!(table.len(), 6);
        assert_eq!(table[5].name, "noseBridge");
    }

    #[test]
    fn unknown_variant_falls_back_to_basic() {
        let mut config = AppConfig::default();
        config.landmarks.variant = "no-such-table".to_string();
        assert_eq!(config.landmark_table().len(), 5);
    }

    #[test]
    fn landmark_spec_round_trips_through_json() {
        let spec = LandmarkSpec::annotation("leftCheek", "leftCheek", 0, 480.0, -20.0);
        let json = serde_json::to_string(&spec).unwrap();
        let back: LandmarkSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
        assert!(matches!(back.source, LandmarkSource::Annotation { .. }));
    }

    #[test]
    fn device_index_follows_facing() {
        let config = AppConfig::default();
        assert_eq!(config.device_index(Facing::Forward), 0);
        assert_eq!(config.device_index(Facing::Backward), 1);
    }
}
