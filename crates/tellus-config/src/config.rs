//! Configuration structs with defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Planet synthesis settings.
    pub planet: PlanetConfig,
    /// Streaming buffer sizing.
    pub streaming: StreamingConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Window title.
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Tellus".to_string(),
        }
    }
}

/// Planet synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetConfig {
    /// Master noise seed; one value reproduces the whole planet.
    pub seed: u64,
    /// Heightfield rows over the polar angle.
    pub rows: usize,
    /// Heightfield columns over azimuth.
    pub cols: usize,
    /// Unperturbed sphere radius.
    pub radius: f64,
    /// Noise octave count.
    pub octaves: u32,
    /// Per-octave frequency multiplier (and inverse amplitude divisor).
    pub lacunarity: f64,
    /// Overall terrain noise amplitude scale.
    pub base_scale: f64,
    /// Frequency of the broadest octave, in cycles per grid cell.
    pub base_frequency: f64,
    /// Polar ice-cap width as a fraction of the pole-to-equator span.
    pub ice_band: f64,
    /// Ice-cap fade width as a latitude fraction.
    pub ice_fade: f64,
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            rows: 1024,
            cols: 1024,
            radius: 32.0,
            octaves: 10,
            lacunarity: 2.0,
            base_scale: 0.5,
            base_frequency: 1.0 / 512.0,
            ice_band: 0.18,
            ice_fade: 0.10,
        }
    }
}

/// Streaming buffer capacities and block sizes, in elements.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Vertex buffer capacity in vertices.
    pub vertex_capacity: usize,
    /// Vertices per vertex block.
    pub vertex_block_size: usize,
    /// Index buffer capacity in indices.
    pub index_capacity: usize,
    /// Indices per index block.
    pub index_block_size: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        // Sized for a pair of 1024x1024 planets with room to spare.
        Self {
            vertex_capacity: 3_000_000,
            vertex_block_size: 300_000,
            index_capacity: 30_000_000,
            index_block_size: 3_000_000,
        }
    }
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: String::new(),
        }
    }
}

/// Platform config directory for the application.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tellus")
}

impl Config {
    /// Load config from the given directory, or create a default config
    /// file there.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new().depth_limit(3);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("width: 1280"));
        assert!(ron_str.contains("rows: 1024"));
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(window: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.planet, PlanetConfig::default());
        assert_eq!(config.streaming, StreamingConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.planet.seed = 987;
        config.streaming.vertex_block_size = 1234;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_creates_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(loaded, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }
}
