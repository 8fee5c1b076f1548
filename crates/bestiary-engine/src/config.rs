//! Simulation configuration.
//!
//! Provides the parameters of a headless run: seed, timestep, frame cap,
//! where authored definitions live and how the autopilot plays.
//! Configuration can be loaded from and saved to a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
pub const CONFIG_FILE: &str = "bestiary.toml";

/// Autopilot behaviour toggles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Swing at monsters in reach
    pub attack: bool,
    /// Roll away when a monster winds up nearby
    pub dodge: bool,
    /// Carve fallen monsters
    pub carve: bool,
    /// Distance at which the hunter stops walking and swings
    pub engage_distance: f32,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            attack: true,
            dodge: true,
            carve: true,
            engage_distance: 3.0,
        }
    }
}

/// Headless run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Seed for every random stream
    pub seed: u64,
    /// Fixed timestep in seconds
    pub timestep: f32,
    /// Frames to simulate before giving up (0 = until the quest resolves)
    pub max_frames: u64,
    /// Definitions document (.toml or .ron)
    pub definitions: Option<PathBuf>,
    /// Quest to run (None = first quest in the document)
    pub quest: Option<String>,
    /// Weapon to carry (None = first weapon in the document)
    pub weapon: Option<String>,
    /// Autopilot toggles
    pub autopilot: AutopilotConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED,
            timestep: 1.0 / 60.0,
            max_frames: 60 * 60 * 10, // 10 minutes
            definitions: Some(PathBuf::from("assets/definitions/hunt.toml")),
            quest: None,
            weapon: None,
            autopilot: AutopilotConfig::default(),
        }
    }
}

impl SimConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file {} not found, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(mut config) => {
                    config.validate();
                    info!("Loaded config from {}", path.display());
                    config
                },
                Err(e) => {
                    warn!("Failed to parse config file: {e}");
                    Self::default()
                },
            },
            Err(e) => {
                warn!("Failed to read config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    #[allow(dead_code)]
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Frame budget, `None` when unlimited.
    #[must_use]
    pub fn frame_limit(&self) -> Option<u64> {
        (self.max_frames > 0).then_some(self.max_frames)
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.timestep = self.timestep.clamp(1.0 / 240.0, 0.1);
        self.autopilot.engage_distance = self.autopilot.engage_distance.clamp(0.5, 10.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert!((config.timestep - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(config.max_frames, 36_000);
        assert!(config.autopilot.attack);
        assert!(config.quest.is_none());
        assert_eq!(config.frame_limit(), Some(36_000));

        let unlimited = SimConfig {
            max_frames: 0,
            ..SimConfig::default()
        };
        assert_eq!(unlimited.frame_limit(), None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimConfig::default();
        config.timestep = 5.0;
        config.autopilot.engage_distance = -1.0;

        config.validate();

        assert!((config.timestep - 0.1).abs() < 1e-6);
        assert!((config.autopilot.engage_distance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join(CONFIG_FILE);

        let mut config = SimConfig::default();
        config.seed = 12345;
        config.quest = Some(String::from("Hunt a Wyvern"));
        config.autopilot.dodge = false;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.seed, 12345);
        assert_eq!(loaded.quest.as_deref(), Some("Hunt a Wyvern"));
        assert!(!loaded.autopilot.dodge);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "seed = 7\n[autopilot]\ncarve = false\n").expect("write");

        let loaded = SimConfig::load_from(&config_path);
        assert_eq!(loaded.seed, 7);
        assert!(!loaded.autopilot.carve);
        assert!(loaded.autopilot.attack);
        assert_eq!(loaded.max_frames, SimConfig::default().max_frames);
    }

    #[test]
    fn test_config_load_missing_or_broken_file() {
        let config = SimConfig::load_from("/nonexistent/path/bestiary.toml");
        assert_eq!(config, SimConfig::default());

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&config_path, "seed = \"not a number\"").expect("write");
        assert_eq!(SimConfig::load_from(&config_path), SimConfig::default());
    }
}
