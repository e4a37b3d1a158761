//! Configuration loader/writer plus strongly typed settings structures.
//!
//! Settings live in a single `config.toml` under the mudlink directory
//! (`~/.mudlink`, or `$MUDLINK_DIR`). The embedded default is extracted on
//! first run, and every field carries a serde default so partial files load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// Embed default configuration at compile time
const DEFAULT_CONFIG: &str = include_str!("../defaults/config.toml");

/// Environment variable overriding the mudlink directory
pub const DIR_ENV: &str = "MUDLINK_DIR";

/// Top-level configuration object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub framer: FramerConfig,
    #[serde(default)]
    pub triggers: TriggerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_map_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize, // Lines of scrollback kept per pane
    #[serde(default)]
    pub show_timestamps: bool,
    #[serde(default = "default_true")]
    pub announce_location: bool, // Print a status line when the map location changes
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramerConfig {
    #[serde(default = "default_flush_delay_ms")]
    pub flush_delay_ms: u64,
    #[serde(default = "default_prompts")]
    pub prompts: Vec<String>,
    #[serde(default = "default_tick_glyphs")]
    pub tick_glyphs: Vec<String>,
}

impl FramerConfig {
    pub fn flush_delay(&self) -> Duration {
        Duration::from_millis(self.flush_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_comms_phrases")]
    pub comms_phrases: Vec<String>,
    #[serde(default = "default_room_name_pattern")]
    pub room_name_pattern: String,
    #[serde(default = "default_room_exits_marker")]
    pub room_exits_marker: String,
    #[serde(default = "default_room_exits_pattern")]
    pub room_exits_pattern: String,
}

fn default_url() -> String {
    "ws://localhost:8080".to_string()
}

fn default_true() -> bool {
    true
}

fn default_map_path() -> PathBuf {
    PathBuf::from("map.json")
}

fn default_buffer_size() -> usize {
    1000
}

fn default_flush_delay_ms() -> u64 {
    250
}

fn default_prompts() -> Vec<String> {
    crate::framer::DEFAULT_PROMPTS.iter().map(|s| s.to_string()).collect()
}

fn default_tick_glyphs() -> Vec<String> {
    crate::framer::DEFAULT_TICK_GLYPHS.iter().map(|s| s.to_string()).collect()
}

fn default_comms_phrases() -> Vec<String> {
    [
        " says ",
        " tells you ",
        "You tell ",
        "You say ",
        "whispers",
        "shouts",
        "yells",
        " chats ",
        " narrates ",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_room_name_pattern() -> String {
    r"^\x1b\[36m(.+)\x1b\[0m$".to_string()
}

fn default_room_exits_marker() -> String {
    "obvious exits:".to_string()
}

fn default_room_exits_pattern() -> String {
    r"\[ obvious exits: (.*) \]$".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { url: default_url() }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_map_path(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            show_timestamps: false,
            announce_location: true,
        }
    }
}

impl Default for FramerConfig {
    fn default() -> Self {
        Self {
            flush_delay_ms: default_flush_delay_ms(),
            prompts: default_prompts(),
            tick_glyphs: default_tick_glyphs(),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            comms_phrases: default_comms_phrases(),
            room_name_pattern: default_room_name_pattern(),
            room_exits_marker: default_room_exits_marker(),
            room_exits_pattern: default_room_exits_pattern(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        // Parse from embedded default config.toml
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|e| {
            eprintln!("Failed to parse embedded config.toml: {}", e);
            Self {
                connection: ConnectionConfig::default(),
                map: MapConfig::default(),
                ui: UiConfig::default(),
                framer: FramerConfig::default(),
                triggers: TriggerConfig::default(),
            }
        })
    }
}

impl Config {
    /// Load config.toml from the mudlink directory, extracting the default on
    /// first run
    pub fn load() -> Result<Self> {
        Self::extract_defaults()?;
        Self::load_from_path(&Self::config_path()?)
    }

    /// Load a specific config file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).context(format!("Failed to read config file: {:?}", path))?;
        let config: Config =
            toml::from_str(&contents).context(format!("Failed to parse config file: {:?}", path))?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the base mudlink directory (~/.mudlink/)
    /// Can be overridden with MUDLINK_DIR environment variable
    pub fn base_dir() -> Result<PathBuf> {
        if let Ok(custom_dir) = std::env::var(DIR_ENV) {
            return Ok(PathBuf::from(custom_dir));
        }

        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".mudlink"))
    }

    /// Get path to config.toml
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::base_dir()?.join("config.toml"))
    }

    /// Resolve the map dataset path: absolute paths as-is, relative paths in
    /// the working directory first, then the mudlink directory
    pub fn map_path(&self) -> Result<PathBuf> {
        Self::resolve_data_path(&self.map.path, &Self::base_dir()?)
    }

    fn resolve_data_path(path: &Path, base_dir: &Path) -> Result<PathBuf> {
        if path.is_absolute() || path.exists() {
            return Ok(path.to_path_buf());
        }
        let in_base = base_dir.join(path);
        if in_base.exists() {
            return Ok(in_base);
        }
        // Neither exists; report the working-directory path in the load error
        Ok(path.to_path_buf())
    }

    /// Write the embedded default config.toml if none exists yet
    fn extract_defaults() -> Result<()> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            return Ok(());
        }
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&config_path, DEFAULT_CONFIG).context("Failed to write default config.toml")?;
        tracing::info!("Extracted default config to {:?}", config_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).expect("embedded config.toml");
        assert_eq!(config.connection.url, "ws://localhost:8080");
        assert_eq!(config.framer.flush_delay(), Duration::from_millis(250));
        assert_eq!(config.ui.buffer_size, 1000);
        assert_eq!(config.triggers.room_name_pattern, default_room_name_pattern());
        assert_eq!(config.triggers.room_exits_pattern, default_room_exits_pattern());
        assert_eq!(config.triggers.comms_phrases, default_comms_phrases());
        assert_eq!(config.framer.prompts, default_prompts());
        assert_eq!(config.framer.tick_glyphs, default_tick_glyphs());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[connection]\nurl = \"ws://example.org:4000\"\n").unwrap();
        assert_eq!(config.connection.url, "ws://example.org:4000");
        assert!(config.map.enabled);
        assert_eq!(config.map.path, PathBuf::from("map.json"));
        assert_eq!(config.framer.flush_delay_ms, 250);
        assert!(config.ui.announce_location);
    }

    #[test]
    fn test_serialized_config_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.ui.show_timestamps = true;
        config.framer.flush_delay_ms = 100;
        fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert!(loaded.ui.show_timestamps);
        assert_eq!(loaded.framer.flush_delay_ms, 100);
        assert_eq!(loaded.triggers.room_name_pattern, config.triggers.room_name_pattern);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ui]\nbuffer_size = \"lots\"\n").unwrap();
        let err = Config::load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_resolve_data_path_prefers_existing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("world.json"), "{}").unwrap();

        let resolved = Config::resolve_data_path(Path::new("world.json"), dir.path()).unwrap();
        assert_eq!(resolved, dir.path().join("world.json"));

        let missing = Config::resolve_data_path(Path::new("missing.json"), dir.path()).unwrap();
        assert_eq!(missing, PathBuf::from("missing.json"));
    }
}
