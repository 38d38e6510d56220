use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::caption_parser::TimeErrorPolicy;
use crate::player::{LayoutOffsets, PlayerSettings};

/// Application configuration module
/// This module handles loading, validating and saving the caption settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Whether captions are displayed at all
    #[serde(default = "default_true")]
    pub captions_enabled: bool,

    /// Playback and layout settings
    #[serde(default)]
    pub player: PlayerConfig,

    /// Byte source settings
    #[serde(default)]
    pub source: SourceConfig,

    /// Handling of cues with unparsable time expressions
    #[serde(default)]
    pub time_error_policy: TimeErrorPolicy,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Caption text size preference
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextSize {
    Small,
    #[default]
    Medium,
    Large,
    Huge,
}

impl TextSize {
    // @returns: Percentage nudge applied to both origin axes
    pub fn size_display_offset(&self) -> i32 {
        match self {
            Self::Large => -5,
            Self::Huge => -10,
            _ => 0,
        }
    }

    // @returns: Vertical pixels between stacked regions
    pub fn stacked_view_spacing(&self) -> i32 {
        match self {
            Self::Small => -13,
            Self::Medium => 7,
            Self::Large => 27,
            Self::Huge => 47,
        }
    }

    pub fn layout_offsets(&self) -> LayoutOffsets {
        LayoutOffsets {
            text_size_offset: self.size_display_offset(),
            stacked_view_spacing: self.stacked_view_spacing(),
        }
    }
}

impl std::str::FromStr for TextSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            "huge" => Ok(Self::Huge),
            _ => Err(anyhow!("Invalid text size: {}", s)),
        }
    }
}

/// Playback settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlayerConfig {
    /// Interval between scheduler polls in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of display regions the renderer owns
    #[serde(default = "default_region_count")]
    pub region_count: usize,

    /// Text size, drives the layout offsets
    #[serde(default)]
    pub text_size: TextSize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            region_count: default_region_count(),
            text_size: TextSize::default(),
        }
    }
}

/// Byte source settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceConfig {
    /// Connect timeout for remote documents in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Read timeout for remote documents in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl SourceConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    300
}

fn default_region_count() -> usize {
    3
}

fn default_connect_timeout_ms() -> u64 {
    4000
}

fn default_read_timeout_ms() -> u64 {
    60000
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.player.poll_interval_ms == 0 {
            return Err(anyhow!("Poll interval must be greater than zero"));
        }

        if self.player.region_count == 0 {
            return Err(anyhow!("At least one caption region is required"));
        }

        if self.source.connect_timeout_ms == 0 || self.source.read_timeout_ms == 0 {
            return Err(anyhow!("Source timeouts must be greater than zero"));
        }

        Ok(())
    }

    /// Load the configuration at `path`, writing a default one if the file does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    pub fn layout_offsets(&self) -> LayoutOffsets {
        self.player.text_size.layout_offsets()
    }

    /// Settings handed to the caption player
    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings {
            captions_enabled: self.captions_enabled,
            poll_interval: Duration::from_millis(self.player.poll_interval_ms),
            region_count: self.player.region_count,
            offsets: self.layout_offsets(),
            time_error_policy: self.time_error_policy,
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            captions_enabled: true,
            player: PlayerConfig::default(),
            source: SourceConfig::default(),
            time_error_policy: TimeErrorPolicy::default(),
            log_level: LogLevel::default(),
        }
    }
}
