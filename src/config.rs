//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the
//! station-config.toml file. It covers the upstream API endpoint, the polling
//! schedule and active hours, glyph assets, and the e-ink wiring.
//!
//! Station names, line mappings and screen coordinates are fixed by the board
//! layout and are deliberately absent here.

use crate::active_hours::ActiveHours;
use crate::monitor::Schedule;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Real-time arrivals for 교대 station, first ten records.
pub const DEFAULT_API_URL: &str = "http://swopenAPI.seoul.go.kr/api/subway/65794d52696a736335374c4a5a476a/json/realtimeStationArrival/0/10/%EA%B5%90%EB%8C%80";

/// Application configuration loaded from station-config.toml
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Upstream API configuration
    pub api: ApiConfig,
    /// Polling cadence and active hours
    pub schedule: ScheduleConfig,
    /// Display assets and wiring
    pub display: DisplayConfig,
}

/// Upstream arrival API
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Full GET URL including the API key and station
    pub url: String,
}

/// Polling schedule
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Delay between the end of one cycle and the start of the next
    pub poll_interval_secs: u64,
    /// How often the paused screen re-checks the clock
    pub pause_poll_secs: u64,
    /// First local hour the board is active (inclusive)
    pub active_start_hour: u32,
    /// Local hour the board pauses (exclusive)
    pub active_end_hour: u32,
    /// Fixed offset from UTC used for local time
    pub utc_offset_hours: i32,
    /// Cycles between full panel refreshes; 0 disables them
    pub full_refresh_every: u32,
}

/// Display configuration
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Directory holding the Hangul XBM glyph files
    pub glyph_dir: PathBuf,
    /// E-ink wiring
    pub hardware: HardwareConfig,
}

/// Linux device paths and BCM GPIO numbers for the e-ink panel
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub spi_device: String,
    pub gpio_chip: String,
    pub dc_pin: u32,
    pub rst_pin: u32,
    pub busy_pin: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 20,
            pause_poll_secs: 5,
            active_start_hour: 6,
            active_end_hour: 21,
            utc_offset_hours: 9, // KST
            full_refresh_every: 30,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            glyph_dir: PathBuf::from("assets/glyphs"),
            hardware: HardwareConfig::default(),
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            spi_device: "/dev/spidev0.0".to_string(),
            gpio_chip: "/dev/gpiochip0".to_string(),
            dc_pin: 25,
            rst_pin: 17,
            busy_pin: 24,
        }
    }
}

impl Config {
    pub const DEFAULT_PATH: &'static str = "station-config.toml";

    /// Load configuration from station-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(Self::DEFAULT_PATH)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("Invalid config file format: {}", e);
                    warn!("Using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!(
                    "No config file at {}, using default configuration",
                    path.display()
                );
                Self::default()
            }
        }
    }

    /// Daily active window. An empty or out-of-range window falls back to 6-21.
    pub fn active_hours(&self) -> ActiveHours {
        let start = self.schedule.active_start_hour;
        let end = self.schedule.active_end_hour;
        if start < end && end <= 24 {
            ActiveHours::new(start, end)
        } else {
            warn!(
                "Ignoring active hours {}-{}, using {:?}",
                start,
                end,
                ActiveHours::default()
            );
            ActiveHours::default()
        }
    }

    /// Loop timing derived from the `[schedule]` section.
    pub fn schedule(&self) -> Schedule {
        Schedule {
            active_hours: self.active_hours(),
            poll_interval: Duration::from_secs(self.schedule.poll_interval_secs),
            pause_poll_interval: Duration::from_secs(self.schedule.pause_poll_secs.max(1)),
            full_refresh_every: self.schedule.full_refresh_every,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.url, DEFAULT_API_URL);
        assert_eq!(config.schedule.poll_interval_secs, 20);
        assert_eq!(config.schedule.active_start_hour, 6);
        assert_eq!(config.schedule.active_end_hour, 21);
        assert_eq!(config.schedule.utc_offset_hours, 9);
        assert_eq!(config.display.glyph_dir, PathBuf::from("assets/glyphs"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.api.url, parsed.api.url);
        assert_eq!(config.display.hardware.busy_pin, parsed.display.hardware.busy_pin);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        assert_eq!(config.schedule.poll_interval_secs, 20);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[schedule]\npoll_interval_secs = 45").unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.schedule.poll_interval_secs, 45);
        assert_eq!(config.schedule.active_end_hour, 21);
        assert_eq!(config.api.url, DEFAULT_API_URL);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[schedule\npoll_interval_secs = ").unwrap();

        let config = Config::load_from_path(file.path());
        assert_eq!(config.schedule.poll_interval_secs, 20);
    }

    #[test]
    fn test_empty_window_uses_default_hours() {
        let mut config = Config::default();
        config.schedule.active_start_hour = 22;
        config.schedule.active_end_hour = 5;
        assert_eq!(config.active_hours(), ActiveHours::new(6, 21));

        config.schedule.active_start_hour = 7;
        config.schedule.active_end_hour = 23;
        assert_eq!(config.active_hours(), ActiveHours::new(7, 23));
    }

    #[test]
    fn test_schedule_durations() {
        let schedule = Config::default().schedule();
        assert_eq!(schedule.poll_interval, Duration::from_secs(20));
        assert_eq!(schedule.pause_poll_interval, Duration::from_secs(5));
        assert_eq!(schedule.full_refresh_every, 30);
    }
}
