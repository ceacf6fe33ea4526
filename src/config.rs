use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::geo::angular_distance;

pub const CONFIG_FILE: &str = "impact-sim.ron";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Simulator settings, loaded from `impact-sim.ron` in the working
/// directory at startup. Every field is optional in the file; missing ones
/// take the default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Name shown in the header for the launch site.
    pub hq_name: String,
    /// Launch site longitude (degrees).
    pub hq_lon: f64,
    /// Launch site latitude (degrees).
    pub hq_lat: f64,
    /// Flight time floor in milliseconds.
    pub flight_base_ms: u64,
    /// Extra flight time per radian of great-circle distance.
    pub flight_ms_per_radian: u64,
    /// TopoJSON world boundaries, fetched once when nothing local is found.
    pub world_url: String,
    /// Directory searched for local boundary files (and where the download is cached).
    pub data_dir: PathBuf,
    /// Diagnostic log file. The terminal belongs to the UI.
    pub log_file: PathBuf,
    /// Base URL of the text-generation API.
    pub report_endpoint: String,
    /// Text-generation model name.
    pub report_model: String,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hq_name: "WASHINGTON DC".to_string(),
            hq_lon: -77.0369,
            hq_lat: 38.9072,
            flight_base_ms: 1500,
            flight_ms_per_radian: 2000,
            world_url: "https://cdn.jsdelivr.net/npm/world-atlas@2/countries-110m.json".to_string(),
            data_dir: PathBuf::from("data"),
            log_file: PathBuf::from("impact-sim.log"),
            report_endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            report_model: "gemini-3-flash-preview".to_string(),
        }
    }
}

impl SimConfig {
    /// Read a config file. `Ok(None)` when the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(data) => Ok(Some(ron::from_str(&data)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Default location of the config file
    pub fn path() -> PathBuf {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(CONFIG_FILE)
    }

    /// API key for the report service. Only ever read from the environment.
    pub fn api_key() -> Option<String> {
        std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .ok()
    }

    /// Launch site as (lon, lat)
    pub fn hq(&self) -> (f64, f64) {
        (self.hq_lon, self.hq_lat)
    }

    /// Flight time grows with great-circle distance from HQ
    pub fn flight_duration(&self, target: (f64, f64)) -> Duration {
        let radians = angular_distance(self.hq(), target);
        let ms = self.flight_base_ms as f64 + radians * self.flight_ms_per_radian as f64;
        Duration::from_secs_f64(ms / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: SimConfig = ron::from_str("(hq_name: \"NORAD\", flight_base_ms: 900)").unwrap();
        assert_eq!(config.hq_name, "NORAD");
        assert_eq!(config.flight_base_ms, 900);
        assert_eq!(config.flight_ms_per_radian, 2000);
        assert_eq!(config.hq(), (-77.0369, 38.9072));
    }

    #[test]
    fn test_missing_file_is_none() {
        let path = Path::new("definitely/not/here/impact-sim.ron");
        assert!(matches!(SimConfig::read(path), Ok(None)));
    }

    #[test]
    fn test_unreadable_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("impact-sim-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let binary = dir.join("binary.ron");
        std::fs::write(&binary, [0xff, 0xfe, b'(', b')']).unwrap();
        assert!(matches!(SimConfig::read(&binary), Err(ConfigError::Io(_))));

        // A directory where the file should be
        assert!(matches!(SimConfig::read(&dir), Err(ConfigError::Io(_))));

        let broken = dir.join("broken.ron");
        std::fs::write(&broken, "(hq_lon: \"west\")").unwrap();
        assert!(matches!(SimConfig::read(&broken), Err(ConfigError::Parse(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_flight_duration_grows_with_distance() {
        let config = SimConfig::default();
        let at_hq = config.flight_duration(config.hq());
        assert_eq!(at_hq.as_millis(), 1500);

        let london = config.flight_duration((-0.1, 51.5));
        let tokyo = config.flight_duration((139.7, 35.7));
        assert!(london > at_hq);
        assert!(tokyo > london);
        // ~0.926 rad to London
        assert!((london.as_millis() as i64 - 3352).abs() <= 2);
    }
}
