use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::proximity::{Thresholds, DEFAULT_DISTANCE_PX, DEFAULT_REL_THRESHOLD};

const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_NETWORK: &str = "resnet18-body";
const DEFAULT_MIN_CONFIDENCE: f32 = 0.15;
const DEFAULT_RESULT_DIR: &str = "result";
const DEFAULT_RECORD_NAME: &str = "violence_realtime";

#[derive(Debug, Deserialize, Default)]
struct ProximityConfigFile {
    thresholds: Option<ThresholdsConfigFile>,
    detection: Option<DetectionConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ThresholdsConfigFile {
    distance: Option<f32>,
    rel_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectionConfigFile {
    backend: Option<String>,
    network: Option<String>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct OutputConfigFile {
    result_dir: Option<PathBuf>,
    record_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProximityConfig {
    /// Absolute distance threshold in pixels.
    pub distance: f32,
    /// Relative threshold (distance / average person height).
    pub rel_threshold: f32,
    pub detection: DetectionSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSettings {
    /// Pose backend name (`stub`, `replay`, `tract`).
    pub backend: String,
    /// Model name or path, passed to model-backed backends.
    pub network: String,
    /// Keypoints and people below this confidence are dropped by the backend.
    pub min_confidence: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub result_dir: PathBuf,
    pub record_name: String,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            distance: DEFAULT_DISTANCE_PX,
            rel_threshold: DEFAULT_REL_THRESHOLD,
            detection: DetectionSettings {
                backend: DEFAULT_BACKEND.to_string(),
                network: DEFAULT_NETWORK.to_string(),
                min_confidence: DEFAULT_MIN_CONFIDENCE,
            },
            output: OutputSettings {
                result_dir: PathBuf::from(DEFAULT_RESULT_DIR),
                record_name: DEFAULT_RECORD_NAME.to_string(),
            },
        }
    }
}

impl ProximityConfig {
    /// Defaults, then the file named by `PROXIMITY_CONFIG`, then env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PROXIMITY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ProximityConfigFile) -> Self {
        let defaults = Self::default();
        let thresholds = file.thresholds.unwrap_or_default();
        let detection = file.detection.unwrap_or_default();
        let output = file.output.unwrap_or_default();
        Self {
            distance: thresholds.distance.unwrap_or(defaults.distance),
            rel_threshold: thresholds.rel_threshold.unwrap_or(defaults.rel_threshold),
            detection: DetectionSettings {
                backend: detection.backend.unwrap_or(defaults.detection.backend),
                network: detection.network.unwrap_or(defaults.detection.network),
                min_confidence: detection
                    .min_confidence
                    .unwrap_or(defaults.detection.min_confidence),
            },
            output: OutputSettings {
                result_dir: output.result_dir.unwrap_or(defaults.output.result_dir),
                record_name: output.record_name.unwrap_or(defaults.output.record_name),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(distance) = env_f32("PROXIMITY_DISTANCE")? {
            self.distance = distance;
        }
        if let Some(rel) = env_f32("PROXIMITY_REL_THRESHOLD")? {
            self.rel_threshold = rel;
        }
        if let Some(conf) = env_f32("PROXIMITY_MIN_CONFIDENCE")? {
            self.detection.min_confidence = conf;
        }
        if let Ok(backend) = std::env::var("PROXIMITY_BACKEND") {
            if !backend.trim().is_empty() {
                self.detection.backend = backend.trim().to_string();
            }
        }
        if let Ok(network) = std::env::var("PROXIMITY_NETWORK") {
            if !network.trim().is_empty() {
                self.detection.network = network;
            }
        }
        if let Ok(dir) = std::env::var("PROXIMITY_RESULT_DIR") {
            if !dir.trim().is_empty() {
                self.output.result_dir = PathBuf::from(dir);
            }
        }
        Ok(())
    }

    /// Check ranges. Call again after applying command-line overrides.
    pub fn validate(&mut self) -> Result<()> {
        self.thresholds()?;
        if !(0.0..=1.0).contains(&self.detection.min_confidence) {
            return Err(anyhow!(
                "min_confidence must be within 0..=1 (got {})",
                self.detection.min_confidence
            ));
        }
        self.detection.backend = self.detection.backend.to_ascii_lowercase();
        if self.detection.backend.is_empty() {
            return Err(anyhow!("pose backend name must not be empty"));
        }
        if self.output.result_dir.as_os_str().is_empty() {
            return Err(anyhow!("result_dir must not be empty"));
        }
        if self.output.record_name.trim().is_empty() {
            return Err(anyhow!("record_name must not be empty"));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> Result<Thresholds> {
        Thresholds::new(self.distance, self.rel_threshold)
    }
}

fn read_config_file(path: &Path) -> Result<ProximityConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<f32>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a number (got '{}')", key, value)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() -> Result<()> {
        let mut cfg = ProximityConfig::from_file(ProximityConfigFile::default());
        cfg.validate()?;
        assert_eq!(cfg, ProximityConfig::default());
        assert_eq!(cfg.thresholds()?, Thresholds::default());
        assert_eq!(cfg.output.result_dir, PathBuf::from("result"));
        Ok(())
    }

    #[test]
    fn toml_sections_are_parsed() -> Result<()> {
        let file: ProximityConfigFile = toml::from_str(
            r#"
            [thresholds]
            distance = 90.0

            [detection]
            backend = "Replay"
            min_confidence = 0.3
            "#,
        )?;
        let mut cfg = ProximityConfig::from_file(file);
        cfg.validate()?;
        assert_eq!(cfg.distance, 90.0);
        assert_eq!(cfg.rel_threshold, DEFAULT_REL_THRESHOLD);
        assert_eq!(cfg.detection.backend, "replay");
        assert_eq!(cfg.detection.min_confidence, 0.3);
        Ok(())
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg = ProximityConfig {
            rel_threshold: 0.0,
            ..ProximityConfig::default()
        };
        assert!(cfg.validate().is_err());

        let mut cfg = ProximityConfig::default();
        cfg.detection.min_confidence = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = ProximityConfig::default();
        cfg.output.record_name = " ".to_string();
        assert!(cfg.validate().is_err());
    }
}
