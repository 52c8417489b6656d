use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Cadence at which the session polls the source for a new frame.
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_quality")]
    pub quality: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Sampling rate the estimator assumes when converting peak spacing to
    /// BPM. Not measured from the camera; a source delivering at a different
    /// rate biases every estimate proportionally.
    #[serde(default = "default_assumed_fps")]
    pub assumed_fps: f64,
    #[serde(default = "default_bpm_min")]
    pub bpm_min: u32,
    #[serde(default = "default_bpm_max")]
    pub bpm_max: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticConfig {
    #[serde(default = "default_synthetic_bpm")]
    pub bpm: f64,
    #[serde(default = "default_baseline")]
    pub baseline: f64,
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            url: default_url(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            quality: default_quality(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            min_samples: default_min_samples(),
            interval_ms: default_interval_ms(),
            assumed_fps: default_assumed_fps(),
            bpm_min: default_bpm_min(),
            bpm_max: default_bpm_max(),
        }
    }
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bpm: default_synthetic_bpm(),
            baseline: default_baseline(),
            amplitude: default_amplitude(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub const CAMERA_MODES: &[&str] = &["mjpeg", "polling", "synthetic"];

/// Frame rates accepted for `camera.fps` and `analysis.assumed_fps`.
pub const FPS_RANGE: RangeInclusive<f64> = 1.0..=240.0;

impl CameraConfig {
    /// Period between frame polls. A rate outside [`FPS_RANGE`] (including
    /// NaN and infinity) falls back to the default 30 fps.
    pub fn frame_interval(&self) -> Duration {
        let fps = if FPS_RANGE.contains(&self.fps) {
            self.fps
        } else {
            default_fps()
        };
        Duration::from_secs_f64(1.0 / fps)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        let config = Self::parse(&content)?;
        debug!(path = %path.display(), mode = config.camera.mode, "config loaded");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !CAMERA_MODES.contains(&self.camera.mode.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unknown camera mode '{}', expected one of {:?}",
                self.camera.mode, CAMERA_MODES
            )));
        }
        if !FPS_RANGE.contains(&self.camera.fps) {
            return Err(ConfigError::Invalid(format!(
                "camera.fps must be within {:?}, got {}",
                FPS_RANGE, self.camera.fps
            )));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "camera size must be non-zero, got {}x{}",
                self.camera.width, self.camera.height
            )));
        }
        let analysis = &self.analysis;
        if !FPS_RANGE.contains(&analysis.assumed_fps) {
            return Err(ConfigError::Invalid(format!(
                "analysis.assumed_fps must be within {:?}, got {}",
                FPS_RANGE, analysis.assumed_fps
            )));
        }
        if analysis.buffer_capacity < 3 {
            return Err(ConfigError::Invalid(format!(
                "analysis.buffer_capacity must be at least 3, got {}",
                analysis.buffer_capacity
            )));
        }
        // The analysis gate needs more than `min_samples` buffered.
        if analysis.buffer_capacity <= analysis.min_samples {
            return Err(ConfigError::Invalid(format!(
                "analysis.buffer_capacity ({}) must exceed analysis.min_samples ({})",
                analysis.buffer_capacity, analysis.min_samples
            )));
        }
        if analysis.bpm_min >= analysis.bpm_max {
            return Err(ConfigError::Invalid(format!(
                "analysis.bpm_min ({}) must be below analysis.bpm_max ({})",
                analysis.bpm_min, analysis.bpm_max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_mode() -> String {
    "mjpeg".into()
}
fn default_url() -> String {
    "http://127.0.0.1:8080/stream".into()
}
fn default_width() -> u32 {
    640
}
fn default_height() -> u32 {
    480
}
fn default_fps() -> f64 {
    30.0
}
fn default_quality() -> u32 {
    80
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_buffer_capacity() -> usize {
    256
}
fn default_min_samples() -> usize {
    60
}
fn default_interval_ms() -> u64 {
    2000
}
fn default_assumed_fps() -> f64 {
    30.0
}
fn default_bpm_min() -> u32 {
    40
}
fn default_bpm_max() -> u32 {
    200
}
fn default_synthetic_bpm() -> f64 {
    72.0
}
fn default_baseline() -> f64 {
    128.0
}
fn default_amplitude() -> f64 {
    40.0
}
fn default_port() -> u16 {
    8090
}
fn default_log_level() -> String {
    "info".into()
}
