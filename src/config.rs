//! Configuration management for the gesture steering application

use crate::{constants, Error, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Calibration configuration
    pub calibration: CalibrationSettings,

    /// Vehicle geometry and control tuning
    pub vehicle: VehicleSettings,

    /// Detection source configuration
    pub detection: DetectionSettings,

    /// Drive loop configuration
    pub session: SessionSettings,
}

/// Calibration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSettings {
    /// Whether the video feed is mirrored
    pub mirror: bool,

    /// Dead-zone half-width as a fraction of the frame dimension
    pub dead_zone_ratio: f64,

    /// Reference frame width in pixels
    pub frame_width: f64,

    /// Reference frame height in pixels
    pub frame_height: f64,
}

/// Vehicle kinematics parameters.
///
/// Per-tick quantities are tuned against the render frame rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSettings {
    /// Distance between left and right wheels
    pub axle_length: f64,

    /// Distance between front and rear wheel pivots
    pub wheel_base: f64,

    /// Wheel radius
    pub wheel_radius: f64,

    /// Maximum steer angle in radians
    pub max_steer_angle: f64,

    /// Steer angle change per tick in radians
    pub steer_step: f64,

    /// Speed gained per tick while accelerating
    pub throttle_step: f64,

    /// Speed ceiling
    pub max_speed: f64,

    /// Speed lost per tick while coasting
    pub speed_decay: f64,

    /// Turning radius at scene setup
    pub initial_radius: f64,
}

/// Detection source parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    /// Detections below this confidence are discarded (0.0-1.0)
    pub min_confidence: f32,

    /// Delay between detection polls in milliseconds
    pub poll_interval_ms: u64,
}

/// Drive loop parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Fixed render rate the simulator integrates at
    pub target_fps: u32,

    /// Stop after this many frames
    pub max_frames: Option<u64>,

    /// Frames between info-level status lines
    pub status_every: u64,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            mirror: true,
            dead_zone_ratio: constants::DEFAULT_DEAD_ZONE_RATIO,
            frame_width: constants::DEFAULT_FRAME_WIDTH,
            frame_height: constants::DEFAULT_FRAME_HEIGHT,
        }
    }
}

impl Default for VehicleSettings {
    fn default() -> Self {
        Self {
            axle_length: constants::AXLE_LENGTH,
            wheel_base: constants::WHEEL_BASE,
            wheel_radius: constants::WHEEL_RADIUS,
            max_steer_angle: constants::MAX_STEER_ANGLE,
            steer_step: constants::STEER_STEP,
            throttle_step: constants::THROTTLE_STEP,
            max_speed: constants::MAX_SPEED,
            speed_decay: constants::SPEED_DECAY,
            initial_radius: constants::INITIAL_RADIUS,
        }
    }
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            min_confidence: constants::DEFAULT_MIN_CONFIDENCE,
            poll_interval_ms: constants::DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            target_fps: 60,
            max_frames: None,
            status_every: constants::DEFAULT_STATUS_EVERY,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let calibration = &self.calibration;
        if !(calibration.dead_zone_ratio > 0.0 && calibration.dead_zone_ratio < 0.5) {
            return Err(Error::ConfigError(
                "Dead zone ratio must be between 0.0 and 0.5 (exclusive)".to_string(),
            ));
        }
        if calibration.frame_width <= 0.0 || calibration.frame_height <= 0.0 {
            return Err(Error::ConfigError(
                "Frame dimensions must be greater than 0".to_string(),
            ));
        }

        let vehicle = &self.vehicle;
        if vehicle.axle_length <= 0.0 || vehicle.wheel_base <= 0.0 || vehicle.wheel_radius <= 0.0 {
            return Err(Error::ConfigError(
                "Axle length, wheel base and wheel radius must be greater than 0".to_string(),
            ));
        }
        if !(vehicle.max_steer_angle > 0.0 && vehicle.max_steer_angle < FRAC_PI_2) {
            return Err(Error::ConfigError(
                "Max steer angle must be between 0 and pi/2 (exclusive)".to_string(),
            ));
        }
        if vehicle.steer_step <= 0.0 {
            return Err(Error::ConfigError("Steer step must be greater than 0".to_string()));
        }
        if vehicle.throttle_step <= 0.0 || vehicle.max_speed <= 0.0 {
            return Err(Error::ConfigError(
                "Throttle step and max speed must be greater than 0".to_string(),
            ));
        }
        if vehicle.speed_decay < 0.0 {
            return Err(Error::ConfigError("Speed decay must not be negative".to_string()));
        }

        if !(0.0..=1.0).contains(&self.detection.min_confidence) {
            return Err(Error::ConfigError(
                "Minimum confidence must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.session.target_fps == 0 {
            return Err(Error::ConfigError("Target FPS must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Lean Drive Configuration

# Calibration
calibration:
  mirror: true
  dead_zone_ratio: 0.1
  frame_width: 250.0
  frame_height: 200.0

# Vehicle geometry and per-tick tuning (angles in radians)
vehicle:
  axle_length: 4.0
  wheel_base: 4.0
  wheel_radius: 1.5
  throttle_step: 1.0
  max_speed: 5.0
  speed_decay: 0.15
  initial_radius: 50.0

# Detection source
detection:
  min_confidence: 0.5
  poll_interval_ms: 16

# Drive loop
session:
  target_fps: 60
  status_every: 60
"#;
