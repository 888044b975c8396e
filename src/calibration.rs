//! Calibration engine.
//!
//! Sequences the operator through reference-pose sampling (center, lean left,
//! lean right, brake, gas) and derives the dead zones the normalizer uses.
//! The protocol is strictly linear: each step is accepted only in the status
//! that expects it and advances the status by exactly one position.

use crate::{
    constants::DEFAULT_DEAD_ZONE_RATIO,
    detection::{primary, Detection},
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session state of the calibration protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CalibrationStatus {
    /// Unrecoverable session failure
    Error,
    /// Nothing requested yet
    Initial,
    /// Camera access requested
    Pending,
    /// Camera access granted, center sample expected
    Accepted,
    /// Lean-left sample expected
    ConfigLeft,
    /// Lean-right sample expected
    ConfigRight,
    /// Brake sample expected
    ConfigBrake,
    /// Gas sample expected
    ConfigGas,
    /// All references recorded
    ConfigComplete,
}

impl CalibrationStatus {
    /// Following status in the linear protocol
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Error => Self::Error,
            Self::Initial => Self::Pending,
            Self::Pending => Self::Accepted,
            Self::Accepted => Self::ConfigLeft,
            Self::ConfigLeft => Self::ConfigRight,
            Self::ConfigRight => Self::ConfigBrake,
            Self::ConfigBrake => Self::ConfigGas,
            Self::ConfigGas | Self::ConfigComplete => Self::ConfigComplete,
        }
    }

    /// Whether a reference sample is expected in this status
    #[must_use]
    pub const fn expects_sample(self) -> bool {
        matches!(
            self,
            Self::Accepted | Self::ConfigLeft | Self::ConfigRight | Self::ConfigBrake | Self::ConfigGas
        )
    }

    /// Operator instruction for the pose sampled in this status
    #[must_use]
    pub const fn instruction(self) -> &'static str {
        match self {
            Self::Accepted => "Sit centered and look straight ahead",
            Self::ConfigLeft => "Lean left",
            Self::ConfigRight => "Lean right",
            Self::ConfigBrake => "Look down to brake",
            Self::ConfigGas => "Look up to accelerate",
            Self::ConfigComplete => "Calibration complete",
            Self::Error => "Calibration failed",
            Self::Initial | Self::Pending => "Waiting for camera",
        }
    }
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "ERROR",
            Self::Initial => "INITIAL",
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::ConfigLeft => "CONFIG_LEFT",
            Self::ConfigRight => "CONFIG_RIGHT",
            Self::ConfigBrake => "CONFIG_BRAKE",
            Self::ConfigGas => "CONFIG_GAS",
            Self::ConfigComplete => "CONFIG_COMPLETE",
        };
        f.write_str(name)
    }
}

/// Calibrated references and dead zones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Horizontal reference in pixels
    pub center: f64,
    /// Vertical reference in pixels
    pub center_y: f64,
    /// Reference frame width
    pub width: f64,
    /// Reference frame height
    pub height: f64,
    /// Inclusive horizontal dead zone
    pub x_center_range: (f64, f64),
    /// Inclusive vertical dead zone
    pub y_center_range: (f64, f64),
    /// Whether the video feed is mirrored
    pub mirror: bool,
    /// Lean-left reference (horizontal bbox center)
    pub left: f64,
    /// Lean-right reference (horizontal bbox center)
    pub right: f64,
    /// Brake reference (vertical bbox center)
    pub up: f64,
    /// Gas reference (vertical bbox center)
    pub down: f64,
}

impl CalibrationConfig {
    /// Uncalibrated configuration
    #[must_use]
    pub const fn new(mirror: bool) -> Self {
        Self {
            center: 0.0,
            center_y: 0.0,
            width: 0.0,
            height: 0.0,
            x_center_range: (0.0, 0.0),
            y_center_range: (0.0, 0.0),
            mirror,
            left: 0.0,
            right: 0.0,
            up: 0.0,
            down: 0.0,
        }
    }

    /// Whether a horizontal center reference has been set
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.center != 0.0
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self::new(true)
    }
}

fn usable_x(detections: &[Detection]) -> Option<f64> {
    primary(detections).map(|d| d.bounding_box.center_x())
}

fn usable_y(detections: &[Detection]) -> Option<f64> {
    primary(detections).map(|d| d.bounding_box.center_y())
}

/// Owner of the calibration status and configuration
#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    status: CalibrationStatus,
    config: CalibrationConfig,
    dead_zone_ratio: f64,
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new(true)
    }
}

impl CalibrationEngine {
    #[must_use]
    pub fn new(mirror: bool) -> Self {
        Self::with_dead_zone(mirror, DEFAULT_DEAD_ZONE_RATIO)
    }

    #[must_use]
    pub fn with_dead_zone(mirror: bool, dead_zone_ratio: f64) -> Self {
        Self {
            status: CalibrationStatus::Initial,
            config: CalibrationConfig::new(mirror),
            dead_zone_ratio,
        }
    }

    pub const fn status(&self) -> CalibrationStatus {
        self.status
    }

    pub const fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    pub fn is_complete(&self) -> bool {
        self.status == CalibrationStatus::ConfigComplete
    }

    /// Force a status; used for camera permission and fatal errors
    pub fn set_status(&mut self, status: CalibrationStatus) {
        if status != self.status {
            info!("Calibration status {} -> {}", self.status, status);
        }
        self.status = status;
    }

    /// Derive the center references and dead zones from frame dimensions
    pub fn set_center(&mut self, width: f64, height: f64) {
        let x_center = width / 2.0;
        let y_center = height / 2.0;
        let x_margin = width * self.dead_zone_ratio;
        let y_margin = height * self.dead_zone_ratio;

        let config = &mut self.config;
        config.center = x_center;
        config.center_y = y_center;
        config.width = width;
        config.height = height;
        config.x_center_range = (x_center - x_margin, x_center + x_margin);
        config.y_center_range = (y_center - y_margin, y_center + y_margin);

        debug!(
            "Center set to ({x_center}, {y_center}), dead zones x={:?} y={:?}",
            config.x_center_range, config.y_center_range
        );
    }

    fn accepts(&self, expected: CalibrationStatus, step: &str) -> bool {
        if self.status == expected {
            true
        } else {
            warn!("Ignoring {step} sample while status is {}", self.status);
            false
        }
    }

    fn advance(&mut self) {
        let next = self.status.next();
        self.set_status(next);
    }

    /// Record the center pose.
    ///
    /// The references come from the frame dimensions, not from the detection;
    /// the detection only proves the subject is visible.
    pub fn config_center(&mut self, detections: &[Detection], width: f64, height: f64) -> bool {
        if !self.accepts(CalibrationStatus::Accepted, "center") {
            return false;
        }
        if usable_x(detections).is_none() {
            warn!("No usable detection for center sample");
            return false;
        }
        self.set_center(width, height);
        self.advance();
        true
    }

    pub fn config_left(&mut self, detections: &[Detection]) -> bool {
        if !self.accepts(CalibrationStatus::ConfigLeft, "left") {
            return false;
        }
        let Some(x) = usable_x(detections) else {
            warn!("No usable detection for left sample");
            return false;
        };
        self.config.left = x;
        info!("Left reference recorded at x={x}");
        self.advance();
        true
    }

    pub fn config_right(&mut self, detections: &[Detection]) -> bool {
        if !self.accepts(CalibrationStatus::ConfigRight, "right") {
            return false;
        }
        let Some(x) = usable_x(detections) else {
            warn!("No usable detection for right sample");
            return false;
        };
        self.config.right = x;
        info!("Right reference recorded at x={x}");
        self.advance();
        true
    }

    pub fn config_brake(&mut self, detections: &[Detection]) -> bool {
        if !self.accepts(CalibrationStatus::ConfigBrake, "brake") {
            return false;
        }
        let Some(y) = usable_y(detections) else {
            warn!("No usable detection for brake sample");
            return false;
        };
        self.config.up = y;
        info!("Brake reference recorded at y={y}");
        self.advance();
        true
    }

    pub fn config_gas(&mut self, detections: &[Detection]) -> bool {
        if !self.accepts(CalibrationStatus::ConfigGas, "gas") {
            return false;
        }
        let Some(y) = usable_y(detections) else {
            warn!("No usable detection for gas sample");
            return false;
        };
        self.config.down = y;
        info!("Gas reference recorded at y={y}");
        self.advance();
        true
    }

    /// Feed one operator-triggered sample to whichever step is expected
    pub fn sample(&mut self, detections: &[Detection], width: f64, height: f64) -> bool {
        match self.status {
            CalibrationStatus::Accepted => self.config_center(detections, width, height),
            CalibrationStatus::ConfigLeft => self.config_left(detections),
            CalibrationStatus::ConfigRight => self.config_right(detections),
            CalibrationStatus::ConfigBrake => self.config_brake(detections),
            CalibrationStatus::ConfigGas => self.config_gas(detections),
            status => {
                warn!("No calibration sample expected in status {status}");
                false
            }
        }
    }

    /// Run all five steps against one still frame.
    ///
    /// A single frame cannot show five distinct poses, so this only suits
    /// fixtures and demos; interactive sessions sample each pose separately.
    pub fn calibrate_single_frame(&mut self, detections: &[Detection], width: f64, height: f64) -> bool {
        if usable_x(detections).is_none() {
            return false;
        }
        if matches!(self.status, CalibrationStatus::Initial | CalibrationStatus::Pending) {
            self.set_status(CalibrationStatus::Accepted);
        }
        self.config_center(detections, width, height)
            && self.config_left(detections)
            && self.config_right(detections)
            && self.config_brake(detections)
            && self.config_gas(detections)
    }

    /// Discard recorded references and restart at the center sample.
    /// `ERROR` is terminal and cannot be recalibrated.
    pub fn recalibrate(&mut self) -> bool {
        if self.status == CalibrationStatus::Error {
            warn!("Cannot recalibrate after a session error");
            return false;
        }
        let mirror = self.config.mirror;
        self.config = CalibrationConfig::new(mirror);
        self.set_status(CalibrationStatus::Accepted);
        true
    }
}
