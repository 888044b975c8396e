//! Input normalizer.
//!
//! Maps the current detection, the calibrated references and the keyboard
//! snapshot to an [`InputVector`]. Pure: the same inputs always give the same
//! output and nothing is remembered between frames.
//!
//! The horizontal axis yields continuous lean magnitudes with optional
//! mirroring; the vertical axis yields binary up/down flags, matching the
//! binary throttle of the simulator.

use crate::{calibration::CalibrationConfig, detection::Detection, keyboard::KeyboardState};
use serde::{Deserialize, Serialize};

/// Directional input for one frame, each component in `[0, 1]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputVector {
    pub left: f64,
    pub right: f64,
    pub up: f64,
    pub down: f64,
    pub center: f64,
}

impl InputVector {
    /// Centered, no direction
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            left: 0.0,
            right: 0.0,
            up: 0.0,
            down: 0.0,
            center: 1.0,
        }
    }
}

/// Horizontal part of the vector
#[derive(Debug, Clone, Copy, PartialEq)]
struct XInputs {
    left: f64,
    right: f64,
    center: f64,
}

impl XInputs {
    const CENTERED: Self = Self {
        left: 0.0,
        right: 0.0,
        center: 1.0,
    };
}

fn in_range(range: (f64, f64), value: f64) -> bool {
    value >= range.0 && range.1 >= value
}

fn x_inputs(detection: Option<&Detection>, config: &CalibrationConfig, keys: &KeyboardState) -> XInputs {
    if keys.arrow_left() || keys.arrow_right() {
        let left = if keys.arrow_left() { 1.0 } else { 0.0 };
        let right = if keys.arrow_right() { 1.0 } else { 0.0 };
        return XInputs {
            left,
            right,
            center: 0.0,
        };
    }

    if !config.is_calibrated() {
        return XInputs::CENTERED;
    }
    let Some(x_center) = detection.map(|d| d.bounding_box.center_x()) else {
        return XInputs::CENTERED;
    };
    if in_range(config.x_center_range, x_center) {
        return XInputs::CENTERED;
    }

    let (lower, upper) = config.x_center_range;
    let left_lean = if x_center < lower {
        ((config.center - x_center) / config.center).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let right_lean = if x_center > upper {
        ((x_center - config.center) / config.center).clamp(0.0, 1.0)
    } else {
        0.0
    };

    // A front-facing camera shows the user's physical left on the image's right
    let (left, right) = if config.mirror {
        (right_lean, left_lean)
    } else {
        (left_lean, right_lean)
    };

    XInputs {
        left,
        right,
        center: 0.0,
    }
}

fn y_inputs(detection: Option<&Detection>, config: &CalibrationConfig, keys: &KeyboardState) -> (f64, f64) {
    let y_center = if config.is_calibrated() {
        detection.map(|d| d.bounding_box.center_y())
    } else {
        None
    };
    let (lower, upper) = config.y_center_range;

    let cam_up = y_center.is_some_and(|y| y < lower);
    let cam_down = y_center.is_some_and(|y| y > upper);

    let up = if cam_up || keys.arrow_up() { 1.0 } else { 0.0 };
    let down = if cam_down || keys.arrow_down() { 1.0 } else { 0.0 };
    (up, down)
}

/// Compute the input vector for one frame.
///
/// Held left/right arrows override the camera on the horizontal axis;
/// up/down arrows add to the camera on the vertical axis. A missing
/// detection or an uncalibrated config reads as centered.
#[must_use]
pub fn normalize(detection: Option<&Detection>, config: &CalibrationConfig, keys: &KeyboardState) -> InputVector {
    let (up, down) = y_inputs(detection, config, keys);
    let x = x_inputs(detection, config, keys);

    InputVector {
        left: x.left,
        right: x.right,
        up,
        down,
        center: x.center,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{detection::BoundingBox, keyboard::Key};

    fn config(mirror: bool) -> CalibrationConfig {
        CalibrationConfig {
            center: 100.0,
            center_y: 50.0,
            width: 200.0,
            height: 100.0,
            x_center_range: (90.0, 110.0),
            y_center_range: (40.0, 60.0),
            ..CalibrationConfig::new(mirror)
        }
    }

    fn at(x_center: f64, y_center: f64) -> Detection {
        Detection::new(BoundingBox::new(x_center - 10.0, y_center - 10.0, 20.0, 20.0), 0.9)
    }

    #[test]
    fn test_left_lean_unmirrored() {
        let detection = at(70.0, 50.0);
        let input = normalize(Some(&detection), &config(false), &KeyboardState::new());
        assert!((input.left - 0.3).abs() < 1e-12);
        assert_eq!(input.right, 0.0);
        assert_eq!(input.center, 0.0);
    }

    #[test]
    fn test_left_lean_mirrored() {
        let detection = at(70.0, 50.0);
        let input = normalize(Some(&detection), &config(true), &KeyboardState::new());
        assert_eq!(input.left, 0.0);
        assert!((input.right - 0.3).abs() < 1e-12);
        assert_eq!(input.center, 0.0);
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        for x in [90.0, 100.0, 110.0] {
            let detection = at(x, 50.0);
            let input = normalize(Some(&detection), &config(false), &KeyboardState::new());
            assert_eq!(input, InputVector::neutral());
        }
    }

    #[test]
    fn test_lean_is_clamped() {
        let detection = at(320.0, 50.0);
        let input = normalize(Some(&detection), &config(false), &KeyboardState::new());
        assert_eq!(input.right, 1.0);
    }

    #[test]
    fn test_keyboard_overrides_camera_x() {
        let mut keys = KeyboardState::new();
        keys.press(Key::ArrowRight);
        let detection = at(20.0, 50.0);
        let input = normalize(Some(&detection), &config(false), &keys);
        assert_eq!((input.left, input.right, input.center), (0.0, 1.0, 0.0));
    }

    #[test]
    fn test_vertical_is_binary() {
        let keys = KeyboardState::new();
        let high = at(100.0, 20.0);
        let input = normalize(Some(&high), &config(false), &keys);
        assert_eq!((input.up, input.down), (1.0, 0.0));

        let low = at(100.0, 95.0);
        let input = normalize(Some(&low), &config(false), &keys);
        assert_eq!((input.up, input.down), (0.0, 1.0));
    }

    #[test]
    fn test_uncalibrated_is_neutral() {
        let detection = at(10.0, 10.0);
        let input = normalize(Some(&detection), &CalibrationConfig::default(), &KeyboardState::new());
        assert_eq!(input, InputVector::neutral());
    }
}
