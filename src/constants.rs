//! Constants used throughout the application

use std::f64::consts::PI;

/// Default frames per second assumption
pub const DEFAULT_FPS: f64 = 60.0;

/// Half-width of the dead zone as a fraction of the frame dimension
pub const DEFAULT_DEAD_ZONE_RATIO: f64 = 0.1;

/// Default preview frame size used to derive the calibrated center
pub const DEFAULT_FRAME_WIDTH: f64 = 250.0;
pub const DEFAULT_FRAME_HEIGHT: f64 = 200.0;

/// Distance between the left and right wheels
pub const AXLE_LENGTH: f64 = 4.0;

/// Distance between the front and rear wheel pivots
pub const WHEEL_BASE: f64 = 4.0;

/// Wheel radius
pub const WHEEL_RADIUS: f64 = 1.5;

/// Maximum front-wheel steer angle (30°)
pub const MAX_STEER_ANGLE: f64 = PI / 6.0;

/// Steer angle change applied per tick while a turn input is held
pub const STEER_STEP: f64 = PI / 252.0;

/// Speed gained per tick while accelerating
pub const THROTTLE_STEP: f64 = 1.0;

/// Speed ceiling
pub const MAX_SPEED: f64 = 5.0;

/// Speed lost per tick while coasting
pub const SPEED_DECAY: f64 = 0.15;

/// Turning radius at scene setup, equal to the pivot's initial offset
pub const INITIAL_RADIUS: f64 = 50.0;

/// Longest measured frame time integrated as-is; longer gaps tick at `DEFAULT_FPS`
pub const MAX_FRAME_TIME_SECS: f64 = 0.1;

/// Steer angles at or below this magnitude snap to zero
pub const STEER_EPSILON: f64 = 1e-8;

/// Body-frame mounting points of the wheels on the ground plane (x, z).
/// The car faces -x; the front axle sits at x = -6.5.
pub const FRONT_AXLE_X: f64 = -6.5;
pub const FRONT_PIVOT_Z: f64 = 2.0;
pub const FRONT_WHEEL_OFFSET_Z: f64 = 1.8;
pub const REAR_WHEEL_Z: f64 = 2.8;

/// Default minimum detection confidence
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Default detection polling interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 16;

/// Frames between periodic status log lines
pub const DEFAULT_STATUS_EVERY: u64 = 60;
