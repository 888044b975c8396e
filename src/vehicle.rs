//! Vehicle kinematics simulator.
//!
//! A discrete-time bicycle-style steering model advanced once per render
//! tick. The car body hangs off a rotation pivot placed at the current
//! turning center: turning rotates the pivot, driving straight translates it.
//! When the steer angle changes, the pivot slides along its local z axis to
//! the new turning center while the body slides the opposite way, so the
//! body's world position never jumps.
//!
//! Poses live on the ground plane as `(x, z)` coordinates of a left-handed,
//! y-up world. The car faces its local `-x` direction.

use crate::{
    config::VehicleSettings,
    constants::{
        DEFAULT_FPS, FRONT_AXLE_X, FRONT_PIVOT_Z, FRONT_WHEEL_OFFSET_Z, REAR_WHEEL_Z, STEER_EPSILON,
    },
    keyboard::KeyboardState,
    normalizer::InputVector,
};
use log::debug;
use nalgebra::{Point2, Rotation2, Vector2};
use std::fmt;

/// Position and heading on the ground plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanePose {
    /// `(x, z)` world position
    pub position: Point2<f64>,
    /// Rotation about the world up axis in radians
    pub heading: f64,
}

impl PlanePose {
    #[must_use]
    pub fn new(x: f64, z: f64, heading: f64) -> Self {
        Self {
            position: Point2::new(x, z),
            heading,
        }
    }

    /// Local-to-world rotation; positive headings turn `-x` towards `+z`
    #[must_use]
    pub fn rotation(&self) -> Rotation2<f64> {
        Rotation2::new(-self.heading)
    }

    /// Map a point from this pose's local frame to the world
    #[must_use]
    pub fn transform_point(&self, local: &Point2<f64>) -> Point2<f64> {
        self.position + self.rotation() * local.coords
    }

    /// Move along the pose's own axes
    pub fn translate_local(&mut self, delta: Vector2<f64>) {
        self.position += self.rotation() * delta;
    }
}

/// Wheel positions, named relative to the initial turning center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wheel {
    FrontInner,
    FrontOuter,
    RearInner,
    RearOuter,
}

impl Wheel {
    pub const ALL: [Self; 4] = [Self::FrontInner, Self::FrontOuter, Self::RearInner, Self::RearOuter];

    const fn index(self) -> usize {
        match self {
            Self::FrontInner => 0,
            Self::FrontOuter => 1,
            Self::RearInner => 2,
            Self::RearOuter => 3,
        }
    }

    #[must_use]
    pub const fn is_front(self) -> bool {
        matches!(self, Self::FrontInner | Self::FrontOuter)
    }
}

/// Mounting and orientation of one wheel in the body frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelState {
    /// Steering hub in the body frame
    pub hub: Point2<f64>,
    /// Lateral offset of the wheel center from its hub
    pub offset_z: f64,
    /// Steer angle about the hub
    pub steer: f64,
    /// Accumulated rolling angle
    pub spin: f64,
}

impl WheelState {
    fn mounted(hub_x: f64, hub_z: f64, offset_z: f64) -> Self {
        Self {
            hub: Point2::new(hub_x, hub_z),
            offset_z,
            steer: 0.0,
            spin: 0.0,
        }
    }

    /// Wheel center in the body frame
    #[must_use]
    pub fn center(&self) -> Point2<f64> {
        self.hub + Rotation2::new(-self.steer) * Vector2::new(0.0, self.offset_z)
    }
}

/// Which way the car is currently steering, read from the steer angle sign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlState {
    Straight,
    TurningLeft,
    TurningRight,
}

impl ControlState {
    #[must_use]
    pub fn from_theta(theta: f64) -> Self {
        if theta < 0.0 {
            Self::TurningLeft
        } else if theta > 0.0 {
            Self::TurningRight
        } else {
            Self::Straight
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Straight => f.write_str("straight"),
            Self::TurningLeft => f.write_str("turning-left"),
            Self::TurningRight => f.write_str("turning-right"),
        }
    }
}

/// Control inputs consumed by one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveControls {
    pub accelerate: bool,
    pub steer_left: bool,
    pub steer_right: bool,
}

impl DriveControls {
    /// Combine the gesture input with the direct driving keys
    #[must_use]
    pub fn from_inputs(input: &InputVector, keys: &KeyboardState) -> Self {
        Self {
            accelerate: input.up > 0.0 || keys.accelerate_key(),
            steer_left: input.left > 0.0 || keys.steer_left_key(),
            steer_right: input.right > 0.0 || keys.steer_right_key(),
        }
    }
}

/// Kinematic state, mutated only by [`Simulator::tick`]
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    /// Front-wheel steer angle
    pub theta: f64,
    /// Forward speed per second of render time
    pub speed: f64,
    /// Signed turning radius; zero when driving straight after a snap
    pub radius: f64,
    /// Rotation pivot carrying the body
    pub pivot: PlanePose,
    wheels: [WheelState; 4],
}

impl VehicleState {
    /// Scene-setup state: straight wheels, stopped, pivot at the initial radius
    #[must_use]
    pub fn new(initial_radius: f64) -> Self {
        Self {
            theta: 0.0,
            speed: 0.0,
            radius: initial_radius,
            pivot: PlanePose::new(0.0, initial_radius, 0.0),
            wheels: [
                WheelState::mounted(FRONT_AXLE_X, -FRONT_PIVOT_Z, -FRONT_WHEEL_OFFSET_Z),
                WheelState::mounted(FRONT_AXLE_X, FRONT_PIVOT_Z, FRONT_WHEEL_OFFSET_Z),
                WheelState::mounted(0.0, -REAR_WHEEL_Z, 0.0),
                WheelState::mounted(0.0, REAR_WHEEL_Z, 0.0),
            ],
        }
    }

    /// World pose of the car body
    #[must_use]
    pub fn body_pose(&self) -> PlanePose {
        PlanePose {
            position: self.pivot.transform_point(&Point2::new(0.0, -self.radius)),
            heading: self.pivot.heading,
        }
    }

    #[must_use]
    pub const fn wheel(&self, wheel: Wheel) -> &WheelState {
        &self.wheels[wheel.index()]
    }

    /// World position of a wheel center
    #[must_use]
    pub fn wheel_position(&self, wheel: Wheel) -> Point2<f64> {
        self.body_pose().transform_point(&self.wheel(wheel).center())
    }

    #[must_use]
    pub fn control_state(&self) -> ControlState {
        ControlState::from_theta(self.theta)
    }

    fn wheel_mut(&mut self, wheel: Wheel) -> &mut WheelState {
        &mut self.wheels[wheel.index()]
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub control_state: ControlState,
    /// The steer angle changed this tick
    pub steered: bool,
    /// The steer angle snapped to zero this tick
    pub snapped: bool,
    /// Pivot rotation applied this tick
    pub phi: f64,
    /// Straight-line distance applied this tick
    pub distance: f64,
}

/// Integrates the vehicle state from control inputs
#[derive(Debug, Clone)]
pub struct Simulator {
    params: VehicleSettings,
    state: VehicleState,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new(VehicleSettings::default())
    }
}

impl Simulator {
    #[must_use]
    pub fn new(params: VehicleSettings) -> Self {
        let state = VehicleState::new(params.initial_radius);
        Self { params, state }
    }

    pub const fn state(&self) -> &VehicleState {
        &self.state
    }

    pub const fn params(&self) -> &VehicleSettings {
        &self.params
    }

    /// Return to the scene-setup state
    pub fn reset(&mut self) {
        self.state = VehicleState::new(self.params.initial_radius);
    }

    /// Advance one render tick at the given frame rate
    pub fn tick(&mut self, controls: DriveControls, fps: f64) -> TickReport {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { DEFAULT_FPS };

        self.integrate_throttle(controls.accelerate);

        let max = self.params.max_steer_angle;
        let mut steered = false;
        let mut snapped = false;
        if controls.steer_left && self.state.theta > -max {
            snapped = self.steer(-self.params.steer_step);
            steered = true;
        }
        if !steered && controls.steer_right && self.state.theta < max {
            snapped = self.steer(self.params.steer_step);
            steered = true;
        }

        let (phi, distance) = self.integrate_pose(fps);

        TickReport {
            control_state: self.state.control_state(),
            steered,
            snapped,
            phi,
            distance,
        }
    }

    fn integrate_throttle(&mut self, accelerate: bool) {
        let state = &mut self.state;
        if accelerate {
            if state.speed < self.params.max_speed {
                state.speed = (state.speed + self.params.throttle_step).min(self.params.max_speed);
            }
        } else if state.speed > self.params.speed_decay {
            state.speed -= self.params.speed_decay;
        } else {
            state.speed = 0.0;
        }
    }

    /// Change the steer angle and move the pivot to the new turning center.
    /// Returns whether the angle snapped to zero.
    fn steer(&mut self, delta: f64) -> bool {
        let max = self.params.max_steer_angle;
        let state = &mut self.state;
        state.theta = (state.theta + delta).clamp(-max, max);

        let mut snapped = false;
        let new_radius = if state.theta.abs() > STEER_EPSILON {
            self.params.axle_length / 2.0 + self.params.wheel_base / state.theta.tan()
        } else {
            debug!("Steer angle {:e} snapped to zero", state.theta);
            state.theta = 0.0;
            snapped = true;
            0.0
        };

        state.pivot.translate_local(Vector2::new(0.0, new_radius - state.radius));
        state.radius = new_radius;

        let theta = state.theta;
        for wheel in Wheel::ALL.into_iter().filter(|w| w.is_front()) {
            state.wheel_mut(wheel).steer = theta;
        }

        snapped
    }

    fn integrate_pose(&mut self, fps: f64) -> (f64, f64) {
        let speed = self.state.speed;
        if speed <= 0.0 {
            return (0.0, 0.0);
        }

        let r = self.params.wheel_radius;
        let axle = self.params.axle_length;
        let base = self.params.wheel_base;
        let state = &mut self.state;
        let radius = state.radius;

        if state.theta != 0.0 && radius.abs() > STEER_EPSILON {
            let phi = speed / (radius * fps);
            state.pivot.heading += phi;

            state.wheel_mut(Wheel::RearInner).spin += speed / (r * fps);
            state.wheel_mut(Wheel::RearOuter).spin += speed * (radius + axle) / (r * fps);
            state.wheel_mut(Wheel::FrontInner).spin += speed * radius.hypot(base) / (r * fps);
            state.wheel_mut(Wheel::FrontOuter).spin += speed * (radius + axle).hypot(base) / (r * fps);

            (phi, 0.0)
        } else {
            let distance = speed / fps;
            state.pivot.translate_local(Vector2::new(-distance, 0.0));

            let psi = speed / (r * fps);
            for wheel in Wheel::ALL {
                state.wheel_mut(wheel).spin += psi;
            }

            (0.0, distance)
        }
    }
}
