//! Read-only consumers of per-frame output.
//!
//! A presenter sees the input vector and the vehicle state once per frame and
//! never mutates either. Drawing a scene is left to whatever implements the
//! trait; the crate ships a log-based presenter and a recorder.

use crate::{
    normalizer::InputVector,
    vehicle::{PlanePose, VehicleState},
};
use log::debug;

/// Consumer of per-frame session output
pub trait Presenter {
    fn present(&mut self, frame: u64, input: &InputVector, vehicle: &VehicleState);
}

/// Text rendering of the input arrows, e.g. `<0.30 ( ) ----  ^.`
#[must_use]
pub fn arrows(input: &InputVector) -> String {
    let left = if input.left > 0.0 {
        format!("<{:.2}", input.left)
    } else {
        " ----".to_string()
    };
    let right = if input.right > 0.0 {
        format!("{:.2}>", input.right)
    } else {
        "---- ".to_string()
    };
    let up = if input.up > 0.0 { '^' } else { '.' };
    let down = if input.down > 0.0 { 'v' } else { '.' };
    let center = if input.center > 0.0 { "(o)" } else { "( )" };

    format!("{left} {center} {right} {up}{down}")
}

/// Writes one debug line per frame
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn present(&mut self, frame: u64, input: &InputVector, vehicle: &VehicleState) {
        let body = vehicle.body_pose();
        debug!(
            "frame {frame}: {} | {} theta={:.4} speed={:.2} body=({:.2}, {:.2}) heading={:.3}",
            arrows(input),
            vehicle.control_state(),
            vehicle.theta,
            vehicle.speed,
            body.position.x,
            body.position.y,
            body.heading,
        );
    }
}

/// Snapshot of one presented frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub input: InputVector,
    pub theta: f64,
    pub speed: f64,
    pub radius: f64,
    pub body: PlanePose,
}

/// Keeps every presented frame
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub frames: Vec<FrameSnapshot>,
}

impl RecordingPresenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&FrameSnapshot> {
        self.frames.last()
    }
}

impl Presenter for RecordingPresenter {
    fn present(&mut self, frame: u64, input: &InputVector, vehicle: &VehicleState) {
        self.frames.push(FrameSnapshot {
            frame,
            input: *input,
            theta: vehicle.theta,
            speed: vehicle.speed,
            radius: vehicle.radius,
            body: vehicle.body_pose(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrows_rendering() {
        assert_eq!(arrows(&InputVector::neutral()), " ---- (o) ----  ..");

        let input = InputVector {
            left: 0.3,
            up: 1.0,
            ..InputVector::default()
        };
        assert_eq!(arrows(&input), "<0.30 ( ) ----  ^.");
    }

    #[test]
    fn test_recording_presenter() {
        let mut recorder = RecordingPresenter::new();
        let vehicle = VehicleState::new(50.0);
        recorder.present(1, &InputVector::neutral(), &vehicle);
        recorder.present(2, &InputVector::neutral(), &vehicle);
        assert_eq!(recorder.frames.len(), 2);
        assert_eq!(recorder.last().unwrap().frame, 2);
        assert_eq!(recorder.last().unwrap().radius, 50.0);
    }
}
