//! Gesture steering library: drive a simulated car by leaning and tilting
//! your head in front of a webcam.
//!
//! The pipeline consists of:
//! 1. A detection source yielding face bounding boxes per frame
//! 2. A calibration engine recording reference poses and dead zones
//! 3. An input normalizer mapping detections to directional inputs
//! 4. A kinematics simulator turning those inputs into car motion
//!
//! # Examples
//!
//! ## Normalizing a Detection
//!
//! ```
//! use lean_drive::{
//!     calibration::CalibrationEngine,
//!     detection::{BoundingBox, Detection},
//!     keyboard::KeyboardState,
//!     normalizer::normalize,
//! };
//!
//! let mut engine = CalibrationEngine::new(false);
//! let still = vec![Detection::new(BoundingBox::new(105.0, 80.0, 40.0, 40.0), 0.9)];
//! assert!(engine.calibrate_single_frame(&still, 250.0, 200.0));
//!
//! // Face center at x = 70, well left of the dead zone around 125
//! let leaning = Detection::new(BoundingBox::new(50.0, 80.0, 40.0, 40.0), 0.9);
//! let input = normalize(Some(&leaning), engine.config(), &KeyboardState::new());
//! assert!(input.left > 0.0);
//! assert_eq!(input.right, 0.0);
//! ```
//!
//! ## Driving the Simulator
//!
//! ```
//! use lean_drive::vehicle::{DriveControls, Simulator};
//!
//! let mut simulator = Simulator::default();
//! let controls = DriveControls { accelerate: true, steer_left: true, steer_right: false };
//! for _ in 0..10 {
//!     simulator.tick(controls, 60.0);
//! }
//! println!("Body at {:?}", simulator.state().body_pose().position);
//! ```
//!
//! ## Complete Session
//!
//! ```no_run
//! use lean_drive::{
//!     config::Config,
//!     detection::ReplaySource,
//!     presenter::LogPresenter,
//!     session::{AutoPrompt, Session},
//! };
//!
//! # fn main() -> lean_drive::Result<()> {
//! let config = Config::from_file("lean-drive.yaml")?;
//! let mut source = ReplaySource::from_file("trace.yaml", config.detection.min_confidence)?;
//! let mut session = Session::new(&config);
//!
//! session.calibrate(&mut source, &mut AutoPrompt)?;
//! let summary = session.run(&mut source, &mut LogPresenter)?;
//! println!("Drove {} frames", summary.frames);
//! # Ok(())
//! # }
//! ```

/// Face detection data model and detection sources
pub mod detection;

/// Keyboard override state
pub mod keyboard;

/// Calibration protocol and calibrated references
pub mod calibration;

/// Mapping from detections to directional inputs
pub mod normalizer;

/// Vehicle kinematics simulation
pub mod vehicle;

/// Read-only consumers of per-frame output
pub mod presenter;

/// Calibration and drive loop orchestration
pub mod session;

/// Error types and result handling
pub mod error;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
