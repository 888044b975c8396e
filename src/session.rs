//! Session orchestration: calibration protocol and drive loop.
//!
//! Everything runs on one thread. Each frame the detection step writes the
//! input vector and the render step reads it, so there is only ever one
//! writer. Detection failures are the one fatal condition: they move the
//! calibration status to `ERROR` and end the loop. Empty frames are normal.

use crate::{
    calibration::{CalibrationEngine, CalibrationStatus},
    config::{Config, SessionSettings},
    constants::{DEFAULT_FPS, MAX_FRAME_TIME_SECS},
    detection::{primary, DetectionSource},
    error::{Error, Result},
    keyboard::KeyboardState,
    normalizer::{normalize, InputVector},
    presenter::Presenter,
    vehicle::{DriveControls, Simulator, TickReport, VehicleState},
};
use log::{debug, error, info, warn};
use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

/// Blocks until the operator asks for the next calibration sample
pub trait OperatorPrompt {
    fn wait_for_sample(&mut self, step: CalibrationStatus) -> Result<()>;
}

/// Treats every polled frame as a triggered sample
#[derive(Debug, Default)]
pub struct AutoPrompt;

impl OperatorPrompt for AutoPrompt {
    fn wait_for_sample(&mut self, _step: CalibrationStatus) -> Result<()> {
        Ok(())
    }
}

/// Prints the pose instruction and waits for a line of operator input
pub struct LinePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> OperatorPrompt for LinePrompt<R, W> {
    fn wait_for_sample(&mut self, step: CalibrationStatus) -> Result<()> {
        write!(self.output, "{} and press Enter... ", step.instruction())?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(Error::Prompt("Operator input closed".to_string()));
        }
        Ok(())
    }
}

/// How the simulator's frame rate is obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockMode {
    /// Every tick integrates at this rate, independent of wall time
    Fixed(f64),
    /// Each tick uses the rate implied by the wall time since the last tick
    Measured,
}

/// Frame counter and frame-rate source for the render step
#[derive(Debug, Clone)]
pub struct FrameClock {
    mode: ClockMode,
    frames: u64,
    started: Instant,
    last_tick: Instant,
}

impl FrameClock {
    #[must_use]
    pub fn new(mode: ClockMode) -> Self {
        let now = Instant::now();
        Self {
            mode,
            frames: 0,
            started: now,
            last_tick: now,
        }
    }

    /// Start measuring from now, discarding frames counted so far
    pub fn restart(&mut self) {
        let now = Instant::now();
        self.frames = 0;
        self.started = now;
        self.last_tick = now;
    }

    /// Count a frame and return the rate to integrate it at.
    ///
    /// In measured mode a gap longer than `MAX_FRAME_TIME_SECS` (a stalled
    /// detector, a calibration pause) is integrated at `DEFAULT_FPS`.
    pub fn tick(&mut self) -> f64 {
        self.frames += 1;
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;

        match self.mode {
            ClockMode::Fixed(fps) => fps,
            ClockMode::Measured if elapsed > 0.0 && elapsed <= MAX_FRAME_TIME_SECS => 1.0 / elapsed,
            ClockMode::Measured => {
                if elapsed > MAX_FRAME_TIME_SECS {
                    debug!("Frame took {elapsed:.3}s, integrating at {DEFAULT_FPS} fps");
                }
                DEFAULT_FPS
            }
        }
    }

    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Average wall-clock frame rate since the clock started
    pub fn measured_fps(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.frames as f64 / elapsed
        } else {
            0.0
        }
    }
}

/// Result of one detection + render step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    pub frame: u64,
    /// A usable detection was present
    pub detected: bool,
    pub input: InputVector,
    pub controls: DriveControls,
    pub report: TickReport,
}

/// Why the drive loop stopped
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StopReason {
    #[default]
    SourceExhausted,
    FrameLimit,
    DetectorFailed(String),
}

/// Totals for one drive loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub frames_with_detection: u64,
    pub steering_snaps: u64,
    pub distance_straight: f64,
    pub stop_reason: StopReason,
}

impl RunSummary {
    fn record(&mut self, outcome: &FrameOutcome) {
        self.frames += 1;
        if outcome.detected {
            self.frames_with_detection += 1;
        }
        if outcome.report.snapped {
            self.steering_snaps += 1;
        }
        self.distance_straight += outcome.report.distance;
    }
}

/// One user session: calibration state, keyboard, input vector and vehicle
pub struct Session {
    engine: CalibrationEngine,
    keyboard: KeyboardState,
    input: InputVector,
    simulator: Simulator,
    clock: FrameClock,
    frame_size: (f64, f64),
    settings: SessionSettings,
    pacing: Option<Duration>,
}

impl Session {
    /// Create a session from configuration with a fixed-rate clock
    #[must_use]
    pub fn new(config: &Config) -> Self {
        let calibration = &config.calibration;
        Self {
            engine: CalibrationEngine::with_dead_zone(calibration.mirror, calibration.dead_zone_ratio),
            keyboard: KeyboardState::new(),
            input: InputVector::neutral(),
            simulator: Simulator::new(config.vehicle.clone()),
            clock: FrameClock::new(ClockMode::Fixed(f64::from(config.session.target_fps))),
            frame_size: (calibration.frame_width, calibration.frame_height),
            settings: config.session.clone(),
            pacing: None,
        }
    }

    /// Use a different frame clock
    #[must_use]
    pub fn with_clock(mut self, mode: ClockMode) -> Self {
        self.clock = FrameClock::new(mode);
        self
    }

    /// Sleep this long between frames of the drive loop
    #[must_use]
    pub const fn with_pacing(mut self, interval: Duration) -> Self {
        self.pacing = Some(interval);
        self
    }

    pub const fn status(&self) -> CalibrationStatus {
        self.engine.status()
    }

    pub const fn calibration(&self) -> &CalibrationEngine {
        &self.engine
    }

    pub fn calibration_mut(&mut self) -> &mut CalibrationEngine {
        &mut self.engine
    }

    pub const fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    /// Keyboard state for event listeners to update
    pub fn keyboard_mut(&mut self) -> &mut KeyboardState {
        &mut self.keyboard
    }

    pub const fn input(&self) -> &InputVector {
        &self.input
    }

    pub const fn vehicle(&self) -> &VehicleState {
        self.simulator.state()
    }

    pub const fn clock(&self) -> &FrameClock {
        &self.clock
    }

    fn apply_key_events<S: DetectionSource + ?Sized>(&mut self, source: &mut S) {
        for event in source.take_key_events() {
            self.keyboard.apply(event);
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        error!("Session error: {err}");
        self.engine.set_status(CalibrationStatus::Error);
        err
    }

    /// Run the five-step calibration protocol.
    ///
    /// Waits on the prompt before every sample; a sample without a usable
    /// detection is logged and retried on the next trigger.
    pub fn calibrate<S, P>(&mut self, source: &mut S, prompt: &mut P) -> Result<()>
    where
        S: DetectionSource + ?Sized,
        P: OperatorPrompt + ?Sized,
    {
        info!("Starting calibration");
        if self.engine.status() == CalibrationStatus::Error {
            return Err(Error::Calibration("Session is in the ERROR state".to_string()));
        }
        if self.engine.status() != CalibrationStatus::Accepted {
            self.engine.set_status(CalibrationStatus::Pending);
            self.engine.set_status(CalibrationStatus::Accepted);
        }
        let (width, height) = self.frame_size;
        self.engine.set_center(width, height);

        let mut attempts = 0u64;
        while !self.engine.is_complete() {
            let step = self.engine.status();
            if let Err(e) = prompt.wait_for_sample(step) {
                return Err(self.fail(e));
            }
            if source.is_exhausted() {
                let err = Error::Calibration(format!("Detection source ended while waiting for {step} sample"));
                return Err(self.fail(err));
            }

            let detections = match source.detect() {
                Ok(detections) => detections,
                Err(e) => return Err(self.fail(e)),
            };
            self.apply_key_events(source);
            attempts += 1;

            if self.engine.sample(&detections, width, height) {
                info!("{step} sample accepted: {}", step.instruction());
            } else {
                warn!("No usable detection for {step} sample, waiting for the next trigger");
            }
        }

        info!("Calibration complete after {attempts} samples");
        Ok(())
    }

    /// Poll one frame, normalize it and advance the simulator one tick
    pub fn step<S: DetectionSource + ?Sized>(&mut self, source: &mut S) -> Result<FrameOutcome> {
        let detections = match source.detect() {
            Ok(detections) => detections,
            Err(e) => return Err(self.fail(e)),
        };
        self.apply_key_events(source);

        let detection = primary(&detections);
        self.input = normalize(detection, self.engine.config(), &self.keyboard);

        let controls = DriveControls::from_inputs(&self.input, &self.keyboard);
        let fps = self.clock.tick();
        let report = self.simulator.tick(controls, fps);

        Ok(FrameOutcome {
            frame: self.clock.frames(),
            detected: detection.is_some(),
            input: self.input,
            controls,
            report,
        })
    }

    /// Run the drive loop until the source ends, the frame limit is hit, or
    /// the detector fails
    pub fn run<S, P>(&mut self, source: &mut S, presenter: &mut P) -> Result<RunSummary>
    where
        S: DetectionSource + ?Sized,
        P: Presenter + ?Sized,
    {
        if self.engine.status() == CalibrationStatus::Error {
            return Err(Error::Calibration("Session is in the ERROR state".to_string()));
        }
        if !self.engine.is_complete() {
            warn!("Drive loop starting without completed calibration; camera input stays neutral");
        }

        info!("Entering drive loop");
        self.clock.restart();
        let mut summary = RunSummary::default();
        loop {
            if source.is_exhausted() {
                info!("End of detection stream reached");
                summary.stop_reason = StopReason::SourceExhausted;
                break;
            }
            if self.settings.max_frames.is_some_and(|max| summary.frames >= max) {
                info!("Frame limit of {} reached", summary.frames);
                summary.stop_reason = StopReason::FrameLimit;
                break;
            }

            let outcome = match self.step(source) {
                Ok(outcome) => outcome,
                Err(e) => {
                    summary.stop_reason = StopReason::DetectorFailed(e.to_string());
                    break;
                }
            };
            presenter.present(outcome.frame, &self.input, self.simulator.state());
            summary.record(&outcome);

            if self.settings.status_every > 0 && summary.frames % self.settings.status_every == 0 {
                let vehicle = self.simulator.state();
                info!(
                    "Frame {}: {} speed={:.2} theta={:.3} ({:.1} fps)",
                    summary.frames,
                    vehicle.control_state(),
                    vehicle.speed,
                    vehicle.theta,
                    self.clock.measured_fps()
                );
            }

            if let Some(interval) = self.pacing {
                std::thread::sleep(interval);
            }
        }

        info!(
            "Drive loop finished after {} frames ({} with a detection)",
            summary.frames, summary.frames_with_detection
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_fixed_clock() {
        let mut clock = FrameClock::new(ClockMode::Fixed(30.0));
        assert_eq!(clock.tick(), 30.0);
        assert_eq!(clock.tick(), 30.0);
        assert_eq!(clock.frames(), 2);
    }

    #[test]
    fn test_measured_clock_caps_long_gaps() {
        let mut clock = FrameClock::new(ClockMode::Measured);
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(clock.tick(), DEFAULT_FPS);

        let fps = clock.tick();
        assert!(fps >= 1.0 / MAX_FRAME_TIME_SECS, "fps={fps}");
    }

    #[test]
    fn test_clock_restart() {
        let mut clock = FrameClock::new(ClockMode::Fixed(30.0));
        clock.tick();
        clock.tick();
        clock.restart();
        assert_eq!(clock.frames(), 0);
        assert_eq!(clock.tick(), 30.0);
        assert_eq!(clock.frames(), 1);
    }

    #[test]
    fn test_line_prompt_waits_for_lines() {
        let mut output = Vec::new();
        let mut prompt = LinePrompt::new(Cursor::new("\n"), &mut output);
        assert!(prompt.wait_for_sample(CalibrationStatus::ConfigLeft).is_ok());
        assert!(matches!(
            prompt.wait_for_sample(CalibrationStatus::ConfigRight),
            Err(Error::Prompt(_))
        ));
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Lean left"));
        assert!(text.contains("Lean right"));
    }

    #[test]
    fn test_new_session_is_neutral() {
        let session = Session::new(&Config::default());
        assert_eq!(session.status(), CalibrationStatus::Initial);
        assert_eq!(*session.input(), InputVector::neutral());
        assert_eq!(session.vehicle().radius, 50.0);
    }
}
