//! End-to-end tests for calibration and the drive loop


use lean_drive::{
    calibration::CalibrationStatus,
    config::Config,
    constants::MAX_FRAME_TIME_SECS,
    detection::{DetectionSource, ReplaySource, TraceFrame},
    keyboard::Key,
    normalizer::InputVector,
    presenter::RecordingPresenter,
    session::{AutoPrompt, ClockMode, LinePrompt, Session, StopReason},
    Error,
};
use std::io::Cursor;
use std::time::Duration;
use test_helpers::{calibration_frames, empty_frame, frame_at, frame_with_keys};

const MIN_CONFIDENCE: f32 = 0.5;

fn source_with(drive: Vec<TraceFrame>) -> ReplaySource {
    let mut frames = calibration_frames();
    frames.extend(drive);
    ReplaySource::from_frames(frames, MIN_CONFIDENCE)
}

fn failing_frame() -> TraceFrame {
    TraceFrame {
        fail: true,
        ..TraceFrame::default()
    }
}

#[test]
fn test_calibrate_then_drive() {
    let mut source = source_with(vec![
        frame_with_keys(frame_at(125.0, 100.0), &[Key::Space], &[]),
        frame_at(190.0, 100.0),
        frame_at(190.0, 100.0),
        frame_at(190.0, 100.0),
    ]);
    let mut session = Session::new(&Config::default());
    let mut presenter = RecordingPresenter::new();

    session.calibrate(&mut source, &mut AutoPrompt).unwrap();
    assert_eq!(session.status(), CalibrationStatus::ConfigComplete);
    assert_eq!(session.calibration().config().center, 125.0);

    let summary = session.run(&mut source, &mut presenter).unwrap();
    assert_eq!(summary.frames, 4);
    assert_eq!(summary.frames_with_detection, 4);
    assert_eq!(summary.stop_reason, StopReason::SourceExhausted);
    assert_eq!(presenter.frames.len(), 4);

    // Mirrored feed: a face on the image's right is a lean to the left
    let last = presenter.last().unwrap();
    assert!((last.input.left - 0.52).abs() < 1e-12);
    assert_eq!(last.input.right, 0.0);
    assert!(last.theta < 0.0);
    assert_eq!(last.speed, 4.0);
    assert_eq!(presenter.frames[0].input, InputVector::neutral());
}

#[test]
fn test_empty_sample_is_retried() {
    let mut frames = calibration_frames();
    frames.insert(1, empty_frame());
    frames.insert(3, empty_frame());
    let mut source = ReplaySource::from_frames(frames, MIN_CONFIDENCE);
    let mut session = Session::new(&Config::default());

    session.calibrate(&mut source, &mut AutoPrompt).unwrap();
    assert!(session.calibration().is_complete());
    assert_eq!(session.calibration().config().left, 60.0);
    assert_eq!(session.calibration().config().right, 190.0);
    assert!(source.is_exhausted());
}

#[test]
fn test_low_confidence_sample_is_ignored() {
    let mut weak = frame_at(10.0, 10.0);
    weak.detections[0].confidence = Some(0.2);
    let mut frames = calibration_frames();
    frames.insert(1, weak);
    let mut source = ReplaySource::from_frames(frames, MIN_CONFIDENCE);
    let mut session = Session::new(&Config::default());

    session.calibrate(&mut source, &mut AutoPrompt).unwrap();
    assert_eq!(session.calibration().config().left, 60.0);
}

#[test]
fn test_source_ending_during_calibration() {
    let frames = calibration_frames().into_iter().take(3).collect();
    let mut source = ReplaySource::from_frames(frames, MIN_CONFIDENCE);
    let mut session = Session::new(&Config::default());

    let result = session.calibrate(&mut source, &mut AutoPrompt);
    assert!(matches!(result, Err(Error::Calibration(_))));
    assert_eq!(session.status(), CalibrationStatus::Error);
}

#[test]
fn test_detector_failure_stops_the_loop() {
    let mut source = source_with(vec![frame_at(125.0, 100.0), failing_frame(), frame_at(125.0, 100.0)]);
    let mut session = Session::new(&Config::default());
    session.calibrate(&mut source, &mut AutoPrompt).unwrap();

    let summary = session.run(&mut source, &mut RecordingPresenter::new()).unwrap();
    assert_eq!(summary.frames, 1);
    assert!(matches!(summary.stop_reason, StopReason::DetectorFailed(_)));
    assert_eq!(session.status(), CalibrationStatus::Error);
    assert_eq!(source.remaining(), 1);

    // ERROR is terminal
    let rerun = session.run(&mut source, &mut RecordingPresenter::new());
    assert!(matches!(rerun, Err(Error::Calibration(_))));
    let recalibrate = session.calibrate(&mut source, &mut AutoPrompt);
    assert!(matches!(recalibrate, Err(Error::Calibration(_))));
}

#[test]
fn test_detector_failure_during_calibration() {
    let mut frames = calibration_frames();
    frames.insert(2, failing_frame());
    let mut source = ReplaySource::from_frames(frames, MIN_CONFIDENCE);
    let mut session = Session::new(&Config::default());

    let result = session.calibrate(&mut source, &mut AutoPrompt);
    assert!(matches!(result, Err(Error::DetectionSource(_))));
    assert_eq!(session.status(), CalibrationStatus::Error);
}

#[test]
fn test_frame_limit() {
    let mut config = Config::default();
    config.session.max_frames = Some(3);
    let mut source = source_with(vec![frame_at(125.0, 100.0); 10]);
    let mut session = Session::new(&config);
    session.calibrate(&mut source, &mut AutoPrompt).unwrap();

    let summary = session.run(&mut source, &mut RecordingPresenter::new()).unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.stop_reason, StopReason::FrameLimit);
    assert_eq!(source.remaining(), 7);
}

#[test]
fn test_keyboard_events_from_trace() {
    let mut source = ReplaySource::from_frames(
        vec![
            frame_with_keys(empty_frame(), &[Key::ArrowLeft], &[]),
            empty_frame(),
            frame_with_keys(empty_frame(), &[], &[Key::ArrowLeft]),
        ],
        MIN_CONFIDENCE,
    );
    let mut session = Session::new(&Config::default());

    let first = session.step(&mut source).unwrap();
    assert_eq!((first.input.left, first.input.center), (1.0, 0.0));
    assert!(first.controls.steer_left);
    assert!(!first.detected);

    let second = session.step(&mut source).unwrap();
    assert_eq!(second.input.left, 1.0);

    let third = session.step(&mut source).unwrap();
    assert_eq!(third.input, InputVector::neutral());
    assert!(!session.keyboard().arrow_left());
    assert!(session.vehicle().theta < 0.0);
}

#[test]
fn test_uncalibrated_session_still_takes_keys() {
    let mut source = ReplaySource::from_frames(
        vec![
            frame_with_keys(frame_at(10.0, 10.0), &[Key::Space, Key::D], &[]),
            frame_at(10.0, 10.0),
        ],
        MIN_CONFIDENCE,
    );
    let mut session = Session::new(&Config::default());

    let summary = session.run(&mut source, &mut RecordingPresenter::new()).unwrap();
    assert_eq!(summary.frames, 2);
    assert_eq!(*session.input(), InputVector::neutral());
    assert_eq!(session.vehicle().speed, 2.0);
    assert!(session.vehicle().theta > 0.0);
}

#[test]
fn test_interactive_calibration() {
    let mut source = ReplaySource::from_frames(calibration_frames(), MIN_CONFIDENCE);
    let mut session = Session::new(&Config::default());
    let mut output = Vec::new();
    let mut prompt = LinePrompt::new(Cursor::new("\n\n\n\n\n"), &mut output);

    session.calibrate(&mut source, &mut prompt).unwrap();
    assert!(session.calibration().is_complete());

    let text = String::from_utf8(output).unwrap();
    assert_eq!(text.matches("press Enter").count(), 5);
}

#[test]
fn test_closed_operator_input_aborts_calibration() {
    let mut source = ReplaySource::from_frames(calibration_frames(), MIN_CONFIDENCE);
    let mut session = Session::new(&Config::default());
    let mut prompt = LinePrompt::new(Cursor::new("\n\n"), Vec::new());

    let result = session.calibrate(&mut source, &mut prompt);
    assert!(matches!(result, Err(Error::Prompt(_))));
    assert_eq!(session.status(), CalibrationStatus::Error);
    assert_eq!(source.remaining(), 3);
}

#[test]
fn test_sample_trace_replays() {
    let trace = include_str!("../demos/sample_trace.yaml");
    let mut source = ReplaySource::from_yaml(trace, MIN_CONFIDENCE).unwrap();
    let mut session = Session::new(&Config::default());
    let mut presenter = RecordingPresenter::new();

    session.calibrate(&mut source, &mut AutoPrompt).unwrap();
    let summary = session.run(&mut source, &mut presenter).unwrap();

    assert_eq!(summary.frames, 8);
    assert_eq!(summary.frames_with_detection, 6);
    assert_eq!(summary.stop_reason, StopReason::SourceExhausted);
    assert!(presenter.frames.iter().any(|f| f.input.right > 0.0));
    assert!(presenter.frames.iter().any(|f| f.input.left > 0.0));
    assert!(session.vehicle().speed > 0.0);
}

#[test]
fn test_pause_before_driving_does_not_jump_the_car() {
    let mut source = source_with(vec![frame_with_keys(frame_at(125.0, 100.0), &[Key::Space], &[])]);
    let mut session = Session::new(&Config::default()).with_clock(ClockMode::Measured);
    session.calibrate(&mut source, &mut AutoPrompt).unwrap();

    std::thread::sleep(Duration::from_millis(300));
    let outcome = session.step(&mut source).unwrap();

    assert_eq!(session.vehicle().speed, 1.0);
    assert!((outcome.report.distance - 1.0 / 60.0).abs() < 1e-12);
}

#[test]
fn test_measured_run_ticks_stay_bounded() {
    let mut source = source_with(vec![frame_with_keys(frame_at(125.0, 100.0), &[Key::Space], &[]); 3]);
    let mut session = Session::new(&Config::default()).with_clock(ClockMode::Measured);
    session.calibrate(&mut source, &mut AutoPrompt).unwrap();
    std::thread::sleep(Duration::from_millis(300));

    let mut presenter = RecordingPresenter::new();
    session.run(&mut source, &mut presenter).unwrap();

    // Speeds 1, 2, 3; no tick integrates more than MAX_FRAME_TIME_SECS
    let first = -presenter.frames[0].body.position.x;
    assert!(first > 0.0 && first <= MAX_FRAME_TIME_SECS, "first={first}");
    let travelled = -session.vehicle().body_pose().position.x;
    assert!(travelled <= 6.0 * MAX_FRAME_TIME_SECS, "travelled={travelled}");
}

#[test]
fn test_calibrated_gas_pose_accelerates() {
    let mut source = source_with(vec![frame_at(125.0, 50.0), frame_at(125.0, 150.0)]);
    let mut session = Session::new(&Config::default());
    session.calibrate(&mut source, &mut AutoPrompt).unwrap();

    let config = session.calibration().config();
    assert!(config.down < config.y_center_range.0);
    assert!(config.up > config.y_center_range.1);

    // Looking up as in the gas sample reads as up and accelerates
    let gas = session.step(&mut source).unwrap();
    assert_eq!(gas.input.up, 1.0);
    assert!(gas.controls.accelerate);

    // Looking down as in the brake sample does not
    let brake = session.step(&mut source).unwrap();
    assert_eq!(brake.input.down, 1.0);
    assert!(!brake.controls.accelerate);
}
