//! Face detection data model and detection sources.
//!
//! The face-detection model itself is a black box: something that, once per
//! video frame, yields zero or more detections with a bounding box, keypoints
//! and a confidence score. The core only consumes the typed [`Detection`]
//! produced here. Raw payloads with missing fields are rejected on conversion,
//! so a frame without a usable subject is simply an empty list.

use crate::{
    keyboard::{Key, KeyEvent},
    Error, Result,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

/// Center of an extent along one axis: `origin + extent / 2`.
///
/// No rounding is applied; dead-zone comparisons rely on the exact value.
#[must_use]
pub fn bbox_center(origin: f64, extent: f64) -> f64 {
    origin + extent / 2.0
}

/// Axis-aligned bounding box in source video pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    #[must_use]
    pub const fn new(origin_x: f64, origin_y: f64, width: f64, height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            width,
            height,
        }
    }

    /// Horizontal center in pixels
    #[must_use]
    pub fn center_x(&self) -> f64 {
        bbox_center(self.origin_x, self.width)
    }

    /// Vertical center in pixels
    #[must_use]
    pub fn center_y(&self) -> f64 {
        bbox_center(self.origin_y, self.height)
    }
}

/// Facial keypoint in normalized video coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
}

/// A complete detection of the subject in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Bounding box of the detected face
    pub bounding_box: BoundingBox,
    /// Facial keypoints
    pub keypoints: Vec<Keypoint>,
    /// Confidence score of the detection
    pub confidence: f32,
}

impl Detection {
    #[must_use]
    pub fn new(bounding_box: BoundingBox, confidence: f32) -> Self {
        Self {
            bounding_box,
            keypoints: Vec::new(),
            confidence,
        }
    }

    #[must_use]
    pub fn with_keypoints(mut self, keypoints: Vec<Keypoint>) -> Self {
        self.keypoints = keypoints;
        self
    }
}

/// Detections of one frame, best first
pub type DetectionList = Vec<Detection>;

/// The primary detection of a frame, if any
#[must_use]
pub fn primary(detections: &[Detection]) -> Option<&Detection> {
    detections.first()
}

/// Detection payload as emitted by the model, fields possibly absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDetection {
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub keypoints: Vec<Keypoint>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

impl TryFrom<RawDetection> for Detection {
    type Error = Error;

    fn try_from(raw: RawDetection) -> Result<Self> {
        let bounding_box = raw
            .bounding_box
            .ok_or_else(|| Error::InvalidInput("Detection has no bounding box".to_string()))?;
        let confidence = raw
            .confidence
            .ok_or_else(|| Error::InvalidInput("Detection has no confidence score".to_string()))?;

        Ok(Self {
            bounding_box,
            keypoints: raw.keypoints,
            confidence,
        })
    }
}

impl Detection {
    /// Convert a raw payload, rejecting incomplete ones
    pub fn from_raw(raw: RawDetection) -> Result<Self> {
        Self::try_from(raw)
    }
}

/// Per-frame producer of detections.
///
/// An empty list is the normal "nothing seen" answer; `Err` means the
/// underlying detector or video is unavailable.
pub trait DetectionSource {
    /// Poll the detector for the current frame
    fn detect(&mut self) -> Result<DetectionList>;

    /// Whether the source has reached the end of its stream
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Keyboard events that occurred before the most recently polled frame
    fn take_key_events(&mut self) -> Vec<KeyEvent> {
        Vec::new()
    }
}

/// One recorded frame of a detection trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceFrame {
    /// Raw detector output for this frame
    pub detections: Vec<RawDetection>,
    /// Keys pressed before this frame
    pub keys_down: Vec<Key>,
    /// Keys released before this frame
    pub keys_up: Vec<Key>,
    /// Simulate a detector failure on this frame
    pub fail: bool,
}

/// Replays a recorded detection trace frame by frame
#[derive(Debug, Clone)]
pub struct ReplaySource {
    frames: VecDeque<TraceFrame>,
    min_confidence: f32,
    pending_keys: Vec<KeyEvent>,
    polled: u64,
}

impl ReplaySource {
    /// Create a replay source from in-memory frames
    #[must_use]
    pub fn from_frames(frames: Vec<TraceFrame>, min_confidence: f32) -> Self {
        Self {
            frames: frames.into(),
            min_confidence,
            pending_keys: Vec::new(),
            polled: 0,
        }
    }

    /// Parse a YAML trace (a list of frames)
    pub fn from_yaml(content: &str, min_confidence: f32) -> Result<Self> {
        let frames: Vec<TraceFrame> =
            serde_yaml::from_str(content).map_err(|e| Error::TraceFormat(format!("Failed to parse trace: {e}")))?;
        Ok(Self::from_frames(frames, min_confidence))
    }

    /// Load a YAML trace from disk
    pub fn from_file<P: AsRef<Path>>(path: P, min_confidence: f32) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading detection trace from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let source = Self::from_yaml(&content, min_confidence)?;
        info!("Trace contains {} frames", source.remaining());
        Ok(source)
    }

    /// Frames not yet replayed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    /// Frames replayed so far
    #[must_use]
    pub const fn polled(&self) -> u64 {
        self.polled
    }
}

impl DetectionSource for ReplaySource {
    fn detect(&mut self) -> Result<DetectionList> {
        let Some(frame) = self.frames.pop_front() else {
            return Ok(Vec::new());
        };
        self.polled += 1;

        self.pending_keys
            .extend(frame.keys_down.iter().map(|&key| KeyEvent::Down(key)));
        self.pending_keys
            .extend(frame.keys_up.iter().map(|&key| KeyEvent::Up(key)));

        if frame.fail {
            return Err(Error::DetectionSource(format!(
                "Detector failed on trace frame {}",
                self.polled
            )));
        }

        let mut detections = Vec::with_capacity(frame.detections.len());
        for raw in frame.detections {
            match Detection::try_from(raw) {
                Ok(detection) if detection.confidence >= self.min_confidence => detections.push(detection),
                Ok(detection) => debug!(
                    "Dropping detection with confidence {:.2} below {:.2}",
                    detection.confidence, self.min_confidence
                ),
                Err(e) => warn!("Skipping incomplete detection: {e}"),
            }
        }

        Ok(detections)
    }

    fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }

    fn take_key_events(&mut self) -> Vec<KeyEvent> {
        std::mem::take(&mut self.pending_keys)
    }
}
