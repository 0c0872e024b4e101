//! Deterministic stand-ins for the engine, the camera, and model loading.
//!
//! Used for replaying recorded detection traces and for exercising sessions
//! without a model host or a webcam.

use crate::analyzer::{AnalyzerError, FaceAnalyzer, ModelProvider};
use crate::camera::CameraSource;
use crate::frame::Frame;
use crate::models::ModelError;
use crate::types::{BoundingBox, DetectedFace, Descriptor, FaceDetection};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// One face in a recorded trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFace {
    pub score: f32,
    #[serde(default)]
    pub descriptor: Vec<f32>,
    #[serde(default)]
    pub bbox: BoundingBox,
}

impl From<TraceFace> for DetectedFace {
    fn from(t: TraceFace) -> Self {
        DetectedFace {
            detection: FaceDetection {
                bbox: t.bbox,
                score: t.score,
                landmarks: None,
            },
            descriptor: Descriptor::new(t.descriptor),
        }
    }
}

/// A recorded run: one entry per detection call, each the faces it returned.
pub type Trace = Vec<Vec<TraceFace>>;

/// Replays samples in order; once exhausted every call reports no face.
#[derive(Default)]
pub struct ScriptedAnalyzer {
    samples: Mutex<VecDeque<Vec<DetectedFace>>>,
    calls: AtomicUsize,
}

impl ScriptedAnalyzer {
    pub fn new(samples: impl IntoIterator<Item = Vec<DetectedFace>>) -> Self {
        Self {
            samples: Mutex::new(samples.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn from_trace(trace: Trace) -> Self {
        Self::new(
            trace
                .into_iter()
                .map(|sample| sample.into_iter().map(DetectedFace::from).collect()),
        )
    }

    /// The same single face `count` times.
    pub fn repeating(face: DetectedFace, count: usize) -> Self {
        Self::new(std::iter::repeat(vec![face]).take(count))
    }

    /// Number of `detect_all` calls served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl FaceAnalyzer for ScriptedAnalyzer {
    async fn detect_all(&self, _frame: Frame) -> Result<Vec<DetectedFace>, AnalyzerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .samples
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        Ok(next.unwrap_or_default())
    }
}

/// Camera that always shows the same frame.
pub struct StillCamera {
    frame: Option<Frame>,
}

impl StillCamera {
    pub fn new(frame: Frame) -> Self {
        Self { frame: Some(frame) }
    }

    /// A stream that is active but has not produced a frame.
    pub fn empty() -> Self {
        Self { frame: None }
    }
}

impl CameraSource for StillCamera {
    fn current_frame(&self) -> Option<Frame> {
        self.frame.clone()
    }
}

/// Model provider that resolves immediately with a fixed analyzer or error.
pub struct ScriptedProvider<A> {
    analyzer: Option<A>,
    failure: String,
}

impl<A> ScriptedProvider<A> {
    pub fn ready(analyzer: A) -> Self {
        Self {
            analyzer: Some(analyzer),
            failure: String::new(),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            analyzer: None,
            failure: reason.into(),
        }
    }
}

impl<A: FaceAnalyzer + Clone> ModelProvider for ScriptedProvider<A> {
    type Analyzer = A;

    async fn load(&self) -> Result<A, ModelError> {
        match &self.analyzer {
            Some(a) => Ok(a.clone()),
            None => Err(ModelError::Backend(self.failure.clone())),
        }
    }
}

/// Build a single-face sample with the given score and descriptor fill.
pub fn face(score: f32, fill: f32) -> DetectedFace {
    DetectedFace {
        detection: FaceDetection {
            bbox: BoundingBox {
                x: 40.0,
                y: 30.0,
                width: 120.0,
                height: 120.0,
            },
            score,
            landmarks: None,
        },
        descriptor: Descriptor::new(vec![fill; crate::types::DESCRIPTOR_LEN]),
    }
}
