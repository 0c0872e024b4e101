use serde::{Deserialize, Serialize};

/// Length of descriptors produced by the face-recognition bundle.
pub const DESCRIPTOR_LEN: usize = 128;

/// Bounding box for a detected face, in frame pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Detector output for one face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub bbox: BoundingBox,
    /// Confidence that the region is a face, in [0, 1].
    pub score: f32,
    /// 68-point landmarks, when the landmark stage ran.
    pub landmarks: Option<Vec<(f32, f32)>>,
}

/// Identity embedding for one face.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Descriptor {
    pub values: Vec<f32>,
}

impl Descriptor {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Hand the raw vector to the caller.
    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }
}

impl From<Vec<f32>> for Descriptor {
    fn from(values: Vec<f32>) -> Self {
        Self { values }
    }
}

/// A face as returned by a full detect → landmarks → descriptor pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    pub detection: FaceDetection,
    pub descriptor: Descriptor,
}

impl DetectedFace {
    pub fn score(&self) -> f32 {
        self.detection.score
    }
}
