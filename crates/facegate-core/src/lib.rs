//! facegate-core — Acceptance logic for webcam face capture.
//!
//! Holds the polling state machine that decides when a sampled face is good
//! enough to hand back to the caller, plus the traits the face-recognition
//! engine and the camera are plugged in through.

pub mod analyzer;
pub mod camera;
pub mod frame;
pub mod models;
pub mod notice;
pub mod poller;
pub mod scripted;
pub mod types;

pub use analyzer::{AnalyzerError, FaceAnalyzer, ModelProvider};
pub use camera::{CameraError, CameraSource};
pub use frame::Frame;
pub use models::{ModelBundle, ModelError, ModelSet, ModelSource};
pub use notice::{Notice, Severity};
pub use poller::{AcceptancePolicy, Phase, PollState, Poller, TickOutcome, Verdict};
pub use types::{BoundingBox, DetectedFace, Descriptor, FaceDetection};
