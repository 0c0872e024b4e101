//! Face-recognition engine seams.
//!
//! The engine itself (detector, landmark net, recognition net) lives outside
//! this workspace; sessions only see these traits.

use crate::frame::Frame;
use crate::models::ModelError;
use crate::types::DetectedFace;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("frame rejected: {0}")]
    InvalidFrame(String),
}

/// Runs detection, landmarks, and descriptor extraction over one frame.
pub trait FaceAnalyzer: Send + Sync + 'static {
    /// Detect every face in `frame`, each with its descriptor.
    fn detect_all(
        &self,
        frame: Frame,
    ) -> impl Future<Output = Result<Vec<DetectedFace>, AnalyzerError>> + Send;
}

impl<A: FaceAnalyzer> FaceAnalyzer for Arc<A> {
    fn detect_all(
        &self,
        frame: Frame,
    ) -> impl Future<Output = Result<Vec<DetectedFace>, AnalyzerError>> + Send {
        (**self).detect_all(frame)
    }
}

/// Loads the model set once and yields a ready analyzer.
pub trait ModelProvider: Send + Sync + 'static {
    type Analyzer: FaceAnalyzer;

    fn load(&self) -> impl Future<Output = Result<Self::Analyzer, ModelError>> + Send;
}
