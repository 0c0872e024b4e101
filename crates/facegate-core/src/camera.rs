//! Camera collaborator: frame access and failure classification.

use crate::frame::Frame;
use crate::notice::Notice;
use thiserror::Error;

/// Marker the capture backend uses when no video input exists.
const DEVICE_NOT_FOUND: &str = "device not found";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("{0}")]
    Failed(String),
}

impl CameraError {
    /// Classify a raw failure reason reported by the capture backend.
    pub fn from_reason(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if reason.to_lowercase().contains(DEVICE_NOT_FOUND) {
            CameraError::DeviceNotFound(reason)
        } else {
            CameraError::Failed(reason)
        }
    }

    /// The notice shown to the user for this failure.
    pub fn notice(&self) -> Notice {
        match self {
            CameraError::DeviceNotFound(_) => Notice::CameraMissing,
            CameraError::Failed(reason) => Notice::CameraFailed {
                reason: reason.clone(),
            },
        }
    }
}

/// Live video source sampled by a session.
///
/// Readiness and failures are reported to the session by whoever owns the
/// camera; the session only pulls frames once told the stream is active.
pub trait CameraSource: Send + 'static {
    /// The frame currently on screen, or `None` if the stream has no frame yet.
    fn current_frame(&self) -> Option<Frame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_not_found_gets_camera_notice() {
        let err = CameraError::from_reason("Requested device not found");
        assert!(matches!(err, CameraError::DeviceNotFound(_)));
        assert_eq!(err.notice(), Notice::CameraMissing);
    }

    #[test]
    fn test_other_failures_keep_raw_reason() {
        let err = CameraError::from_reason("Permission denied");
        assert_eq!(err, CameraError::Failed("Permission denied".into()));
        assert_eq!(
            err.notice(),
            Notice::CameraFailed {
                reason: "Permission denied".into()
            }
        );
    }

    #[test]
    fn test_classification_ignores_case() {
        let err = CameraError::from_reason("NotFoundError: Device Not Found");
        assert_eq!(err.notice(), Notice::CameraMissing);
    }
}
