//! User-facing notices raised by a capture session.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory; sampling continues.
    Warning,
    Error,
}

/// A message the presentation layer should show to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// One of the model bundles could not be fetched or validated.
    ModelLoadFailed,
    /// Sent every `warn_every` attempts while nothing has been accepted.
    ImproveConditions,
    /// The attempt ceiling was exceeded.
    RecognitionFailed,
    /// The camera backend reported that no capture device exists.
    CameraMissing,
    /// Any other camera failure; the backend's reason is shown verbatim.
    CameraFailed { reason: String },
}

impl Notice {
    pub fn severity(&self) -> Severity {
        match self {
            Notice::ImproveConditions => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Translation key for the message, `None` when the text is passed through raw.
    pub fn i18n_key(&self) -> Option<&'static str> {
        match self {
            Notice::ModelLoadFailed => Some("login:Model loading failure"),
            Notice::ImproveConditions => Some(
                "login:Please ensure sufficient lighting and align your face in the center of the recognition box",
            ),
            Notice::RecognitionFailed => Some("login:Face recognition failed"),
            Notice::CameraMissing => {
                Some("login:You need to have a camera device to login with Face ID")
            }
            Notice::CameraFailed { .. } => None,
        }
    }

    /// Whether this notice ends the session with a cancellation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Notice::ModelLoadFailed | Notice::RecognitionFailed | Notice::CameraMissing
        )
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.i18n_key()) {
            (Notice::CameraFailed { reason }, _) => f.write_str(reason),
            (_, Some(key)) => {
                // Keys carry the English source text after the namespace.
                let text = key.split_once(':').map_or(key, |(_, text)| text);
                f.write_str(text)
            }
            (_, None) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_improve_conditions_is_a_warning() {
        assert_eq!(Notice::ImproveConditions.severity(), Severity::Warning);
        assert_eq!(Notice::RecognitionFailed.severity(), Severity::Error);
        assert_eq!(Notice::CameraMissing.severity(), Severity::Error);
    }

    #[test]
    fn test_display_strips_namespace() {
        assert_eq!(Notice::RecognitionFailed.to_string(), "Face recognition failed");
        assert_eq!(
            Notice::CameraMissing.to_string(),
            "You need to have a camera device to login with Face ID"
        );
    }

    #[test]
    fn test_camera_failed_shows_raw_reason() {
        let notice = Notice::CameraFailed { reason: "Permission denied".into() };
        assert_eq!(notice.to_string(), "Permission denied");
        assert!(notice.i18n_key().is_none());
        assert!(!notice.is_terminal());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(Notice::CameraFailed { reason: "x".into() }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "camera_failed", "reason": "x"}));
    }
}
