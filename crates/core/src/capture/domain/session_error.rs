use thiserror::Error;

/// Why a capture session could not be started.
///
/// Every variant is fatal to one `start()` attempt and is never retried
/// automatically; the caller decides whether to try again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("capture preset unavailable: {0}")]
    PresetUnavailable(String),
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("failed to attach capture input: {0}")]
    InputAttachFailed(String),
    #[error("failed to attach frame output: {0}")]
    OutputAttachFailed(String),
    #[error("capture session is already running")]
    AlreadyRunning,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_reason() {
        let err = SessionError::DeviceUnavailable("no such file".into());
        assert_eq!(err.to_string(), "capture device unavailable: no such file");
    }

    #[test]
    fn test_clone_compares_equal() {
        let err = SessionError::OutputAttachFailed("closed".into());
        assert_eq!(err.clone(), err);
        assert_ne!(err, SessionError::AlreadyRunning);
    }
}
