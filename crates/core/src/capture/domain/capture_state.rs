use super::session_error::SessionError;

/// Lifecycle of the single capture session.
///
/// `Idle → Configuring → Running → Stopping → Idle`, with `Failed` reachable
/// from `Configuring` when a configuration step is rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CaptureState {
    #[default]
    Idle,
    Configuring,
    Running,
    Stopping,
    Failed(SessionError),
}

impl CaptureState {
    pub fn is_running(&self) -> bool {
        matches!(self, CaptureState::Running)
    }

    /// Whether `start()` may begin configuring from this state.
    pub fn can_start(&self) -> bool {
        matches!(self, CaptureState::Idle | CaptureState::Failed(_))
    }
}
