use std::fmt;
use std::str::FromStr;

/// When face-found / face-lost notifications are raised.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PresenceEvents {
    /// One event per processed frame.
    #[default]
    EveryFrame,
    /// Only when the pipeline switches between searching and tracking.
    OnTransition,
}

impl fmt::Display for PresenceEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceEvents::EveryFrame => write!(f, "every-frame"),
            PresenceEvents::OnTransition => write!(f, "on-transition"),
        }
    }
}

impl FromStr for PresenceEvents {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "every-frame" | "frame" => Ok(PresenceEvents::EveryFrame),
            "on-transition" | "transition" => Ok(PresenceEvents::OnTransition),
            other => Err(format!(
                "invalid event mode '{other}': expected every-frame or on-transition"
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenceEvent {
    FaceFound,
    FaceLost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PresenceState {
    Searching,
    Tracking,
}

/// Turns per-frame "was a face detected" results into presence events.
///
/// In transition mode the first observation always reports, so a fresh
/// session tells the sink where it starts.
#[derive(Clone, Debug)]
pub struct PresenceTracker {
    mode: PresenceEvents,
    state: Option<PresenceState>,
}

impl PresenceTracker {
    pub fn new(mode: PresenceEvents) -> Self {
        Self { mode, state: None }
    }

    pub fn observe(&mut self, face_present: bool) -> Option<PresenceEvent> {
        let next = if face_present {
            PresenceState::Tracking
        } else {
            PresenceState::Searching
        };
        let changed = self.state != Some(next);
        self.state = Some(next);

        if self.mode == PresenceEvents::OnTransition && !changed {
            return None;
        }
        Some(match next {
            PresenceState::Tracking => PresenceEvent::FaceFound,
            PresenceState::Searching => PresenceEvent::FaceLost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    use PresenceEvent::{FaceFound, FaceLost};

    fn run(mode: PresenceEvents, observations: &[bool]) -> Vec<Option<PresenceEvent>> {
        let mut tracker = PresenceTracker::new(mode);
        observations.iter().map(|&p| tracker.observe(p)).collect()
    }

    #[test]
    fn test_every_frame_reports_each_observation() {
        let events = run(PresenceEvents::EveryFrame, &[true, true, false, false]);
        assert_eq!(
            events,
            vec![Some(FaceFound), Some(FaceFound), Some(FaceLost), Some(FaceLost)]
        );
    }

    #[test]
    fn test_on_transition_reports_changes_only() {
        let events = run(PresenceEvents::OnTransition, &[false, false, true, true, false]);
        assert_eq!(
            events,
            vec![Some(FaceLost), None, Some(FaceFound), None, Some(FaceLost)]
        );
    }

    #[test]
    fn test_new_tracker_reports_first_observation() {
        let mut tracker = PresenceTracker::new(PresenceEvents::OnTransition);
        assert_eq!(tracker.observe(true), Some(FaceFound));
        assert_eq!(tracker.observe(true), None);
        let mut fresh = PresenceTracker::new(PresenceEvents::OnTransition);
        assert_eq!(fresh.observe(true), Some(FaceFound));
    }

    #[rstest]
    #[case("every-frame", PresenceEvents::EveryFrame)]
    #[case("transition", PresenceEvents::OnTransition)]
    fn test_parse_mode(#[case] input: &str, #[case] expected: PresenceEvents) {
        assert_eq!(input.parse::<PresenceEvents>().unwrap(), expected);
    }

    #[test]
    fn test_parse_mode_rejects_unknown() {
        assert!("sometimes".parse::<PresenceEvents>().is_err());
    }
}
