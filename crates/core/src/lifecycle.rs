use serde::{Deserialize, Serialize};
use std::fmt;

/// The agent's responsive sub-states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveState {
    Listening,
    Thinking,
    Speaking,
}

/// Lifecycle of the single call owned by a client.
///
/// `Initializing` means the agent joined but is not yet available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Idle,
    Connecting,
    Initializing,
    Active(ActiveState),
    Ended,
}

impl LifecycleState {
    pub const LISTENING: Self = Self::Active(ActiveState::Listening);
    pub const THINKING: Self = Self::Active(ActiveState::Thinking);
    pub const SPEAKING: Self = Self::Active(ActiveState::Speaking);

    /// Whether the agent is available to the caller.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Connecting => 1,
            Self::Initializing => 2,
            Self::Active(_) => 3,
            Self::Ended => 4,
        }
    }

    /// Whether moving from `self` to `next` is a forward transition.
    ///
    /// Active sub-states may alternate freely. Returning to `Connecting` is
    /// only possible through a new call start, which bypasses this check.
    pub fn can_advance_to(&self, next: LifecycleState) -> bool {
        next.rank() >= self.rank() && *self != Self::Ended
    }

    /// Parses the agent state names reported by the transport layer.
    pub fn from_agent_state(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "idle" | "disconnected" => Some(Self::Idle),
            "connecting" => Some(Self::Connecting),
            "initializing" => Some(Self::Initializing),
            "listening" => Some(Self::LISTENING),
            "thinking" => Some(Self::THINKING),
            "speaking" => Some(Self::SPEAKING),
            "ended" => Some(Self::Ended),
            _ => None,
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Initializing => "initializing",
            Self::Active(ActiveState::Listening) => "listening",
            Self::Active(ActiveState::Thinking) => "thinking",
            Self::Active(ActiveState::Speaking) => "speaking",
            Self::Ended => "ended",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        use LifecycleState::*;
        assert!(Idle.can_advance_to(Connecting));
        assert!(Connecting.can_advance_to(Initializing));
        assert!(Connecting.can_advance_to(LifecycleState::LISTENING));
        assert!(LifecycleState::LISTENING.can_advance_to(LifecycleState::SPEAKING));
        assert!(LifecycleState::SPEAKING.can_advance_to(LifecycleState::THINKING));
        assert!(LifecycleState::THINKING.can_advance_to(Ended));
    }

    #[test]
    fn test_backward_and_post_end_transitions_are_refused() {
        use LifecycleState::*;
        assert!(!LifecycleState::LISTENING.can_advance_to(Connecting));
        assert!(!Initializing.can_advance_to(Idle));
        assert!(!Ended.can_advance_to(Ended));
        assert!(!Ended.can_advance_to(LifecycleState::LISTENING));
    }

    #[test]
    fn test_agent_state_names() {
        assert_eq!(
            LifecycleState::from_agent_state("Listening"),
            Some(LifecycleState::LISTENING)
        );
        assert_eq!(
            LifecycleState::from_agent_state("disconnected"),
            Some(LifecycleState::Idle)
        );
        assert_eq!(LifecycleState::from_agent_state("dancing"), None);
        assert_eq!(LifecycleState::SPEAKING.to_string(), "speaking");
        assert!(LifecycleState::THINKING.is_active());
        assert!(!LifecycleState::Initializing.is_active());
    }
}
