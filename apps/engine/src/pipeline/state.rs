use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of pipeline stages.
///
/// A run flows INTAKE → PARSE_JD → PARSE_RESUME → ANALYZE_FIT →
/// GENERATE_OUTPUTS ⇄ VALIDATE → DONE, with ERROR reachable from any
/// non-terminal state on handler failure. `Done` and `Error` are terminal and
/// never have handlers registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    Intake,
    ParseJd,
    ParseResume,
    AnalyzeFit,
    GenerateOutputs,
    Validate,
    Done,
    Error,
}

impl AgentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentState::Done | AgentState::Error)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentState::Intake => "INTAKE",
            AgentState::ParseJd => "PARSE_JD",
            AgentState::ParseResume => "PARSE_RESUME",
            AgentState::AnalyzeFit => "ANALYZE_FIT",
            AgentState::GenerateOutputs => "GENERATE_OUTPUTS",
            AgentState::Validate => "VALIDATE",
            AgentState::Done => "DONE",
            AgentState::Error => "ERROR",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display_uses_wire_names() {
        assert_eq!(AgentState::Intake.to_string(), "INTAKE");
        assert_eq!(AgentState::ParseJd.to_string(), "PARSE_JD");
        assert_eq!(AgentState::GenerateOutputs.to_string(), "GENERATE_OUTPUTS");
        assert_eq!(AgentState::Done.to_string(), "DONE");
        assert_eq!(AgentState::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_only_done_and_error_are_terminal() {
        assert!(AgentState::Done.is_terminal());
        assert!(AgentState::Error.is_terminal());
        assert!(!AgentState::Intake.is_terminal());
        assert!(!AgentState::Validate.is_terminal());
    }
}
