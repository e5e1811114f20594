use std::time::Duration;

use crate::parser::ActionPolicy;
use crate::prompt::ProtocolMarkers;

/// What happens when a tool returns an error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ToolErrorPolicy {
    /// The session fails with [`Error::ActionExecution`](super::Error).
    Abort,
    /// The failure is described in the observation, so the model can try
    /// something else.
    #[default]
    Observe,
}

/// Options of an [`Agent`](super::Agent).
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Maximum number of model calls per question.
    pub max_turns: usize,
    /// How many action lines of one reply are executed.
    pub action_policy: ActionPolicy,
    /// Keywords of the protocol.
    pub markers: ProtocolMarkers,
    /// Whether to ask the model to summarize each observation, which may
    /// end the session early.
    pub extraction_step: bool,
    /// What happens when a tool fails.
    pub tool_error_policy: ToolErrorPolicy,
    /// Time limit for one tool execution.
    pub tool_timeout: Option<Duration>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 5,
            action_policy: ActionPolicy::default(),
            markers: ProtocolMarkers::default(),
            extraction_step: false,
            tool_error_policy: ToolErrorPolicy::default(),
            tool_timeout: None,
        }
    }
}
