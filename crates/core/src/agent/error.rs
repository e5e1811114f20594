use crate::model_client::BackendError;
use crate::tool::Error as ToolError;

/// Why a session ended without an answer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The model asked for an action that is not registered.
    #[error("unknown action `{name}` (argument: {argument:?})")]
    UnknownAction {
        /// The requested action name.
        name: String,
        /// The argument the model gave.
        argument: String,
    },
    /// A tool failed under [`ToolErrorPolicy::Abort`](super::ToolErrorPolicy).
    #[error("action `{name}` failed: {source}")]
    ActionExecution {
        /// The action name.
        name: String,
        /// The argument the action ran with.
        argument: String,
        /// The error returned by the tool.
        source: ToolError,
    },
    /// The model backend failed.
    #[error("model backend failed: {0}")]
    Backend(#[from] BackendError),
    /// No final answer within the allowed number of model calls.
    #[error("no final answer after {max_turns} model calls")]
    TurnBudgetExceeded {
        /// The exhausted budget.
        max_turns: usize,
        /// The last reply of the model, if it was called at all.
        last_reply: Option<String>,
    },
}

impl Error {
    /// Returns `true` if the session ran out of turns.
    #[inline]
    pub fn is_turn_budget_exceeded(&self) -> bool {
        matches!(self, Error::TurnBudgetExceeded { .. })
    }
}
