mod builder;
mod config;
mod error;
mod state;

use std::fmt::{self, Debug};
use std::sync::Arc;

use tracing::Instrument;

use crate::model_client::ModelClient;
use crate::tool::ToolRegistry;
pub use builder::AgentBuilder;
pub use config::{AgentConfig, ToolErrorPolicy};
pub use error::Error;
use state::Session;

type TranscriptFn = Arc<dyn Fn(&str, TranscriptSource) + Send + Sync>;

/// Where a piece of transcript comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranscriptSource {
    /// The question asked by the user.
    User,
    /// A reply written by the model.
    Assistant,
    /// An observation produced by running actions.
    Observation,
}

/// The outcome of a successful [`Agent::ask`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Answer {
    /// The reply in which the model concluded.
    pub reply: String,
    /// The answer text: what follows the final-answer marker, or the whole
    /// reply when the model answered without any marker.
    pub answer: String,
    /// How many model calls were made.
    pub turns: usize,
}

/// An agent that answers questions by alternating model calls and tool
/// executions.
///
/// The agent itself holds no conversation state: every [`Agent::ask`] runs
/// a fresh session, so one agent may serve concurrent questions.
#[derive(Clone)]
pub struct Agent {
    model_client: ModelClient,
    tools: Arc<ToolRegistry>,
    config: Arc<AgentConfig>,
    on_transcript: Option<TranscriptFn>,
}

impl Agent {
    fn from_builder(builder: AgentBuilder) -> Self {
        let AgentBuilder {
            model_client,
            tools,
            config,
            on_transcript,
        } = builder;
        Self {
            model_client,
            tools: Arc::new(tools),
            config: Arc::new(config),
            on_transcript,
        }
    }

    /// Returns the configuration of this agent.
    #[inline]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Returns the tools available to the model.
    #[inline]
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Runs a session for `question` until the model gives a final answer.
    ///
    /// # Errors
    ///
    /// Fails when the model asks for an unregistered action, when the
    /// backend fails, when a tool fails under [`ToolErrorPolicy::Abort`],
    /// or when no answer is reached within [`AgentConfig::max_turns`]
    /// model calls.
    pub async fn ask(&self, question: &str) -> Result<Answer, Error> {
        Session::new(self)
            .run(question)
            .instrument(debug_span!("agent session"))
            .await
    }

    fn emit(&self, text: &str, source: TranscriptSource) {
        if let Some(on_transcript) = &self.on_transcript {
            on_transcript(text, source);
        }
    }
}

impl Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("model_client", &self.model_client)
            .field("tools", &self.tools)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
