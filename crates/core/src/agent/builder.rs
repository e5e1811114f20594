use std::sync::Arc;
use std::time::Duration;

use react_agent_model::ModelProvider;

use super::{Agent, AgentConfig, ToolErrorPolicy, TranscriptFn, TranscriptSource};
use crate::model_client::ModelClient;
use crate::parser::ActionPolicy;
use crate::prompt::ProtocolMarkers;
use crate::tool::{Tool, ToolRegistry};

/// [`Agent`] builder.
pub struct AgentBuilder {
    pub(super) model_client: ModelClient,
    pub(super) tools: ToolRegistry,
    pub(super) config: AgentConfig,
    pub(super) on_transcript: Option<TranscriptFn>,
}

impl AgentBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self::with_model_client(ModelClient::new(provider))
    }

    /// Creates a new builder with an already configured model client.
    #[inline]
    pub fn with_model_client(model_client: ModelClient) -> Self {
        Self {
            model_client,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
            on_transcript: None,
        }
    }

    /// Registers a tool. A tool with the same name is replaced.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.tools.register(tool);
        self
    }

    /// Replaces all registered tools.
    #[inline]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Replaces the whole configuration.
    #[inline]
    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the maximum number of model calls per question.
    #[inline]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.config.max_turns = max_turns;
        self
    }

    /// Sets how many actions of one reply are executed.
    #[inline]
    pub fn with_action_policy(mut self, policy: ActionPolicy) -> Self {
        self.config.action_policy = policy;
        self
    }

    /// Sets the protocol keywords.
    #[inline]
    pub fn with_markers(mut self, markers: ProtocolMarkers) -> Self {
        self.config.markers = markers;
        self
    }

    /// Enables or disables the extraction call after each observation.
    #[inline]
    pub fn with_extraction_step(mut self, enabled: bool) -> Self {
        self.config.extraction_step = enabled;
        self
    }

    /// Sets what happens when a tool fails.
    #[inline]
    pub fn with_tool_error_policy(mut self, policy: ToolErrorPolicy) -> Self {
        self.config.tool_error_policy = policy;
        self
    }

    /// Limits the duration of every tool execution.
    #[inline]
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = Some(timeout);
        self
    }

    /// Attaches a callback invoked with every message appended to the
    /// conversation.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Arc::new(on_transcript));
        self
    }

    /// Builds the agent.
    #[inline]
    pub fn build(self) -> Agent {
        Agent::from_builder(self)
    }
}
