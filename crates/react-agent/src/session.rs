use std::time::Duration;

use backoff::ExponentialBackoff;
use react_agent_core::{
    ActionPolicy, Agent, AgentBuilder, AgentConfig, Answer, Error, Language,
    ModelClient, ProtocolMarkers, ToolErrorPolicy, TranscriptSource,
};
use react_agent_model::ModelProvider;

use crate::tools::*;

type TranscriptFn = Box<dyn Fn(&str, TranscriptSource) + Send + Sync>;

/// A session builder.
///
/// See [`Session`].
pub struct SessionBuilder {
    model_client: ModelClient,
    language: Language,
    config: AgentConfig,
    call_timeout: Option<Duration>,
    retry: Option<ExponentialBackoff>,
    wikipedia_endpoint: Option<String>,
    on_transcript: Option<TranscriptFn>,
}

impl SessionBuilder {
    /// Creates a session builder with a specified model provider.
    pub fn with_model_provider<M: ModelProvider + 'static>(
        provider: M,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            language: Language::Portuguese,
            config: AgentConfig::default(),
            call_timeout: None,
            retry: None,
            wikipedia_endpoint: None,
            on_transcript: None,
        }
    }

    /// Sets the language of the instructions, protocol keywords and tool
    /// descriptions. Portuguese by default.
    #[inline]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
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

    /// Limits the duration of every model call, delegated chats included.
    #[inline]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Retries model calls that failed with a transient error.
    #[inline]
    pub fn with_retry(mut self, backoff: ExponentialBackoff) -> Self {
        self.retry = Some(backoff);
        self
    }

    /// Sets the MediaWiki API endpoint of the `wikipedia` action.
    #[inline]
    pub fn with_wikipedia_endpoint<S: Into<String>>(
        mut self,
        endpoint: S,
    ) -> Self {
        self.wikipedia_endpoint = Some(endpoint.into());
        self
    }

    /// Attaches a callback to be invoked when a transcript is generated.
    #[inline]
    pub fn on_transcript(
        mut self,
        on_transcript: impl Fn(&str, TranscriptSource) + Send + Sync + 'static,
    ) -> Self {
        self.on_transcript = Some(Box::new(on_transcript));
        self
    }

    /// Builds a new session.
    pub fn build(self) -> Session {
        let Self {
            mut model_client,
            language,
            mut config,
            call_timeout,
            retry,
            wikipedia_endpoint,
            on_transcript,
        } = self;

        if let Some(timeout) = call_timeout {
            model_client = model_client.with_timeout(timeout);
        }
        if let Some(backoff) = retry {
            model_client = model_client.with_retry(backoff);
        }
        config.markers = ProtocolMarkers::for_language(language);

        let mut wikipedia = WikipediaTool::new(language);
        if let Some(endpoint) = wikipedia_endpoint {
            wikipedia = wikipedia.with_endpoint(endpoint);
        }

        let mut agent_builder = AgentBuilder::with_model_client(model_client.clone())
            .with_config(config)
            .with_tool(CalculatorTool::new(language))
            .with_tool(wikipedia)
            .with_tool(ChatTool::new(model_client, language));
        if let Some(on_transcript) = on_transcript {
            agent_builder = agent_builder.on_transcript(on_transcript);
        }
        let agent = agent_builder.build();
        debug!("session ready with actions: {:?}", agent.tools().names());

        Session { agent }
    }
}

/// A question-answering session.
///
/// The session holds a fully configured agent that you can use directly,
/// and it is basically a wrapper around [`Agent`]. Every question starts
/// from a fresh conversation.
#[derive(Clone, Debug)]
pub struct Session {
    agent: Agent,
}

impl Session {
    /// Asks a question and waits for the final answer.
    #[inline]
    pub async fn ask(&self, question: &str) -> Result<Answer, Error> {
        self.agent.ask(question).await
    }

    /// Returns the underlying agent.
    #[inline]
    pub fn agent(&self) -> &Agent {
        &self.agent
    }
}

#[cfg(test)]
mod tests {
    use react_agent_test_model::TestModelProvider;

    use super::*;

    #[tokio::test]
    async fn test_calculation_scenario() {
        let mut provider = TestModelProvider::default();
        provider.add_text_response(
            "Pensamento: Preciso calcular.\nAção: calcular: 4 * 7 / 3\nPAUSA",
        );
        provider.add_text_response("Resposta: 9.333333333333334");

        let session = SessionBuilder::with_model_provider(provider.clone()).build();
        let answer = session.ask("Quanto é 4 * 7 / 3?").await.unwrap();
        assert_eq!(answer.answer, "9.333333333333334");
        assert_eq!(answer.turns, 2);

        let requests = provider.requests();
        assert_eq!(
            requests[1].messages[3].content(),
            "Observação: 9.333333333333334"
        );
    }

    #[tokio::test]
    async fn test_delegated_chat_scenario() {
        let mut provider = TestModelProvider::default();
        provider.add_text_response("Ação: chat: Qual a capital do Brasil?\nPAUSA");
        // Consumed by the delegated conversation.
        provider.add_text_response("Brasília");
        provider.add_text_response("Resposta: Brasília");

        let session = SessionBuilder::with_model_provider(provider.clone()).build();
        let answer = session.ask("Qual a capital do Brasil?").await.unwrap();
        assert_eq!(answer.answer, "Brasília");
        assert_eq!(answer.turns, 2);

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].messages.len(), 2);
        assert_eq!(requests[2].messages[3].content(), "Observação: Brasília");
    }

    #[tokio::test]
    async fn test_english_preset() {
        let mut provider = TestModelProvider::default();
        provider.add_text_response("Final Answer: 6");

        let session = SessionBuilder::with_model_provider(provider.clone())
            .with_language(Language::English)
            .build();
        assert_eq!(
            session.agent().tools().names(),
            ["calculate", "wikipedia", "chat"]
        );
        let answer = session.ask("What is 2 * 3?").await.unwrap();
        assert_eq!(answer.answer, "6");

        let system_prompt = provider.requests()[0].messages[0].content().to_owned();
        assert!(system_prompt.contains("calculate:\nRuns a calculation"));
        assert!(system_prompt.contains("Final Answer: Paris"));
    }
}
