use react_agent_model::ModelMessage;

use super::{Agent, Answer, Error, ToolErrorPolicy, TranscriptSource};
use crate::conversation::Conversation;
use crate::parser::{ActionParser, ActionRequest};
use crate::prompt::{
    format_failure, format_observation, render_extraction_prompt,
    render_instructions,
};
use crate::tool::{Error as ToolError, ToolHandle};

/// What a session does after a model reply has been handled.
#[derive(Debug, PartialEq, Eq)]
enum AgentStage {
    /// Feed this message back to the model.
    Observing(String),
    /// The session is over.
    Done(Answer),
}

/// The state of one question: the conversation and the calls spent.
pub(super) struct Session<'a> {
    agent: &'a Agent,
    parser: ActionParser,
    conversation: Conversation,
    turns: usize,
    last_reply: Option<String>,
}

impl<'a> Session<'a> {
    pub(super) fn new(agent: &'a Agent) -> Self {
        let config = agent.config();
        let instructions =
            render_instructions(&config.markers, &agent.tools().describe_all());
        Self {
            agent,
            parser: ActionParser::new(&config.markers.action, config.action_policy),
            conversation: Conversation::with_system_prompt(instructions),
            turns: 0,
            last_reply: None,
        }
    }

    pub(super) async fn run(mut self, question: &str) -> Result<Answer, Error> {
        self.push_user(question, TranscriptSource::User);
        loop {
            let reply = self.call_model().await?;
            self.conversation.push_assistant(reply.as_str());
            self.agent.emit(&reply, TranscriptSource::Assistant);

            match self.handle_reply(reply).await? {
                AgentStage::Done(answer) => {
                    info!(turns = answer.turns, "session finished");
                    return Ok(answer);
                }
                AgentStage::Observing(observation) => {
                    self.push_user(&observation, TranscriptSource::Observation);
                }
            }
        }
    }

    fn push_user(&mut self, text: &str, source: TranscriptSource) {
        self.conversation.push_user(text);
        self.agent.emit(text, source);
    }

    /// Spends one turn of the budget on a model call with the current
    /// history.
    async fn call_model(&mut self) -> Result<String, Error> {
        self.reserve_turn()?;
        let messages = self.conversation.messages().to_vec();
        self.complete(&messages).await
    }

    fn reserve_turn(&mut self) -> Result<(), Error> {
        let max_turns = self.agent.config().max_turns;
        if self.turns >= max_turns {
            warn!(max_turns, "turn budget exhausted");
            return Err(Error::TurnBudgetExceeded {
                max_turns,
                last_reply: self.last_reply.take(),
            });
        }
        self.turns += 1;
        Ok(())
    }

    async fn complete(&mut self, messages: &[ModelMessage]) -> Result<String, Error> {
        debug!(turn = self.turns, messages = messages.len(), "calling model");
        let reply = self.agent.model_client.complete(messages).await?;
        trace!("model replied: {reply}");
        self.last_reply = Some(reply.clone());
        Ok(reply)
    }

    async fn handle_reply(&mut self, reply: String) -> Result<AgentStage, Error> {
        let agent = self.agent;
        let markers = &agent.config().markers;
        if let Some(answer) = markers.find_final_answer(&reply) {
            return Ok(self.finish(reply, Some(answer)));
        }

        let requests = self.parser.parse(&reply);
        if requests.is_empty() {
            // The model answered without following the protocol.
            return Ok(self.finish(reply, None));
        }

        let tools = requests
            .iter()
            .map(|request| self.resolve(request))
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = Vec::with_capacity(requests.len());
        for (request, tool) in requests.into_iter().zip(tools) {
            let result = self.run_action(&request, tool).await?;
            results.push((request, result));
        }
        let observation = format_observation(markers, &results);

        if agent.config().extraction_step {
            return self.extract(observation).await;
        }
        Ok(AgentStage::Observing(observation))
    }

    fn finish(&self, reply: String, answer: Option<String>) -> AgentStage {
        let answer = answer
            .filter(|answer| !answer.is_empty())
            .unwrap_or_else(|| reply.trim().to_owned());
        AgentStage::Done(Answer {
            reply,
            answer,
            turns: self.turns,
        })
    }

    fn resolve(&self, request: &ActionRequest) -> Result<ToolHandle, Error> {
        self.agent.tools().resolve(&request.name).map_err(|err| {
            warn!("model asked for an unknown action: {}", err.name);
            Error::UnknownAction {
                name: err.name,
                argument: request.argument.clone(),
            }
        })
    }

    async fn run_action(
        &self,
        request: &ActionRequest,
        tool: ToolHandle,
    ) -> Result<String, Error> {
        let config = self.agent.config();
        info!(action = %request.name, argument = %request.argument, "running action");

        let fut = tool.execute(request.argument.clone());
        let result = match config.tool_timeout {
            Some(timeout) => tokio::time::timeout(timeout, fut)
                .await
                .unwrap_or_else(|_| {
                    Err(ToolError::timeout()
                        .with_reason(format!("no result within {timeout:?}")))
                }),
            None => fut.await,
        };

        match result {
            Ok(text) => Ok(text),
            Err(err) => match config.tool_error_policy {
                ToolErrorPolicy::Abort => Err(Error::ActionExecution {
                    name: request.name.clone(),
                    argument: request.argument.clone(),
                    source: err,
                }),
                ToolErrorPolicy::Observe => {
                    warn!(action = %request.name, "action failed: {err}");
                    Ok(format_failure(&config.markers, request, &err))
                }
            },
        }
    }

    /// Asks the model whether the observation already answers the question.
    ///
    /// The extraction prompt is not kept in the history, only its outcome.
    async fn extract(&mut self, observation: String) -> Result<AgentStage, Error> {
        let agent = self.agent;
        if self.turns >= agent.config().max_turns {
            debug!("no turn left for extraction");
            return Ok(AgentStage::Observing(observation));
        }
        self.turns += 1;

        let markers = &agent.config().markers;
        let mut messages = self.conversation.messages().to_vec();
        messages.push(ModelMessage::User(render_extraction_prompt(
            markers,
            &observation,
        )));
        let summary = self.complete(&messages).await?;

        if let Some(answer) = markers.find_final_answer(&summary) {
            return Ok(self.finish(summary, Some(answer)));
        }
        Ok(AgentStage::Observing(format!(
            "{}: {}",
            markers.observation,
            summary.trim()
        )))
    }
}
