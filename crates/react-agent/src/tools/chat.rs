use react_agent_core::conversation::Conversation;
use react_agent_core::tool::{Error as ToolError, Tool, ToolResult};
use react_agent_core::{Language, ModelClient};

/// A tool that answers a question from the model's own knowledge, in a
/// separate one-shot conversation.
#[derive(Clone)]
pub struct ChatTool {
    model_client: ModelClient,
    language: Language,
}

impl ChatTool {
    /// Creates a new chat tool delegating to `model_client`.
    #[inline]
    pub fn new(model_client: ModelClient, language: Language) -> Self {
        Self {
            model_client,
            language,
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self.language {
            Language::English => {
                "You answer questions as briefly as possible, without explanations."
            }
            Language::Portuguese => {
                "Você responde as questões da maneira mais sucinta possível, sem explicações."
            }
        }
    }
}

impl Tool for ChatTool {
    fn name(&self) -> &str {
        "chat"
    }

    fn description(&self) -> &str {
        match self.language {
            Language::English => {
                r#"
Answers a question with knowledge the model already has.
ex: chat: What is the capital of Brazil?"#
            }
            Language::Portuguese => {
                r#"
Responde questão com informações já conhecidas pelo modelo.
ex: chat: Qual a capital do Brasil?"#
            }
        }
    }

    fn execute(
        &self,
        argument: String,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let model_client = self.model_client.clone();
        let mut conversation = Conversation::with_system_prompt(self.system_prompt());
        conversation.push_user(argument);
        async move {
            model_client
                .complete(conversation.messages())
                .await
                .map_err(|err| {
                    ToolError::execution_error().with_reason(format!("{err}"))
                })
        }
    }
}
