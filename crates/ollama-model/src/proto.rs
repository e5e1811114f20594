use react_agent_model::{ModelMessage, ModelRequest, Role};
use serde::{Deserialize, Serialize};

use crate::OllamaConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatChunk {
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    pub done_reason: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Message {
    role: Role,
    content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    stream: bool,
}

#[inline]
pub fn create_request(req: &ModelRequest, config: &OllamaConfig) -> ChatRequest {
    ChatRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        stream: true,
    }
}

#[inline]
fn create_message(msg: &ModelMessage) -> Message {
    Message {
        role: msg.role(),
        content: msg.content().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::System("Seja breve.".to_owned()),
                ModelMessage::User("Qual a capital do Brasil?".to_owned()),
            ],
        };
        let payload =
            serde_json::to_value(create_request(&request, &OllamaConfig::default()))
                .unwrap();
        assert_eq!(
            payload,
            json!({
                "model": "llama3",
                "messages": [
                    { "role": "system", "content": "Seja breve." },
                    { "role": "user", "content": "Qual a capital do Brasil?" }
                ],
                "stream": true
            })
        );
    }

    #[test]
    fn test_parse_error_chunk() {
        let chunk: ChatChunk =
            serde_json::from_str(r#"{"error":"model 'llama9' not found"}"#)
                .unwrap();
        assert!(!chunk.done);
        assert_eq!(chunk.error.as_deref(), Some("model 'llama9' not found"));
    }
}
