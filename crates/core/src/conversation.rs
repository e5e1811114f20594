//! Conversation-related types.

use react_agent_model::{ModelMessage, ModelRequest};

/// The ordered history of one session, which is exactly the context sent
/// to the model on every call.
///
/// A conversation holds at most one system message, and it is always the
/// first one. Messages are only ever appended: nothing is removed or
/// reordered once pushed.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    messages: Vec<ModelMessage>,
}

impl Conversation {
    /// Creates an empty conversation without system instructions.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation seeded with the system instructions.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(prompt: S) -> Self {
        Self {
            messages: vec![ModelMessage::System(prompt.into())],
        }
    }

    /// Appends a user message, which is either the question or an
    /// observation fed back to the model.
    #[inline]
    pub fn push_user<S: Into<String>>(&mut self, content: S) {
        self.messages.push(ModelMessage::User(content.into()));
    }

    /// Appends a reply from the model.
    #[inline]
    pub fn push_assistant<S: Into<String>>(&mut self, content: S) {
        self.messages.push(ModelMessage::Assistant(content.into()));
    }

    /// Returns all messages in order.
    #[inline]
    pub fn messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Returns the most recently appended message.
    #[inline]
    pub fn last(&self) -> Option<&ModelMessage> {
        self.messages.last()
    }

    /// Returns the number of messages, the system message included.
    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if nothing has been appended yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Builds a model request carrying the whole history.
    #[inline]
    pub fn to_request(&self) -> ModelRequest {
        ModelRequest {
            messages: self.messages.clone(),
        }
    }
}
