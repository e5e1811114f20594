//! Core logic of the agent: the reasoning loop, action parsing, tool
//! dispatch, prompt rendering and the model client.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod conversation;
mod model_client;
pub mod parser;
pub mod prompt;
pub mod tool;

pub use agent::{
    Agent, AgentBuilder, AgentConfig, Answer, Error, ToolErrorPolicy,
    TranscriptSource,
};
pub use model_client::{BackendError, ModelClient};
pub use parser::{ActionPolicy, ActionRequest};
pub use prompt::{FinalAnswerMatch, Language, ProtocolMarkers};
