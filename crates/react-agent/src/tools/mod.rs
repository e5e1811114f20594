//! The built-in actions offered to the model.

mod calculator;
mod chat;
mod wikipedia;

pub use calculator::{CalculatorTool, evaluate};
pub use chat::ChatTool;
pub use wikipedia::{DEFAULT_ENDPOINT as DEFAULT_WIKIPEDIA_ENDPOINT, WikipediaTool};
