//! An out-of-the-box agent that assembles the built-in tools and a model
//! provider.
//!
//! The crate includes a CLI tool for asking one question in the terminal.
//! You can also use it as a library to run the agent inside your own host
//! apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod session;
pub mod tools;

pub use session::{Session, SessionBuilder};

/// Re-exports of [`react_agent_core`] crate.
pub mod core {
    pub use react_agent_core::*;
}
