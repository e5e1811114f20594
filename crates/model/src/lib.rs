//! An abstraction layer for different LLMs.
//!
//! This crate establishes an unified protocol for the agent to talk to
//! a language model, so that the agent loop can switch between a hosted
//! completion API and a locally hosted model server without modifying
//! the core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
