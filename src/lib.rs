//! Tether: a suspendable LLM task agent.
//!
//! An [`agent::Agent`] drives a budgeted step loop against a tool-calling
//! model. A step may suspend the run to ask a human a question; the answer
//! is later fed back as the result of the pending tool call. Skills
//! discovered from `SKILL.md` files layer instructions and lifecycle hooks
//! onto an agent at runtime, and a [`session::SessionStore`] keeps one agent
//! per session id across independent requests.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tether::prelude::*;
//!
//! # async fn example() -> tether::error::Result<()> {
//! let config = TetherConfig::load(None)?;
//! let client = Arc::new(OpenAiCompatibleClient::from_settings(&config.model)?);
//! let service = SessionService::from_config(&config, client);
//!
//! let response = service.chat(ChatRequest::new("Book a table for two")).await;
//! println!("{} ({})", response.response, response.status);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod hooks;
pub mod llm;
pub mod logging;
pub mod prelude;
pub mod session;
pub mod skills;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
