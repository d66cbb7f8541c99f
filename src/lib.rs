//! FPL Assistant - Fantasy Premier League chat backed by hosted LLMs
//!
//! Each turn fetches public FPL statistics, formats them into a prompt,
//! forwards the prompt (optionally with a team screenshot) to `OpenAI` or
//! Gemini and returns the reply through one of two front-ends.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Front-ends                        │
//! │        HTTP JSON / SSE (api)  │  Terminal (repl)    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Assistant                           │
//! │   fpl  │  prompt  │  session  │  tokens  │  image  │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Model client (llm)                      │
//! │          OpenAI  →  Gemini  →  text-only             │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod assistant;
pub mod config;
pub mod error;
pub mod fpl;
pub mod image_ops;
pub mod llm;
pub mod prompt;
pub mod repl;
pub mod session;
pub mod setup;
pub mod tokens;

pub use assistant::{Assistant, ChatRequest, FetchPolicy};
pub use config::Config;
pub use error::{Error, Result};
pub use session::{InMemorySessionStore, Message, Role, SessionStore};
