//! Grounded answer generation.
//!
//! Joins retrieved passages into one context block and asks the chat model
//! to answer from that context only.

pub mod generate;

pub use generate::{build_context, AnswerGenerator, DEFAULT_CHAT_MODEL};
