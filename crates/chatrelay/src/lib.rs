//! Chatrelay - a chat completion relay that falls back across upstream LLM
//! providers and streams every reply in one uniform chunk format.

pub mod catalog;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod handlers;
pub mod llm;
pub mod response;
pub mod server;
pub mod stream;

#[cfg(test)]
mod testing;
