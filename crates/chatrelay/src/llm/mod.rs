//! LLM provider adapters for chat completions.

mod cohere;
mod error;
mod gemini;
mod huggingface;
mod openai;
mod provider;
mod registry;
mod types;

pub use cohere::CohereProvider;
pub use error::LLMError;
pub use gemini::GeminiProvider;
pub use huggingface::HuggingFaceProvider;
pub use openai::OpenAICompatibleProvider;
pub use provider::{LLMProvider, ProviderKind, ProviderOptions, ProviderReply};
pub use registry::ProviderRegistry;
pub use types::{Message, Role};
