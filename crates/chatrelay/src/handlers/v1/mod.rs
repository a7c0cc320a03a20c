//! V1 API handlers.

mod chat;
mod providers;

pub use chat::chat;
pub use providers::{get_provider, list_providers};
