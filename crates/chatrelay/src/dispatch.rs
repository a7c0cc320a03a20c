//! Sequential fallback across upstream providers.
//!
//! Providers are tried strictly in registry order, one outbound call each.
//! The first success wins and its reply is normalized into the outgoing
//! chunk format. Per-provider failures stay internal: callers only ever see
//! [`DispatchError::InvalidInput`] or the generic [`DispatchError::Exhausted`].

use std::time::Duration;

use thiserror::Error;
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};
use ulid::Ulid;

use crate::llm::{Message, ProviderRegistry};
use crate::stream::{ByteStream, normalize};

/// The only failure message callers see once every provider is exhausted.
pub const UNAVAILABLE_MESSAGE: &str =
    "All AI services are temporarily unavailable. Please check your API keys or try again later.";

/// How one provider fared during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    /// Not called: no credential and no anonymous access.
    Skipped,
    Failed {
        status: Option<u16>,
        detail: String,
    },
}

/// Record of one provider considered during a dispatch. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderAttempt {
    pub provider: String,
    pub has_credential: bool,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Every provider failed or was skipped. Display never includes upstream detail.
    #[error("{}", UNAVAILABLE_MESSAGE)]
    Exhausted { attempts: Vec<ProviderAttempt> },
}

/// A successful dispatch.
pub struct Dispatch {
    /// Id of the provider that answered.
    pub provider: String,
    /// Reply in the outgoing chunk format.
    pub stream: ByteStream,
    pub attempts: Vec<ProviderAttempt>,
}

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub chunk_delay: Duration,
    pub error_excerpt_chars: usize,
    /// Limit on one provider call, up to the point its reply is handed back.
    /// Streamed bodies are not bounded by it.
    pub attempt_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            chunk_delay: Duration::from_millis(30),
            error_excerpt_chars: 200,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// Tries providers in priority order until one succeeds.
#[derive(Clone)]
pub struct Dispatcher {
    registry: ProviderRegistry,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(registry: ProviderRegistry, options: DispatchOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, messages: &[Message]) -> Result<Dispatch, DispatchError> {
        if messages.is_empty() {
            return Err(DispatchError::InvalidInput(
                "conversation must contain at least one message".to_string(),
            ));
        }

        let span = info_span!(
            "dispatch",
            request_id = %Ulid::new(),
            messages = messages.len()
        );
        self.run(messages).instrument(span).await
    }

    async fn run(&self, messages: &[Message]) -> Result<Dispatch, DispatchError> {
        let mut attempts = Vec::with_capacity(self.registry.len());

        for provider in self.registry.iter() {
            let id = provider.id().to_string();
            let has_credential = provider.has_credential();

            if !has_credential && !provider.allows_anonymous() {
                info!(provider = %id, "Skipping provider without credential");
                attempts.push(ProviderAttempt {
                    provider: id,
                    has_credential,
                    outcome: AttemptOutcome::Skipped,
                });
                continue;
            }

            debug!(provider = %id, has_credential, "Attempting provider");
            let limit = self.options.attempt_timeout;
            let result = match timeout(limit, provider.send(messages)).await {
                Ok(result) => result.map_err(|e| (e.status(), e.to_string())),
                // Elapsed counts as a network failure.
                Err(_) => Err((None, format!("no reply within {}ms", limit.as_millis()))),
            };

            match result {
                Ok(reply) => {
                    info!(provider = %id, reply = reply.kind(), "Provider succeeded");
                    attempts.push(ProviderAttempt {
                        provider: id.clone(),
                        has_credential,
                        outcome: AttemptOutcome::Success,
                    });
                    return Ok(Dispatch {
                        provider: id,
                        stream: normalize(reply, self.options.chunk_delay),
                        attempts,
                    });
                }
                Err((status, message)) => {
                    let detail = excerpt(&message, self.options.error_excerpt_chars);
                    warn!(provider = %id, ?status, error = %detail, "Provider failed, falling back");
                    attempts.push(ProviderAttempt {
                        provider: id,
                        has_credential,
                        outcome: AttemptOutcome::Failed { status, detail },
                    });
                }
            }
        }

        let failed = attempts
            .iter()
            .filter(|a| matches!(a.outcome, AttemptOutcome::Failed { .. }))
            .count();
        error!(
            providers = attempts.len(),
            failed, "All providers failed or were skipped"
        );
        Err(DispatchError::Exhausted { attempts })
    }
}

/// Cut `text` to at most `max_chars` characters.
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}
