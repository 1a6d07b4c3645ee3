//! promptgrade-providers — completion-service backends.
//!
//! Implements the `CompletionService` trait for OpenAI and Ollama, the two
//! backends with native schema-constrained structured output, plus a
//! deterministic mock for testing the evaluation pipeline without real API
//! calls.

pub mod config;
pub mod error;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{create_completion, load_config, PromptgradeConfig, ProviderConfig};
pub use error::ProviderError;
