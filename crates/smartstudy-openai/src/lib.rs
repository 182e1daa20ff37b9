// OpenAI-compatible Driver Implementation
//
// This crate implements the LlmDriver trait from smartstudy-core over the
// OpenAI chat completions protocol, so the assistant can talk to Groq,
// OpenAI or any compatible gateway.

mod driver;
mod types;

pub use driver::{OpenAiCompatibleDriver, DEFAULT_API_URL};
pub use types::{ChatMessage, ChatRequest, ChatResponse};

// Re-export core types for convenience
pub use smartstudy_core::{LlmDriver, LlmError};
