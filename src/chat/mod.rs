//! Response orchestration.
//!
//! Drives a question through the pipeline and shapes the outcome for callers.

mod events;
mod service;

pub use events::{ChatAnswer, StreamEvent};
pub use service::{ChatService, DEFAULT_LLM_TIMEOUT};
