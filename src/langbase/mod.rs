//! Langbase Pipes: HTTP client, wire types and the two pipe-backed
//! collaborators (rubric analysis and reflection prompts).

mod client;
mod pipes;
mod types;

pub use client::LangbaseClient;
pub use pipes::{LangbaseAnalysisBackend, LangbaseReflectionGenerator};
pub use types::{
    AnalysisCompletion, CreatePipeRequest, CreatePipeResponse, Message, MessageRole, PipeRequest,
    PipeResponse, RawResponse, ReflectionCompletion, Usage,
};
