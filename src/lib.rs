//! # Narrative Workshop
//!
//! Coaching engine for short personal-narrative essays. It turns a rubric
//! analysis from an external scoring service into a revision workflow:
//!
//! - **Version store**: append-only draft history per activity with score
//!   deltas, comparisons and JSON export/import
//! - **Teaching issues**: severity, priority rank and quick-win classification
//!   per weak rubric category, each with a transferable principle
//! - **Example matcher**: before/after exemplars chosen by category and
//!   severity from a static library
//! - **Reflection prompts**: Socratic questions per issue, cached by a
//!   fingerprint of the issue and draft with single-flight generation
//! - **Chat context**: one snapshot of the session for a conversational coach
//!
//! ## Architecture
//!
//! ```text
//! caller → Workshop → analysis backend (Langbase pipe)
//!             ├── TeachingTransformer → ExampleLibrary
//!             ├── VersionStore ──────┐
//!             ├── ReflectionPromptCache → prompt generator (Langbase pipe)
//!             │                      └── Storage (SQLite / memory)
//!             └── build_context → WorkshopChatContext
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use narrative_workshop::{Config, Workshop};
//! use narrative_workshop::rubric::ActivityContext;
//! use narrative_workshop::storage::SqliteStorage;
//! use narrative_workshop::workshop::AnalysisOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = Arc::new(SqliteStorage::new(&config.database).await?);
//!     let workshop = Workshop::from_config(&config, storage)?;
//!     let activity = ActivityContext::new("robotics", "Robotics Team");
//!     workshop
//!         .analyze_draft(&activity, "My essay...", AnalysisOptions::default())
//!         .await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Chat context aggregation for the conversational coach.
pub mod chat;
/// Command-line maintenance commands.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Before/after exemplar library.
pub mod exemplars;
/// Langbase API client and pipe-backed collaborators.
pub mod langbase;
/// System prompts for Langbase pipes.
pub mod prompts;
/// Reflection prompts and their cache.
pub mod reflection;
/// Rubric analysis model.
pub mod rubric;
/// Key-value persistence.
pub mod storage;
/// Teaching-issue derivation and lifecycle.
pub mod teaching;
/// Essay version history.
pub mod versions;
/// Session orchestration.
pub mod workshop;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use workshop::Workshop;
