use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// Persistence failure.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Analysis backend or prompt generator failure.
    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    /// Rejected workshop operation.
    #[error("Workshop error: {0}")]
    Workshop(#[from] WorkshopError),
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not open the database.
    #[error("Database connection failed: {message}")]
    Connection {
        /// Driver message.
        message: String,
    },

    /// A query failed.
    #[error("Query failed: {message}")]
    Query {
        /// Driver message.
        message: String,
    },

    /// Embedded migrations failed.
    #[error("Migration failed: {message}")]
    Migration {
        /// Driver message.
        message: String,
    },

    /// A stored value could not be encoded or decoded.
    #[error("Serialization failed: {message}")]
    Serialization {
        /// Serde message.
        message: String,
    },

    /// No version with this id in the activity's log.
    #[error("Version not found: {version_id} (activity {activity_id})")]
    VersionNotFound {
        /// Activity that was searched.
        activity_id: String,
        /// Requested version id.
        version_id: String,
    },

    /// Raw SQLx failure.
    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Langbase API errors (analysis backend and prompt generator failures)
#[derive(Debug, Error)]
pub enum LangbaseError {
    /// Retries exhausted.
    #[error("Langbase unavailable: {message} (retries: {retries})")]
    Unavailable {
        /// Last failure seen.
        message: String,
        /// Retries attempted.
        retries: u32,
    },

    /// Non-retryable HTTP status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// The completion did not match the expected shape.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// What was wrong.
        message: String,
    },

    /// The request exceeded its timeout.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Coaching workflow errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorkshopError {
    /// Rejected input.
    #[error("Validation failed: {field} - {reason}")]
    Validation {
        /// Offending field.
        field: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The activity has no applied analysis yet.
    #[error("No analysis recorded for activity: {activity_id}")]
    NoAnalysis {
        /// Requested activity.
        activity_id: String,
    },

    /// No issue with this id in the current report.
    #[error("Teaching issue not found: {issue_id}")]
    IssueNotFound {
        /// Requested issue.
        issue_id: String,
    },

    /// The issue's status does not allow the requested move.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// Completion needs a longer workspace draft.
    #[error("Workspace draft too short: {length} chars (minimum {minimum})")]
    DraftTooShort {
        /// Trimmed draft length in characters.
        length: usize,
        /// Required length.
        minimum: usize,
    },

    /// Reflection prompt generation failed.
    #[error("Prompt generation failed: {message}")]
    Generation {
        /// Underlying failure.
        message: String,
    },

    /// An export document could not be imported.
    #[error("Invalid export document: {message}")]
    InvalidExport {
        /// What was wrong.
        message: String,
    },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

/// Result type alias for workshop operations
pub type WorkshopResult<T> = Result<T, WorkshopError>;
