use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Langbase API settings
    pub langbase: LangbaseConfig,
    /// SQLite settings
    pub database: DatabaseConfig,
    /// Log level and format
    pub logging: LoggingConfig,
    /// HTTP timeout and retry policy
    pub request: RequestConfig,
    /// Pipe names
    pub pipes: PipeConfig,
    /// Workshop thresholds
    pub workshop: WorkshopConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    /// API key sent as a bearer token
    pub api_key: String,
    /// API base URL
    pub base_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path
    pub path: PathBuf,
    /// Connection pool size
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output
    Pretty,
    /// One JSON object per line
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

/// Langbase pipe name configuration
#[derive(Debug, Clone)]
pub struct PipeConfig {
    /// Pipe that scores an essay against the narrative rubric.
    pub analysis: String,
    /// Pipe that writes Socratic reflection prompts for one teaching issue.
    pub reflection: String,
}

/// Coaching thresholds
#[derive(Debug, Clone)]
pub struct WorkshopConfig {
    /// Minimum workspace draft length before an issue can be completed.
    pub completion_min_chars: usize,
    /// Maximum distance (in percentage points) to the next tier for a quick win.
    pub quick_win_gap: f64,
    /// Upper bound on exemplars attached to a single issue.
    pub max_examples: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY").map_err(|_| AppError::Config {
                message: "LANGBASE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let request = RequestConfig {
            timeout_ms: parse_var("REQUEST_TIMEOUT_MS", 30000),
            max_retries: parse_var("MAX_RETRIES", 3),
            retry_delay_ms: parse_var("RETRY_DELAY_MS", 1000),
        };

        let pipes = PipeConfig {
            analysis: env::var("PIPE_ANALYSIS")
                .unwrap_or_else(|_| "narrative-analysis-v1".to_string()),
            reflection: env::var("PIPE_REFLECTION")
                .unwrap_or_else(|_| "reflection-prompts-v1".to_string()),
        };

        Ok(Config {
            langbase,
            database: DatabaseConfig::from_env(),
            logging: LoggingConfig::from_env(),
            request,
            pipes,
            workshop: WorkshopConfig::from_env(),
        })
    }
}

impl DatabaseConfig {
    /// Read only the database section (no API key needed)
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/workshop.db".to_string()),
            ),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 5),
        }
    }
}

impl LoggingConfig {
    /// Read only the logging section
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        }
    }
}

impl WorkshopConfig {
    /// Read only the coaching thresholds
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Self {
            completion_min_chars: parse_var(
                "WORKSHOP_COMPLETION_MIN_CHARS",
                defaults.completion_min_chars,
            ),
            quick_win_gap: parse_var("WORKSHOP_QUICK_WIN_GAP", defaults.quick_win_gap),
            max_examples: parse_var("WORKSHOP_MAX_EXAMPLES", defaults.max_examples),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            analysis: "narrative-analysis-v1".to_string(),
            reflection: "reflection-prompts-v1".to_string(),
        }
    }
}

impl Default for WorkshopConfig {
    fn default() -> Self {
        Self {
            completion_min_chars: 50,
            quick_win_gap: 10.0,
            max_examples: 3,
        }
    }
}
