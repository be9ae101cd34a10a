//! Command-line maintenance over persisted workshop state.
//!
//! Everything here works from storage alone, so no Langbase credentials are
//! needed.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;

use crate::reflection::clear_persisted_prompts;
use crate::storage::Storage;
use crate::versions::{Direction, VersionStore};

/// Workshop CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum WorkshopCommands {
    /// List saved versions of an activity, newest first
    Versions {
        /// Activity id
        activity_id: String,
    },

    /// Show version count and score improvement for an activity
    Summary {
        /// Activity id
        activity_id: String,
    },

    /// Compare two versions of an activity
    Compare {
        /// Activity id
        activity_id: String,
        /// Older version id
        from: String,
        /// Newer version id
        to: String,
    },

    /// Attach or replace a note on a version
    Note {
        /// Activity id
        activity_id: String,
        /// Version id
        version_id: String,
        /// Note text; empty clears the note
        text: String,
    },

    /// Delete one version
    Delete {
        /// Activity id
        activity_id: String,
        /// Version id
        version_id: String,
    },

    /// Write an activity's history as JSON
    Export {
        /// Activity id
        activity_id: String,
        /// Output file (stdout when omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Replace an activity's history from an export file
    Import {
        /// Export file
        input: PathBuf,
    },

    /// Remove cached reflection prompts
    ClearCache {
        /// Only clear prompts for this issue id
        #[arg(long)]
        issue: Option<String>,
    },
}

/// Result of CLI command execution.
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }
}

/// Execute a workshop CLI command.
pub async fn execute_command(command: WorkshopCommands, storage: Arc<dyn Storage>) -> CliResult {
    let versions = VersionStore::new(storage.clone());

    match command {
        WorkshopCommands::Versions { activity_id } => execute_versions(&versions, &activity_id).await,
        WorkshopCommands::Summary { activity_id } => execute_summary(&versions, &activity_id).await,
        WorkshopCommands::Compare {
            activity_id,
            from,
            to,
        } => execute_compare(&versions, &activity_id, &from, &to).await,
        WorkshopCommands::Note {
            activity_id,
            version_id,
            text,
        } => match versions.add_version_note(&activity_id, &version_id, &text).await {
            Ok(v) => CliResult::success(format!(
                "Note on {}: {}",
                v.id,
                v.note.as_deref().unwrap_or("(cleared)")
            )),
            Err(e) => CliResult::error(format!("Failed to update note: {}", e)),
        },
        WorkshopCommands::Delete {
            activity_id,
            version_id,
        } => match versions.delete_version(&activity_id, &version_id).await {
            Ok(true) => CliResult::success(format!("Deleted version {}", version_id)),
            Ok(false) => CliResult::error(format!("No version {} for {}", version_id, activity_id)),
            Err(e) => CliResult::error(format!("Failed to delete version: {}", e)),
        },
        WorkshopCommands::Export {
            activity_id,
            output,
        } => execute_export(&versions, &activity_id, output).await,
        WorkshopCommands::Import { input } => execute_import(&versions, input).await,
        WorkshopCommands::ClearCache { issue } => {
            match clear_persisted_prompts(storage.as_ref(), issue.as_deref()).await {
                Ok(count) => CliResult::success(format!("Removed {} cached prompt sets", count)),
                Err(e) => CliResult::error(format!("Failed to clear cache: {}", e)),
            }
        }
    }
}

async fn execute_versions(store: &VersionStore, activity_id: &str) -> CliResult {
    let versions = match store.get_versions(activity_id).await {
        Ok(v) => v,
        Err(e) => return CliResult::error(format!("Failed to read versions: {}", e)),
    };
    if versions.is_empty() {
        return CliResult::success(format!("No versions saved for {}", activity_id));
    }

    let mut output = format!("Versions of {} ({})\n", activity_id, versions.len());
    for version in &versions {
        output.push_str(&format!(
            "  {}  {}  NQI {:>5.1}  {:>4} words  {}{}\n",
            version.id,
            version.created_at.format("%Y-%m-%d %H:%M:%S"),
            version.nqi,
            version.word_count,
            version.engine,
            version
                .note
                .as_ref()
                .map(|n| format!("  \"{}\"", n))
                .unwrap_or_default()
        ));
    }
    CliResult::success(output)
}

async fn execute_summary(store: &VersionStore, activity_id: &str) -> CliResult {
    match store.get_version_history_summary(activity_id).await {
        Ok(summary) => {
            let latest = summary
                .latest_version
                .as_ref()
                .map(|v| format!("{} (NQI {:.1})", v.id, v.nqi))
                .unwrap_or_else(|| "-".to_string());
            CliResult::success(format!(
                "Activity: {}\nVersions: {}\nLatest: {}\nImprovement: {:+.1} NQI ({:+.1}%)",
                activity_id,
                summary.total_versions,
                latest,
                summary.improvement.nqi_delta,
                summary.improvement.percent_change
            ))
        }
        Err(e) => CliResult::error(format!("Failed to summarize history: {}", e)),
    }
}

async fn execute_compare(store: &VersionStore, activity_id: &str, from: &str, to: &str) -> CliResult {
    let comparison = match store.compare_versions(activity_id, from, to).await {
        Ok(c) => c,
        Err(e) => return CliResult::error(format!("Failed to compare versions: {}", e)),
    };

    let mut output = format!(
        "NQI {:+.1}\nText +{} / -{} chars (net {:+})\n",
        comparison.nqi_delta, comparison.text.added, comparison.text.removed, comparison.text.net
    );
    for delta in &comparison.category_deltas {
        let arrow = match delta.direction {
            Direction::Up => "↑",
            Direction::Down => "↓",
            Direction::Same => "=",
        };
        output.push_str(&format!(
            "  {} {:<14} {:>5.1} -> {:>5.1} ({:+.1})\n",
            arrow,
            delta.category.as_str(),
            delta.from_score,
            delta.to_score,
            delta.delta
        ));
    }
    CliResult::success(output)
}

async fn execute_export(store: &VersionStore, activity_id: &str, output: Option<PathBuf>) -> CliResult {
    let document = match store.export_activity(activity_id).await {
        Ok(d) => d,
        Err(e) => return CliResult::error(format!("Failed to export: {}", e)),
    };
    match output {
        Some(path) => match tokio::fs::write(&path, &document).await {
            Ok(()) => CliResult::success(format!("Exported {} to {}", activity_id, path.display())),
            Err(e) => CliResult::error(format!("Failed to write {}: {}", path.display(), e)),
        },
        None => CliResult::success(document),
    }
}

async fn execute_import(store: &VersionStore, input: PathBuf) -> CliResult {
    let document = match tokio::fs::read_to_string(&input).await {
        Ok(d) => d,
        Err(e) => return CliResult::error(format!("Failed to read {}: {}", input.display(), e)),
    };
    match store.import_activity(&document).await {
        Ok((activity_id, count)) => {
            CliResult::success(format!("Imported {} versions for {}", count, activity_id))
        }
        Err(e) => CliResult::error(format!("Import failed: {}", e)),
    }
}
