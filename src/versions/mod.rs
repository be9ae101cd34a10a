//! Append-only revision history per activity.
//!
//! Each activity's versions live as one JSON array (oldest first) under
//! `versions:{activity_id}` in the injected [`Storage`]. Writers for the same
//! activity are serialized through a per-activity async mutex, so "latest" is
//! always well defined; different activities never contend.

mod compare;

pub use compare::{CategoryDelta, Direction, TextDelta, VersionComparison};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppResult, StorageError, StorageResult, WorkshopError};
use crate::rubric::{AnalysisResult, RubricCategory};
use crate::storage::{get_json, set_json, Storage};

/// Storage namespace for version logs.
pub const VERSION_KEY_PREFIX: &str = "versions:";

/// Current export document format.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// Raw score for one category at save time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    /// Points awarded.
    pub score: f64,
    /// Points available.
    pub max_score: f64,
}

/// One saved draft and the analysis it received. Never mutated after saving
/// except for the student note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EssayVersion {
    /// Unique version id.
    pub id: String,
    /// Full draft text.
    pub text: String,
    /// Save time, strictly increasing within an activity.
    pub created_at: DateTime<Utc>,
    /// NQI the draft received.
    pub nqi: f64,
    /// Raw scores per category.
    pub category_scores: BTreeMap<RubricCategory, ScoreSnapshot>,
    /// Backend flags at save time.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Whitespace-separated words in `text`.
    pub word_count: usize,
    /// Analysis engine that scored this draft.
    #[serde(default)]
    pub engine: String,
    /// Student note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Optional extras supplied with a save.
#[derive(Debug, Clone, Default)]
pub struct VersionMetadata {
    /// Overrides the engine recorded on the analysis.
    pub engine: Option<String>,
    /// Student note; blank is ignored.
    pub note: Option<String>,
}

impl VersionMetadata {
    /// Set the engine identifier
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    /// Set the student note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// Score change from the first to the latest version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    /// Latest NQI minus earliest NQI.
    pub nqi_delta: f64,
    /// Delta as a percentage of the earliest NQI, 0 with a zero baseline.
    pub percent_change: f64,
}

/// Overview of an activity's history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    /// Saved versions.
    pub total_versions: usize,
    /// Most recent version.
    pub latest_version: Option<EssayVersion>,
    /// Earliest-to-latest change.
    pub improvement: Improvement,
}

impl HistorySummary {
    /// Summarize versions given most recent first.
    pub fn from_versions(versions: &[EssayVersion]) -> Self {
        let (Some(latest), Some(earliest)) = (versions.first(), versions.last()) else {
            return Self::default();
        };

        let nqi_delta = latest.nqi - earliest.nqi;
        let percent_change = if earliest.nqi == 0.0 {
            0.0
        } else {
            nqi_delta / earliest.nqi * 100.0
        };

        Self {
            total_versions: versions.len(),
            latest_version: Some(latest.clone()),
            improvement: Improvement {
                nqi_delta,
                percent_change,
            },
        }
    }
}

/// Backup document for one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionExport {
    /// Document format, currently 1.
    pub format_version: u32,
    /// Activity the versions belong to.
    pub activity_id: String,
    /// When the export was written.
    pub exported_at: DateTime<Utc>,
    /// Oldest first.
    pub versions: Vec<EssayVersion>,
}

/// Per-activity version log over a key-value store.
pub struct VersionStore {
    storage: Arc<dyn Storage>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl VersionStore {
    /// Create a store over `storage`
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Append a version for `activity_id`.
    ///
    /// Identical text is still appended since the score may differ. The
    /// timestamp is forced strictly after the previous version's.
    pub async fn save_version(
        &self,
        activity_id: &str,
        draft_text: &str,
        analysis: &AnalysisResult,
        metadata: VersionMetadata,
    ) -> StorageResult<EssayVersion> {
        let lock = self.activity_lock(activity_id);
        let _guard = lock.lock().await;

        let mut versions = self.load(activity_id).await?;

        let mut created_at = Utc::now();
        if let Some(last) = versions.last() {
            if created_at <= last.created_at {
                created_at = last.created_at + Duration::milliseconds(1);
            }
        }

        let version = EssayVersion {
            id: Uuid::new_v4().to_string(),
            text: draft_text.to_string(),
            created_at,
            nqi: analysis.nqi,
            category_scores: analysis
                .categories
                .iter()
                .map(|c| {
                    (
                        c.category,
                        ScoreSnapshot {
                            score: c.score,
                            max_score: c.max_score,
                        },
                    )
                })
                .collect(),
            flags: analysis.flags.clone(),
            word_count: draft_text.split_whitespace().count(),
            engine: metadata.engine.unwrap_or_else(|| analysis.engine.clone()),
            note: metadata.note.filter(|n| !n.trim().is_empty()),
        };

        versions.push(version.clone());
        self.store(activity_id, &versions).await?;

        info!(
            activity_id = %activity_id,
            version_id = %version.id,
            nqi = version.nqi,
            total = versions.len(),
            "Essay version saved"
        );
        Ok(version)
    }

    /// All versions, most recent first.
    pub async fn get_versions(&self, activity_id: &str) -> StorageResult<Vec<EssayVersion>> {
        let mut versions = self.load(activity_id).await?;
        versions.reverse();
        Ok(versions)
    }

    /// One version by id
    pub async fn get_version(
        &self,
        activity_id: &str,
        version_id: &str,
    ) -> StorageResult<Option<EssayVersion>> {
        Ok(self
            .load(activity_id)
            .await?
            .into_iter()
            .find(|v| v.id == version_id))
    }

    /// Count, latest version and first-to-latest improvement.
    pub async fn get_version_history_summary(
        &self,
        activity_id: &str,
    ) -> StorageResult<HistorySummary> {
        Ok(HistorySummary::from_versions(
            &self.get_versions(activity_id).await?,
        ))
    }

    /// Differences going from `from_id` to `to_id`.
    pub async fn compare_versions(
        &self,
        activity_id: &str,
        from_id: &str,
        to_id: &str,
    ) -> StorageResult<VersionComparison> {
        let versions = self.load(activity_id).await?;
        let find = |id: &str| {
            versions
                .iter()
                .find(|v| v.id == id)
                .ok_or_else(|| StorageError::VersionNotFound {
                    activity_id: activity_id.to_string(),
                    version_id: id.to_string(),
                })
        };
        Ok(VersionComparison::between(find(from_id)?, find(to_id)?))
    }

    /// Remove one version. Returns whether anything was removed.
    pub async fn delete_version(&self, activity_id: &str, version_id: &str) -> StorageResult<bool> {
        let lock = self.activity_lock(activity_id);
        let guard = lock.lock().await;

        let mut versions = self.load(activity_id).await?;
        let before = versions.len();
        versions.retain(|v| v.id != version_id);
        if versions.len() == before {
            return Ok(false);
        }

        let emptied = versions.is_empty();
        if emptied {
            self.storage.delete(&version_key(activity_id)).await?;
        } else {
            self.store(activity_id, &versions).await?;
        }
        info!(activity_id = %activity_id, version_id = %version_id, "Essay version deleted");

        if emptied {
            drop(guard);
            self.release_lock(activity_id, &lock);
        }
        Ok(true)
    }

    /// Attach or replace the note on an existing version; a blank note clears it.
    pub async fn add_version_note(
        &self,
        activity_id: &str,
        version_id: &str,
        note: &str,
    ) -> StorageResult<EssayVersion> {
        let lock = self.activity_lock(activity_id);
        let _guard = lock.lock().await;

        let mut versions = self.load(activity_id).await?;
        let version = versions
            .iter_mut()
            .find(|v| v.id == version_id)
            .ok_or_else(|| StorageError::VersionNotFound {
                activity_id: activity_id.to_string(),
                version_id: version_id.to_string(),
            })?;

        let trimmed = note.trim();
        version.note = (!trimmed.is_empty()).then(|| trimmed.to_string());
        let updated = version.clone();

        self.store(activity_id, &versions).await?;
        debug!(activity_id = %activity_id, version_id = %version_id, "Version note updated");
        Ok(updated)
    }

    /// Pretty JSON backup of every version of an activity.
    pub async fn export_activity(&self, activity_id: &str) -> StorageResult<String> {
        let document = VersionExport {
            format_version: EXPORT_FORMAT_VERSION,
            activity_id: activity_id.to_string(),
            exported_at: Utc::now(),
            versions: self.load(activity_id).await?,
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Replace an activity's history with the contents of an export document.
    ///
    /// Returns the activity id and the number of versions imported.
    pub async fn import_activity(&self, document: &str) -> AppResult<(String, usize)> {
        let export: VersionExport =
            serde_json::from_str(document).map_err(|e| WorkshopError::InvalidExport {
                message: e.to_string(),
            })?;
        let versions = validate_export(export.format_version, &export.activity_id, export.versions)?;

        let lock = self.activity_lock(&export.activity_id);
        let _guard = lock.lock().await;

        self.store(&export.activity_id, &versions).await?;
        info!(
            activity_id = %export.activity_id,
            versions = versions.len(),
            "Version history imported"
        );
        Ok((export.activity_id, versions.len()))
    }

    /// Activity ids with at least one stored version
    pub async fn activities(&self) -> StorageResult<Vec<String>> {
        Ok(self
            .storage
            .list_by_prefix(VERSION_KEY_PREFIX)
            .await?
            .into_iter()
            .filter_map(|(key, _)| key.strip_prefix(VERSION_KEY_PREFIX).map(str::to_string))
            .collect())
    }

    /// [`get_versions`](Self::get_versions) for display paths: read failures
    /// are logged and yield an empty list.
    pub async fn versions_for_display(&self, activity_id: &str) -> Vec<EssayVersion> {
        self.get_versions(activity_id).await.unwrap_or_else(|e| {
            warn!(activity_id = %activity_id, error = %e, "Failed to read version history");
            Vec::new()
        })
    }

    /// [`get_version_history_summary`](Self::get_version_history_summary) for
    /// display paths.
    pub async fn summary_for_display(&self, activity_id: &str) -> HistorySummary {
        HistorySummary::from_versions(&self.versions_for_display(activity_id).await)
    }

    fn activity_lock(&self, activity_id: &str) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(activity_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop the lock for an activity with no versions left, unless another
    /// caller still holds or waits on it. Clones are only taken under the map
    /// lock, so the count is stable while we check it.
    fn release_lock(&self, activity_id: &str, lock: &Arc<AsyncMutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let idle = locks
            .get(activity_id)
            .is_some_and(|held| Arc::ptr_eq(held, lock) && Arc::strong_count(lock) == 2);
        if idle {
            locks.remove(activity_id);
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    async fn load(&self, activity_id: &str) -> StorageResult<Vec<EssayVersion>> {
        Ok(get_json(self.storage.as_ref(), &version_key(activity_id))
            .await?
            .unwrap_or_default())
    }

    async fn store(&self, activity_id: &str, versions: &[EssayVersion]) -> StorageResult<()> {
        set_json(self.storage.as_ref(), &version_key(activity_id), versions).await
    }
}

fn version_key(activity_id: &str) -> String {
    format!("{}{}", VERSION_KEY_PREFIX, activity_id)
}

fn validate_export(
    format_version: u32,
    activity_id: &str,
    mut versions: Vec<EssayVersion>,
) -> Result<Vec<EssayVersion>, WorkshopError> {
    let invalid = |message: String| WorkshopError::InvalidExport { message };

    if format_version != EXPORT_FORMAT_VERSION {
        return Err(invalid(format!(
            "unsupported format_version {} (expected {})",
            format_version, EXPORT_FORMAT_VERSION
        )));
    }
    if activity_id.trim().is_empty() {
        return Err(invalid("activity_id is empty".to_string()));
    }

    let mut ids = HashSet::new();
    for version in &versions {
        if !ids.insert(version.id.as_str()) {
            return Err(invalid(format!("duplicate version id {}", version.id)));
        }
    }

    versions.sort_by_key(|v| v.created_at);
    // keep the log strictly increasing
    for i in 1..versions.len() {
        if versions[i].created_at <= versions[i - 1].created_at {
            versions[i].created_at = versions[i - 1].created_at + Duration::milliseconds(1);
        }
    }
    Ok(versions)
}
