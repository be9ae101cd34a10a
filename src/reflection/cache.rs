use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Instant;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::{
    prompt_fingerprint, GenerationConfig, IssueDescriptor, PromptDepth, PromptTone,
    ReflectionGenerator, ReflectionPromptSet, ReflectionRequest,
};
use crate::error::{StorageResult, WorkshopError, WorkshopResult};
use crate::rubric::ActivityContext;
use crate::storage::{get_json, set_json, Storage};
use crate::teaching::TeachingIssue;

/// Storage namespace for persisted prompt sets.
pub const REFLECTION_KEY_PREFIX: &str = "reflection:";

type SharedOutcome = Result<Arc<ReflectionPromptSet>, WorkshopError>;

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Resolved sets held in memory.
    pub entries: usize,
    /// Generations currently running.
    pub in_flight: usize,
    /// Lookups answered without generating.
    pub hits: u64,
    /// Generations started.
    pub generator_calls: u64,
}

/// Fingerprint-keyed cache of reflection prompt sets.
///
/// Hits are answered from memory without touching the generator. Misses for
/// the same fingerprint that overlap in time share one generator call: the
/// first caller becomes the leader and broadcasts its outcome to everyone
/// who arrived while it was pending. Entries never expire; they leave only
/// through [`clear`](Self::clear) or [`invalidate_issue`](Self::invalidate_issue).
pub struct ReflectionPromptCache {
    generator: Arc<dyn ReflectionGenerator>,
    /// Optional write-through persistence.
    storage: Option<Arc<dyn Storage>>,
    entries: RwLock<HashMap<String, Arc<ReflectionPromptSet>>>,
    in_flight: Mutex<HashMap<String, broadcast::Sender<SharedOutcome>>>,
    hits: AtomicU64,
    generator_calls: AtomicU64,
}

impl ReflectionPromptCache {
    /// Create a memory-only cache
    pub fn new(generator: Arc<dyn ReflectionGenerator>) -> Self {
        Self {
            generator,
            storage: None,
            entries: RwLock::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            generator_calls: AtomicU64::new(0),
        }
    }

    /// Persist generated sets to `storage` and read through it on a miss
    pub fn with_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Return the prompt set for `issue` against `draft_text`, generating it
    /// on a miss.
    pub async fn generate_reflection_prompts_with_cache(
        &self,
        issue: &TeachingIssue,
        activity: &ActivityContext,
        draft_text: &str,
    ) -> WorkshopResult<Arc<ReflectionPromptSet>> {
        let key = prompt_fingerprint(&issue.id, &issue.problem.from_draft, draft_text);

        loop {
            let waiter = {
                let mut in_flight = lock(&self.in_flight);
                // checked under the in-flight lock so a leader finishing between
                // the lookup and registration is still seen as a hit
                if let Some(hit) = self.cached(&key) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(issue_id = %issue.id, fingerprint = %key, "Reflection prompt cache hit");
                    return Ok(hit);
                }
                match in_flight.get(&key) {
                    Some(sender) => Some(sender.subscribe()),
                    None => {
                        let (sender, _) = broadcast::channel(1);
                        in_flight.insert(key.clone(), sender);
                        None
                    }
                }
            };

            let Some(mut receiver) = waiter else {
                return self.lead(key, issue, activity, draft_text).await;
            };

            debug!(issue_id = %issue.id, fingerprint = %key, "Joining in-flight prompt generation");
            match receiver.recv().await {
                Ok(outcome) => return outcome,
                // leader was cancelled before finishing; try again
                Err(_) => continue,
            }
        }
    }

    /// Cached set for an issue and draft, without generating.
    pub fn peek(&self, issue: &TeachingIssue, draft_text: &str) -> Option<Arc<ReflectionPromptSet>> {
        self.cached(&prompt_fingerprint(
            &issue.id,
            &issue.problem.from_draft,
            draft_text,
        ))
    }

    /// Drop every cached set, in memory and in storage.
    pub async fn clear(&self) -> StorageResult<usize> {
        let removed_memory = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let count = entries.len();
            entries.clear();
            count
        };
        let removed_stored = match &self.storage {
            Some(storage) => clear_persisted_prompts(storage.as_ref(), None).await?,
            None => 0,
        };
        info!(
            memory = removed_memory,
            stored = removed_stored,
            "Reflection prompt cache cleared"
        );
        Ok(removed_memory.max(removed_stored))
    }

    /// Drop every cached set for one issue.
    pub async fn invalidate_issue(&self, issue_id: &str) -> StorageResult<usize> {
        let prefix = format!("{}:", issue_id);
        let removed_memory = {
            let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
            let before = entries.len();
            entries.retain(|k, _| !k.starts_with(&prefix));
            before - entries.len()
        };
        let removed_stored = match &self.storage {
            Some(storage) => clear_persisted_prompts(storage.as_ref(), Some(issue_id)).await?,
            None => 0,
        };
        Ok(removed_memory.max(removed_stored))
    }

    /// Current counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.read().unwrap_or_else(|e| e.into_inner()).len(),
            in_flight: lock(&self.in_flight).len(),
            hits: self.hits.load(Ordering::Relaxed),
            generator_calls: self.generator_calls.load(Ordering::Relaxed),
        }
    }

    fn cached(&self, key: &str) -> Option<Arc<ReflectionPromptSet>> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    async fn lead(
        &self,
        key: String,
        issue: &TeachingIssue,
        activity: &ActivityContext,
        draft_text: &str,
    ) -> WorkshopResult<Arc<ReflectionPromptSet>> {
        let guard = InFlightGuard {
            cache: self,
            key: Some(key.clone()),
        };

        let outcome = self
            .load_or_generate(&key, issue, activity, draft_text)
            .await
            .map(Arc::new);

        if let Ok(set) = &outcome {
            self.entries
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .insert(key, set.clone());
        }

        guard.complete(outcome.clone());
        outcome
    }

    async fn load_or_generate(
        &self,
        key: &str,
        issue: &TeachingIssue,
        activity: &ActivityContext,
        draft_text: &str,
    ) -> WorkshopResult<ReflectionPromptSet> {
        let storage_key = format!("{}{}", REFLECTION_KEY_PREFIX, key);

        if let Some(storage) = &self.storage {
            match get_json::<ReflectionPromptSet>(storage.as_ref(), &storage_key).await {
                Ok(Some(set)) => {
                    debug!(issue_id = %issue.id, fingerprint = %key, "Reflection prompts loaded from storage");
                    return Ok(set);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, fingerprint = %key, "Failed to read cached prompts; regenerating");
                }
            }
        }

        let request = ReflectionRequest {
            issue: IssueDescriptor::from(issue),
            activity: activity.clone(),
            draft_text: draft_text.to_string(),
            config: GenerationConfig {
                tone: PromptTone::Mentor,
                depth: PromptDepth::for_severity(issue.severity),
            },
        };

        let start = Instant::now();
        self.generator_calls.fetch_add(1, Ordering::Relaxed);
        let prompts = self
            .generator
            .generate(&request)
            .await
            .map_err(|e| WorkshopError::Generation {
                message: e.to_string(),
            })?;

        if prompts.is_empty() {
            return Err(WorkshopError::Generation {
                message: format!("generator returned no prompts for {}", issue.id),
            });
        }

        info!(
            issue_id = %issue.id,
            prompts = prompts.len(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Reflection prompts generated"
        );

        let set = ReflectionPromptSet {
            issue_id: issue.id.clone(),
            fingerprint: key.to_string(),
            prompts,
            generated_at: Utc::now(),
        };

        if let Some(storage) = &self.storage {
            if let Err(e) = set_json(storage.as_ref(), &storage_key, &set).await {
                warn!(error = %e, fingerprint = %key, "Failed to persist reflection prompts");
            }
        }

        Ok(set)
    }

}

/// Delete persisted prompt sets, for one issue or all of them.
pub async fn clear_persisted_prompts(
    storage: &dyn Storage,
    issue_id: Option<&str>,
) -> StorageResult<usize> {
    let prefix = match issue_id {
        Some(id) => format!("{}{}:", REFLECTION_KEY_PREFIX, id),
        None => REFLECTION_KEY_PREFIX.to_string(),
    };
    let stored = storage.list_by_prefix(&prefix).await?;
    for (key, _) in &stored {
        storage.delete(key).await?;
    }
    Ok(stored.len())
}

/// Removes the in-flight registration even if the leader is dropped mid-call,
/// which wakes waiters with a closed channel so one of them takes over.
struct InFlightGuard<'a> {
    cache: &'a ReflectionPromptCache,
    key: Option<String>,
}

impl InFlightGuard<'_> {
    fn complete(mut self, outcome: SharedOutcome) {
        if let Some(key) = self.key.take() {
            if let Some(sender) = lock(&self.cache.in_flight).remove(&key) {
                // no receivers is fine
                let _ = sender.send(outcome);
            }
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            lock(&self.cache.in_flight).remove(&key);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl From<&TeachingIssue> for IssueDescriptor {
    fn from(issue: &TeachingIssue) -> Self {
        Self {
            issue_id: issue.id.clone(),
            category: issue.category,
            severity: issue.severity,
            title: issue.problem.title.clone(),
            from_draft: issue.problem.from_draft.clone(),
            explanation: issue.problem.explanation.clone(),
            principle: issue.principle.name.clone(),
        }
    }
}
