//! Session orchestration for one or more activities.
//!
//! [`Workshop`] wires the analysis backend, teaching transformer, version
//! store and prompt cache together. It keeps the last successfully applied
//! analysis per activity and never replaces it with a failed or stale run.

mod backend;
mod sequencer;

pub use backend::{AnalysisBackend, AnalysisDepth, AnalysisOptions, AnalysisRequest, AnalysisResponse};
#[cfg(test)]
pub use backend::MockAnalysisBackend;
pub use sequencer::{RequestSequencer, RequestTicket};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::chat::{build_context, RecordedAnswer, WorkshopChatContext};
use crate::config::{Config, WorkshopConfig};
use crate::error::{AppResult, WorkshopError, WorkshopResult};
use crate::exemplars::ExampleLibrary;
use crate::langbase::{LangbaseAnalysisBackend, LangbaseClient, LangbaseReflectionGenerator};
use crate::reflection::{ReflectionGenerator, ReflectionPromptCache, ReflectionPromptSet};
use crate::rubric::{ActivityContext, AnalysisResult, RawCoaching};
use crate::storage::Storage;
use crate::teaching::{migrate_statuses, TeachingIssue, TeachingReport, TeachingTransformer};
use crate::versions::{EssayVersion, VersionMetadata, VersionStore};

/// Last applied analysis for one activity.
#[derive(Debug, Clone)]
pub struct ActivitySession {
    /// Activity the session belongs to.
    pub activity: ActivityContext,
    /// Draft the analysis was run on.
    pub draft: String,
    /// Applied analysis.
    pub analysis: AnalysisResult,
    /// Coaching returned with it.
    pub coaching: Option<RawCoaching>,
    /// Teaching report with the student's progress.
    pub report: TeachingReport,
    /// When the analysis was applied.
    pub analyzed_at: DateTime<Utc>,
}

/// Result of [`Workshop::analyze_draft`].
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    /// The run was applied to the session.
    Applied {
        /// Report with progress migrated from the previous run.
        report: TeachingReport,
        /// `None` when the version could not be persisted.
        version: Option<EssayVersion>,
        /// Why the version was not persisted.
        persistence_warning: Option<String>,
    },
    /// A newer analysis was requested while this one was pending.
    Superseded,
}

/// Result of [`Workshop::reflection_prompts`].
#[derive(Debug, Clone)]
pub enum PromptOutcome {
    /// Prompts attached to the issue.
    Applied(Arc<ReflectionPromptSet>),
    /// A newer request for the same issue was issued while this one was pending.
    Superseded,
}

/// Coaching engine over all activities.
pub struct Workshop {
    backend: Arc<dyn AnalysisBackend>,
    versions: VersionStore,
    prompts: ReflectionPromptCache,
    transformer: TeachingTransformer<'static>,
    sequencer: RequestSequencer,
    sessions: RwLock<HashMap<String, ActivitySession>>,
    config: WorkshopConfig,
}

impl Workshop {
    /// Assemble a workshop from its collaborators
    pub fn new(
        backend: Arc<dyn AnalysisBackend>,
        generator: Arc<dyn ReflectionGenerator>,
        storage: Arc<dyn Storage>,
        config: WorkshopConfig,
    ) -> Self {
        Self {
            backend,
            versions: VersionStore::new(storage.clone()),
            prompts: ReflectionPromptCache::new(generator).with_storage(storage),
            transformer: TeachingTransformer::new(ExampleLibrary::builtin(), config.clone()),
            sequencer: RequestSequencer::new(),
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Build Langbase-backed collaborators from configuration
    pub fn from_config(config: &Config, storage: Arc<dyn Storage>) -> AppResult<Self> {
        let client = LangbaseClient::new(&config.langbase, config.request.clone())?;
        let backend = LangbaseAnalysisBackend::new(client.clone(), &config.pipes.analysis);
        let generator = LangbaseReflectionGenerator::new(client, &config.pipes.reflection);
        Ok(Self::new(
            Arc::new(backend),
            Arc::new(generator),
            storage,
            config.workshop.clone(),
        ))
    }

    /// The version store
    pub fn versions(&self) -> &VersionStore {
        &self.versions
    }

    /// The reflection prompt cache
    pub fn prompt_cache(&self) -> &ReflectionPromptCache {
        &self.prompts
    }

    /// Snapshot of an activity's session
    pub async fn session(&self, activity_id: &str) -> Option<ActivitySession> {
        self.sessions.read().await.get(activity_id).cloned()
    }

    /// Current teaching report for an activity
    pub async fn report(&self, activity_id: &str) -> Option<TeachingReport> {
        self.sessions
            .read()
            .await
            .get(activity_id)
            .map(|s| s.report.clone())
    }

    /// Analyze a draft and, if this is still the newest request for the
    /// activity, replace the session and save a version.
    ///
    /// A backend failure leaves the previous session untouched and is
    /// returned as an error. A failed version save is logged and reported
    /// through `persistence_warning`.
    pub async fn analyze_draft(
        &self,
        activity: &ActivityContext,
        draft: &str,
        options: AnalysisOptions,
    ) -> AppResult<AnalysisOutcome> {
        let ticket = self
            .sequencer
            .begin(format!("analysis:{}", activity.activity_id));
        let outcome = self.run_analysis(&ticket, activity, draft, options).await;
        self.sequencer.finish(&ticket);
        outcome
    }

    async fn run_analysis(
        &self,
        ticket: &RequestTicket,
        activity: &ActivityContext,
        draft: &str,
        options: AnalysisOptions,
    ) -> AppResult<AnalysisOutcome> {
        let activity_id = activity.activity_id.clone();

        let request = AnalysisRequest {
            essay_text: draft.to_string(),
            activity: activity.clone(),
            options,
        };

        let response = match self.backend.analyze(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!(activity_id = %activity_id, error = %e, "Analysis failed; keeping previous state");
                return Err(e.into());
            }
        };

        let mut report =
            self.transformer
                .transform(&response.analysis, response.coaching.as_ref(), draft);

        // The version is saved under the session lock so the newest stored
        // version always matches the applied session.
        let (version, persistence_warning) = {
            let mut sessions = self.sessions.write().await;
            if !self.sequencer.is_latest(ticket) {
                info!(
                    activity_id = %activity_id,
                    sequence = ticket.sequence(),
                    "Discarding superseded analysis"
                );
                return Ok(AnalysisOutcome::Superseded);
            }

            if let Some(previous) = sessions.get(&activity_id) {
                migrate_statuses(&previous.report, &mut report);
            }

            sessions.insert(
                activity_id.clone(),
                ActivitySession {
                    activity: activity.clone(),
                    draft: draft.to_string(),
                    analysis: response.analysis.clone(),
                    coaching: response.coaching.clone(),
                    report: report.clone(),
                    analyzed_at: Utc::now(),
                },
            );

            match self
                .versions
                .save_version(&activity_id, draft, &response.analysis, VersionMetadata::default())
                .await
            {
                Ok(version) => (Some(version), None),
                Err(e) => {
                    warn!(activity_id = %activity_id, error = %e, "Failed to save essay version");
                    (None, Some(e.to_string()))
                }
            }
        };

        info!(
            activity_id = %activity_id,
            nqi = response.analysis.nqi,
            issues = report.teaching_issues.len(),
            quick_wins = report.quick_wins.len(),
            "Analysis applied"
        );

        Ok(AnalysisOutcome::Applied {
            report,
            version,
            persistence_warning,
        })
    }

    /// Reflection prompts for one issue, generated on a cache miss and
    /// attached to the issue unless a newer request superseded this one.
    pub async fn reflection_prompts(
        &self,
        activity_id: &str,
        issue_id: &str,
    ) -> AppResult<PromptOutcome> {
        let ticket = self
            .sequencer
            .begin(format!("prompts:{}:{}", activity_id, issue_id));
        let outcome = self.run_prompts(&ticket, activity_id, issue_id).await;
        self.sequencer.finish(&ticket);
        outcome
    }

    async fn run_prompts(
        &self,
        ticket: &RequestTicket,
        activity_id: &str,
        issue_id: &str,
    ) -> AppResult<PromptOutcome> {
        let (issue, activity, draft) = {
            let sessions = self.sessions.read().await;
            let session = sessions.get(activity_id).ok_or_else(|| no_analysis(activity_id))?;
            let issue = session
                .report
                .issue(issue_id)
                .cloned()
                .ok_or_else(|| issue_not_found(issue_id))?;
            (issue, session.activity.clone(), session.draft.clone())
        };

        let set = self
            .prompts
            .generate_reflection_prompts_with_cache(&issue, &activity, &draft)
            .await?;

        let mut sessions = self.sessions.write().await;
        if !self.sequencer.is_latest(ticket) {
            debug!(issue_id = %issue_id, "Discarding superseded reflection prompts");
            return Ok(PromptOutcome::Superseded);
        }

        if let Some(target) = sessions
            .get_mut(activity_id)
            .and_then(|s| s.report.issue_mut(issue_id))
        {
            let previous = std::mem::take(&mut target.reflection_prompts);
            target.reflection_prompts = set
                .prompts
                .iter()
                .cloned()
                .map(|mut prompt| {
                    prompt.answer = previous
                        .iter()
                        .find(|p| p.question == prompt.question)
                        .and_then(|p| p.answer.clone());
                    prompt
                })
                .collect();
        }

        Ok(PromptOutcome::Applied(set))
    }

    /// Validate and store the student's answer to one reflection prompt.
    pub async fn record_reflection_answer(
        &self,
        activity_id: &str,
        issue_id: &str,
        prompt_index: usize,
        answer: &str,
    ) -> AppResult<TeachingIssue> {
        Ok(self
            .with_issue(activity_id, issue_id, |issue| {
                let prompt = issue.reflection_prompts.get_mut(prompt_index).ok_or_else(|| {
                    WorkshopError::Validation {
                        field: "prompt_index".to_string(),
                        reason: format!("no prompt at index {}", prompt_index),
                    }
                })?;
                prompt.validate_answer(answer)?;
                prompt.answer = Some(answer.trim().to_string());
                Ok(())
            })
            .await?)
    }

    /// Save the student's rewrite for an issue
    pub async fn edit_issue(
        &self,
        activity_id: &str,
        issue_id: &str,
        draft: &str,
    ) -> WorkshopResult<TeachingIssue> {
        self.with_issue(activity_id, issue_id, |issue| {
            issue.record_edit(draft, Utc::now());
            Ok(())
        })
        .await
    }

    /// Move an issue to review
    pub async fn request_issue_feedback(
        &self,
        activity_id: &str,
        issue_id: &str,
    ) -> WorkshopResult<TeachingIssue> {
        self.with_issue(activity_id, issue_id, TeachingIssue::request_feedback)
            .await
    }

    /// Store AI feedback text on an issue
    pub async fn attach_issue_feedback(
        &self,
        activity_id: &str,
        issue_id: &str,
        feedback: &str,
    ) -> WorkshopResult<TeachingIssue> {
        self.with_issue(activity_id, issue_id, |issue| {
            issue.attach_feedback(feedback);
            Ok(())
        })
        .await
    }

    /// Mark an issue completed
    pub async fn complete_issue(
        &self,
        activity_id: &str,
        issue_id: &str,
    ) -> WorkshopResult<TeachingIssue> {
        let min_chars = self.config.completion_min_chars;
        self.with_issue(activity_id, issue_id, |issue| issue.complete(min_chars))
            .await
    }

    /// Reset an issue to not started
    pub async fn reset_issue(
        &self,
        activity_id: &str,
        issue_id: &str,
    ) -> WorkshopResult<TeachingIssue> {
        self.with_issue(activity_id, issue_id, |issue| {
            issue.reset();
            Ok(())
        })
        .await
    }

    /// Snapshot for the conversational coach.
    pub async fn chat_context(&self, activity_id: &str) -> WorkshopResult<WorkshopChatContext> {
        let session = self
            .session(activity_id)
            .await
            .ok_or_else(|| no_analysis(activity_id))?;
        let versions = self.versions.versions_for_display(activity_id).await;
        let answers = recorded_answers(&session.report);

        Ok(build_context(
            &session.activity,
            &session.draft,
            Some(&session.analysis),
            Some(&session.report),
            &versions,
            &answers,
        ))
    }

    async fn with_issue<F>(
        &self,
        activity_id: &str,
        issue_id: &str,
        apply: F,
    ) -> WorkshopResult<TeachingIssue>
    where
        F: FnOnce(&mut TeachingIssue) -> WorkshopResult<()>,
    {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(activity_id)
            .ok_or_else(|| no_analysis(activity_id))?;
        let issue = session
            .report
            .issue_mut(issue_id)
            .ok_or_else(|| issue_not_found(issue_id))?;

        apply(issue)?;
        let updated = issue.clone();
        session.report.recompute_overall();

        debug!(
            activity_id = %activity_id,
            issue_id = %issue_id,
            status = %updated.status,
            "Issue updated"
        );
        Ok(updated)
    }
}

fn recorded_answers(report: &TeachingReport) -> BTreeMap<String, Vec<RecordedAnswer>> {
    report
        .teaching_issues
        .iter()
        .map(|issue| {
            let answers: Vec<RecordedAnswer> = issue
                .reflection_prompts
                .iter()
                .filter_map(|p| {
                    p.answer.as_ref().map(|answer| RecordedAnswer {
                        question: p.question.clone(),
                        answer: answer.clone(),
                    })
                })
                .collect();
            (issue.id.clone(), answers)
        })
        .filter(|(_, answers)| !answers.is_empty())
        .collect()
}

fn no_analysis(activity_id: &str) -> WorkshopError {
    WorkshopError::NoAnalysis {
        activity_id: activity_id.to_string(),
    }
}

fn issue_not_found(issue_id: &str) -> WorkshopError {
    WorkshopError::IssueNotFound {
        issue_id: issue_id.to_string(),
    }
}
