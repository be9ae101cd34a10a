use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::{IssueStatus, TeachingIssue, TeachingReport, Workspace};
use crate::error::{WorkshopError, WorkshopResult};
use crate::rubric::RubricCategory;

impl TeachingIssue {
    /// Store a new workspace draft. The first edit starts the issue; later
    /// edits never move the status backwards.
    pub fn record_edit(&mut self, draft: impl Into<String>, at: DateTime<Utc>) {
        self.workspace.draft = draft.into();
        self.workspace.updated_at = Some(at);
        if self.status == IssueStatus::NotStarted {
            self.status = IssueStatus::InProgress;
        }
    }

    /// Ask for AI feedback on the workspace draft.
    pub fn request_feedback(&mut self) -> WorkshopResult<()> {
        match self.status {
            IssueStatus::NotStarted => Err(self.transition_error(IssueStatus::NeedsReview)),
            IssueStatus::InProgress => {
                self.status = IssueStatus::NeedsReview;
                Ok(())
            }
            IssueStatus::NeedsReview | IssueStatus::Completed => Ok(()),
        }
    }

    /// Attach feedback text without touching the status
    pub fn attach_feedback(&mut self, feedback: impl Into<String>) {
        self.workspace.ai_feedback = Some(feedback.into());
    }

    /// Mark the issue done; the workspace draft must be at least `min_chars`
    /// characters once trimmed.
    pub fn complete(&mut self, min_chars: usize) -> WorkshopResult<()> {
        if self.status == IssueStatus::Completed {
            return Ok(());
        }
        let length = self.workspace.draft.trim().chars().count();
        if length < min_chars {
            return Err(WorkshopError::DraftTooShort {
                length,
                minimum: min_chars,
            });
        }
        self.status = IssueStatus::Completed;
        self.workspace.completed = true;
        Ok(())
    }

    /// Start over: clears the workspace and any recorded answers.
    pub fn reset(&mut self) {
        self.status = IssueStatus::NotStarted;
        self.workspace = Workspace::default();
        for prompt in &mut self.reflection_prompts {
            prompt.answer = None;
        }
    }

    fn transition_error(&self, to: IssueStatus) -> WorkshopError {
        WorkshopError::InvalidTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }
}

/// Carry student progress from `previous` into a freshly derived `next`.
///
/// Matching is by category. Same severity keeps status and workspace as they
/// were; a changed severity keeps the workspace and steps a reviewed or
/// completed issue back to `in_progress`. An issue never drops to
/// `not_started` here. Reflection prompts carry over only when the issue id
/// is unchanged.
pub fn migrate_statuses(previous: &TeachingReport, next: &mut TeachingReport) {
    let by_category: HashMap<RubricCategory, &TeachingIssue> = previous
        .teaching_issues
        .iter()
        .map(|issue| (issue.category, issue))
        .collect();

    for issue in &mut next.teaching_issues {
        let Some(old) = by_category.get(&issue.category) else {
            continue;
        };

        issue.workspace = old.workspace.clone();
        if old.severity == issue.severity {
            issue.status = old.status;
        } else {
            issue.workspace.completed = false;
            issue.status = old.status.min(IssueStatus::InProgress);
        }

        if old.id == issue.id {
            issue.reflection_prompts = old.reflection_prompts.clone();
        }

        debug!(
            issue_id = %issue.id,
            category = %issue.category,
            status = %issue.status,
            "Migrated issue progress"
        );
    }

    next.recompute_overall();
}
