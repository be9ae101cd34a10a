//! Snapshot handed to the conversational coach.
//!
//! [`build_context`] is pure assembly over state the caller already holds; it
//! performs no I/O and never talks to the chat collaborator itself.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rubric::{ActivityContext, AnalysisResult, RubricCategory, Severity};
use crate::teaching::TeachingReport;
use crate::versions::{EssayVersion, TextDelta};

/// Most recent version-to-version changes included in a snapshot.
const RECENT_CHANGES: usize = 2;

/// A question the student has answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAnswer {
    /// Prompt question as shown to the student.
    pub question: String,
    /// Trimmed answer text.
    pub answer: String,
}

/// Score progress over the session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreProgress {
    /// NQI of the applied analysis.
    pub current_nqi: f64,
    /// NQI of the earliest saved version, or the current score without history.
    pub initial_nqi: f64,
    /// `current_nqi - initial_nqi`.
    pub delta: f64,
}

/// The issue the student should work on next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusIssue {
    /// Id of the issue.
    pub issue_id: String,
    /// Rubric category the issue came from.
    pub category: RubricCategory,
    /// Severity band.
    pub severity: Severity,
    /// Problem title.
    pub problem: String,
    /// Excerpt quoted from the draft.
    pub from_draft: String,
    /// Name of the writing principle.
    pub principle: String,
    /// What the principle asks of the writer.
    pub principle_description: String,
}

/// Change between two consecutive versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentChange {
    /// Id of the newer version of the pair.
    pub version_id: String,
    /// When the newer version was saved.
    pub created_at: DateTime<Utc>,
    /// NQI change from the older version.
    pub nqi_delta: f64,
    /// Character-level text change.
    pub text: TextDelta,
    /// Student note on the newer version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Everything the conversational collaborator is grounded on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkshopChatContext {
    /// Activity identifier.
    pub activity_id: String,
    /// Display name of the activity.
    pub activity_name: String,
    /// Student's role in the activity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_role: Option<String>,
    /// Words in the analyzed draft.
    pub draft_word_count: usize,
    /// Reader-impression label from the analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_impression: Option<String>,
    /// Score progress over the session.
    pub scores: ScoreProgress,
    /// Issues not yet completed.
    pub unresolved_issues: usize,
    /// Issues marked completed.
    pub completed_issues: usize,
    /// Highest-priority unresolved issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_issue: Option<FocusIssue>,
    /// Newest first.
    pub recent_changes: Vec<RecentChange>,
    /// Keyed by issue id.
    pub reflection_answers: BTreeMap<String, Vec<RecordedAnswer>>,
}

/// Assemble a chat snapshot. `versions` are most recent first, as returned by
/// the version store.
pub fn build_context(
    activity: &ActivityContext,
    draft: &str,
    analysis: Option<&AnalysisResult>,
    report: Option<&TeachingReport>,
    versions: &[EssayVersion],
    reflection_answers: &BTreeMap<String, Vec<RecordedAnswer>>,
) -> WorkshopChatContext {
    let current_nqi = analysis
        .map(|a| a.nqi)
        .or_else(|| versions.first().map(|v| v.nqi))
        .unwrap_or(0.0);
    let initial_nqi = versions.last().map(|v| v.nqi).unwrap_or(current_nqi);

    let (unresolved_issues, completed_issues) = report
        .map(|r| {
            let completed = r.completed_count();
            (r.teaching_issues.len() - completed, completed)
        })
        .unwrap_or((0, 0));

    let focus_issue = report.and_then(TeachingReport::focus_issue).map(|issue| FocusIssue {
        issue_id: issue.id.clone(),
        category: issue.category,
        severity: issue.severity,
        problem: issue.problem.title.clone(),
        from_draft: issue.problem.from_draft.clone(),
        principle: issue.principle.name.clone(),
        principle_description: issue.principle.description.clone(),
    });

    let recent_changes = versions
        .windows(2)
        .take(RECENT_CHANGES)
        .map(|pair| {
            let (newer, older) = (&pair[0], &pair[1]);
            RecentChange {
                version_id: newer.id.clone(),
                created_at: newer.created_at,
                nqi_delta: newer.nqi - older.nqi,
                text: TextDelta::between(&older.text, &newer.text),
                note: newer.note.clone(),
            }
        })
        .collect();

    let reflection_answers = reflection_answers
        .iter()
        .filter(|(_, answers)| !answers.is_empty())
        .map(|(id, answers)| (id.clone(), answers.clone()))
        .collect();

    WorkshopChatContext {
        activity_id: activity.activity_id.clone(),
        activity_name: activity.name.clone(),
        activity_role: activity.role.clone(),
        draft_word_count: draft.split_whitespace().count(),
        reader_impression: analysis
            .map(|a| a.reader_impression.clone())
            .filter(|s| !s.is_empty()),
        scores: ScoreProgress {
            current_nqi,
            initial_nqi,
            delta: current_nqi - initial_nqi,
        },
        unresolved_issues,
        completed_issues,
        focus_issue,
        recent_changes,
        reflection_answers,
    }
}
