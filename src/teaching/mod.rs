//! Teaching issues derived from a rubric analysis.
//!
//! [`transform`] turns one [`AnalysisResult`](crate::rubric::AnalysisResult)
//! into a ranked [`TeachingReport`]. Reports are replaced wholesale on every
//! analysis run; [`migrate_statuses`] carries the student's progress from the
//! previous report into the new one.

mod lifecycle;
mod principles;
mod transformer;

pub use lifecycle::migrate_statuses;
pub use principles::default_principle;
pub use transformer::{transform, TeachingTransformer};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exemplars::EliteEssayExample;
use crate::reflection::ReflectionPrompt;
use crate::rubric::{RubricCategory, Severity};

/// Where the student is with one issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    /// No workspace edit yet.
    #[default]
    NotStarted,
    /// The student has started a rewrite.
    InProgress,
    /// AI feedback was requested.
    NeedsReview,
    /// Marked done by the student.
    Completed,
}

impl IssueStatus {
    /// Wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::NotStarted => "not_started",
            IssueStatus::InProgress => "in_progress",
            IssueStatus::NeedsReview => "needs_review",
            IssueStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How advanced a writing principle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillLevel {
    /// Basic craft every essay needs.
    Foundational,
    /// Builds on the foundations.
    Intermediate,
    /// Polish that separates strong essays.
    Advanced,
}

/// What is wrong and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemBlock {
    /// Short headline for the problem.
    pub title: String,
    /// Verbatim excerpt from the draft, empty when the analysis quoted nothing.
    pub from_draft: String,
    /// Reviewer comments joined into prose.
    pub explanation: String,
    /// How many NQI points the problem costs.
    pub impact_on_score: String,
}

/// The transferable writing concept behind an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipleBlock {
    /// Principle name.
    pub name: String,
    /// What the principle asks of the writer.
    pub description: String,
    /// Difficulty.
    pub skill_level: SkillLevel,
    /// Why admissions readers care.
    pub why_it_matters: String,
}

/// The student's rewrite area for one issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// Rewrite text.
    pub draft: String,
    /// Last edit time.
    pub updated_at: Option<DateTime<Utc>>,
    /// Feedback attached to the rewrite.
    pub ai_feedback: Option<String>,
    /// Mirrors a `completed` status.
    pub completed: bool,
}

/// Student-facing unit of feedback for one rubric category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingIssue {
    /// Deterministic id, stable across identical analysis runs.
    pub id: String,
    /// Rubric category the issue came from.
    pub category: RubricCategory,
    /// Severity band of the category score.
    pub severity: Severity,
    /// 1-based; lower is more urgent.
    pub priority_rank: u32,
    /// Category score as a percentage of its maximum.
    pub percentage: f64,
    /// Normalized rubric weight.
    pub weight: f64,
    /// What is wrong and where.
    pub problem: ProblemBlock,
    /// Concept to learn.
    pub principle: PrincipleBlock,
    /// Revision ideas from the analysis.
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// Matched exemplars, at most three.
    #[serde(default)]
    pub examples: Vec<EliteEssayExample>,
    /// Filled lazily from the prompt cache.
    #[serde(default)]
    pub reflection_prompts: Vec<ReflectionPrompt>,
    /// The student's rewrite area.
    #[serde(default)]
    pub workspace: Workspace,
    /// Lifecycle status.
    #[serde(default)]
    pub status: IssueStatus,
}

impl TeachingIssue {
    /// Whether the student has finished this issue
    pub fn is_resolved(&self) -> bool {
        self.status == IssueStatus::Completed
    }

    /// NQI points this issue is expected to recover.
    pub fn estimated_gain(&self) -> f64 {
        self.weight * self.severity.point_value()
    }
}

/// Aggregate progress over a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallProgress {
    /// NQI of the analysis.
    pub current_nqi: f64,
    /// Projected NQI once every unresolved issue is fixed, at most 100.
    pub target_nqi: f64,
    /// `target_nqi - current_nqi`.
    pub potential_gain: f64,
    /// All issues in the report.
    pub total_issues: usize,
    /// Issues not yet completed.
    pub unresolved_issues: usize,
    /// Estimated work left.
    pub estimated_time_minutes: u32,
}

impl OverallProgress {
    /// Compute progress over the unresolved issues.
    pub fn compute(current_nqi: f64, issues: &[TeachingIssue]) -> Self {
        let unresolved: Vec<&TeachingIssue> = issues.iter().filter(|i| !i.is_resolved()).collect();
        let gain: f64 = unresolved.iter().map(|i| i.estimated_gain()).sum();
        let target_nqi = (current_nqi + gain).min(100.0);

        Self {
            current_nqi,
            target_nqi,
            potential_gain: target_nqi - current_nqi,
            total_issues: issues.len(),
            unresolved_issues: unresolved.len(),
            estimated_time_minutes: unresolved.iter().map(|i| i.severity.minutes()).sum(),
        }
    }
}

/// Output of one transform run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeachingReport {
    /// Issues in priority order.
    pub teaching_issues: Vec<TeachingIssue>,
    /// Aggregate progress, kept current by `recompute_overall`.
    pub overall: OverallProgress,
    /// Ids of the issues that qualify as quick wins, in priority order.
    pub quick_wins: Vec<String>,
}

impl TeachingReport {
    /// Look up an issue by id
    pub fn issue(&self, issue_id: &str) -> Option<&TeachingIssue> {
        self.teaching_issues.iter().find(|i| i.id == issue_id)
    }

    /// Mutable lookup by id
    pub fn issue_mut(&mut self, issue_id: &str) -> Option<&mut TeachingIssue> {
        self.teaching_issues.iter_mut().find(|i| i.id == issue_id)
    }

    /// The quick-win view over `teaching_issues`.
    pub fn quick_win_issues(&self) -> impl Iterator<Item = &TeachingIssue> {
        self.teaching_issues
            .iter()
            .filter(move |i| self.quick_wins.contains(&i.id))
    }

    /// Highest-priority issue the student has not completed.
    pub fn focus_issue(&self) -> Option<&TeachingIssue> {
        self.teaching_issues.iter().find(|i| !i.is_resolved())
    }

    /// Number of completed issues
    pub fn completed_count(&self) -> usize {
        self.teaching_issues.iter().filter(|i| i.is_resolved()).count()
    }

    /// Recalculate `overall` after status changes.
    pub fn recompute_overall(&mut self) {
        self.overall = OverallProgress::compute(self.overall.current_nqi, &self.teaching_issues);
    }
}
