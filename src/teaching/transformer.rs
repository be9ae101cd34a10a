use std::cmp::Ordering;
use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::principles::{default_principle, problem_title};
use super::{IssueStatus, OverallProgress, ProblemBlock, TeachingIssue, TeachingReport, Workspace};
use crate::config::WorkshopConfig;
use crate::exemplars::ExampleLibrary;
use crate::reflection::stable_digest;
use crate::rubric::{AnalysisResult, CategoryScore, RawCoaching, Severity};

/// Hex characters of evidence digest in an issue id.
const ISSUE_ID_HEX_LEN: usize = 12;

/// Tolerance for comparing a weight against the median.
const WEIGHT_EPSILON: f64 = 1e-9;

/// Converts an analysis into a ranked, example-backed teaching report.
///
/// Pure and deterministic: identical inputs always give identical ids,
/// severities and ranks.
#[derive(Debug, Clone)]
pub struct TeachingTransformer<'a> {
    library: &'a ExampleLibrary,
    config: WorkshopConfig,
}

impl Default for TeachingTransformer<'static> {
    fn default() -> Self {
        Self::new(ExampleLibrary::builtin(), WorkshopConfig::default())
    }
}

/// One qualifying category before ranking.
struct Candidate<'s> {
    index: usize,
    score: &'s CategoryScore,
    percentage: f64,
    severity: Severity,
    weight: f64,
}

impl<'a> TeachingTransformer<'a> {
    /// Create a transformer over a specific library
    pub fn new(library: &'a ExampleLibrary, config: WorkshopConfig) -> Self {
        Self { library, config }
    }

    /// Derive teaching issues from one analysis run.
    pub fn transform(
        &self,
        analysis: &AnalysisResult,
        coaching: Option<&RawCoaching>,
        draft_text: &str,
    ) -> TeachingReport {
        let mut seen = BTreeSet::new();
        let mut candidates = Vec::new();

        for (index, score) in analysis.categories.iter().enumerate() {
            if !seen.insert(score.category) {
                warn!(category = %score.category, "Ignoring duplicate category score");
                continue;
            }
            let Some(percentage) = score.percentage() else {
                warn!(
                    category = %score.category,
                    score = score.score,
                    max_score = score.max_score,
                    "Skipping unusable category score"
                );
                continue;
            };

            let flagged = coaching.map(|c| c.flags(score.category)).unwrap_or(false);
            let severity = match Severity::from_percentage(percentage) {
                Some(severity) => severity,
                None if flagged => Severity::Minor,
                None => continue,
            };

            candidates.push(Candidate {
                index,
                score,
                percentage,
                severity,
                weight: analysis.weight_for(score.category),
            });
        }

        candidates.sort_by(|a, b| {
            a.severity
                .cmp(&b.severity)
                .then_with(|| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal))
                .then_with(|| a.index.cmp(&b.index))
        });

        let median = analysis.median_weight();
        let mut quick_wins = Vec::new();
        let teaching_issues: Vec<TeachingIssue> = candidates
            .iter()
            .enumerate()
            .map(|(rank, candidate)| {
                let issue = self.build_issue(candidate, rank as u32 + 1, coaching);
                if self.is_quick_win(candidate, median) {
                    quick_wins.push(issue.id.clone());
                }
                issue
            })
            .collect();

        debug!(
            issues = teaching_issues.len(),
            quick_wins = quick_wins.len(),
            nqi = analysis.nqi,
            draft_chars = draft_text.chars().count(),
            "Teaching report derived"
        );

        TeachingReport {
            overall: OverallProgress::compute(analysis.nqi, &teaching_issues),
            teaching_issues,
            quick_wins,
        }
    }

    fn build_issue(
        &self,
        candidate: &Candidate<'_>,
        priority_rank: u32,
        coaching: Option<&RawCoaching>,
    ) -> TeachingIssue {
        let score = candidate.score;
        let category = score.category;
        let note = coaching.and_then(|c| c.note(category));
        let excerpt = score.evidence.first().cloned().unwrap_or_default();

        let mut principle = default_principle(category);
        if let Some(note) = note {
            if let Some(name) = &note.principle_name {
                principle.name = name.clone();
            }
            if let Some(description) = &note.principle_description {
                principle.description = description.clone();
            }
            if let Some(why) = &note.why_it_matters {
                principle.why_it_matters = why.clone();
            }
        }

        let title = note
            .and_then(|n| n.headline.clone())
            .unwrap_or_else(|| problem_title(category, candidate.severity));

        let gain = candidate.weight * candidate.severity.point_value();
        let impact_on_score = format!(
            "Worth up to {:.1} NQI points ({} issue, {:.0}% of the rubric weight)",
            gain,
            candidate.severity,
            candidate.weight * 100.0
        );

        TeachingIssue {
            id: issue_id(category.as_str(), &excerpt),
            category,
            severity: candidate.severity,
            priority_rank,
            percentage: candidate.percentage,
            weight: candidate.weight,
            problem: ProblemBlock {
                title,
                from_draft: excerpt,
                explanation: score.comments.join(" "),
                impact_on_score,
            },
            principle,
            suggestions: score.suggestions.clone(),
            examples: self.library.get_examples_limited(
                category,
                candidate.severity,
                self.config.max_examples,
            ),
            reflection_prompts: Vec::new(),
            workspace: Workspace::default(),
            status: IssueStatus::NotStarted,
        }
    }

    fn is_quick_win(&self, candidate: &Candidate<'_>, median_weight: f64) -> bool {
        let gap = (candidate.severity.next_threshold() - candidate.percentage).max(0.0);
        gap <= self.config.quick_win_gap && candidate.weight + WEIGHT_EPSILON >= median_weight
    }
}

/// Derive teaching issues with the built-in library and default thresholds.
pub fn transform(
    analysis: &AnalysisResult,
    coaching: Option<&RawCoaching>,
    draft_text: &str,
) -> TeachingReport {
    TeachingTransformer::default().transform(analysis, coaching, draft_text)
}

fn issue_id(category: &str, evidence: &str) -> String {
    format!(
        "{}-{}",
        category,
        stable_digest(&[category, evidence], ISSUE_ID_HEX_LEN)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rubric::{CoachingNote, RubricCategory};
    use pretty_assertions::assert_eq;

    fn sample_analysis() -> AnalysisResult {
        AnalysisResult::new(62.0)
            .with_category(
                CategoryScore::new(RubricCategory::Vulnerability, 40.0, 100.0)
                    .with_evidence("I was fine after we lost.")
                    .with_comment("Emotion is stated, never shown.")
                    .with_comment("The loss has no cost."),
            )
            .with_category(CategoryScore::new(RubricCategory::Dialogue, 78.0, 100.0))
            .with_category(CategoryScore::new(RubricCategory::Structure, 90.0, 100.0))
            .with_weight(RubricCategory::Vulnerability, 0.4)
            .with_weight(RubricCategory::Dialogue, 0.3)
            .with_weight(RubricCategory::Structure, 0.3)
    }

    #[test]
    fn test_reference_scenario() {
        let report = transform(&sample_analysis(), None, "draft");

        let summary: Vec<(RubricCategory, Severity, u32)> = report
            .teaching_issues
            .iter()
            .map(|i| (i.category, i.severity, i.priority_rank))
            .collect();
        assert_eq!(
            summary,
            vec![
                (RubricCategory::Vulnerability, Severity::Critical, 1),
                (RubricCategory::Dialogue, Severity::Minor, 2),
            ]
        );
        assert!((report.overall.target_nqi - (62.0 + 3.65)).abs() < 1e-9);
        assert!((report.overall.potential_gain - 3.65).abs() < 1e-9);
        assert_eq!(report.overall.total_issues, 2);
        assert_eq!(report.overall.estimated_time_minutes, 18);
    }

    #[test]
    fn test_problem_block_from_evidence_and_comments() {
        let report = transform(&sample_analysis(), None, "draft");
        let issue = &report.teaching_issues[0];
        assert_eq!(issue.problem.from_draft, "I was fine after we lost.");
        assert_eq!(
            issue.problem.explanation,
            "Emotion is stated, never shown. The loss has no cost."
        );
        assert!(issue.problem.impact_on_score.contains("3.2"));

        let dialogue = &report.teaching_issues[1];
        assert_eq!(dialogue.problem.from_draft, "");
    }

    #[test]
    fn test_quick_win_requires_small_gap_and_weight() {
        let report = transform(&sample_analysis(), None, "draft");
        let dialogue_id = report.teaching_issues[1].id.clone();
        assert_eq!(report.quick_wins, vec![dialogue_id]);
        for id in &report.quick_wins {
            assert!(report.issue(id).is_some());
        }
    }

    #[test]
    fn test_idempotent_ids() {
        let a = transform(&sample_analysis(), None, "draft");
        let b = transform(&sample_analysis(), None, "draft");
        assert_eq!(a, b);
        assert!(a.teaching_issues[0].id.starts_with("vulnerability-"));
        assert_eq!(a.teaching_issues[0].id.len(), "vulnerability-".len() + 12);
    }

    #[test]
    fn test_weight_breaks_ties_within_severity() {
        let analysis = AnalysisResult::new(50.0)
            .with_category(CategoryScore::new(RubricCategory::Imagery, 30.0, 100.0))
            .with_category(CategoryScore::new(RubricCategory::Stakes, 30.0, 100.0))
            .with_category(CategoryScore::new(RubricCategory::Voice, 30.0, 100.0))
            .with_weight(RubricCategory::Imagery, 0.2)
            .with_weight(RubricCategory::Stakes, 0.4)
            .with_weight(RubricCategory::Voice, 0.2);

        let order: Vec<RubricCategory> = transform(&analysis, None, "")
            .teaching_issues
            .iter()
            .map(|i| i.category)
            .collect();
        assert_eq!(
            order,
            vec![RubricCategory::Stakes, RubricCategory::Imagery, RubricCategory::Voice]
        );
    }

    #[test]
    fn test_coaching_flag_promotes_healthy_category() {
        let coaching = RawCoaching {
            notes: vec![CoachingNote::new(RubricCategory::Structure)
                .flagged()
                .with_headline("The middle drags")],
        };
        let report = transform(&sample_analysis(), Some(&coaching), "draft");

        let structure = report
            .teaching_issues
            .iter()
            .find(|i| i.category == RubricCategory::Structure)
            .expect("structure issue");
        assert_eq!(structure.severity, Severity::Minor);
        assert_eq!(structure.problem.title, "The middle drags");
        assert_eq!(structure.priority_rank, 3);
    }

    #[test]
    fn test_malformed_category_is_skipped() {
        let analysis = AnalysisResult::new(70.0)
            .with_category(CategoryScore::new(RubricCategory::Voice, 10.0, 0.0))
            .with_category(CategoryScore::new(RubricCategory::Pacing, f64::NAN, 100.0))
            .with_category(CategoryScore::new(RubricCategory::Ending, 60.0, 100.0));

        let report = transform(&analysis, None, "");
        assert_eq!(report.teaching_issues.len(), 1);
        assert_eq!(report.teaching_issues[0].category, RubricCategory::Ending);
        assert_eq!(report.teaching_issues[0].severity, Severity::Major);
    }

    #[test]
    fn test_target_is_clamped() {
        let analysis = AnalysisResult::new(98.0)
            .with_category(CategoryScore::new(RubricCategory::Voice, 10.0, 100.0))
            .with_weight(RubricCategory::Voice, 1.0);
        let report = transform(&analysis, None, "");
        assert_eq!(report.overall.target_nqi, 100.0);
        assert!((report.overall.potential_gain - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_examples_follow_configured_limit() {
        let config = WorkshopConfig {
            max_examples: 1,
            ..WorkshopConfig::default()
        };
        let transformer = TeachingTransformer::new(ExampleLibrary::builtin(), config);
        let report = transformer.transform(&sample_analysis(), None, "");
        assert_eq!(report.teaching_issues[0].examples.len(), 1);
        assert!(report.teaching_issues[0]
            .examples
            .iter()
            .all(|e| e.category == RubricCategory::Vulnerability));
    }
}
