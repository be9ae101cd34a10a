//! Before/after exemplar library and the matcher that picks examples for an issue.
//!
//! The catalog is static and read-only; [`ExampleLibrary::builtin`] hands out a
//! process-wide instance so no locking is involved.

mod builtins;

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::rubric::{RubricCategory, Severity};

/// Hard cap on examples attached to one issue.
pub const MAX_EXAMPLES_PER_ISSUE: usize = 3;

/// Admissions tier of the school the exemplar essay was written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchoolTier {
    /// Ivy League and peer schools.
    IvyPlus,
    /// Top University of California campuses.
    TopUc,
    /// Competitive selective schools.
    Competitive,
}

impl SchoolTier {
    /// Wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchoolTier::IvyPlus => "ivy_plus",
            SchoolTier::TopUc => "top_uc",
            SchoolTier::Competitive => "competitive",
        }
    }
}

impl std::fmt::Display for SchoolTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The weaker passage and what is wrong with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeforeExcerpt {
    /// Original passage.
    pub text: String,
    /// What the passage does wrong.
    pub problems: Vec<String>,
}

/// The revised passage and how much it gained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AfterExcerpt {
    /// Revised passage.
    pub text: String,
    /// Human-readable score change, e.g. "+4 points".
    pub score_improvement: String,
}

/// A highlighted span of the revised passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Span quoted from the revised passage.
    pub highlight: String,
    /// Why the span works.
    pub explanation: String,
    /// Principle the span demonstrates.
    pub principle: String,
}

/// Immutable library entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EliteEssayExample {
    /// Stable library id.
    pub id: String,
    /// Rubric category the example teaches.
    pub category: RubricCategory,
    /// Short label for the essay the excerpt came from.
    pub context: String,
    /// Tier of the target school.
    pub tier: SchoolTier,
    /// Weaker version.
    pub before: BeforeExcerpt,
    /// Revised version.
    pub after: AfterExcerpt,
    /// Highlighted spans of the revision.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

/// Read-only catalog of exemplars.
#[derive(Debug, Clone)]
pub struct ExampleLibrary {
    examples: Vec<EliteEssayExample>,
}

static BUILTIN: OnceLock<ExampleLibrary> = OnceLock::new();

impl ExampleLibrary {
    /// Build a library from explicit entries
    pub fn new(examples: Vec<EliteEssayExample>) -> Self {
        Self { examples }
    }

    /// The shared built-in catalog
    pub fn builtin() -> &'static ExampleLibrary {
        BUILTIN.get_or_init(|| ExampleLibrary::new(builtins::catalog()))
    }

    /// All entries in catalog order
    pub fn all(&self) -> &[EliteEssayExample] {
        &self.examples
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Examples for one category in catalog order
    pub fn by_category(&self, category: RubricCategory) -> impl Iterator<Item = &EliteEssayExample> {
        self.examples.iter().filter(move |e| e.category == category)
    }

    /// Pick up to three exemplars for an issue.
    ///
    /// Only exact-category entries are considered; the result is never padded
    /// from other categories. Tier preference depends on severity: critical
    /// issues lead with `ivy_plus`, minor issues with `competitive` then
    /// `top_uc`.
    pub fn get_examples_for_issue(
        &self,
        category: RubricCategory,
        severity: Severity,
    ) -> Vec<EliteEssayExample> {
        self.get_examples_limited(category, severity, MAX_EXAMPLES_PER_ISSUE)
    }

    /// Same as [`get_examples_for_issue`](Self::get_examples_for_issue) with a
    /// caller-chosen limit (still capped at three).
    pub fn get_examples_limited(
        &self,
        category: RubricCategory,
        severity: Severity,
        limit: usize,
    ) -> Vec<EliteEssayExample> {
        let mut matches: Vec<&EliteEssayExample> = self.by_category(category).collect();
        // stable sort keeps catalog order within a tier
        matches.sort_by_key(|e| tier_rank(severity, e.tier));
        matches
            .into_iter()
            .take(limit.min(MAX_EXAMPLES_PER_ISSUE))
            .cloned()
            .collect()
    }
}

fn tier_rank(severity: Severity, tier: SchoolTier) -> u8 {
    match (severity, tier) {
        (Severity::Critical, SchoolTier::IvyPlus) => 0,
        (Severity::Critical, SchoolTier::TopUc) => 1,
        (Severity::Critical, SchoolTier::Competitive) => 2,
        (Severity::Major, SchoolTier::TopUc) => 0,
        (Severity::Major, SchoolTier::IvyPlus) => 1,
        (Severity::Major, SchoolTier::Competitive) => 2,
        (Severity::Minor, SchoolTier::Competitive) => 0,
        (Severity::Minor, SchoolTier::TopUc) => 1,
        (Severity::Minor, SchoolTier::IvyPlus) => 2,
    }
}
