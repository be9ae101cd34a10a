//! Rubric analysis model and tolerant ingestion of backend payloads.
//!
//! The analysis backend scores an essay against eleven fixed narrative
//! categories. Its JSON is only loosely trustworthy, so [`AnalysisResult::from_value`]
//! validates each category on its own and drops the ones it cannot read
//! rather than rejecting the whole analysis.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{WorkshopError, WorkshopResult};

/// One of the eleven rubric dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RubricCategory {
    /// How the first lines earn attention.
    OpeningHook,
    /// Willingness to show doubt, failure or cost.
    Vulnerability,
    /// Use of spoken exchanges to carry scene and character.
    Dialogue,
    /// Overall arc and paragraph ordering.
    Structure,
    /// Concrete names, numbers and details.
    Specificity,
    /// Sensory description.
    Imagery,
    /// Distinct personal register.
    Voice,
    /// What was at risk for the writer.
    Stakes,
    /// Meaning drawn from the experience.
    Reflection,
    /// Time spent per moment.
    Pacing,
    /// Resonance of the final paragraph.
    Ending,
}

impl RubricCategory {
    /// Every category in rubric order.
    pub const ALL: [RubricCategory; 11] = [
        RubricCategory::OpeningHook,
        RubricCategory::Vulnerability,
        RubricCategory::Dialogue,
        RubricCategory::Structure,
        RubricCategory::Specificity,
        RubricCategory::Imagery,
        RubricCategory::Voice,
        RubricCategory::Stakes,
        RubricCategory::Reflection,
        RubricCategory::Pacing,
        RubricCategory::Ending,
    ];

    /// Wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            RubricCategory::OpeningHook => "opening_hook",
            RubricCategory::Vulnerability => "vulnerability",
            RubricCategory::Dialogue => "dialogue",
            RubricCategory::Structure => "structure",
            RubricCategory::Specificity => "specificity",
            RubricCategory::Imagery => "imagery",
            RubricCategory::Voice => "voice",
            RubricCategory::Stakes => "stakes",
            RubricCategory::Reflection => "reflection",
            RubricCategory::Pacing => "pacing",
            RubricCategory::Ending => "ending",
        }
    }

    /// Student-facing name.
    pub fn label(&self) -> &'static str {
        match self {
            RubricCategory::OpeningHook => "Opening Hook",
            RubricCategory::Vulnerability => "Vulnerability",
            RubricCategory::Dialogue => "Dialogue",
            RubricCategory::Structure => "Structure",
            RubricCategory::Specificity => "Specificity",
            RubricCategory::Imagery => "Imagery",
            RubricCategory::Voice => "Voice",
            RubricCategory::Stakes => "Stakes",
            RubricCategory::Reflection => "Reflection",
            RubricCategory::Pacing => "Pacing",
            RubricCategory::Ending => "Ending",
        }
    }
}

impl std::fmt::Display for RubricCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RubricCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        RubricCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("Unknown rubric category: {}", s))
    }
}

/// How far a category falls below the healthy band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Below 55%.
    Critical,
    /// 55% up to 70%.
    Major,
    /// 70% up to 85%.
    Minor,
}

impl Severity {
    /// Percentage at or above which a category is healthy.
    pub const HEALTHY_THRESHOLD: f64 = 85.0;

    /// Classify a category percentage; `None` means the category is healthy.
    pub fn from_percentage(percentage: f64) -> Option<Self> {
        if percentage >= Self::HEALTHY_THRESHOLD {
            None
        } else if percentage >= 70.0 {
            Some(Severity::Minor)
        } else if percentage >= 55.0 {
            Some(Severity::Major)
        } else {
            Some(Severity::Critical)
        }
    }

    /// Lower bound of the next better tier.
    pub fn next_threshold(&self) -> f64 {
        match self {
            Severity::Critical => 55.0,
            Severity::Major => 70.0,
            Severity::Minor => Self::HEALTHY_THRESHOLD,
        }
    }

    /// NQI points recoverable per unit of category weight.
    pub fn point_value(&self) -> f64 {
        match self {
            Severity::Critical => 8.0,
            Severity::Major => 4.0,
            Severity::Minor => 1.5,
        }
    }

    /// Estimated revision time in minutes.
    pub fn minutes(&self) -> u32 {
        match self {
            Severity::Critical => 15,
            Severity::Major => 8,
            Severity::Minor => 3,
        }
    }

    /// Wire identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Major => "major",
            Severity::Minor => "minor",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Score for one rubric category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Which category was scored.
    pub category: RubricCategory,
    /// Points awarded.
    pub score: f64,
    /// Points available.
    pub max_score: f64,
    /// Reviewer remarks, joined into the problem explanation.
    #[serde(default)]
    pub comments: Vec<String>,
    /// Excerpts quoted from the draft.
    #[serde(default)]
    pub evidence: Vec<String>,
    /// Concrete revision ideas.
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl CategoryScore {
    /// Create a score with no commentary
    pub fn new(category: RubricCategory, score: f64, max_score: f64) -> Self {
        Self {
            category,
            score,
            max_score,
            comments: Vec::new(),
            evidence: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Add a reviewer comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comments.push(comment.into());
        self
    }

    /// Add a quoted evidence excerpt
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    /// Add an improvement suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Score as a percentage of the maximum, `None` when the record is unusable.
    ///
    /// Rounded to nine decimals so a score sitting exactly on a band boundary
    /// classifies into the upper band.
    pub fn percentage(&self) -> Option<f64> {
        if !self.score.is_finite() || !self.max_score.is_finite() || self.max_score <= 0.0 {
            return None;
        }
        if self.score < 0.0 {
            return None;
        }
        let raw = self.score * 100.0 / self.max_score;
        Some((raw * 1e9).round() / 1e9)
    }
}

/// Immutable output of one analysis-backend run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Narrative Quality Index, 0-100.
    pub nqi: f64,
    /// Qualitative reader-impression label.
    #[serde(default)]
    pub reader_impression: String,
    /// Free-form warning flags raised by the backend.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Category scores in rubric order as reported.
    pub categories: Vec<CategoryScore>,
    /// Relative importance per category, summing to 1.
    #[serde(default)]
    pub weights: BTreeMap<RubricCategory, f64>,
    /// Identifier of the analysis engine that produced this result.
    #[serde(default)]
    pub engine: String,
}

impl AnalysisResult {
    /// Create an empty analysis with the given NQI
    pub fn new(nqi: f64) -> Self {
        Self {
            nqi: nqi.clamp(0.0, 100.0),
            reader_impression: String::new(),
            flags: Vec::new(),
            categories: Vec::new(),
            weights: BTreeMap::new(),
            engine: String::new(),
        }
    }

    /// Append a category score
    pub fn with_category(mut self, score: CategoryScore) -> Self {
        self.categories.push(score);
        self
    }

    /// Set a category weight
    pub fn with_weight(mut self, category: RubricCategory, weight: f64) -> Self {
        self.weights.insert(category, weight);
        self
    }

    /// Set the reader-impression label
    pub fn with_impression(mut self, impression: impl Into<String>) -> Self {
        self.reader_impression = impression.into();
        self
    }

    /// Add a flag
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Set the engine identifier
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    /// Find the score record for one category
    pub fn category(&self, category: RubricCategory) -> Option<&CategoryScore> {
        self.categories.iter().find(|c| c.category == category)
    }

    /// Weight for a category; categories absent from the weight map get an
    /// equal share of the scored categories.
    pub fn weight_for(&self, category: RubricCategory) -> f64 {
        match self.weights.get(&category) {
            Some(w) if w.is_finite() && *w >= 0.0 => *w,
            _ if self.categories.is_empty() => 0.0,
            _ => 1.0 / self.categories.len() as f64,
        }
    }

    /// Median weight across the scored categories.
    pub fn median_weight(&self) -> f64 {
        let mut weights: Vec<f64> = self
            .categories
            .iter()
            .map(|c| self.weight_for(c.category))
            .collect();
        if weights.is_empty() {
            return 0.0;
        }
        weights.sort_by(|a, b| a.total_cmp(b));
        let mid = weights.len() / 2;
        if weights.len() % 2 == 0 {
            (weights[mid - 1] + weights[mid]) / 2.0
        } else {
            weights[mid]
        }
    }

    /// Validate a raw backend payload.
    ///
    /// Fails only when the document has no usable `nqi`; malformed categories
    /// and weights are skipped with a warning.
    pub fn from_value(value: &Value) -> WorkshopResult<Self> {
        let nqi = value
            .get("nqi")
            .or_else(|| value.get("narrative_quality_index"))
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite())
            .ok_or_else(|| WorkshopError::Validation {
                field: "nqi".to_string(),
                reason: "missing or non-numeric".to_string(),
            })?;

        let mut result = AnalysisResult::new(nqi);
        result.reader_impression = value
            .get("reader_impression")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        result.flags = string_list(value.get("flags"));
        result.engine = value
            .get("engine")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if let Some(categories) = value.get("categories").and_then(Value::as_array) {
            for (index, raw) in categories.iter().enumerate() {
                match parse_category(raw) {
                    Ok(score) => {
                        if result.category(score.category).is_some() {
                            warn!(category = %score.category, "Duplicate category score ignored");
                            continue;
                        }
                        result.categories.push(score);
                    }
                    Err(reason) => {
                        warn!(index, reason = %reason, "Skipping malformed category score");
                    }
                }
            }
        } else {
            warn!("Analysis payload has no categories array");
        }

        if let Some(weights) = value.get("weights").and_then(Value::as_object) {
            for (key, raw) in weights {
                let parsed = key
                    .parse::<RubricCategory>()
                    .ok()
                    .zip(raw.as_f64().filter(|w| w.is_finite() && *w >= 0.0));
                match parsed {
                    Some((category, weight)) => {
                        result.weights.insert(category, weight);
                    }
                    None => warn!(key = %key, "Skipping malformed category weight"),
                }
            }
        }

        result.normalize_weights();
        Ok(result)
    }

    /// Fill missing weights with an equal share and rescale so they sum to 1.
    pub fn normalize_weights(&mut self) {
        if self.categories.is_empty() {
            return;
        }
        let share = 1.0 / self.categories.len() as f64;
        for score in &self.categories {
            self.weights.entry(score.category).or_insert(share);
        }
        let total: f64 = self.weights.values().sum();
        if total > 0.0 {
            for weight in self.weights.values_mut() {
                *weight /= total;
            }
        }
    }
}

fn parse_category(raw: &Value) -> Result<CategoryScore, String> {
    let id = raw
        .get("category")
        .or_else(|| raw.get("id"))
        .and_then(Value::as_str)
        .ok_or("missing category id")?;
    let category: RubricCategory = id.parse()?;

    let score = raw
        .get("score")
        .and_then(Value::as_f64)
        .ok_or("missing numeric score")?;
    let max_score = raw
        .get("max_score")
        .or_else(|| raw.get("max"))
        .and_then(Value::as_f64)
        .unwrap_or(100.0);

    let parsed = CategoryScore {
        category,
        score,
        max_score,
        comments: string_list(raw.get("comments")),
        evidence: string_list(raw.get("evidence")),
        suggestions: string_list(raw.get("suggestions")),
    };

    if parsed.percentage().is_none() {
        return Err(format!(
            "unusable score {}/{} for {}",
            score, max_score, category
        ));
    }
    Ok(parsed)
}

/// Accept either a single string or an array of strings.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Per-category commentary from the coaching pass of the analysis backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCoaching {
    /// One note per category at most.
    #[serde(default)]
    pub notes: Vec<CoachingNote>,
}

/// Coaching commentary for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingNote {
    /// Category the note is about.
    pub category: RubricCategory,
    /// Forces an otherwise healthy category into the issue list.
    #[serde(default)]
    pub flagged: bool,
    /// Overrides the derived problem title.
    #[serde(default)]
    pub headline: Option<String>,
    /// Overrides the default principle name.
    #[serde(default)]
    pub principle_name: Option<String>,
    /// Overrides the default principle description.
    #[serde(default)]
    pub principle_description: Option<String>,
    /// Overrides the default rationale.
    #[serde(default)]
    pub why_it_matters: Option<String>,
}

impl CoachingNote {
    /// Create an unflagged note for a category
    pub fn new(category: RubricCategory) -> Self {
        Self {
            category,
            flagged: false,
            headline: None,
            principle_name: None,
            principle_description: None,
            why_it_matters: None,
        }
    }

    /// Mark the category as needing attention regardless of score
    pub fn flagged(mut self) -> Self {
        self.flagged = true;
        self
    }

    /// Override the problem title
    pub fn with_headline(mut self, headline: impl Into<String>) -> Self {
        self.headline = Some(headline.into());
        self
    }
}

impl RawCoaching {
    /// Note for a category, if any
    pub fn note(&self, category: RubricCategory) -> Option<&CoachingNote> {
        self.notes.iter().find(|n| n.category == category)
    }

    /// Whether coaching explicitly flags a category
    pub fn flags(&self, category: RubricCategory) -> bool {
        self.note(category).map(|n| n.flagged).unwrap_or(false)
    }

    /// Validate raw coaching commentary, skipping unreadable notes
    pub fn from_value(value: &Value) -> Self {
        let notes = value
            .get("notes")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|raw| match serde_json::from_value::<CoachingNote>(raw.clone()) {
                        Ok(note) => Some(note),
                        Err(e) => {
                            warn!(error = %e, "Skipping malformed coaching note");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { notes }
    }
}

/// The extracurricular activity an essay describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityContext {
    /// Opaque activity identifier that keys the version store.
    pub activity_id: String,
    /// Display name.
    pub name: String,
    /// Student's role, e.g. "Captain".
    #[serde(default)]
    pub role: Option<String>,
    /// Short description of the activity.
    #[serde(default)]
    pub description: Option<String>,
}

impl ActivityContext {
    /// Create an activity with an id and display name
    pub fn new(activity_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            name: name.into(),
            role: None,
            description: None,
        }
    }

    /// Set the student's role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set a short description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_from_str_variants() {
        assert_eq!(
            "opening-hook".parse::<RubricCategory>().unwrap(),
            RubricCategory::OpeningHook
        );
        assert_eq!(
            " Dialogue ".parse::<RubricCategory>().unwrap(),
            RubricCategory::Dialogue
        );
        assert!("plot".parse::<RubricCategory>().is_err());
    }

    #[test]
    fn test_severity_bands() {
        assert_eq!(Severity::from_percentage(0.0), Some(Severity::Critical));
        assert_eq!(Severity::from_percentage(54.99), Some(Severity::Critical));
        assert_eq!(Severity::from_percentage(55.0), Some(Severity::Major));
        assert_eq!(Severity::from_percentage(69.99), Some(Severity::Major));
        assert_eq!(Severity::from_percentage(70.0), Some(Severity::Minor));
        assert_eq!(Severity::from_percentage(84.99), Some(Severity::Minor));
        assert_eq!(Severity::from_percentage(85.0), None);
        assert_eq!(Severity::from_percentage(100.0), None);
    }

    #[test]
    fn test_severity_ordering_puts_critical_first() {
        let mut severities = vec![Severity::Minor, Severity::Critical, Severity::Major];
        severities.sort();
        assert_eq!(
            severities,
            vec![Severity::Critical, Severity::Major, Severity::Minor]
        );
    }

    #[test]
    fn test_boundary_scores_land_in_upper_band() {
        let cases = [
            (3.3, 6.0, Some(Severity::Major)),
            (0.7, 1.0, Some(Severity::Minor)),
            (4.2, 6.0, Some(Severity::Minor)),
            (5.1, 6.0, None),
            (0.85, 1.0, None),
            (1.1, 2.0, Some(Severity::Major)),
        ];
        for (score, max, expected) in cases {
            let percentage = CategoryScore::new(RubricCategory::Voice, score, max)
                .percentage()
                .unwrap();
            assert_eq!(
                Severity::from_percentage(percentage),
                expected,
                "{}/{} gave {}",
                score,
                max,
                percentage
            );
        }
    }

    #[test]
    fn test_percentage_rejects_bad_max() {
        assert_eq!(
            CategoryScore::new(RubricCategory::Voice, 7.0, 10.0).percentage(),
            Some(70.0)
        );
        assert!(CategoryScore::new(RubricCategory::Voice, 7.0, 0.0)
            .percentage()
            .is_none());
        assert!(CategoryScore::new(RubricCategory::Voice, -1.0, 10.0)
            .percentage()
            .is_none());
        assert!(CategoryScore::new(RubricCategory::Voice, f64::NAN, 10.0)
            .percentage()
            .is_none());
    }

    #[test]
    fn test_from_value_skips_malformed_categories() {
        let payload = json!({
            "nqi": 61.5,
            "reader_impression": "promising",
            "flags": ["telling_not_showing"],
            "categories": [
                {"category": "vulnerability", "score": 4, "max_score": 10,
                 "comments": ["Stays on the surface"], "evidence": "I was fine."},
                {"category": "plot_twists", "score": 9, "max_score": 10},
                {"category": "dialogue", "score": "high", "max_score": 10},
                {"category": "structure", "score": 8, "max_score": 0},
                {"category": "imagery", "score": 7}
            ],
            "weights": {"vulnerability": 0.8, "imagery": "heavy", "nonsense": 0.2}
        });

        let result = AnalysisResult::from_value(&payload).unwrap();
        assert_eq!(result.nqi, 61.5);
        assert_eq!(result.flags, vec!["telling_not_showing"]);
        assert_eq!(result.categories.len(), 2);
        assert_eq!(result.categories[0].evidence, vec!["I was fine."]);
        assert_eq!(result.categories[1].max_score, 100.0);

        let total: f64 = result.weights.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(result.weight_for(RubricCategory::Vulnerability) > result.weight_for(RubricCategory::Imagery));
    }

    #[test]
    fn test_from_value_requires_nqi() {
        let err = AnalysisResult::from_value(&json!({"categories": []})).unwrap_err();
        assert!(matches!(err, WorkshopError::Validation { .. }));
    }

    #[test]
    fn test_weight_for_missing_weight_uses_equal_share() {
        let result = AnalysisResult::new(50.0)
            .with_category(CategoryScore::new(RubricCategory::Voice, 5.0, 10.0))
            .with_category(CategoryScore::new(RubricCategory::Pacing, 5.0, 10.0));
        assert_eq!(result.weight_for(RubricCategory::Voice), 0.5);
    }

    #[test]
    fn test_median_weight_even_and_odd() {
        let odd = AnalysisResult::new(50.0)
            .with_category(CategoryScore::new(RubricCategory::Vulnerability, 4.0, 10.0))
            .with_category(CategoryScore::new(RubricCategory::Dialogue, 7.0, 10.0))
            .with_category(CategoryScore::new(RubricCategory::Structure, 9.0, 10.0))
            .with_weight(RubricCategory::Vulnerability, 0.4)
            .with_weight(RubricCategory::Dialogue, 0.3)
            .with_weight(RubricCategory::Structure, 0.3);
        assert!((odd.median_weight() - 0.3).abs() < 1e-9);

        let even = AnalysisResult::new(50.0)
            .with_category(CategoryScore::new(RubricCategory::Voice, 4.0, 10.0))
            .with_category(CategoryScore::new(RubricCategory::Pacing, 7.0, 10.0))
            .with_weight(RubricCategory::Voice, 0.2)
            .with_weight(RubricCategory::Pacing, 0.8);
        assert!((even.median_weight() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_raw_coaching_skips_bad_notes() {
        let coaching = RawCoaching::from_value(&json!({
            "notes": [
                {"category": "structure", "flagged": true, "headline": "Arc stalls"},
                {"category": "not_a_category", "flagged": true},
                "garbage"
            ]
        }));
        assert_eq!(coaching.notes.len(), 1);
        assert!(coaching.flags(RubricCategory::Structure));
        assert!(!coaching.flags(RubricCategory::Dialogue));
    }
}
