//! Socratic reflection prompts and their fingerprint-keyed cache.
//!
//! Prompt text comes from an external generator ([`ReflectionGenerator`]);
//! this module owns the data model, the cache key derivation and the
//! single-flight cache in [`ReflectionPromptCache`].

mod cache;
mod fingerprint;

pub use cache::*;
pub use fingerprint::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{LangbaseResult, WorkshopError, WorkshopResult};
use crate::rubric::{ActivityContext, RubricCategory, Severity};

/// Kind of answer a prompt expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerType {
    /// A sentence or two.
    ShortText,
    /// A paragraph or more.
    LongText,
    /// A finite number.
    Number,
    /// One of the listed options.
    MultipleChoice,
}

/// Optional constraints on an answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Minimum trimmed length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum trimmed length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Lowest accepted number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Highest accepted number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Accepted choices; empty accepts anything.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// One guided question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionPrompt {
    /// Question shown to the student.
    pub question: String,
    /// Why the question is being asked.
    pub purpose: String,
    /// Expected answer kind.
    pub answer_type: AnswerType,
    /// Constraints checked by [`ReflectionPrompt::validate_answer`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationRules>,
    /// The student's answer, once given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl ReflectionPrompt {
    /// Create an unanswered prompt
    pub fn new(question: impl Into<String>, purpose: impl Into<String>, answer_type: AnswerType) -> Self {
        Self {
            question: question.into(),
            purpose: purpose.into(),
            answer_type,
            validation: None,
            answer: None,
        }
    }

    /// Attach validation rules
    pub fn with_validation(mut self, rules: ValidationRules) -> Self {
        self.validation = Some(rules);
        self
    }

    /// Check an answer against the answer type and rules.
    pub fn validate_answer(&self, answer: &str) -> WorkshopResult<()> {
        let trimmed = answer.trim();
        let fail = |reason: String| WorkshopError::Validation {
            field: "answer".to_string(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(fail("answer cannot be empty".to_string()));
        }

        let rules = self.validation.clone().unwrap_or_default();
        let length = trimmed.chars().count();

        match self.answer_type {
            AnswerType::Number => {
                let value = trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| fail(format!("'{}' is not a number", trimmed)))?;
                if let Some(min) = rules.min {
                    if value < min {
                        return Err(fail(format!("must be at least {}", min)));
                    }
                }
                if let Some(max) = rules.max {
                    if value > max {
                        return Err(fail(format!("must be at most {}", max)));
                    }
                }
            }
            AnswerType::MultipleChoice => {
                if !rules.options.is_empty() && !rules.options.iter().any(|o| o == trimmed) {
                    return Err(fail(format!("'{}' is not one of the options", trimmed)));
                }
            }
            AnswerType::ShortText | AnswerType::LongText => {
                if let Some(min) = rules.min_length {
                    if length < min {
                        return Err(fail(format!("must be at least {} characters", min)));
                    }
                }
                if let Some(max) = rules.max_length {
                    if length > max {
                        return Err(fail(format!("must be at most {} characters", max)));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Generated prompts for one (issue, draft state) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionPromptSet {
    /// Issue the prompts were generated for.
    pub issue_id: String,
    /// Cache key this set was stored under.
    pub fingerprint: String,
    /// Generated questions in order.
    pub prompts: Vec<ReflectionPrompt>,
    /// When the generator returned.
    pub generated_at: DateTime<Utc>,
}

/// Voice the generator writes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTone {
    /// Warm, curious mentor voice.
    Mentor,
}

/// How probing the questions should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptDepth {
    /// Clarifying questions about what happened.
    Surface,
    /// Questions that dig into motive and feeling.
    Deep,
}

impl PromptDepth {
    /// Deep questions for critical and major issues, surface for minor ones.
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical | Severity::Major => PromptDepth::Deep,
            Severity::Minor => PromptDepth::Surface,
        }
    }
}

/// Tone/depth configuration sent to the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Voice.
    pub tone: PromptTone,
    /// Probing depth.
    pub depth: PromptDepth,
}

/// The slice of a teaching issue the generator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueDescriptor {
    /// Issue id.
    pub issue_id: String,
    /// Rubric category.
    pub category: RubricCategory,
    /// Severity band.
    pub severity: Severity,
    /// Problem title.
    pub title: String,
    /// Excerpt quoted from the draft.
    pub from_draft: String,
    /// What is wrong with the excerpt.
    pub explanation: String,
    /// Principle name.
    pub principle: String,
}

/// Everything sent to the narrative-generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReflectionRequest {
    /// Issue to ask about.
    pub issue: IssueDescriptor,
    /// Activity the essay describes.
    pub activity: ActivityContext,
    /// Full current draft.
    pub draft_text: String,
    /// Tone and depth.
    pub config: GenerationConfig,
}

/// External narrative-generation collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReflectionGenerator: Send + Sync {
    /// Produce guided questions for one issue.
    async fn generate(&self, request: &ReflectionRequest) -> LangbaseResult<Vec<ReflectionPrompt>>;
}
