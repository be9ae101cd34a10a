use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LangbaseResult;
use crate::rubric::{ActivityContext, AnalysisResult, RawCoaching};

/// How thorough the backend analysis should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisDepth {
    /// Full rubric pass.
    #[default]
    Comprehensive,
}

/// Options sent with every analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AnalysisOptions {
    /// How thorough the analysis is.
    pub depth: AnalysisDepth,
    /// Skip the coaching pass.
    pub skip_coaching: bool,
}

/// Input to the analysis backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Draft to analyze.
    pub essay_text: String,
    /// Activity the draft describes.
    pub activity: ActivityContext,
    /// Request options.
    pub options: AnalysisOptions,
}

/// What the analysis backend returns.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResponse {
    /// Rubric scores.
    pub analysis: AnalysisResult,
    /// Coaching notes, unless skipped.
    pub coaching: Option<RawCoaching>,
}

/// External rubric-scoring service. Potentially slow, potentially failing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Score an essay against the rubric.
    async fn analyze(&self, request: &AnalysisRequest) -> LangbaseResult<AnalysisResponse>;
}
