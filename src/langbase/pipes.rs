use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use super::types::{AnalysisCompletion, Message, PipeRequest, ReflectionCompletion};
use super::LangbaseClient;
use crate::error::{LangbaseError, LangbaseResult};
use crate::prompts::{NARRATIVE_ANALYSIS_PROMPT, REFLECTION_PROMPTS_PROMPT};
use crate::reflection::{ReflectionGenerator, ReflectionPrompt, ReflectionRequest};
use crate::workshop::{AnalysisBackend, AnalysisRequest, AnalysisResponse};

/// Analysis backend served by a Langbase pipe.
#[derive(Clone)]
pub struct LangbaseAnalysisBackend {
    client: LangbaseClient,
    pipe: String,
}

impl LangbaseAnalysisBackend {
    /// Create a backend calling `pipe`
    pub fn new(client: LangbaseClient, pipe: impl Into<String>) -> Self {
        Self {
            client,
            pipe: pipe.into(),
        }
    }

    fn build_messages(request: &AnalysisRequest) -> LangbaseResult<Vec<Message>> {
        let payload = json!({
            "activity": request.activity,
            "options": request.options,
            "essay": request.essay_text,
        });
        let content = serde_json::to_string(&payload).map_err(|e| LangbaseError::InvalidResponse {
            message: format!("Failed to encode analysis request: {}", e),
        })?;
        Ok(vec![
            Message::system(NARRATIVE_ANALYSIS_PROMPT),
            Message::user(content),
        ])
    }
}

#[async_trait]
impl AnalysisBackend for LangbaseAnalysisBackend {
    async fn analyze(&self, request: &AnalysisRequest) -> LangbaseResult<AnalysisResponse> {
        let messages = Self::build_messages(request)?;
        let response = self
            .client
            .call_pipe(PipeRequest::new(&self.pipe, messages))
            .await?;

        let parsed = AnalysisCompletion::from_completion(&response.completion)?;
        debug!(
            activity_id = %request.activity.activity_id,
            nqi = parsed.analysis.nqi,
            categories = parsed.analysis.categories.len(),
            "Analysis completion parsed"
        );

        let mut analysis = parsed.analysis;
        if analysis.engine.is_empty() {
            analysis.engine = response
                .model()
                .map(|m| format!("{}:{}", self.pipe, m))
                .unwrap_or_else(|| self.pipe.clone());
        }

        let coaching = if request.options.skip_coaching {
            None
        } else {
            parsed.coaching
        };

        Ok(AnalysisResponse { analysis, coaching })
    }
}

/// Reflection prompt generator served by a Langbase pipe.
#[derive(Clone)]
pub struct LangbaseReflectionGenerator {
    client: LangbaseClient,
    pipe: String,
}

impl LangbaseReflectionGenerator {
    /// Create a generator calling `pipe`
    pub fn new(client: LangbaseClient, pipe: impl Into<String>) -> Self {
        Self {
            client,
            pipe: pipe.into(),
        }
    }
}

#[async_trait]
impl ReflectionGenerator for LangbaseReflectionGenerator {
    async fn generate(&self, request: &ReflectionRequest) -> LangbaseResult<Vec<ReflectionPrompt>> {
        let content = serde_json::to_string(request).map_err(|e| LangbaseError::InvalidResponse {
            message: format!("Failed to encode reflection request: {}", e),
        })?;
        let messages = vec![
            Message::system(REFLECTION_PROMPTS_PROMPT),
            Message::user(content),
        ];

        let response = self
            .client
            .call_pipe(PipeRequest::new(&self.pipe, messages))
            .await?;

        let parsed = ReflectionCompletion::from_completion(&response.completion)?;
        let total = parsed.prompts.len();
        let prompts: Vec<ReflectionPrompt> = parsed
            .prompts
            .into_iter()
            .filter(|p| !p.question.trim().is_empty())
            .map(|mut p| {
                // answers never come from the generator
                p.answer = None;
                p
            })
            .collect();

        if prompts.len() < total {
            warn!(
                issue_id = %request.issue.issue_id,
                dropped = total - prompts.len(),
                "Dropped blank reflection prompts"
            );
        }
        Ok(prompts)
    }
}
