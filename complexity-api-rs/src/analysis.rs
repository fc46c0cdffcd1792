//! Analysis service
//!
//! Runs one request through the pipeline: credential check, prompt, model
//! call, normalization. Failures of the model call are classified here and
//! nowhere else.

use std::sync::Arc;

use crate::error::{classify, ClassifiedError};
use crate::llm_client::{GenerationConfig, GenerativeModel};
use crate::models::AnalysisResult;
use crate::normalizer::normalize;
use crate::prompt::build_prompt;

const CONNECTION_TEST_CODE: &str = "function fibonacci(n) {
  if (n <= 1) return n;
  return fibonacci(n - 1) + fibonacci(n - 2);
}";

#[derive(Clone)]
pub struct AnalysisService {
    model: Arc<dyn GenerativeModel>,
    generation_config: GenerationConfig,
}

impl AnalysisService {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            model,
            generation_config: GenerationConfig::analysis(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_configured()
    }

    /// Analyze `code` and return a fully populated result.
    pub async fn analyze(
        &self,
        code: &str,
        language: &str,
        problem_title: &str,
    ) -> Result<AnalysisResult, ClassifiedError> {
        if !self.model.is_configured() {
            tracing::error!("GEMINI_API_KEY is not configured");
            return Err(ClassifiedError::config_missing(
                "GEMINI_API_KEY is not configured",
            ));
        }

        let prompt = build_prompt(code, language, problem_title);

        let response_text = self
            .model
            .generate_content(&prompt, &self.generation_config)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "Gemini API call failed");
                let classified = classify(&err);
                tracing::warn!(kind = ?classified.kind, "Classified model failure");
                classified
            })?;

        if response_text.is_empty() {
            tracing::error!("Empty response from Gemini API");
            return Err(ClassifiedError::internal("Empty response from Gemini API"));
        }

        Ok(normalize(&response_text))
    }

    /// Run a small fixed sample through the full pipeline.
    pub async fn test_connection(&self) -> bool {
        match self
            .analyze(CONNECTION_TEST_CODE, "javascript", "Fibonacci Test")
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(error = %err, "Model connection test failed");
                false
            }
        }
    }
}
