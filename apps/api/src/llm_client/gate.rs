//! Generation gate: bounded parallelism, timeouts, and structured-output parsing
//! in front of any `Generator`.
//!
//! Holding a permit is the only thing that spans the external call. No store
//! lock is ever held while waiting on the model.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::errors::AppError;
use crate::llm_client::{strip_json_fences, GenerationRequest, Generator, LlmError};

pub struct GenerationGate {
    generator: Arc<dyn Generator>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl GenerationGate {
    pub fn new(generator: Arc<dyn Generator>, max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            generator,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    pub fn model_id(&self) -> String {
        self.generator.model_id().to_string()
    }

    /// Calls the generator and returns its raw text.
    pub async fn text(&self, request: &GenerationRequest) -> Result<String, AppError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("generation gate closed: {e}")))?;

        debug!("Generation call started (mode={})", request.mode.as_str());

        let outcome = tokio::time::timeout(self.timeout, self.generator.complete(request)).await;
        let text = match outcome {
            Err(_) => {
                return Err(AppError::ExternalTimeout(format!(
                    "{} generation exceeded {}s",
                    request.mode.as_str(),
                    self.timeout.as_secs()
                )))
            }
            Ok(result) => result?,
        };

        if text.trim().is_empty() {
            return Err(AppError::MalformedGenerationOutput(format!(
                "{} generation returned empty text",
                request.mode.as_str()
            )));
        }
        Ok(text)
    }

    /// Calls the generator and parses its output as a JSON object.
    /// Free-text responses are malformed.
    pub async fn structured(&self, request: &GenerationRequest) -> Result<Value, AppError> {
        let text = self.text(request).await?;
        parse_structured(&text).map_err(|reason| {
            AppError::MalformedGenerationOutput(format!(
                "{} generation: {reason}",
                request.mode.as_str()
            ))
        })
    }
}

fn parse_structured(text: &str) -> Result<Value, String> {
    let body = strip_json_fences(text);
    let value: Value =
        serde_json::from_str(body).map_err(|e| format!("response is not valid JSON ({e})"))?;
    if !value.is_object() {
        return Err("response is not a JSON object".to_string());
    }
    Ok(value)
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        if err.is_timeout() {
            return AppError::ExternalTimeout(err.to_string());
        }
        match err {
            LlmError::Parse(e) => AppError::MalformedGenerationOutput(e.to_string()),
            LlmError::EmptyContent => {
                AppError::MalformedGenerationOutput("model returned no text block".to_string())
            }
            other => AppError::External {
                retryable: other.is_retryable(),
                message: other.to_string(),
            },
        }
    }
}
