/*!
 * Robust analyzer adapter.
 *
 * Wraps a raw transport with the behavior every check module relies on:
 * per-call timeout, bounded retries with exponential backoff, schema
 * validation of the structured reply, and repair-and-reparse of malformed
 * replies (strip code fences and trailing commentary, extract the JSON
 * object, coerce loose yes/no forms) before giving up.
 */

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use std::time::Duration;

use crate::errors::AnalyzerError;

use super::{
    AnalyzerRequest, AnalyzerTransport, AnswerSchema, AnswerValue, SemanticAnalyzer,
    StructuredAnswer,
};

/// Options for the robust adapter
#[derive(Debug, Clone)]
pub struct AnalyzerOptions {
    /// Per-call deadline in seconds
    pub timeout_secs: u64,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Base backoff in milliseconds, doubled per attempt
    pub backoff_base_ms: u64,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self { timeout_secs: 30, max_retries: 2, backoff_base_ms: 500 }
    }
}

/// Wire shape of a structured reply
#[derive(Debug, Deserialize)]
struct RawReply {
    answer: serde_json::Value,
    #[serde(default = "default_confidence")]
    confidence: u8,
}

fn default_confidence() -> u8 {
    50
}

/// The one adapter between check modules and the outside capability
#[derive(Debug)]
pub struct RobustAnalyzer<T: AnalyzerTransport> {
    transport: T,
    options: AnalyzerOptions,
}

impl<T: AnalyzerTransport> RobustAnalyzer<T> {
    /// Wrap a transport with default options
    pub fn new(transport: T) -> Self {
        Self::with_options(transport, AnalyzerOptions::default())
    }

    /// Wrap a transport with custom options
    pub fn with_options(transport: T, options: AnalyzerOptions) -> Self {
        Self { transport, options }
    }

    /// Render the prompt: question, context, and the schema instruction that
    /// constrains the reply shape.
    fn render_prompt(request: &AnalyzerRequest) -> String {
        let shape = match &request.schema {
            AnswerSchema::YesNo => {
                r#"{"answer": true|false, "confidence": 0-100}"#.to_string()
            }
            AnswerSchema::Choice { options } => format!(
                r#"{{"answer": "<one of: {}>", "confidence": 0-100}}"#,
                options.join(" | ")
            ),
            AnswerSchema::List => {
                r#"{"answer": ["item", ...], "confidence": 0-100}"#.to_string()
            }
            AnswerSchema::Text => r#"{"answer": "<text>", "confidence": 0-100}"#.to_string(),
        };
        format!(
            "{}\n\nText:\n\"\"\"\n{}\n\"\"\"\n\nReply with exactly one JSON object of the form {} and nothing else.",
            request.question, request.context_text, shape
        )
    }

    /// Parse a reply against the schema, repairing common damage first.
    fn parse_reply(reply: &str, schema: &AnswerSchema) -> Result<StructuredAnswer, AnalyzerError> {
        let attempts = [reply.to_string(), repair_reply(reply)];
        let mut last_error = String::new();

        for attempt in &attempts {
            match serde_json::from_str::<RawReply>(attempt) {
                Ok(raw) => return validate_against_schema(raw, schema),
                Err(e) => last_error = e.to_string(),
            }
        }
        Err(AnalyzerError::MalformedResponse(format!(
            "reply does not parse as a structured answer: {}",
            last_error
        )))
    }
}

#[async_trait]
impl<T: AnalyzerTransport> SemanticAnalyzer for RobustAnalyzer<T> {
    async fn ask(&self, request: AnalyzerRequest) -> Result<StructuredAnswer, AnalyzerError> {
        let prompt = Self::render_prompt(&request);
        let timeout = Duration::from_secs(self.options.timeout_secs);

        let mut attempt = 0u32;
        let mut last_error: Option<AnalyzerError> = None;

        while attempt <= self.options.max_retries {
            if attempt > 0 {
                let backoff_ms = self.options.backoff_base_ms * (1u64 << (attempt - 1));
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }

            let outcome = tokio::time::timeout(timeout, self.transport.complete(prompt.clone()))
                .await
                .map_err(|_| AnalyzerError::Timeout(self.options.timeout_secs))
                .and_then(|r| r);

            match outcome {
                Ok(reply) => match Self::parse_reply(&reply, &request.schema) {
                    Ok(answer) => {
                        debug!(
                            "Analyzer answered (confidence {}) after {} attempt(s)",
                            answer.confidence,
                            attempt + 1
                        );
                        return Ok(answer);
                    }
                    Err(e) => {
                        warn!("Analyzer reply malformed on attempt {}: {}", attempt + 1, e);
                        last_error = Some(e);
                    }
                },
                Err(e) if e.is_retryable() => {
                    warn!("Analyzer call failed on attempt {}: {}", attempt + 1, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }

            attempt += 1;
        }

        Err(AnalyzerError::RetriesExhausted(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt recorded".to_string()),
        ))
    }
}

/// Strip code fences and trailing commentary, keeping the first JSON object.
fn repair_reply(reply: &str) -> String {
    let without_fences = reply.replace("```json", "").replace("```", "");
    let trimmed = without_fences.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if end > start => trimmed[start..=end].to_string(),
        _ => trimmed.to_string(),
    }
}

/// Validate the raw answer value against the requested schema, coercing the
/// loose forms models actually produce.
fn validate_against_schema(
    raw: RawReply,
    schema: &AnswerSchema,
) -> Result<StructuredAnswer, AnalyzerError> {
    let confidence = raw.confidence.min(100);
    let value = match schema {
        AnswerSchema::YesNo => match &raw.answer {
            serde_json::Value::Bool(b) => AnswerValue::Bool(*b),
            serde_json::Value::String(s) => match s.trim().to_lowercase().as_str() {
                "yes" | "true" => AnswerValue::Bool(true),
                "no" | "false" => AnswerValue::Bool(false),
                other => {
                    return Err(AnalyzerError::MalformedResponse(format!(
                        "expected yes/no, got '{}'",
                        other
                    )));
                }
            },
            other => {
                return Err(AnalyzerError::MalformedResponse(format!(
                    "expected yes/no, got {}",
                    other
                )));
            }
        },
        AnswerSchema::Choice { options } => {
            let chosen = raw
                .answer
                .as_str()
                .map(|s| s.trim().to_lowercase())
                .ok_or_else(|| {
                    AnalyzerError::MalformedResponse("expected a choice string".to_string())
                })?;
            if !options.iter().any(|o| o.to_lowercase() == chosen) {
                return Err(AnalyzerError::MalformedResponse(format!(
                    "'{}' is not one of the allowed options",
                    chosen
                )));
            }
            AnswerValue::Text(chosen)
        }
        AnswerSchema::List => match &raw.answer {
            serde_json::Value::Array(items) => AnswerValue::List(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(|s| s.trim().to_string()))
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            // A single string is accepted as a one-element list
            serde_json::Value::String(s) if !s.trim().is_empty() => {
                AnswerValue::List(vec![s.trim().to_string()])
            }
            other => {
                return Err(AnalyzerError::MalformedResponse(format!(
                    "expected a list, got {}",
                    other
                )));
            }
        },
        AnswerSchema::Text => AnswerValue::Text(
            raw.answer
                .as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| {
                    AnalyzerError::MalformedResponse("expected a text answer".to_string())
                })?,
        ),
    };

    Ok(StructuredAnswer { value, confidence })
}
