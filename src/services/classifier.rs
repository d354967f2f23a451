//! Reasoning adapter: turns the collaborator's free text into a
//! [`Classification`] or a typed failure.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::models::{Classification, TicketPriority};
use crate::domain::ports::{ReasoningError, ReasoningService};

/// Failure modes of one classification attempt.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Worth retrying with backoff.
    #[error("transient reasoning failure: {0}")]
    Transient(ReasoningError),

    /// Retrying cannot fix this — unparseable output or a permanent API
    /// failure. The caller falls back to the default classification.
    #[error("malformed reasoning response: {0}")]
    Malformed(String),
}

/// Wraps the reasoning collaborator with prompt construction, deterministic
/// input truncation and tolerant response parsing.
pub struct Classifier {
    reasoning: Arc<dyn ReasoningService>,
    max_description_chars: usize,
}

impl Classifier {
    pub fn new(reasoning: Arc<dyn ReasoningService>, max_description_chars: usize) -> Self {
        Self {
            reasoning,
            max_description_chars,
        }
    }

    /// Classify one ticket.
    ///
    /// Missing fields in a parseable response default individually; only a
    /// response that is not a JSON object at all is `Malformed`.
    pub async fn classify(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Classification, ClassifyError> {
        let description = truncate_chars(description, self.max_description_chars);
        let prompt = build_prompt(title, description);

        let raw = self.reasoning.complete(&prompt).await.map_err(|err| {
            if err.is_transient() {
                ClassifyError::Transient(err)
            } else {
                ClassifyError::Malformed(err.to_string())
            }
        })?;

        parse_response(&raw)
    }
}

fn build_prompt(title: &str, description: &str) -> String {
    format!(
        "Analyze the support ticket and return ONLY a JSON object with:\n\
         {{\n\
         \x20 \"summary\": \"short summary\",\n\
         \x20 \"priority\": \"low|medium|high\",\n\
         \x20 \"helpfulNotes\": \"technical notes\",\n\
         \x20 \"relatedSkills\": [\"skills\"]\n\
         }}\n\n\
         Title: {title}\n\
         Description: {description}\n"
    )
}

/// Truncate to a character budget without splitting a code point.
fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &s[..byte_index],
        None => s,
    }
}

/// Strip a Markdown code fence if the whole response is wrapped in one.
///
/// Reasoning services wrap JSON in ```json fences even when instructed not
/// to; the content inside the fence is what we parse.
fn strip_code_fences(output: &str) -> &str {
    let trimmed = output.trim();
    if !(trimmed.starts_with("```") && trimmed.ends_with("```") && trimmed.len() > 6) {
        return trimmed;
    }

    let start = trimmed.find('\n').map_or(3, |pos| pos + 1);
    let end = trimmed.rfind("\n```").unwrap_or(trimmed.len() - 3);
    if start >= end {
        return trimmed;
    }
    trimmed[start..end].trim()
}

fn parse_response(raw: &str) -> Result<Classification, ClassifyError> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(ClassifyError::Malformed("empty response".to_string()));
    }

    let value: serde_json::Value = serde_json::from_str(cleaned)
        .map_err(|err| ClassifyError::Malformed(err.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ClassifyError::Malformed("response is not a JSON object".to_string()))?;

    // Partial credit: each field defaults independently.
    let summary = object
        .get("summary")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let priority = object
        .get("priority")
        .and_then(|v| v.as_str())
        .map_or(TicketPriority::Unset, TicketPriority::from_keyword);
    let helpful_notes = object
        .get("helpfulNotes")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let related_skills = object
        .get("relatedSkills")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(Classification {
        summary,
        priority,
        helpful_notes,
        related_skills,
    })
}
