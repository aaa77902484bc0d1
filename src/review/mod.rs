pub mod parse;
pub mod prompts;

use tracing::{debug, info, warn};

use crate::docs::types::{ContextHit, Issue};
use crate::llm::ReviewModel;

/// Ask the model for compliance issues in `document`, grounded on `context`.
///
/// The model is called exactly once. A failed call or an unusable answer
/// yields one synthetic issue instead of an error, so a batch keeps going.
pub async fn analyze<M: ReviewModel>(
    model: &M,
    jurisdiction: &str,
    context: &[ContextHit],
    document: &str,
) -> Vec<Issue> {
    let context_text = context
        .iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(prompts::CONTEXT_SEPARATOR);
    let prompt = prompts::build_review_prompt(jurisdiction, &context_text, document);
    debug!(prompt_len = prompt.len(), excerpts = context.len(), "review prompt built");

    let response = match model.generate(&prompt).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %format!("{e:#}"), "model call failed");
            return vec![Issue::failed(format!("model call failed: {e:#}"), "")];
        }
    };

    debug!(response_len = response.len(), "model response received");
    let issues = parse::parse_issues(&response);
    if issues.iter().any(|i| i.error.is_some()) {
        warn!(response_len = response.len(), "model response was not a JSON issue list");
    } else {
        info!(issues = issues.len(), "model review parsed");
    }
    issues
}


#[cfg(test)]
mod tests {
    use super::test_support::CannedModel;
    use super::*;
    use crate::docs::types::ReferenceChunk;

    fn hit(text: &str) -> ContextHit {
        ContextHit {
            chunk: ReferenceChunk {
                text: text.to_string(),
                source_name: "regs.txt".to_string(),
            },
            distance: 0.0,
        }
    }

    #[tokio::test]
    async fn test_context_joined_in_order() {
        let model = CannedModel::replying("[]");
        let issues = analyze(&model, "ADGM", &[hit("first"), hit("second")], "doc body").await;
        assert!(issues.is_empty());
        assert_eq!(model.calls(), 1);
        let prompt = model.prompts.lock().unwrap()[0].clone();
        assert!(prompt.contains("first\n---\nsecond"));
        assert!(prompt.contains("doc body"));
    }

    #[tokio::test]
    async fn test_model_failure_becomes_issue() {
        let model = CannedModel::failing();
        let issues = analyze(&model, "ADGM", &[], "doc").await;
        assert_eq!(issues.len(), 1);
        assert!(issues[0].error.as_deref().unwrap().contains("connection refused"));
        assert_eq!(issues[0].raw.as_deref(), Some(""));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn test_garbage_response_becomes_issue() {
        let model = CannedModel::replying("Sorry, I can't help with that.");
        let issues = analyze(&model, "ADGM", &[hit("x")], "doc").await;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].raw.as_deref(), Some("Sorry, I can't help with that."));
    }
}
