//! Chat-turn pipeline: assemble the conversation, call the classifier,
//! apply the review-flag heuristic to the reply.

use saguaro_core::classify::{ClassifierBackend, ClassifyError};
use saguaro_core::flagging;
use saguaro_core::models::{ChatTurn, ExpenseRef};
use saguaro_core::prompt;

/// Outcome of one chat turn.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutcome {
    pub response: String,
    pub flagged: bool,
    pub flag_reason: Option<String>,
}

/// Run one turn against `backend`. Upstream failures propagate; the
/// caller decides how to render them.
pub async fn run_turn(
    backend: &dyn ClassifierBackend,
    message: &str,
    history: &[ChatTurn],
    expenses: &[ExpenseRef],
) -> Result<ChatOutcome, ClassifyError> {
    let messages = prompt::assemble_conversation(message, history, expenses);

    tracing::debug!(
        backend = backend.name(),
        turns = messages.len(),
        "Dispatching chat turn"
    );

    let response = backend.classify(prompt::RULES_ENGINE, &messages).await?;

    let reason = flagging::review_reason(&response);
    if reason.is_some() {
        tracing::info!("Reply flagged for review");
    }

    Ok(ChatOutcome {
        flagged: reason.is_some(),
        flag_reason: reason.map(str::to_string),
        response,
    })
}
