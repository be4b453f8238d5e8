use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One chat transcript entry. `role` stays free text on the wire so a
/// malformed entry is dropped at assembly time instead of failing the
/// whole request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub flagged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            timestamp: Some(Utc::now()),
            flagged: false,
            flag_reason: None,
            attachment: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            ..Self::user(content)
        }
    }
}

/// Expense fields the chat endpoint renders into the reference block.
/// Everything is optional on the wire; fallbacks apply at render time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseRef {
    #[serde(default)]
    pub property: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<&crate::models::Expense> for ExpenseRef {
    fn from(e: &crate::models::Expense) -> Self {
        Self {
            property: e.property.clone(),
            amount: e.amount.clone(),
            vendor: e.vendor.clone(),
            note: e.note.clone(),
            created_at: Some(e.created_at),
        }
    }
}

/// A single message in the sequence sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: String,
    pub content: String,
}

impl ModelMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}
