use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An interaction heuristically marked for human bookkeeper review.
/// Append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FlaggedItem {
    pub id: Uuid,
    pub query: String,
    pub response: String,
    pub flag_reason: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new flagged item; `id` and `created_at` come from the database.
#[derive(Debug, Clone, Default)]
pub struct NewFlag {
    pub query: String,
    pub response: String,
    pub flag_reason: String,
}
