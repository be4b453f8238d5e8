use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A submitted expense. JSON is camelCase on the wire, snake_case in PostgreSQL.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,
    pub property: String,
    pub amount: String,
    pub vendor: String,
    pub note: String,
    pub submitted_by: String,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields for a new expense row; `id` and `created_at` come from the database.
#[derive(Debug, Clone, Default)]
pub struct NewExpense {
    pub property: String,
    pub amount: String,
    pub vendor: String,
    pub note: String,
    pub submitted_by: String,
    pub receipt_url: Option<String>,
}
