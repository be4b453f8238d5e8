pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod flagging;
pub mod models;
pub mod prompt;
pub mod receipts;
pub mod store;

pub use classify::{AnthropicClient, ClassifierBackend, ClassifierConfig, ClassifyError};
pub use config::SaguaroConfig;
pub use error::SaguaroError;
pub use flagging::{review_reason, FLAG_REASON, TRIGGER_PHRASES};
pub use receipts::{ReceiptError, ReceiptStore, ReceiptStoreConfig};
