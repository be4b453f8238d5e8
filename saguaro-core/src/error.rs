use thiserror::Error;

#[derive(Error, Debug)]
pub enum SaguaroError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Classifier error: {0}")]
    Classify(#[from] crate::classify::ClassifyError),

    #[error("Receipt storage error: {0}")]
    Receipts(#[from] crate::receipts::ReceiptError),

    #[error("Other error: {0}")]
    Other(String),
}
