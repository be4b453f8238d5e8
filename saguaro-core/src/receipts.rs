//! Receipt blob storage, Supabase storage REST shape.
//!
//! Uploads go to `POST {base}/storage/v1/object/{bucket}/{name}` with a
//! bearer service key; the returned URL is the public object path. The
//! expense row, not the blob, is the source of truth: callers decide
//! whether an upload failure is fatal, and a successful upload followed
//! by a failed row insert leaves an orphaned blob (accepted gap).

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error types
// ============================================================================

/// Receipt upload errors
#[derive(Error, Debug)]
pub enum ReceiptError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Storage API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing storage URL or service key")]
    MissingCredentials,
}

// ============================================================================
// Config
// ============================================================================

/// Storage client configuration
#[derive(Debug, Clone)]
pub struct ReceiptStoreConfig {
    pub base_url: String,
    pub service_key: String,
    pub bucket: String,
}

impl ReceiptStoreConfig {
    /// Read `SUPABASE_URL` / `SUPABASE_SERVICE_KEY` from the environment.
    pub fn from_env(bucket: String) -> Self {
        Self {
            base_url: std::env::var("SUPABASE_URL").unwrap_or_default(),
            service_key: std::env::var("SUPABASE_SERVICE_KEY").unwrap_or_default(),
            bucket,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StorageErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Object name for an uploaded receipt: upload instant in unix millis
/// plus the original filename, path separators flattened.
pub fn object_name(now: DateTime<Utc>, original: &str) -> String {
    format!("{}-{}", now.timestamp_millis(), original.replace(['/', '\\'], "_"))
}

// ============================================================================
// ReceiptStore
// ============================================================================

/// Receipt blob store client.
#[derive(Debug, Clone)]
pub struct ReceiptStore {
    client: Client,
    config: ReceiptStoreConfig,
}

impl ReceiptStore {
    pub fn new(config: ReceiptStoreConfig) -> Result<Self, ReceiptError> {
        if config.base_url.is_empty() || config.service_key.is_empty() {
            return Err(ReceiptError::MissingCredentials);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        let config = ReceiptStoreConfig {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ..config
        };

        Ok(Self { client, config })
    }

    /// Upload a blob under `name` and return its public URL.
    pub async fn upload(
        &self,
        name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, ReceiptError> {
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.config.base_url, self.config.bucket, name
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StorageErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.message.or(e.error))
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Receipt upload failed");

            return Err(ReceiptError::Api {
                code: status.as_u16(),
                message,
            });
        }

        Ok(self.public_url(name))
    }

    /// Public URL for an object in the configured bucket.
    pub fn public_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.base_url, self.config.bucket, name
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str) -> ReceiptStoreConfig {
        ReceiptStoreConfig {
            base_url: base_url.to_string(),
            service_key: "service-key".to_string(),
            bucket: "receipts".to_string(),
        }
    }

    #[test]
    fn test_object_name_from_instant_and_filename() {
        let now = Utc.timestamp_millis_opt(1_754_000_000_123).unwrap();
        assert_eq!(
            object_name(now, "receipt.jpg"),
            "1754000000123-receipt.jpg"
        );
    }

    #[test]
    fn test_object_name_flattens_path_separators() {
        let now = Utc.timestamp_millis_opt(1_754_000_000_123).unwrap();
        assert_eq!(
            object_name(now, "scans/aug/receipt.pdf"),
            "1754000000123-scans_aug_receipt.pdf"
        );
    }

    #[tokio::test]
    async fn test_upload_returns_public_url() {
        let mock_server = MockServer::start().await;
        let store = ReceiptStore::new(test_config(&mock_server.uri()))
            .expect("Failed to create store");

        Mock::given(method("POST"))
            .and(path("/storage/v1/object/receipts/123-receipt.jpg"))
            .and(header("authorization", "Bearer service-key"))
            .and(header("content-type", "image/jpeg"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Key": "receipts/123-receipt.jpg"
            })))
            .mount(&mock_server)
            .await;

        let url = store
            .upload("123-receipt.jpg", "image/jpeg", vec![0xFF, 0xD8])
            .await
            .expect("upload should succeed");

        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/public/receipts/123-receipt.jpg",
                mock_server.uri()
            )
        );
    }

    #[tokio::test]
    async fn test_upload_maps_api_error() {
        let mock_server = MockServer::start().await;
        let store = ReceiptStore::new(test_config(&mock_server.uri()))
            .expect("Failed to create store");

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "message": "new row violates row-level security policy"
            })))
            .mount(&mock_server)
            .await;

        let result = store.upload("x.png", "image/png", vec![1, 2, 3]).await;

        match result {
            Err(ReceiptError::Api { code, message }) => {
                assert_eq!(code, 403);
                assert!(message.contains("row-level security"));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let config = ReceiptStoreConfig {
            base_url: String::new(),
            service_key: String::new(),
            bucket: "receipts".to_string(),
        };

        assert!(matches!(
            ReceiptStore::new(config),
            Err(ReceiptError::MissingCredentials)
        ));
    }
}
