//! AWS S3 state store.
//!
//! Keeps the snapshot as a single object. A missing key means no state yet.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::models::{S3StateConfig, Snapshot};
use crate::storage::StateStore;

/// S3-backed single-slot store.
pub struct S3StateStore {
    client: Client,
    bucket: String,
    key: String,
}

impl S3StateStore {
    /// Create a new S3 store instance.
    pub fn new(client: Client, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Create an S3 store using the default AWS credential chain.
    pub async fn from_config(config: &S3StateConfig) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&sdk_config), &config.bucket, &config.key)
    }
}

#[async_trait]
impl StateStore for S3StateStore {
    async fn load(&self) -> Result<Option<Snapshot>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let bytes = output
                    .body
                    .collect()
                    .await
                    .map_err(AppError::storage)?
                    .into_bytes();
                let blob = String::from_utf8(bytes.to_vec()).map_err(AppError::storage)?;
                Ok(Some(Snapshot::from_persisted(blob)))
            }
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    log::info!("No state at s3://{}/{} yet", self.bucket, self.key);
                    Ok(None)
                } else {
                    Err(AppError::storage(service_err))
                }
            }
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let body = ByteStream::from(snapshot.as_str().as_bytes().to_vec());

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .body(body)
            .content_type("application/json")
            .send()
            .await
            .map_err(AppError::storage)?;

        log::debug!("Snapshot written to s3://{}/{}", self.bucket, self.key);
        Ok(())
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}
