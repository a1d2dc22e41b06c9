pub mod client_builder;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_smithy_types::error::metadata::ProvideErrorMetadata;

use crate::config::ClientConfig;
use crate::storage::{Storage, StorageFactory, StorageTrait};
use crate::types::{DeleteFailure, DeleteOutcome, ObjectPage};

/// Extracts the S3 error code and message from an AWS SDK error.
///
/// For service errors (S3 API responses), returns the S3 error code
/// (e.g. "AccessDenied", "NoSuchBucket") and the human-readable error
/// message from the response. For other error types (network, timeout,
/// construction failure), returns "N/A" as the code and the full error
/// description as the message.
fn extract_sdk_error_details<E: std::fmt::Display + ProvideErrorMetadata>(
    e: &SdkError<E>,
) -> (String, String) {
    if let Some(service_err) = e.as_service_error() {
        (
            service_err.code().unwrap_or("unknown").to_string(),
            service_err.message().unwrap_or("no message").to_string(),
        )
    } else {
        ("N/A".to_string(), e.to_string())
    }
}

/// Factory creating one S3 storage handle per bucket.
///
/// `create()` builds a fresh `aws_sdk_s3::Client` on every call, so each
/// concurrent bucket task owns its own client and connection pool.
pub struct S3StorageFactory {
    client_config: ClientConfig,
}

impl S3StorageFactory {
    pub fn new(client_config: ClientConfig) -> Self {
        Self { client_config }
    }
}

#[async_trait]
impl StorageFactory for S3StorageFactory {
    async fn create(&self, bucket: &str) -> Result<Storage> {
        let client = self.client_config.create_client().await;
        Ok(Box::new(S3Storage {
            bucket: bucket.to_string(),
            client,
        }))
    }
}

/// S3 storage implementation backing a bucket purge task.
///
/// Provides the two operations the purger needs: paginated ListObjectsV2
/// and batch DeleteObjects. Request timeouts and transport retries are
/// the AWS SDK defaults plus whatever the client's retry policy was
/// configured with.
struct S3Storage {
    bucket: String,
    client: Client,
}

#[async_trait]
impl StorageTrait for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list_objects_page(
        &self,
        max_keys: i32,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .set_continuation_token(continuation_token)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = self.bucket,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 ListObjectsV2 API call failed for s3://{}: {} ({}).",
                    self.bucket,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::list_objects_v2() failed.")
            })?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(String::from))
            .collect();

        let next_continuation_token = if output.is_truncated() == Some(true) {
            output.next_continuation_token().map(String::from)
        } else {
            None
        };

        Ok(ObjectPage {
            keys,
            next_continuation_token,
        })
    }

    async fn delete_objects(&self, keys: Vec<String>) -> Result<DeleteOutcome> {
        let object_count = keys.len();

        let identifiers = keys
            .into_iter()
            .map(|key| {
                ObjectIdentifier::builder()
                    .key(key)
                    .build()
                    .context("Failed to build ObjectIdentifier")
            })
            .collect::<Result<Vec<_>>>()?;

        let delete = Delete::builder()
            .set_objects(Some(identifiers))
            .build()
            .context("Failed to build Delete request")?;

        let response = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|e| {
                let (s3_error_code, s3_error_message) = extract_sdk_error_details(&e);
                tracing::error!(
                    bucket = self.bucket,
                    object_count = object_count,
                    s3_error_code = s3_error_code,
                    s3_error_message = s3_error_message,
                    "S3 DeleteObjects API call failed for {} objects in s3://{}: {} ({}).",
                    object_count,
                    self.bucket,
                    s3_error_code,
                    s3_error_message,
                );
                anyhow::anyhow!(e).context("aws_sdk_s3::client::delete_objects() failed.")
            })?;

        let deleted = response
            .deleted()
            .iter()
            .filter_map(|d| d.key().map(String::from))
            .collect();

        let errors = response
            .errors()
            .iter()
            .map(|err| DeleteFailure {
                key: err.key().unwrap_or("unknown").to_string(),
                code: err.code().unwrap_or("unknown").to_string(),
                message: err.message().unwrap_or("no message").to_string(),
            })
            .collect();

        Ok(DeleteOutcome { deleted, errors })
    }
}
