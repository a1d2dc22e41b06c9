use anyhow::Result;
use async_trait::async_trait;

use crate::types::{DeleteOutcome, ObjectPage};

pub mod s3;

/// Type alias for a boxed Storage trait object.
pub type Storage = Box<dyn StorageTrait + Send + Sync>;

/// Storage operations needed by a bucket purge task.
///
/// Kept to the two capabilities the purger consumes: paginated listing
/// and batch deletion. Timeouts and transport-level retries are whatever
/// the underlying client provides; the purger layers its own bounded
/// retry on top.
#[async_trait]
pub trait StorageTrait {
    /// The bucket this storage handle operates on.
    fn bucket(&self) -> &str;

    /// Fetch one page of object keys.
    ///
    /// `continuation_token` of `None` starts the listing from the
    /// beginning. A returned page with `next_continuation_token == None`
    /// signals end-of-listing; an empty page with a token present is a
    /// valid intermediate page.
    async fn list_objects_page(
        &self,
        max_keys: i32,
        continuation_token: Option<String>,
    ) -> Result<ObjectPage>;

    /// Delete the given keys in a single batch request.
    ///
    /// Accepts at most 1000 keys per call (S3 API limit); the caller is
    /// responsible for chunking. Per-key failures inside an otherwise
    /// successful call are reported in the outcome, not as an error.
    async fn delete_objects(&self, keys: Vec<String>) -> Result<DeleteOutcome>;
}

/// Factory producing one storage handle per bucket task.
///
/// Each call builds an independent client so concurrent bucket tasks
/// never share connection state.
#[async_trait]
pub trait StorageFactory: Send + Sync {
    async fn create(&self, bucket: &str) -> Result<Storage>;
}
