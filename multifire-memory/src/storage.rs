//! In-memory object storage client.

use async_trait::async_trait;
use mea::rwlock::RwLock;
use std::{any::Any, collections::HashMap};

use multifire_core::{
    backend::StorageBackend,
    error::{FirebaseError, FirebaseResult},
};

/// Objects of one bucket, keyed by path.
#[derive(Debug)]
pub struct InMemoryStorage {
    bucket: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryStorage {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    fn validate(path: &str) -> FirebaseResult<()> {
        if path.trim_matches('/').is_empty() {
            return Err(FirebaseError::InvalidArgument("empty object path".into()));
        }

        Ok(())
    }
}

#[async_trait]
impl StorageBackend for InMemoryStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> FirebaseResult<()> {
        Self::validate(path)?;

        self.objects.write().await.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn download(&self, path: &str) -> FirebaseResult<Vec<u8>> {
        Self::validate(path)?;

        self.objects
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| FirebaseError::NotFound(format!("gs://{}/{path}", self.bucket)))
    }

    async fn delete(&self, path: &str) -> FirebaseResult<()> {
        Self::validate(path)?;

        self.objects
            .write()
            .await
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| FirebaseError::NotFound(format!("gs://{}/{path}", self.bucket)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
