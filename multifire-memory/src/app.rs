//! An app created by [`InMemoryBackend`](crate::InMemoryBackend).

use async_trait::async_trait;
use std::{
    any::Any,
    sync::{Arc, Weak},
};
use tracing::info;

use multifire_core::{
    backend::{AppBackend, AuthBackend, FirestoreBackend, StorageBackend},
    config::FirebaseOptions,
    error::{FirebaseError, FirebaseResult},
};

use crate::{
    auth::InMemoryAuth, firestore::InMemoryFirestore, provider::ProviderState,
    storage::InMemoryStorage,
};

/// One in-memory app and its service handles.
#[derive(Debug)]
pub struct InMemoryApp {
    name: String,
    options: FirebaseOptions,
    auth: Arc<InMemoryAuth>,
    firestore: Arc<InMemoryFirestore>,
    storage: Arc<InMemoryStorage>,
    provider: Weak<ProviderState>,
}

impl InMemoryApp {
    pub(crate) fn new(
        name: &str,
        options: &FirebaseOptions,
        provider: Weak<ProviderState>,
    ) -> Self {
        Self {
            name: name.to_string(),
            options: options.clone(),
            auth: Arc::new(InMemoryAuth::new()),
            firestore: Arc::new(InMemoryFirestore::new()),
            storage: Arc::new(InMemoryStorage::new(options.storage_bucket.clone())),
            provider,
        }
    }

    /// The concrete document store, for fault injection.
    pub fn memory_firestore(&self) -> &Arc<InMemoryFirestore> {
        &self.firestore
    }
}

#[async_trait]
impl AppBackend for InMemoryApp {
    fn name(&self) -> &str {
        &self.name
    }

    fn options(&self) -> &FirebaseOptions {
        &self.options
    }

    fn auth(&self) -> Arc<dyn AuthBackend> {
        self.auth.clone()
    }

    fn firestore(&self) -> Arc<dyn FirestoreBackend> {
        self.firestore.clone()
    }

    fn storage(&self) -> Arc<dyn StorageBackend> {
        self.storage.clone()
    }

    async fn delete(&self) -> FirebaseResult<()> {
        if let Some(provider) = self.provider.upgrade() {
            if provider.failing_deletions.read().await.contains(&self.name) {
                return Err(FirebaseError::Backend(format!(
                    "failed to delete app '{}'",
                    self.name
                )));
            }

            provider.apps.write().await.remove(&self.name);
        }

        self.firestore.terminate().await;
        info!(app = %self.name, "app deleted");

        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
