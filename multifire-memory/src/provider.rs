//! Backend provider keeping every app in memory.
//!
//! Besides implementing [`BackendProvider`], [`InMemoryBackend`] exposes hooks tests use to make
//! initialization or deletion of a named app fail, and counts how many apps it created.

use async_trait::async_trait;
use mea::rwlock::RwLock;
use std::{
    any::Any,
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tracing::debug;

use multifire_core::{
    backend::{AppBackend, BackendProvider},
    config::FirebaseOptions,
    error::{FirebaseError, FirebaseResult},
};

use crate::{app::InMemoryApp, firestore::InMemoryFirestore};

#[derive(Debug, Default)]
pub(crate) struct ProviderState {
    pub(crate) apps: RwLock<HashMap<String, Arc<InMemoryApp>>>,
    pub(crate) failing_initializations: RwLock<HashSet<String>>,
    pub(crate) failing_deletions: RwLock<HashSet<String>>,
    initializations: AtomicUsize,
}

/// In-memory stand-in for the backend SDK's app namespace.
///
/// Clones share the same apps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<ProviderState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later attempt to initialize `name` fail.
    pub async fn fail_initialization_of(&self, name: impl Into<String>) {
        self.state
            .failing_initializations
            .write()
            .await
            .insert(name.into());
    }

    /// Makes every later attempt to delete the app `name` fail.
    pub async fn fail_deletion_of(&self, name: impl Into<String>) {
        self.state
            .failing_deletions
            .write()
            .await
            .insert(name.into());
    }

    /// Clears the failures injected for `name`.
    pub async fn heal(&self, name: &str) {
        self.state.failing_initializations.write().await.remove(name);
        self.state.failing_deletions.write().await.remove(name);
    }

    /// Number of apps created so far.
    pub fn initialization_count(&self) -> usize {
        self.state.initializations.load(Ordering::SeqCst)
    }

    /// The concrete document store of app `name`.
    pub async fn firestore_of(&self, name: &str) -> Option<Arc<InMemoryFirestore>> {
        self.state
            .apps
            .read()
            .await
            .get(name)
            .map(|app| app.memory_firestore().clone())
    }
}

#[async_trait]
impl BackendProvider for InMemoryBackend {
    async fn initialize_app(
        &self,
        name: &str,
        options: &FirebaseOptions,
    ) -> FirebaseResult<Arc<dyn AppBackend>> {
        if self.state.failing_initializations.read().await.contains(name) {
            return Err(FirebaseError::Backend(format!(
                "failed to initialize app '{name}'"
            )));
        }

        let mut apps = self.state.apps.write().await;
        if apps.contains_key(name) {
            return Err(FirebaseError::InvalidArgument(format!(
                "an app named '{name}' already exists"
            )));
        }

        let app = Arc::new(InMemoryApp::new(
            name,
            options,
            Arc::downgrade(&self.state),
        ));
        apps.insert(name.to_string(), app.clone());
        self.state.initializations.fetch_add(1, Ordering::SeqCst);
        debug!(app = %name, project_id = %options.project_id, "app created");

        Ok(app)
    }

    async fn app(&self, name: &str) -> FirebaseResult<Arc<dyn AppBackend>> {
        self.state
            .apps
            .read()
            .await
            .get(name)
            .map(|app| app.clone() as Arc<dyn AppBackend>)
            .ok_or_else(|| FirebaseError::NoApp(name.to_string()))
    }

    async fn apps(&self) -> Vec<String> {
        let mut names = self
            .state
            .apps
            .read()
            .await
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> FirebaseOptions {
        FirebaseOptions {
            api_key: "key".into(),
            auth_domain: "demo.firebaseapp.com".into(),
            project_id: "demo".into(),
            storage_bucket: "demo.appspot.com".into(),
            messaging_sender_id: "1".into(),
            app_id: "1:1:web:1".into(),
            database_url: None,
            measurement_id: None,
        }
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected() {
        let backend = InMemoryBackend::new();

        backend.initialize_app("p1", &options()).await.unwrap();
        let duplicate = backend.initialize_app("p1", &options()).await;

        assert!(matches!(duplicate, Err(FirebaseError::InvalidArgument(_))));
        assert_eq!(backend.initialization_count(), 1);
        assert_eq!(backend.apps().await, vec!["p1".to_string()]);
    }

    #[tokio::test]
    async fn deleting_an_app_forgets_its_name() {
        let backend = InMemoryBackend::new();
        let app = backend.initialize_app("p1", &options()).await.unwrap();

        backend.fail_deletion_of("p1").await;
        assert!(app.delete().await.is_err());
        assert!(backend.app("p1").await.is_ok());

        backend.heal("p1").await;
        app.delete().await.unwrap();
        assert!(matches!(backend.app("p1").await, Err(FirebaseError::NoApp(_))));
    }

    #[tokio::test]
    async fn services_are_downcastable() {
        let backend = InMemoryBackend::new();
        let app = backend.initialize_app("p1", &options()).await.unwrap();

        assert!(app.firestore().as_any().downcast_ref::<InMemoryFirestore>().is_some());
        assert_eq!(app.storage().bucket(), "demo.appspot.com");
        assert!(app.as_any().downcast_ref::<InMemoryApp>().is_some());
    }
}
