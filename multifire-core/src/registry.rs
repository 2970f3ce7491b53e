//! Registry of named backend projects.
//!
//! The registry is a process-scoped context object: create it once at startup (usually through
//! [`Firebase::new`](crate::firebase::Firebase::new)), share clones of it, drop it at shutdown.
//! It holds at most one app per project name.
//!
//! # Example
//!
//! ```ignore
//! use multifire::{prelude::*, memory::InMemoryBackend};
//!
//! let firebase = Firebase::new(InMemoryBackend::new());
//! firebase
//!     .projects()
//!     .initialize_projects(vec![ProjectConfig::new("p1", options)])
//!     .await?;
//!
//! let app = firebase.projects().get_project("p1").await?;
//! firebase.projects().delete_project("p1").await?;
//! ```

use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, warn};

use crate::{
    backend::{AppBackend, BackendProvider},
    config::ProjectConfig,
    error::{FirebaseError, FirebaseResult, ProjectFailure},
};

/// Handle of an initialized app.
pub type FirebaseApp = Arc<dyn AppBackend>;

type ProjectMap = HashMap<String, FirebaseApp>;

/// Keyed registry of initialized projects.
///
/// Cloning is cheap; clones share the same mapping.
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    provider: Arc<dyn BackendProvider>,
    projects: Arc<RwLock<ProjectMap>>,
}

impl ProjectRegistry {
    pub fn new(provider: Arc<dyn BackendProvider>) -> Self {
        Self {
            provider,
            projects: Arc::new(RwLock::new(ProjectMap::new())),
        }
    }

    /// Initializes every project that is not registered yet.
    ///
    /// Names that are already registered, including repeats within `configs`, are skipped.
    /// Every entry is attempted; failures are collected into one
    /// [`FirebaseError::Aggregate`] while the successful entries stay registered.
    pub async fn initialize_projects(&self, configs: Vec<ProjectConfig>) -> FirebaseResult<()> {
        let mut projects = self.projects.write().await;
        let mut failures = Vec::new();

        for config in configs {
            if projects.contains_key(&config.name) {
                debug!(project = %config.name, "project already registered, skipping");
                continue;
            }

            match self.initialize_project(&config).await {
                Ok(app) => {
                    info!(
                        project = %config.name,
                        project_id = %config.options.project_id,
                        "project initialized"
                    );
                    projects.insert(config.name, app);
                }
                Err(error) => {
                    warn!(project = %config.name, %error, "project initialization failed");
                    failures.push(ProjectFailure {
                        name: config.name,
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(FirebaseError::Aggregate(failures))
        }
    }

    async fn initialize_project(&self, config: &ProjectConfig) -> FirebaseResult<FirebaseApp> {
        config.validate()?;

        // adopt an app the backend already knows under this name
        let app = match self.provider.app(&config.name).await {
            Ok(app) => app,
            Err(FirebaseError::NoApp(_)) => {
                self.provider
                    .initialize_app(&config.name, &config.options)
                    .await?
            }
            Err(error) => return Err(error),
        };

        app.firestore().configure(&config.settings).await?;

        Ok(app)
    }

    /// Returns the registered app, or [`FirebaseError::ProjectNotFound`].
    pub async fn get_project(&self, name: &str) -> FirebaseResult<FirebaseApp> {
        self.projects
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| FirebaseError::ProjectNotFound(name.to_string()))
    }

    /// Returns a copy of the current name to app mapping.
    pub async fn get_all_projects(&self) -> HashMap<String, FirebaseApp> {
        self.projects.read().await.clone()
    }

    /// Releases and unregisters a project. Unknown names are a no-op.
    ///
    /// If the backend fails to release the app, the mapping is kept so the caller can retry.
    pub async fn delete_project(&self, name: &str) -> FirebaseResult<()> {
        let mut projects = self.projects.write().await;

        let Some(app) = projects.get(name) else {
            debug!(project = %name, "project not registered, nothing to delete");
            return Ok(());
        };

        app.delete()
            .await
            .map_err(|source| FirebaseError::ProjectDeletion {
                name: name.to_string(),
                source: Box::new(source),
            })?;

        projects.remove(name);
        info!(project = %name, "project deleted");

        Ok(())
    }

    pub async fn contains(&self, name: &str) -> bool {
        self.projects.read().await.contains_key(name)
    }

    pub async fn len(&self) -> usize {
        self.projects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.projects.read().await.is_empty()
    }
}
