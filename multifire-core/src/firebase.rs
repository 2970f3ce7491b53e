//! The helper surface applications call.
//!
//! [`Firebase`] bundles a backend provider with the project registry and exposes the service
//! accessors, the document reference resolver, and the read, write, batch, transaction and
//! subscription helpers. Every helper takes an optional project name; `None` targets the
//! default app.
//!
//! # Example
//!
//! ```ignore
//! use multifire::{prelude::*, memory::InMemoryBackend};
//! use bson::doc;
//!
//! let firebase = Firebase::new(InMemoryBackend::new());
//! firebase.projects().initialize_projects(vec![ProjectConfig::new("p1", options)]).await?;
//!
//! firebase
//!     .set_data("users", "u1", &doc! { "name": "Ann" }, SetOptions::default(), Some("p1"))
//!     .await?;
//! let snapshot = firebase.get_data("users", "u1", Some("p1")).await?;
//! assert!(snapshot.exists());
//! ```

use futures::FutureExt;
use mea::mutex::Mutex;
use serde::Serialize;
use std::{future::Future, sync::Arc};
use tracing::{debug, warn};

use crate::{
    backend::{
        AuthBackend, BackendProvider, FirestoreBackend, StorageBackend, TransactionBackend,
        TransactionFn,
    },
    config::DEFAULT_APP_NAME,
    document::{DocumentPath, DocumentSnapshot, QueryDocument},
    error::{FirebaseError, FirebaseResult},
    listener::{ListenerRegistration, Observer},
    query::{GetOptions, QuerySpec, Source},
    reference::DocumentReference,
    registry::{FirebaseApp, ProjectRegistry},
    transaction::Transaction,
    write::{BatchOperation, SetOptions, UpdateOptions, Write},
};

/// Process-scoped context: the backend provider plus the project registry.
///
/// Cloning is cheap; clones share the provider and the registry.
#[derive(Debug, Clone)]
pub struct Firebase {
    provider: Arc<dyn BackendProvider>,
    projects: ProjectRegistry,
}

impl Firebase {
    pub fn new<P: BackendProvider + 'static>(provider: P) -> Self {
        Self::with_provider(Arc::new(provider))
    }

    pub fn with_provider(provider: Arc<dyn BackendProvider>) -> Self {
        Self {
            projects: ProjectRegistry::new(provider.clone()),
            provider,
        }
    }

    pub fn provider(&self) -> &Arc<dyn BackendProvider> {
        &self.provider
    }

    pub fn projects(&self) -> &ProjectRegistry {
        &self.projects
    }

    /// Resolves an app through the backend provider.
    pub async fn app(&self, project: Option<&str>) -> FirebaseResult<FirebaseApp> {
        self.provider.app(project.unwrap_or(DEFAULT_APP_NAME)).await
    }

    pub async fn auth(&self, project: Option<&str>) -> FirebaseResult<Arc<dyn AuthBackend>> {
        Ok(self.app(project).await?.auth())
    }

    pub async fn firestore(
        &self,
        project: Option<&str>,
    ) -> FirebaseResult<Arc<dyn FirestoreBackend>> {
        Ok(self.app(project).await?.firestore())
    }

    pub async fn storage(&self, project: Option<&str>) -> FirebaseResult<Arc<dyn StorageBackend>> {
        Ok(self.app(project).await?.storage())
    }

    /// Returns a handle to `collection/doc` in the project's document store.
    pub async fn reference(
        &self,
        collection: &str,
        doc: &str,
        project: Option<&str>,
    ) -> FirebaseResult<DocumentReference> {
        Ok(DocumentReference::new(
            DocumentPath::new(collection, doc),
            self.firestore(project).await?,
        ))
    }

    /// Fetches one document.
    pub async fn get_data(
        &self,
        collection: &str,
        doc: &str,
        project: Option<&str>,
    ) -> FirebaseResult<DocumentSnapshot> {
        debug!(collection, doc, ?project, "get_data");

        self.reference(collection, doc, project)
            .await?
            .get(Source::Default)
            .await
    }

    /// Whether the document exists.
    pub async fn is_exist(
        &self,
        collection: &str,
        doc: &str,
        project: Option<&str>,
    ) -> FirebaseResult<bool> {
        debug!(collection, doc, ?project, "is_exist");

        self.reference(collection, doc, project)
            .await?
            .exists()
            .await
    }

    /// Runs a query with the requested read source. A limit of 0 returns every match.
    pub async fn get_query(
        &self,
        spec: &QuerySpec,
        options: GetOptions,
    ) -> FirebaseResult<Vec<QueryDocument>> {
        debug!(
            collection = %spec.query.collection,
            project = ?spec.project,
            source = ?options.source,
            "get_query"
        );

        self.firestore(spec.project.as_deref())
            .await?
            .run_query(&spec.query.clone().without_zero_limit(), options.source)
            .await
    }

    /// Creates or replaces a document and returns its id.
    pub async fn set_data<T>(
        &self,
        collection: &str,
        doc: &str,
        data: &T,
        options: SetOptions,
        project: Option<&str>,
    ) -> FirebaseResult<String>
    where
        T: Serialize + ?Sized,
    {
        debug!(collection, doc, ?project, merge = options.merge, "set_data");

        self.reference(collection, doc, project)
            .await?
            .set(data, options)
            .await?;

        Ok(doc.to_string())
    }

    /// Writes a new document under a generated id and returns the id.
    pub async fn add_data<T>(
        &self,
        collection: &str,
        data: &T,
        options: SetOptions,
        project: Option<&str>,
    ) -> FirebaseResult<String>
    where
        T: Serialize + ?Sized,
    {
        let path = DocumentPath::auto_id(collection);
        debug!(collection, doc = path.id(), ?project, "add_data");

        DocumentReference::new(path.clone(), self.firestore(project).await?)
            .set(data, options)
            .await?;

        Ok(path.id().to_string())
    }

    /// Updates fields of an existing document and returns its id.
    pub async fn update_data<T>(
        &self,
        collection: &str,
        doc: &str,
        data: &T,
        options: UpdateOptions,
        project: Option<&str>,
    ) -> FirebaseResult<String>
    where
        T: Serialize + ?Sized,
    {
        debug!(collection, doc, ?project, "update_data");

        self.reference(collection, doc, project)
            .await?
            .update(data, options)
            .await?;

        Ok(doc.to_string())
    }

    /// Deletes a document and returns its id. Deleting a missing document succeeds.
    pub async fn delete_data(
        &self,
        collection: &str,
        doc: &str,
        project: Option<&str>,
    ) -> FirebaseResult<String> {
        debug!(collection, doc, ?project, "delete_data");

        self.reference(collection, doc, project)
            .await?
            .delete()
            .await?;

        Ok(doc.to_string())
    }

    /// Commits every operation in one atomic batch and returns the affected ids in input order.
    pub async fn execute_batch(
        &self,
        operations: Vec<BatchOperation>,
        project: Option<&str>,
    ) -> FirebaseResult<Vec<String>> {
        debug!(operations = operations.len(), ?project, "execute_batch");

        let firestore = self.firestore(project).await?;
        let ids = operations
            .iter()
            .map(|op| op.doc_id().to_string())
            .collect::<Vec<_>>();
        let writes = operations
            .into_iter()
            .map(BatchOperation::into_write)
            .collect::<FirebaseResult<Vec<Write>>>()?;

        firestore.commit(writes).await?;

        Ok(ids)
    }

    /// Runs `callback` inside a backend transaction and returns its result.
    ///
    /// The callback receives the transaction handle and a clone of this context. It may be
    /// invoked more than once when the backend retries on contention, so it should not have
    /// side effects outside the transaction.
    pub async fn execute_transaction<F, Fut, T>(
        &self,
        project: Option<&str>,
        mut callback: F,
    ) -> FirebaseResult<T>
    where
        F: FnMut(Transaction, Firebase) -> Fut + Send,
        Fut: Future<Output = FirebaseResult<T>> + Send,
        T: Send,
    {
        debug!(?project, "execute_transaction");

        let firestore = self.firestore(project).await?;
        let firebase = self.clone();
        let outcome = Arc::new(Mutex::new(None));
        let attempt_outcome = outcome.clone();

        let update: TransactionFn<'_> = Box::new(move |inner: Arc<dyn TransactionBackend>| {
            let attempt = callback(Transaction::new(inner), firebase.clone());
            let outcome = attempt_outcome.clone();

            async move {
                let value = attempt.await?;
                *outcome.lock().await = Some(value);
                Ok(())
            }
            .boxed()
        });

        firestore.run_transaction(update).await?;

        let value = outcome.lock().await.take();
        value.ok_or_else(|| {
            FirebaseError::Backend("transaction finished without running its callback".into())
        })
    }

    /// Subscribes to one document.
    ///
    /// `observer` receives the current state immediately and then every change.
    pub async fn listen_to_document(
        &self,
        collection: &str,
        doc: &str,
        observer: Observer<DocumentSnapshot>,
        project: Option<&str>,
    ) -> FirebaseResult<ListenerRegistration> {
        debug!(collection, doc, ?project, "listen_to_document");

        self.reference(collection, doc, project)
            .await?
            .listen(observer)
            .await
    }

    /// Subscribes to a filtered, ordered and limited view of a collection.
    ///
    /// `observer` receives the full result list on every delivery. Cursors are not applied to
    /// listeners.
    pub async fn listen_to_collection(
        &self,
        spec: &QuerySpec,
        observer: Observer<Vec<QueryDocument>>,
    ) -> FirebaseResult<ListenerRegistration> {
        let collection = &spec.query.collection;
        debug!(%collection, project = ?spec.project, "listen_to_collection");

        if !spec.query.cursors.is_empty() {
            warn!(%collection, "cursors are ignored by collection listeners");
        }

        self.firestore(spec.project.as_deref())
            .await?
            .listen_query(spec.query.clone().without_cursors().without_zero_limit(), observer)
            .await
    }
}
