//! Backend service abstraction.
//!
//! This module defines the traits a backend SDK is consumed through. The helpers never talk to a
//! service directly; they resolve an app by name through a [`BackendProvider`] and call the
//! primitives of its [`FirestoreBackend`], [`AuthBackend`] and [`StorageBackend`] handles.
//!
//! # Overview
//!
//! - [`BackendProvider`]: named app creation and lookup (the SDK's app namespace)
//! - [`AppBackend`]: one initialized app and its service handles
//! - [`FirestoreBackend`]: document store primitives (get, query, atomic commit, transactions,
//!   snapshot listeners)
//! - [`TransactionBackend`]: the handle a transaction attempt reads and writes through
//! - [`AuthBackend`] and [`StorageBackend`]: opaque client handles, downcastable to the
//!   concrete SDK types with `as_any`
//!
//! Implementations must be thread-safe. Errors are reported with the [`FirebaseError`] variant
//! matching the backend's own error code and are propagated by the helpers unchanged.
//!
//! [`FirebaseError`]: crate::error::FirebaseError

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::{any::Any, fmt::Debug, sync::Arc};

use crate::{
    config::{FirebaseOptions, FirestoreSettings},
    document::{DocumentPath, DocumentSnapshot, QueryDocument},
    error::FirebaseResult,
    listener::{ListenerRegistration, Observer},
    query::{Query, Source},
    write::Write,
};

/// Type-erased body of one transaction attempt.
///
/// The backend calls it once per attempt with a fresh [`TransactionBackend`] and commits the
/// writes buffered in it when the returned future resolves to `Ok`.
pub type TransactionFn<'a> =
    Box<dyn FnMut(Arc<dyn TransactionBackend>) -> BoxFuture<'a, FirebaseResult<()>> + Send + 'a>;

/// Named app creation and lookup.
#[async_trait]
pub trait BackendProvider: Send + Sync + Debug {
    /// Creates the app `name`.
    ///
    /// Creating an app under a name the provider already knows is an error.
    async fn initialize_app(
        &self,
        name: &str,
        options: &FirebaseOptions,
    ) -> FirebaseResult<Arc<dyn AppBackend>>;

    /// Looks up an initialized app, failing with
    /// [`NoApp`](crate::error::FirebaseError::NoApp) if there is none.
    async fn app(&self, name: &str) -> FirebaseResult<Arc<dyn AppBackend>>;

    /// Names of every app the provider currently knows.
    async fn apps(&self) -> Vec<String>;

    fn as_any(&self) -> &dyn Any;
}

/// One initialized app.
#[async_trait]
pub trait AppBackend: Send + Sync + Debug {
    fn name(&self) -> &str;

    fn options(&self) -> &FirebaseOptions;

    fn auth(&self) -> Arc<dyn AuthBackend>;

    fn firestore(&self) -> Arc<dyn FirestoreBackend>;

    fn storage(&self) -> Arc<dyn StorageBackend>;

    /// Releases the app and every service bound to it. The provider forgets the name once this
    /// succeeds.
    async fn delete(&self) -> FirebaseResult<()>;

    fn as_any(&self) -> &dyn Any;
}

/// A signed-in user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub anonymous: bool,
}

/// Authentication client handle.
#[async_trait]
pub trait AuthBackend: Send + Sync + Debug {
    async fn current_user(&self) -> FirebaseResult<Option<AuthUser>>;

    async fn sign_in_anonymously(&self) -> FirebaseResult<AuthUser>;

    async fn sign_out(&self) -> FirebaseResult<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Object storage client handle.
#[async_trait]
pub trait StorageBackend: Send + Sync + Debug {
    fn bucket(&self) -> &str;

    async fn upload(&self, path: &str, bytes: Vec<u8>) -> FirebaseResult<()>;

    async fn download(&self, path: &str) -> FirebaseResult<Vec<u8>>;

    async fn delete(&self, path: &str) -> FirebaseResult<()>;

    fn as_any(&self) -> &dyn Any;
}

/// Document store primitives.
#[async_trait]
pub trait FirestoreBackend: Send + Sync + Debug {
    /// Applies local cache and persistence settings.
    async fn configure(&self, settings: &FirestoreSettings) -> FirebaseResult<()>;

    /// Reads one document from the requested source.
    async fn get_document(
        &self,
        path: &DocumentPath,
        source: Source,
    ) -> FirebaseResult<DocumentSnapshot>;

    /// Runs a query and returns the matching documents in query order.
    async fn run_query(&self, query: &Query, source: Source) -> FirebaseResult<Vec<QueryDocument>>;

    /// Applies every write atomically: either all of them take effect or none do.
    async fn commit(&self, writes: Vec<Write>) -> FirebaseResult<()>;

    /// Runs `update` under optimistic concurrency control, retrying it on contention as the
    /// backend sees fit.
    async fn run_transaction<'a>(&self, update: TransactionFn<'a>) -> FirebaseResult<()>;

    /// Delivers the current state of the document and then every change to it.
    async fn listen_document(
        &self,
        path: DocumentPath,
        observer: Observer<DocumentSnapshot>,
    ) -> FirebaseResult<ListenerRegistration>;

    /// Delivers the full result list of the query and then the full list after every change.
    async fn listen_query(
        &self,
        query: Query,
        observer: Observer<Vec<QueryDocument>>,
    ) -> FirebaseResult<ListenerRegistration>;

    fn as_any(&self) -> &dyn Any;
}

/// Reads and buffered writes of one transaction attempt.
#[async_trait]
pub trait TransactionBackend: Send + Sync + Debug {
    /// Reads a document and records the version that was seen.
    async fn get(&self, path: &DocumentPath) -> FirebaseResult<DocumentSnapshot>;

    /// Buffers a write to be committed with the attempt.
    async fn write(&self, write: Write) -> FirebaseResult<()>;
}
