//! Convenient re-exports of commonly used types from multifire.
//!
//! ```ignore
//! use multifire::prelude::*;
//! ```

pub use multifire_core::{
    backend::{
        AppBackend, AuthBackend, AuthUser, BackendProvider, FirestoreBackend, StorageBackend,
        TransactionBackend,
    },
    config::{CacheSize, DEFAULT_APP_NAME, FirebaseOptions, FirestoreSettings, ProjectConfig},
    document::{DocumentData, DocumentPath, DocumentSnapshot, QueryDocument},
    error::{FirebaseError, FirebaseResult, ProjectFailure},
    firebase::Firebase,
    listener::{ListenerRegistration, Observer},
    query::{
        Filter, GetOptions, OrderBy, Query, QueryBuilder, QuerySpec, SortDirection, Source,
        WhereClause, WhereOp,
    },
    reference::DocumentReference,
    registry::{FirebaseApp, ProjectRegistry},
    transaction::Transaction,
    write::{BatchOperation, SetOptions, TIMESTAMP_FIELD, UpdateOptions},
};
