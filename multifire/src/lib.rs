//! Main multifire crate: one helper surface over several named backend projects.
//!
//! This crate is the entry point for users of multifire. It re-exports the core types from
//! `multifire-core` and the in-memory backend from `multifire-memory`.
//!
//! # Features
//!
//! - **Multi-project registry** - Initialize several projects at once, look them up by name and
//!   release them individually
//! - **Document helpers** - Get, set, merge, update, add and delete documents with optional
//!   server timestamps
//! - **Queries** - Filters, ordering, cursors and limits with a selectable read source
//! - **Batches and transactions** - Atomic multi-document writes and retried read-modify-write
//! - **Snapshot listeners** - Document and collection subscriptions with explicit cancellation
//!
//! # Quick Start
//!
//! ```ignore
//! use multifire::{prelude::*, memory::InMemoryBackend, bson::doc};
//!
//! #[tokio::main]
//! async fn main() -> FirebaseResult<()> {
//!     let firebase = Firebase::new(InMemoryBackend::new());
//!     let options = FirebaseOptions::from_json(include_str!("firebase.json"))?;
//!
//!     firebase
//!         .projects()
//!         .initialize_projects(vec![ProjectConfig::new("p1", options)])
//!         .await?;
//!
//!     firebase
//!         .set_data("users", "u1", &doc! { "name": "Ann" }, SetOptions::default(), Some("p1"))
//!         .await?;
//!
//!     let users = firebase
//!         .get_query(
//!             &Query::builder("users")
//!                 .project("p1")
//!                 .filter(Filter::eq("name", "Ann"))
//!                 .build(),
//!             GetOptions::default(),
//!         )
//!         .await?;
//!
//!     println!("Queried users: {users:?}");
//!     firebase.projects().delete_project("p1").await
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory backend for development and testing

pub mod prelude;

pub use multifire_core::{
    backend, config, document, error, firebase, listener, query, reference, registry,
    transaction, write,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory backend implementations.
pub mod memory {
    pub use multifire_memory::{
        InMemoryApp, InMemoryAuth, InMemoryBackend, InMemoryFirestore, InMemoryStorage,
        MAX_TRANSACTION_ATTEMPTS,
    };
}
