//! In-memory backend for multifire.
//!
//! This crate implements the backend traits of `multifire-core` entirely in memory. It is meant
//! for development and tests: every app gets its own document store, auth client and storage
//! bucket, and the provider exposes hooks to inject failures.
//!
//! # Features
//!
//! - **Document store** - Atomic commits, merge and dotted-path updates, queries with filters,
//!   ordering, cursors and limits
//! - **Transactions** - Optimistic concurrency with version checks and bounded retries
//! - **Snapshot listeners** - Immediate initial delivery, then one delivery per visible change
//! - **Fault injection** - Failing app initialization or deletion, denied collections, offline
//!   mode
//!
//! # Quick Start
//!
//! ```ignore
//! use multifire::{prelude::*, memory::InMemoryBackend};
//!
//! let backend = InMemoryBackend::new();
//! let firebase = Firebase::new(backend.clone());
//!
//! firebase
//!     .projects()
//!     .initialize_projects(vec![ProjectConfig::new("p1", options)])
//!     .await?;
//!
//! backend.firestore_of("p1").await.unwrap().disable_network();
//! ```

pub mod app;
pub mod auth;
mod evaluator;
pub mod firestore;
pub mod provider;
pub mod storage;
pub mod transaction;

pub use app::InMemoryApp;
pub use auth::InMemoryAuth;
pub use firestore::{InMemoryFirestore, MAX_TRANSACTION_ATTEMPTS};
pub use provider::InMemoryBackend;
pub use storage::InMemoryStorage;
pub use transaction::MemoryTransaction;
