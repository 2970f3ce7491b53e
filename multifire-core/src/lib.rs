//! A thin helper layer over Firebase-style backend services with support for several named
//! projects at once.
//!
//! This crate is the core of the multifire project and provides:
//!
//! - **Project registry** ([`registry`]) - Initialize, look up and delete named projects
//! - **Helper surface** ([`firebase`]) - Service accessors, reference resolver, read/write,
//!   batch, transaction and subscription helpers
//! - **Backend abstraction** ([`backend`]) - Traits a backend SDK is consumed through
//! - **Query construction** ([`query`]) - Filters, sort keys, cursors and limits
//! - **Documents** ([`document`]) - Paths, snapshots and typed payload conversion
//! - **Writes** ([`write`]) - Write options, server timestamps and batch operations
//! - **Listeners** ([`listener`]) - Observers and cancellation handles
//! - **Configuration** ([`config`]) - Project and document store settings
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use multifire::{prelude::*, memory::InMemoryBackend};
//! use bson::doc;
//!
//! let firebase = Firebase::new(InMemoryBackend::new());
//! firebase
//!     .projects()
//!     .initialize_projects(vec![ProjectConfig::new("p1", options)])
//!     .await?;
//!
//! let id = firebase
//!     .set_data("users", "u1", &doc! { "name": "Ann" }, SetOptions::default(), Some("p1"))
//!     .await?;
//! ```

pub mod backend;
pub mod config;
pub mod document;
pub mod error;
pub mod firebase;
pub mod listener;
pub mod query;
pub mod reference;
pub mod registry;
pub mod transaction;
pub mod write;
