//! Transaction handle passed to [`execute_transaction`](crate::firebase::Firebase::execute_transaction) callbacks.

use serde::Serialize;
use std::sync::Arc;

use crate::{
    backend::TransactionBackend,
    document::{DocumentPath, DocumentSnapshot, to_document_data},
    error::FirebaseResult,
    write::{SetOptions, UpdateOptions, Write, WriteData},
};

/// Reads and writes of one transaction attempt.
///
/// Reads must come before writes. Writes are buffered and committed together when the callback
/// returns `Ok`; returning an error discards them.
#[derive(Debug, Clone)]
pub struct Transaction {
    inner: Arc<dyn TransactionBackend>,
}

impl Transaction {
    pub fn new(inner: Arc<dyn TransactionBackend>) -> Self {
        Self { inner }
    }

    pub async fn get(&self, collection: &str, doc: &str) -> FirebaseResult<DocumentSnapshot> {
        self.inner.get(&DocumentPath::new(collection, doc)).await
    }

    pub async fn set<T>(
        &self,
        collection: &str,
        doc: &str,
        data: &T,
        options: SetOptions,
    ) -> FirebaseResult<()>
    where
        T: Serialize + ?Sized,
    {
        let data = WriteData::prepare(to_document_data(data)?, options.add_timestamp)?;

        self.inner
            .write(Write::Set {
                path: DocumentPath::new(collection, doc),
                data,
                merge: options.merge,
            })
            .await
    }

    pub async fn update<T>(
        &self,
        collection: &str,
        doc: &str,
        data: &T,
        options: UpdateOptions,
    ) -> FirebaseResult<()>
    where
        T: Serialize + ?Sized,
    {
        let data = WriteData::prepare(to_document_data(data)?, options.add_timestamp)?;

        self.inner
            .write(Write::Update {
                path: DocumentPath::new(collection, doc),
                data,
            })
            .await
    }

    pub async fn delete(&self, collection: &str, doc: &str) -> FirebaseResult<()> {
        self.inner
            .write(Write::Delete {
                path: DocumentPath::new(collection, doc),
            })
            .await
    }
}
