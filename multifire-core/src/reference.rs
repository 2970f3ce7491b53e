//! Handle scoping operations to one document of one project's document store.

use serde::Serialize;
use std::sync::Arc;

use crate::{
    backend::FirestoreBackend,
    document::{DocumentPath, DocumentSnapshot, to_document_data},
    error::FirebaseResult,
    listener::{ListenerRegistration, Observer},
    query::Source,
    write::{SetOptions, UpdateOptions, Write, WriteData},
};

/// A document address bound to a document store.
///
/// References are derived on demand and hold no state besides the address.
#[derive(Debug, Clone)]
pub struct DocumentReference {
    path: DocumentPath,
    firestore: Arc<dyn FirestoreBackend>,
}

impl DocumentReference {
    pub fn new(path: DocumentPath, firestore: Arc<dyn FirestoreBackend>) -> Self {
        Self { path, firestore }
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn collection(&self) -> &str {
        self.path.collection()
    }

    pub async fn get(&self, source: Source) -> FirebaseResult<DocumentSnapshot> {
        self.firestore.get_document(&self.path, source).await
    }

    pub async fn exists(&self) -> FirebaseResult<bool> {
        Ok(self.get(Source::Default).await?.exists())
    }

    /// Creates or replaces the document, merging into it when `options.merge` is set.
    pub async fn set<T>(&self, data: &T, options: SetOptions) -> FirebaseResult<()>
    where
        T: Serialize + ?Sized,
    {
        let data = WriteData::prepare(to_document_data(data)?, options.add_timestamp)?;

        self.firestore
            .commit(vec![Write::Set {
                path: self.path.clone(),
                data,
                merge: options.merge,
            }])
            .await
    }

    /// Updates fields of an existing document. Keys may be dotted paths into nested maps.
    pub async fn update<T>(&self, data: &T, options: UpdateOptions) -> FirebaseResult<()>
    where
        T: Serialize + ?Sized,
    {
        let data = WriteData::prepare(to_document_data(data)?, options.add_timestamp)?;

        self.firestore
            .commit(vec![Write::Update {
                path: self.path.clone(),
                data,
            }])
            .await
    }

    pub async fn delete(&self) -> FirebaseResult<()> {
        self.firestore
            .commit(vec![Write::Delete {
                path: self.path.clone(),
            }])
            .await
    }

    pub async fn listen(
        &self,
        observer: Observer<DocumentSnapshot>,
    ) -> FirebaseResult<ListenerRegistration> {
        self.firestore
            .listen_document(self.path.clone(), observer)
            .await
    }
}
