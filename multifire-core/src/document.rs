//! Document addressing and snapshot types.
//!
//! Payloads are BSON documents, a mapping from field name to a dynamically typed value. Callers
//! that prefer their own record types go through serde with [`DocumentSnapshot::data_as`] and
//! [`QueryDocument::data_as`].

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use uuid::Uuid;

use crate::error::{FirebaseError, FirebaseResult};

/// Field map of a stored document.
pub type DocumentData = Document;

/// The address of one document: a collection name and a document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    collection: String,
    id: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Creates a path with a freshly generated document id.
    pub fn auto_id(collection: impl Into<String>) -> Self {
        Self::new(collection, Uuid::new_v4().simple().to_string())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// The state of a single document at a point in time.
///
/// Existence is derived from the presence of data, so `data()` is `None` exactly when
/// `exists()` is `false`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    id: String,
    data: Option<DocumentData>,
}

impl DocumentSnapshot {
    /// A snapshot of an existing document.
    pub fn found(id: impl Into<String>, data: DocumentData) -> Self {
        Self {
            id: id.into(),
            data: Some(data),
        }
    }

    /// A snapshot of a document that does not exist.
    pub fn missing(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&DocumentData> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<DocumentData> {
        self.data
    }

    /// Returns a single field of an existing document.
    pub fn get(&self, field: &str) -> Option<&Bson> {
        self.data.as_ref()?.get(field)
    }

    /// Deserializes the document fields into `T`.
    ///
    /// Returns `Ok(None)` when the document does not exist.
    pub fn data_as<T: DeserializeOwned>(&self) -> FirebaseResult<Option<T>> {
        match &self.data {
            Some(data) => Ok(Some(deserialize_from_bson(Bson::Document(data.clone()))?)),
            None => Ok(None),
        }
    }
}

/// One row of a query result: the document id and its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocument {
    pub id: String,
    pub data: DocumentData,
}

impl QueryDocument {
    pub fn new(id: impl Into<String>, data: DocumentData) -> Self {
        Self { id: id.into(), data }
    }

    /// Flattens the row into `{ id, ...fields }`.
    ///
    /// A document field literally named `id` takes precedence over the document id.
    pub fn to_document(&self) -> DocumentData {
        let mut document = Document::new();
        document.insert("id", self.id.clone());

        for (key, value) in self.data.iter() {
            document.insert(key.clone(), value.clone());
        }

        document
    }

    /// Deserializes the flattened `{ id, ...fields }` row into `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> FirebaseResult<T> {
        Ok(deserialize_from_bson(Bson::Document(self.to_document()))?)
    }
}

/// Serializes any value into a document payload.
///
/// Fails with [`FirebaseError::Serialization`] when the value does not serialize to a map.
pub fn to_document_data<T: Serialize + ?Sized>(value: &T) -> FirebaseResult<DocumentData> {
    match serialize_to_bson(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(FirebaseError::Serialization(format!(
            "expected a map payload, got {:?}",
            other.element_type()
        ))),
    }
}
