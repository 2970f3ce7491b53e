//! Write payloads, write options and batch operations.
//!
//! A [`WriteData`] is the caller's field map plus, optionally, the name of one field whose value
//! the backend fills in with its own commit time. The reserved field never collides with caller
//! data: asking for a server timestamp on a payload that already has the field is rejected.

use bson::{Bson, DateTime};

use crate::{
    document::{DocumentData, DocumentPath},
    error::{FirebaseError, FirebaseResult},
};

/// Field that receives the server timestamp when `add_timestamp` is requested.
pub const TIMESTAMP_FIELD: &str = "updatedAt";

/// Options for [`set_data`](crate::firebase::Firebase::set_data).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Keep fields of the existing document that the payload does not mention.
    pub merge: bool,
    /// Add [`TIMESTAMP_FIELD`] with the server commit time.
    pub add_timestamp: bool,
}

impl SetOptions {
    pub fn merge() -> Self {
        Self { merge: true, ..Self::default() }
    }

    pub fn with_timestamp(mut self) -> Self {
        self.add_timestamp = true;
        self
    }
}

/// Options for [`update_data`](crate::firebase::Firebase::update_data).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    pub add_timestamp: bool,
}

impl UpdateOptions {
    pub fn with_timestamp() -> Self {
        Self { add_timestamp: true }
    }
}

/// A payload headed for the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteData {
    fields: DocumentData,
    server_timestamp: Option<String>,
}

impl WriteData {
    pub fn new(fields: DocumentData) -> Self {
        Self { fields, server_timestamp: None }
    }

    /// Builds the payload, reserving [`TIMESTAMP_FIELD`] when `add_timestamp` is set.
    pub fn prepare(fields: DocumentData, add_timestamp: bool) -> FirebaseResult<Self> {
        let data = Self::new(fields);

        if add_timestamp {
            data.with_server_timestamp(TIMESTAMP_FIELD)
        } else {
            Ok(data)
        }
    }

    /// Marks `field` as filled in by the backend at commit time.
    pub fn with_server_timestamp(mut self, field: &str) -> FirebaseResult<Self> {
        if self.fields.contains_key(field) {
            return Err(FirebaseError::ReservedField(field.to_string()));
        }

        self.server_timestamp = Some(field.to_string());
        Ok(self)
    }

    pub fn fields(&self) -> &DocumentData {
        &self.fields
    }

    pub fn server_timestamp_field(&self) -> Option<&str> {
        self.server_timestamp.as_deref()
    }

    /// Produces the stored field map, stamping the reserved field with `now`.
    pub fn resolve(self, now: DateTime) -> DocumentData {
        let mut fields = self.fields;

        if let Some(field) = self.server_timestamp {
            fields.insert(field, Bson::DateTime(now));
        }

        fields
    }
}

/// A single write as seen by a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    Set {
        path: DocumentPath,
        data: WriteData,
        merge: bool,
    },
    Update {
        path: DocumentPath,
        data: WriteData,
    },
    Delete {
        path: DocumentPath,
    },
}

impl Write {
    pub fn path(&self) -> &DocumentPath {
        match self {
            Write::Set { path, .. } | Write::Update { path, .. } | Write::Delete { path } => path,
        }
    }
}

/// One entry of an atomic batch.
///
/// Delete entries carry no payload, so merge and timestamp flags only exist where they mean
/// something.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOperation {
    Set {
        collection: String,
        doc: String,
        data: DocumentData,
        merge: bool,
        add_timestamp: bool,
    },
    Update {
        collection: String,
        doc: String,
        data: DocumentData,
        add_timestamp: bool,
    },
    Delete {
        collection: String,
        doc: String,
    },
}

impl BatchOperation {
    pub fn set(collection: impl Into<String>, doc: impl Into<String>, data: DocumentData) -> Self {
        BatchOperation::Set {
            collection: collection.into(),
            doc: doc.into(),
            data,
            merge: false,
            add_timestamp: false,
        }
    }

    pub fn update(
        collection: impl Into<String>,
        doc: impl Into<String>,
        data: DocumentData,
    ) -> Self {
        BatchOperation::Update {
            collection: collection.into(),
            doc: doc.into(),
            data,
            add_timestamp: false,
        }
    }

    pub fn delete(collection: impl Into<String>, doc: impl Into<String>) -> Self {
        BatchOperation::Delete {
            collection: collection.into(),
            doc: doc.into(),
        }
    }

    /// Enables merging for set entries. Other kinds are returned unchanged.
    pub fn merge(mut self) -> Self {
        if let BatchOperation::Set { merge, .. } = &mut self {
            *merge = true;
        }
        self
    }

    /// Requests the server timestamp for set and update entries. Deletes are returned unchanged.
    pub fn with_timestamp(mut self) -> Self {
        match &mut self {
            BatchOperation::Set { add_timestamp, .. }
            | BatchOperation::Update { add_timestamp, .. } => *add_timestamp = true,
            BatchOperation::Delete { .. } => {}
        }
        self
    }

    pub fn doc_id(&self) -> &str {
        match self {
            BatchOperation::Set { doc, .. }
            | BatchOperation::Update { doc, .. }
            | BatchOperation::Delete { doc, .. } => doc,
        }
    }

    /// Converts the entry into the backend write it stands for.
    pub fn into_write(self) -> FirebaseResult<Write> {
        Ok(match self {
            BatchOperation::Set { collection, doc, data, merge, add_timestamp } => Write::Set {
                path: DocumentPath::new(collection, doc),
                data: WriteData::prepare(data, add_timestamp)?,
                merge,
            },
            BatchOperation::Update { collection, doc, data, add_timestamp } => Write::Update {
                path: DocumentPath::new(collection, doc),
                data: WriteData::prepare(data, add_timestamp)?,
            },
            BatchOperation::Delete { collection, doc } => Write::Delete {
                path: DocumentPath::new(collection, doc),
            },
        })
    }
}
