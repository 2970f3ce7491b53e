//! Error types and result types for project and document operations.
//!
//! Registry failures are the only errors this layer produces on its own. Everything a backend
//! reports (permission denial, missing documents on update, contention, network loss) is carried
//! through unchanged in the matching variant. Use [`FirebaseResult<T>`] as the return type for
//! fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::fmt;
use thiserror::Error;

/// One project that failed during [`initialize_projects`](crate::registry::ProjectRegistry::initialize_projects).
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFailure {
    /// The name of the project that failed to initialize.
    pub name: String,
    /// The underlying cause.
    pub error: FirebaseError,
}

impl fmt::Display for ProjectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.error)
    }
}

/// Represents all possible errors that can occur when working with backend projects and their
/// document stores.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FirebaseError {
    /// The project was never registered, or has been deleted.
    #[error("Project not found: {0}")]
    ProjectNotFound(String),
    /// One or more projects failed to initialize. Projects that succeeded in the same call
    /// remain registered.
    #[error("Failed to initialize {} project(s): {}", .0.len(), join_failures(.0))]
    Aggregate(Vec<ProjectFailure>),
    /// The backend failed to release a project instance. The registry still holds it.
    #[error("Failed to delete project {name}: {source}")]
    ProjectDeletion {
        name: String,
        #[source]
        source: Box<FirebaseError>,
    },
    /// The backend has no app instance with the given name.
    #[error("No app named {0} has been initialized")]
    NoApp(String),
    /// A project configuration was rejected before reaching the backend.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// A write payload already carries the reserved server-timestamp field.
    #[error("Field {0} is reserved for the server timestamp")]
    ReservedField(String),
    /// The target document does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// The backend refused the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// The backend rejected the request as malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A transaction could not be committed because of contention.
    #[error("Aborted: {0}")]
    Aborted(String),
    /// The backend could not be reached for the requested source.
    #[error("Unavailable: {0}")]
    Unavailable(String),
    /// Serialization or deserialization of a payload failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Any other backend failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for project and document operations.
pub type FirebaseResult<T> = Result<T, FirebaseError>;

fn join_failures(failures: &[ProjectFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FirebaseError {
    /// Returns the names of the failing projects for an [`FirebaseError::Aggregate`] error.
    pub fn failed_projects(&self) -> Vec<&str> {
        match self {
            FirebaseError::Aggregate(failures) => failures
                .iter()
                .map(|failure| failure.name.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<BsonError> for FirebaseError {
    fn from(err: BsonError) -> Self {
        FirebaseError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for FirebaseError {
    fn from(err: SerdeJsonError) -> Self {
        FirebaseError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_names_every_failing_project() {
        let err = FirebaseError::Aggregate(vec![
            ProjectFailure {
                name: "alpha".into(),
                error: FirebaseError::Backend("boom".into()),
            },
            ProjectFailure {
                name: "beta".into(),
                error: FirebaseError::InvalidConfig("apiKey is empty".into()),
            },
        ]);

        let message = err.to_string();
        assert!(message.contains("alpha: Backend error: boom"));
        assert!(message.contains("beta: Invalid configuration"));
        assert_eq!(err.failed_projects(), vec!["alpha", "beta"]);
    }

    #[test]
    fn deletion_error_exposes_source() {
        let err = FirebaseError::ProjectDeletion {
            name: "p1".into(),
            source: Box::new(FirebaseError::Unavailable("offline".into())),
        };

        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("Unavailable: offline"));
    }
}
