//! Error types shared by the MongoDB storage implementation.

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

/// Convenient result alias returning [`MongoDaoError`] failures.
pub type MongoResult<T> = Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Failures that can occur while interacting with MongoDB.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save document `{id}` in `{collection}`")]
    Save {
        collection: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load document `{id}` from `{collection}`")]
    Load {
        collection: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to list documents from `{collection}`")]
    List {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to update document `{id}` in `{collection}`")]
    Update {
        collection: &'static str,
        id: String,
        #[source]
        source: MongoError,
    },
    #[error("document `{id}` not found in `{collection}`")]
    MissingDocument { collection: &'static str, id: String },
    #[error("document in `{collection}` holds an invalid identifier")]
    InvalidId {
        collection: &'static str,
        #[source]
        source: uuid::Error,
    },
    #[error("failed to acquire or release lease `{name}`")]
    Lease {
        name: String,
        #[source]
        source: MongoError,
    },
}

/// Whether the server rejected a write because of a unique index.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}
