mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchFantasyStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::DocumentConflict { path } => {
                StorageError::Conflict(format!("document `{path}` already exists"))
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
