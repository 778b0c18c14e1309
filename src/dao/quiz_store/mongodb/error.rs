use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
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
    #[error("MongoDB transaction failed during `{step}`")]
    Transaction {
        step: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB operation `{operation}` failed")]
    Operation {
        operation: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB operation `{operation}` returned no document")]
    MissingDocument { operation: &'static str },
    #[error("{what} already exists")]
    DuplicateKey {
        what: &'static str,
        #[source]
        source: MongoError,
    },
}

impl MongoDaoError {
    /// Map a write failure, turning unique index violations into [`MongoDaoError::DuplicateKey`].
    pub fn from_write(operation: &'static str, what: &'static str, source: MongoError) -> Self {
        if is_duplicate_key(&source) {
            MongoDaoError::DuplicateKey { what, source }
        } else {
            MongoDaoError::Operation { operation, source }
        }
    }
}

pub fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(command) => command.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}
