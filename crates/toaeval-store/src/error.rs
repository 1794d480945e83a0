use crate::codec::CodecError;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("payload codec failed: {0}")]
    Codec(#[from] CodecError),
    #[error("feature record already exists for image {image}, detector {detector}, descriptor {descriptor}")]
    DuplicateFeature {
        image: i64,
        detector: i64,
        descriptor: i64,
    },
    #[error("match record already exists for features ({first}, {second})")]
    DuplicateMatch { first: i64, second: i64 },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// `true` when `err` is a UNIQUE / NOT NULL / FOREIGN KEY constraint failure.
pub(crate) fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
