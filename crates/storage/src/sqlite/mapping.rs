use stars_core::model::{Grade, Subject};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn grade_from_i64(v: i64) -> Result<Grade, StorageError> {
    u8::try_from(v)
        .map(Grade::new)
        .map_err(|_| StorageError::Serialization(format!("invalid grade: {v}")))
}

pub(crate) fn parse_subject(s: &str) -> Result<Subject, StorageError> {
    s.parse().map_err(ser)
}
