use thiserror::Error;

use crate::catalog::CatalogError;
use crate::model::{QuestionError, SessionSummaryError, SubjectError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Subject(#[from] SubjectError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
}
