use thiserror::Error;

use crate::assessment::{SamplingError, TransitionError};
use crate::model::{
    AttemptError, CatalogError, CommunityError, QuestionError, TextError, UserError,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Text(#[from] TextError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Community(#[from] CommunityError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}
