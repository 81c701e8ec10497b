//! Shared error types for the services crate.

use thiserror::Error;

use patente_core::assessment::{SamplingError, TransitionError};
use patente_core::model::{CatalogError, CommunityError, QuestionError, UserError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::config::ConfigError;

/// Errors emitted by `AssessmentService` and `ActiveSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl AssessmentError {
    /// The requested selection had no questions to sample from.
    #[must_use]
    pub fn is_empty_selection(&self) -> bool {
        matches!(self, Self::Sampling(SamplingError::EmptySelection))
    }
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AccountService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("account is banned")]
    Banned,
    #[error("email is already registered")]
    EmailTaken,
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `StatsService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StatsServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CommunityService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CommunityServiceError {
    #[error("account is banned")]
    Banned,
    #[error("only the author or an admin may do that")]
    NotAllowed,
    #[error("post has been deleted")]
    PostDeleted,
    #[error(transparent)]
    Community(#[from] CommunityError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AdminService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdminServiceError {
    #[error("admin role required")]
    Forbidden,
    #[error("admin accounts cannot be banned")]
    CannotBanAdmin,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
