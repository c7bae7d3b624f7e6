//! Convenience result alias.

use crate::error::AppError;

/// Result type used by every fallible collaborator call in Authkeep.
pub type AppResult<T> = Result<T, AppError>;
