//! # authkeep-core
//!
//! Core crate for Authkeep. Contains configuration schemas, typed
//! identifiers, the request-scoped execution context, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other Authkeep crates.

pub mod config;
pub mod context;
pub mod error;
pub mod result;
pub mod types;

pub use context::RequestContext;
pub use error::{AppError, ErrorKind};
pub use result::AppResult;
