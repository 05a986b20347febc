//! Core types for the nimbus chat client
//!
//! This crate holds everything that does not need an HTTP stack: the
//! session manager, the backend seam it talks through, client-side storage,
//! configuration and logging setup.

pub mod backend;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod session;
pub mod storage;
pub mod utils;

pub use backend::ChatBackend;
pub use error::{ApiError, ApiResult, Error, Result};
