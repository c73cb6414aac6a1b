//! Common utilities module
//!
//! Shared error type used across the patch pipeline.

pub mod error;

pub use error::{PatchError, Result};
