//! Project configuration.
//!
//! The persisted model lives in [`models`], CLI arguments override it, and the result is turned
//! into a runtime model in [`rt`], which resolves paths and compiles patterns.

mod models;

pub mod rt;
pub mod types;

pub use models::*;
