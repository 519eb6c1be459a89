//! Core definitions (error type and `Result`), relied upon by all trajlog-* crates.

pub mod error;
pub mod result;

pub use result::Result;
