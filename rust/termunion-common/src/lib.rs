//! Core definitions (error types and argument verification helpers), relied upon by all
//! termunion-* crates.

pub mod error;
pub mod result;

pub use result::Result;
