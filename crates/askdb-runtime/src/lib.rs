//! # askdb-runtime
//!
//! The conversion pipeline: generate SQL with a backend, gate it through the
//! validator, execute it, and summarize the rows.

pub mod error;
pub mod orchestrator;

pub use error::{ConvertError, Stage};
pub use orchestrator::Converter;
