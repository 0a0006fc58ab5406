//! Utility types shared by every layer.
//!
//! - [`ValueKind`] - primitive storage kinds of schema nodes
//! - [`Error`] / [`Result`] - error handling

mod error;
mod value_kind;

pub use error::*;
pub use value_kind::*;
