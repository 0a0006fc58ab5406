//! Record payload codec.
//!
//! The encoder walks a [`FieldSchema`](crate::schema::FieldSchema) and a
//! [`DynamicNode`] side by side and reproduces the byte layout the consuming
//! reader expects:
//!
//! - integers and floats: fixed-width little-endian
//! - strings: `i32` byte length + UTF-8, always padded to 4 bytes afterwards
//! - byte blobs: `i32` length + raw bytes
//! - ordinary arrays: `i32` count, the count again, then each element
//! - nodes flagged aligned: zero padding to the next 4-byte boundary
//!
//! The decoder is the mirror image and only exists for field inspection and
//! in-place edits of already-stored records.

mod decoder;
mod encoder;
mod node;
mod value;
mod writer;

pub use decoder::{decode, RecordReader};
pub use encoder::encode;
pub use node::DynamicNode;
pub use value::FieldValue;
pub use writer::RecordWriter;
