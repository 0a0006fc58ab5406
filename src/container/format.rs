//! Container file format constants.

/// Magic bytes at the start of a container file.
pub const CONTAINER_MAGIC: &[u8; 4] = b"FPAC";

/// Size of the fixed file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the format version in the header.
pub const VERSION_OFFSET: usize = 4;

/// Offset of the data region position in the header.
pub const DATA_OFFSET_OFFSET: usize = 8;

/// Current container format version.
pub const CURRENT_VERSION: u16 = 1;

/// Script index marker for types without a script.
pub const NO_SCRIPT: i16 = -1;

/// Payloads start on 8-byte boundaries.
pub const PAYLOAD_ALIGN: u64 = 8;

/// Type tree node flag: node is an array.
pub const NODE_FLAG_ARRAY: u8 = 0x01;

/// Type tree node flag: node is aligned to 4 bytes after its content.
pub const NODE_FLAG_ALIGNED: u8 = 0x02;

/// Type table flag: entry carries an embedded type tree.
pub const TYPE_HAS_TREE: u8 = 0x01;

/// Round `pos` up to the payload alignment.
#[inline]
pub const fn align_payload(pos: u64) -> u64 {
    (pos + PAYLOAD_ALIGN - 1) & !(PAYLOAD_ALIGN - 1)
}
