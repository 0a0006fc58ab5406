//! Font packages.
//!
//! A package is a folder or zip archive holding `manifest.json` plus the
//! payloads and font descriptions it names.

mod apply;
pub mod jsonc;
mod manifest;
mod source;

pub use apply::{apply_package, ApplySummary};
pub use manifest::{FileEntry, FontEntry, Manifest, MaterialEntry, RemoveCharacters, MANIFEST_FILE};
pub use source::{PackageSource, ZipArchive};
