//! Core types shared across the packhook crates.
//!
//! This crate holds the data model that crosses the boundary between the
//! orchestration layer and a build core: asset sources, module and chunk
//! records, resolve payloads, diagnostics and the filesystem seams.

mod diagnostic;
mod fs;
mod records;
mod source;
mod utils;
mod version;

pub use diagnostic::{Diagnostic, Severity};
// Filesystem seams
pub use fs::{DiskFileSystem, InputFileSystem, MemoryFileSystem, OutputFileSystem};
// Records exchanged with a build core
pub use records::{
    ContextInfo, CreateData, NativeChunk, NativeEntrypoint, NativeModule, RawAfterResolveData,
    RawContextResolveData, RawResolveData,
};
pub use source::{Asset, AssetError, AssetInfo, Source};
// String utilities
pub use utils::{to_camel_case, to_pascal_case};
pub use version::Version;
