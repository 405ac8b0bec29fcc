//! Decompression with automatic format detection.
//!
//! Snapshot archives are published compressed. This crate wraps the
//! supported compression libraries behind a single [`Compression`] enum:
//!
//! - **Format detection** from file extensions ([`Compression::from_path`])
//!   or magic bytes ([`Compression::from_magic_bytes`]), with
//!   [`Compression::detect`] preferring the bytes when they're conclusive.
//! - **Streaming** decompression ([`Compression::decompress_stream`]) so
//!   multi-hundred-megabyte archives never need to be held in memory.
//! - **Whole-file** extraction ([`extract_file`]) which sniffs the format of
//!   the source file before streaming it to its destination.
//!
//! Compression is only provided in memory ([`Compression::compress`]); it
//! exists for building fixtures and test archives.

mod detect;
pub mod error;
mod ops;

pub use crate::ops::extract_file;

/// A supported compression format. Defaults to [`None`](Self::None).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// Bzip2 compression (.bz2)
    Bzip2,
    /// Gzip compression (.gz)
    Gzip,
}
