// PageFile - Rust Implementation
// A fixed-layout block allocator over seekable storage

#![warn(rust_2018_idioms)]

//! Fixed-layout block allocator ("Page")
//!
//! A [`Page`] divides any seekable, readable, writable medium (a file or an
//! in-memory buffer) into `block_count` blocks of `block_size` bytes and hands
//! them out first-fit, with per-block reference counts.
//!
//! # Architecture
//!
//! ```text
//! Page
//!   ├─→ Medium (File | Cursor<Vec<u8>>)   [blk 0][blk 1][blk 2]...[blk n-1]
//!   ├─→ Slots                             [ 1 ][ 0 ][ 2 ]...[ 0 ]   (refcounts)
//!   └─→ Codec (serde_json)                value ⇄ framed bytes
//!
//! MemoryAddress
//!   └─→ [slot 0, slot 2]  ← one payload split across blocks, released on drop
//! ```
//!
//! Allocation bookkeeping lives only in process memory. Reopening a medium
//! with a new `Page` starts with every slot Free.

pub mod codec;
pub mod config;
pub mod page;

// Re-exports for convenience
pub use codec::{Codec, JsonCodec};
pub use config::{MediumKind, PageConfig};
pub use page::{block, Medium, MemoryAddress, Page, PageStats};

/// PageFile error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid medium: {0}")]
        InvalidMedium(String),

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        #[error("Out of capacity: all {block_count} blocks are allocated")]
        OutOfCapacity { block_count: usize },

        #[error("Invalid address: slot {index} (page has {block_count} blocks)")]
        InvalidAddress { index: usize, block_count: usize },

        #[error("Stale address: slot {index} was freed since the address was issued")]
        StaleAddress { index: usize },

        #[error("Double release of free slot {index}")]
        DoubleRelease { index: usize },

        #[error("Serialization error: {0}")]
        Serialization(String),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::error::Error;

    #[test]
    fn test_error_messages() {
        let err = Error::OutOfCapacity { block_count: 3 };
        assert_eq!(err.to_string(), "Out of capacity: all 3 blocks are allocated");

        let err = Error::InvalidAddress {
            index: 7,
            block_count: 4,
        };
        assert!(err.to_string().contains("slot 7"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
