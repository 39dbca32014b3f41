use std::io;

use thiserror::Error;

/// Errors that can occur when working with a window cache.
#[derive(Debug, Error)]
pub enum Error {
    /// A read or seek needed bytes beyond the logical end of the storage.
    #[error("End of stream at position {position}")]
    EndOfStream { position: u64 },
    /// A write was attempted on an instance opened read-only.
    #[error("Cache is read-only, write at position {position} rejected")]
    ReadOnlyViolation { position: u64 },
    /// The underlying storage failed during load, flush, sync or open.
    #[error("Storage {op} failed at offset {offset}: {source}")]
    StorageIo {
        op: StorageOp,
        offset: u64,
        #[source]
        source: io::Error,
    },
    /// The configured window capacity is not usable.
    #[error("Invalid window capacity: {0}")]
    InvalidCapacity(usize),
    /// A write would move the stream position past `u64::MAX`.
    #[error("Write of {len} bytes at position {position} overflows the stream")]
    PositionOverflow { position: u64, len: usize },
    /// A seek target could not be represented as an absolute position.
    #[error("Invalid seek: {0}")]
    InvalidSeek(String),
}

/// The storage primitive that reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Open,
    Load,
    Flush,
    Sync,
    Length,
    Truncate,
}

impl std::fmt::Display for StorageOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StorageOp::Open => "open",
            StorageOp::Load => "load",
            StorageOp::Flush => "flush",
            StorageOp::Sync => "sync",
            StorageOp::Length => "length",
            StorageOp::Truncate => "truncate",
        };
        f.write_str(name)
    }
}

impl Error {
    pub(crate) fn storage(op: StorageOp, offset: u64, source: io::Error) -> Self {
        Error::StorageIo { op, offset, source }
    }

    /// Returns true for the end-of-stream kind.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Error::EndOfStream { .. })
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::EndOfStream { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
            Error::ReadOnlyViolation { .. } => {
                io::Error::new(io::ErrorKind::PermissionDenied, err)
            }
            Error::StorageIo { source, .. } => source,
            Error::InvalidCapacity(_) | Error::InvalidSeek(_) | Error::PositionOverflow { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds() {
        let eof: io::Error = Error::EndOfStream { position: 3 }.into();
        assert_eq!(eof.kind(), io::ErrorKind::UnexpectedEof);

        let ro: io::Error = Error::ReadOnlyViolation { position: 0 }.into();
        assert_eq!(ro.kind(), io::ErrorKind::PermissionDenied);

        let storage: io::Error =
            Error::storage(StorageOp::Flush, 8, io::Error::other("disk gone")).into();
        assert_eq!(storage.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn test_display() {
        let err = Error::storage(StorageOp::Load, 512, io::Error::other("boom"));
        assert_eq!(err.to_string(), "Storage load failed at offset 512: boom");
        assert_eq!(
            Error::EndOfStream { position: 10 }.to_string(),
            "End of stream at position 10"
        );
    }
}
