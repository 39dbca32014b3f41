//! Buffered random-access byte I/O over a sliding in-memory window.
//!
//! A [`WindowCache`] owns one storage handle and one fixed-capacity buffer
//! caching `[offset, offset + capacity)` of it. Reads, writes and seeks go
//! through the window; moving outside it writes back unflushed changes and
//! loads a new window. Multi-byte encodings belong to callers layered on top
//! of the byte primitives here (or on the `std::io` traits the cache
//! implements).

pub mod error;
mod cache;
mod options;
mod storage;
mod window;

pub use cache::{Stats, WindowCache};
pub use error::{Error, StorageOp};
pub use options::{DEFAULT_CAPACITY, Mode, Options};
pub use storage::{MemoryStorage, Storage};

pub type Result<T> = std::result::Result<T, Error>;
