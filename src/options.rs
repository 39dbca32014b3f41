use crate::{Result, error::Error};

/// Window capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 512;

/// How the underlying storage is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Reads only. Every write fails with `Error::ReadOnlyViolation`.
    #[default]
    ReadOnly,
    /// Read and write in place, keeping existing content.
    ReadWriteOpenExisting,
    /// Read and write over a store emptied at open time.
    ReadWriteTruncate,
}

impl Mode {
    pub fn is_read_only(self) -> bool { self == Mode::ReadOnly }
}

/// Configuration for opening a window cache.
///
/// # Examples
///
/// ```rust
/// use wincache::{Mode, Options};
///
/// let options = Options::new().mode(Mode::ReadWriteTruncate).capacity(4096);
/// assert_eq!(options.capacity, 4096);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub mode: Mode,
    pub capacity: usize,
}

impl Options {
    pub fn new() -> Self {
        Self {
            mode: Mode::default(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Checks that the options describe a usable window.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCapacity` if the capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::InvalidCapacity(self.capacity));
        }
        Ok(())
    }
}

impl Default for Options {
    fn default() -> Self { Self::new() }
}
