use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
};

use log::{debug, trace, warn};

use crate::{
    Result,
    error::{Error, StorageOp},
    options::{Mode, Options},
    storage::Storage,
    window::Window,
};

/// Counters describing how often the window touched storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Window loads, including the one performed at construction.
    pub loads: u64,
    /// Write-backs of a dirty window.
    pub flushes: u64,
}

/// A buffered random-access view over a single storage handle.
///
/// All reads and writes land in one fixed-capacity window. When an operation
/// needs bytes outside the window, a dirty window is written back first and
/// a new window is loaded at the required offset.
///
/// The instance owns its storage exclusively and is not meant to be shared
/// across threads without external locking.
///
/// # Examples
///
/// ```rust
/// use wincache::{MemoryStorage, Mode, WindowCache};
///
/// # fn main() -> wincache::Result<()> {
/// let mut cache = WindowCache::with_storage(MemoryStorage::new(), Mode::ReadWriteTruncate, 4)?;
/// cache.write_bytes(&[1, 2, 3, 4, 5, 6])?;
/// assert_eq!(cache.length(), 6);
///
/// let storage = cache.into_storage()?;
/// assert_eq!(storage.as_bytes(), &[1, 2, 3, 4, 5, 6]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WindowCache<S: Storage = File> {
    storage: Option<S>,
    window: Window,
    mode: Mode,
    persisted_len: u64,
    stats: Stats,
}

impl WindowCache<File> {
    /// Opens the file at `path` with a window of `capacity` bytes.
    ///
    /// `ReadWriteTruncate` removes any existing file before creating a new
    /// one. `ReadWriteOpenExisting` creates the file if it is missing.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCapacity` if `capacity` is zero.
    /// Returns `Error::StorageIo` if the file cannot be opened or loaded.
    pub fn open(path: impl AsRef<Path>, mode: Mode, capacity: usize) -> Result<Self> {
        Self::open_with(path, &Options { mode, capacity })
    }

    /// Opens the file at `path` as described by `options`.
    pub fn open_with(path: impl AsRef<Path>, options: &Options) -> Result<Self> {
        options.validate()?;
        let path = path.as_ref();

        let opened = match options.mode {
            Mode::ReadOnly => File::open(path),
            Mode::ReadWriteOpenExisting => {
                OpenOptions::new().read(true).write(true).create(true).open(path)
            }
            Mode::ReadWriteTruncate => {
                match fs::remove_file(path) {
                    Ok(()) => debug!("removed existing {}", path.display()),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(Error::storage(StorageOp::Open, 0, e)),
                }
                OpenOptions::new().read(true).write(true).create_new(true).open(path)
            }
        };
        let file = opened.map_err(|e| Error::storage(StorageOp::Open, 0, e))?;

        debug!("opened {} as {:?}", path.display(), options.mode);
        Self::with_storage(file, options.mode, options.capacity)
    }
}

impl<S: Storage> WindowCache<S> {
    /// Wraps an already open storage handle and loads the window at offset 0.
    ///
    /// `ReadWriteTruncate` empties the storage first.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCapacity` if `capacity` is zero.
    /// Returns `Error::StorageIo` if truncation, the length query or the
    /// initial load fails.
    pub fn with_storage(mut storage: S, mode: Mode, capacity: usize) -> Result<Self> {
        Options { mode, capacity }.validate()?;

        if mode == Mode::ReadWriteTruncate {
            storage
                .set_len(0)
                .map_err(|e| Error::storage(StorageOp::Truncate, 0, e))?;
        }
        let persisted_len = storage
            .len()
            .map_err(|e| Error::storage(StorageOp::Length, 0, e))?;

        let mut cache = Self {
            storage: Some(storage),
            window: Window::new(capacity),
            mode,
            persisted_len,
            stats: Stats::default(),
        };
        cache.load(0)?;

        debug!(
            "window cache ready: mode={:?} capacity={} length={}",
            mode, capacity, persisted_len
        );
        Ok(cache)
    }

    /// The mode the cache was opened with.
    pub fn mode(&self) -> Mode { self.mode }

    /// Whether every write is rejected.
    pub fn is_read_only(&self) -> bool { self.mode.is_read_only() }

    /// Window size in bytes.
    pub fn capacity(&self) -> usize { self.window.capacity() }

    /// Whether the window holds modifications not yet written back.
    pub fn is_dirty(&self) -> bool { self.window.is_dirty() }

    /// Load and write-back counters since construction.
    pub fn stats(&self) -> Stats { self.stats }

    /// Current absolute stream position.
    pub fn position(&self) -> u64 { self.window.absolute() }

    /// Logical length: the persisted length, or the end of unflushed growth
    /// held in the window if that lies further out.
    pub fn length(&self) -> u64 {
        if self.window.valid() == 0 {
            self.persisted_len
        } else {
            self.persisted_len.max(self.window.valid_end())
        }
    }

    /// Reads one byte and advances the position.
    ///
    /// # Errors
    ///
    /// Returns `Error::EndOfStream` if no bytes remain.
    /// Returns `Error::StorageIo` if a reload fails.
    pub fn read_byte(&mut self) -> Result<u8> {
        if self.window.readable().is_empty() {
            self.refill()?;
        }

        match self.window.readable().first().copied() {
            Some(byte) => {
                self.window.consume(1);
                Ok(byte)
            }
            None => Err(Error::EndOfStream {
                position: self.position(),
            }),
        }
    }

    /// Fills `dest` completely.
    ///
    /// # Errors
    ///
    /// Returns `Error::EndOfStream` if the stream ends first. `dest` may then
    /// be partially written and its content must not be relied on.
    pub fn read_fully(&mut self, dest: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < dest.len() {
            let src = self.window.readable();
            if src.is_empty() {
                self.refill()?;
                continue;
            }

            let n = src.len().min(dest.len() - filled);
            dest[filled..filled + n].copy_from_slice(&src[..n]);
            self.window.consume(n);
            filled += n;
        }
        Ok(())
    }

    /// Reads up to `buf.len()` bytes, returning 0 at the logical end.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.window.readable().is_empty() {
            if self.window.hits_end() {
                return Ok(0);
            }
            self.reload(self.window.absolute())?;
        }

        let src = self.window.readable();
        let n = src.len().min(buf.len());
        buf[..n].copy_from_slice(&src[..n]);
        self.window.consume(n);
        Ok(n)
    }

    /// Writes one byte at the current position.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadOnlyViolation` if the cache was opened read-only.
    pub fn write_byte(&mut self, byte: u8) -> Result<()> { self.write_bytes(&[byte]) }

    /// Writes `data` at the current position, moving to the next window each
    /// time the current one fills up.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadOnlyViolation` if the cache was opened read-only,
    /// or `Error::PositionOverflow` if the write would end past `u64::MAX`;
    /// nothing is changed in either case.
    /// Returns `Error::StorageIo` if writing back a full window or loading
    /// the next one fails. Bytes placed before the failure stay buffered.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let mut written = 0;
        self.write_counted(data, &mut written)
    }

    /// Writes `data`, keeping `written` up to date so a failure part way
    /// through still reports how many bytes landed in the window.
    fn write_counted(&mut self, data: &[u8], written: &mut usize) -> Result<()> {
        let position = self.position();
        if self.mode.is_read_only() {
            return Err(Error::ReadOnlyViolation { position });
        }
        if position.checked_add(data.len() as u64).is_none() {
            return Err(Error::PositionOverflow {
                position,
                len: data.len(),
            });
        }

        while *written < data.len() {
            if self.window.needs_load() || self.window.remaining_capacity() == 0 {
                self.reload(self.window.absolute())?;
            }
            *written += self.window.put(&data[*written..]);
        }
        Ok(())
    }

    /// Moves to absolute position `target`.
    ///
    /// Seeking never changes the logical length. In read-write mode a target
    /// past the end is accepted and a later write there extends the storage.
    ///
    /// # Errors
    ///
    /// Returns `Error::EndOfStream` in read-only mode if `target` lies past
    /// the logical length. Seeking exactly to the length is allowed.
    /// Returns `Error::StorageIo` if writing back the current window or
    /// loading the new one fails; the position is then unchanged if the
    /// write-back failed.
    pub fn seek(&mut self, target: u64) -> Result<()> {
        if self.mode.is_read_only() && target > self.length() {
            return Err(Error::EndOfStream { position: target });
        }

        match self.window.relative(target) {
            Some(rel) => {
                self.window.set_position(rel);
                Ok(())
            }
            None => self.reload(target),
        }
    }

    /// Advances by up to `n` bytes without passing the logical end.
    ///
    /// Returns the number of bytes skipped.
    pub fn skip_bytes(&mut self, n: u64) -> Result<u64> {
        let start = self.position();
        let end = self.length().max(start);
        let target = start.saturating_add(n).min(end);

        self.seek(target)?;
        Ok(target - start)
    }

    /// Writes a dirty window back to storage. Does nothing for a clean one.
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageIo` if the write fails. The window stays dirty
    /// and unchanged so the flush can be retried.
    pub fn flush(&mut self) -> Result<()> {
        if !self.window.is_dirty() {
            return Ok(());
        }

        let offset = self.window.offset();
        let storage = self
            .storage
            .as_mut()
            .ok_or_else(|| released(StorageOp::Flush, offset))?;
        storage
            .write_all_at(offset, self.window.contents())
            .map_err(|e| Error::storage(StorageOp::Flush, offset, e))?;

        self.window.mark_clean();
        self.persisted_len = self.persisted_len.max(self.window.valid_end());
        self.stats.flushes += 1;
        trace!("flushed {} bytes at {}", self.window.valid(), offset);
        Ok(())
    }

    /// Flushes and then asks the storage to make the data durable.
    pub fn sync(&mut self) -> Result<()> {
        self.flush()?;

        let offset = self.window.offset();
        let storage = self
            .storage
            .as_mut()
            .ok_or_else(|| released(StorageOp::Sync, offset))?;
        storage
            .sync()
            .map_err(|e| Error::storage(StorageOp::Sync, offset, e))
    }

    /// Flushes and releases the window and the storage handle.
    ///
    /// Resources are released even when the flush fails.
    ///
    /// # Errors
    ///
    /// Returns the flush failure, in which case unflushed data is lost.
    pub fn close(self) -> Result<()> { self.into_storage().map(drop) }

    /// Like [`WindowCache::close`], but hands the storage handle back on
    /// success. On a failed flush the handle is dropped and the error returned.
    pub fn into_storage(mut self) -> Result<S> {
        let flushed = self.flush();
        let storage = self.storage.take();

        match (flushed, storage) {
            (Ok(()), Some(storage)) => {
                debug!("closed window cache at length {}", self.persisted_len);
                Ok(storage)
            }
            (Ok(()), None) => Err(released(StorageOp::Flush, self.window.offset())),
            (Err(e), _) => {
                warn!("closing with unflushed window: {e}");
                Err(e)
            }
        }
    }

    fn refill(&mut self) -> Result<()> {
        if self.window.hits_end() {
            return Err(Error::EndOfStream {
                position: self.position(),
            });
        }
        self.reload(self.window.absolute())
    }

    /// Writes back the current window if dirty, then loads one at `offset`.
    fn reload(&mut self, offset: u64) -> Result<()> {
        self.flush()?;
        self.load(offset)
    }

    fn load(&mut self, offset: u64) -> Result<()> {
        let storage = self
            .storage
            .as_mut()
            .ok_or_else(|| released(StorageOp::Load, offset))?;

        match storage.read_at(offset, self.window.load_target()) {
            Ok(n) => {
                self.window.loaded(offset, n);
                self.stats.loads += 1;
                trace!(
                    "loaded window at {offset}: {n} bytes, end={}",
                    self.window.hits_end()
                );
                Ok(())
            }
            Err(e) => {
                self.window.load_failed(offset);
                warn!("window load at {offset} failed: {e}");
                Err(Error::storage(StorageOp::Load, offset, e))
            }
        }
    }
}

fn released(op: StorageOp, offset: u64) -> Error {
    Error::storage(op, offset, io::Error::other("storage handle already released"))
}

impl<S: Storage> Drop for WindowCache<S> {
    fn drop(&mut self) {
        if self.storage.is_some() && self.window.is_dirty() {
            if let Err(e) = self.flush() {
                warn!("dropped window cache lost unflushed data: {e}");
            }
        }
    }
}

impl<S: Storage> Read for WindowCache<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> { Ok(self.read_into(buf)?) }
}

impl<S: Storage> Write for WindowCache<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        match self.write_counted(buf, &mut written) {
            Ok(()) => Ok(buf.len()),
            Err(e) if written > 0 => {
                warn!("short write of {written}/{} bytes: {e}", buf.len());
                Ok(written)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&mut self) -> io::Result<()> { Ok(WindowCache::flush(self)?) }
}

impl<S: Storage> Seek for WindowCache<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(delta) => self.length().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position().checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| Error::InvalidSeek(format!("{pos:?} out of range")))?;

        WindowCache::seek(self, target)?;
        Ok(target)
    }

    fn stream_position(&mut self) -> io::Result<u64> { Ok(self.position()) }
}
