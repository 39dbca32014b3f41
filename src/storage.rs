//! Random-access byte stores that a window cache can sit on top of.

use std::{
    fs::File,
    io::{self, Read, Seek, SeekFrom, Write},
};

/// A random-access byte store owned by exactly one cache.
///
/// Offsets are absolute. Writing past the end extends the store, and any gap
/// between the old end and the write offset reads back as zero bytes.
pub trait Storage {
    /// Reads from `offset` until `buf` is full or the store ends.
    ///
    /// Returns the number of bytes read, which is 0 at or past the end.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes all of `data` starting at `offset`.
    fn write_all_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Current persisted length in bytes.
    fn len(&mut self) -> io::Result<u64>;

    /// Truncates or zero-extends the store to `len` bytes.
    fn set_len(&mut self, len: u64) -> io::Result<()>;

    /// Pushes written data down to the durable device.
    fn sync(&mut self) -> io::Result<()>;
}

impl Storage for File {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.seek(SeekFrom::Start(offset))?;

        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn write_all_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.seek(SeekFrom::Start(offset))?;
        self.write_all(data)
    }

    fn len(&mut self) -> io::Result<u64> { Ok(self.metadata()?.len()) }

    fn set_len(&mut self, len: u64) -> io::Result<()> { File::set_len(self, len) }

    fn sync(&mut self) -> io::Result<()> { self.sync_data() }
}

/// A store held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStorage {
    data: Vec<u8>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self { data: Vec::new() } }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self { Self { data: data.into() } }

    pub fn as_bytes(&self) -> &[u8] { &self.data }

    pub fn into_bytes(self) -> Vec<u8> { self.data }

    fn end_of(offset: u64, len: usize) -> io::Result<usize> {
        usize::try_from(offset)
            .ok()
            .and_then(|start| start.checked_add(len))
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds addressable memory")
            })
    }
}

impl Storage for MemoryStorage {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= self.data.len() {
            return Ok(0);
        }

        let end = std::cmp::min(start.saturating_add(buf.len()), self.data.len());
        let n = end - start;
        buf[..n].copy_from_slice(&self.data[start..end]);
        Ok(n)
    }

    fn write_all_at(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }

        let end = Self::end_of(offset, data.len())?;
        let start = end - data.len();

        if end > self.data.len() {
            self.data.resize(end, 0);
        }

        self.data[start..end].copy_from_slice(data);
        Ok(())
    }

    fn len(&mut self) -> io::Result<u64> { Ok(self.data.len() as u64) }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        let len = Self::end_of(len, 0)?;
        self.data.resize(len, 0);
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> { Ok(()) }
}
