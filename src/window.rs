//! In-memory window over a contiguous region of storage.
//!
//! The window covers `[offset, offset + capacity)`. Only the first `valid`
//! bytes of the buffer reflect real content; `position` is the cursor
//! relative to `offset`. This module does no I/O; loading and writing back
//! are driven by the cache.

#[derive(Debug)]
pub(crate) struct Window {
    buf: Box<[u8]>,
    offset: u64,
    position: usize,
    valid: usize,
    dirty: bool,
    hits_end: bool,
    stale: bool,
}

impl Window {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            offset: 0,
            position: 0,
            valid: 0,
            dirty: false,
            hits_end: false,
            stale: true,
        }
    }

    pub(crate) fn capacity(&self) -> usize { self.buf.len() }

    pub(crate) fn offset(&self) -> u64 { self.offset }

    pub(crate) fn position(&self) -> usize { self.position }

    pub(crate) fn valid(&self) -> usize { self.valid }

    pub(crate) fn is_dirty(&self) -> bool { self.dirty }

    pub(crate) fn hits_end(&self) -> bool { self.hits_end }

    /// True until a load succeeds. A stale window says nothing about storage.
    pub(crate) fn needs_load(&self) -> bool { self.stale }

    /// Absolute stream position of the cursor.
    pub(crate) fn absolute(&self) -> u64 { self.offset + self.position as u64 }

    /// Absolute position one past the last valid byte.
    pub(crate) fn valid_end(&self) -> u64 { self.offset + self.valid as u64 }

    /// Translates an absolute position into a cursor inside this window.
    ///
    /// Returns `None` when `target` falls outside `[offset, offset + capacity)`
    /// or the window needs a load.
    pub(crate) fn relative(&self, target: u64) -> Option<usize> {
        if self.stale {
            return None;
        }
        let delta = target.checked_sub(self.offset)?;
        usize::try_from(delta).ok().filter(|&rel| rel < self.capacity())
    }

    pub(crate) fn set_position(&mut self, position: usize) {
        debug_assert!(position <= self.capacity());
        self.position = position;
    }

    /// Bytes that can be read from the cursor without a reload.
    pub(crate) fn readable(&self) -> &[u8] {
        if self.position < self.valid {
            &self.buf[self.position..self.valid]
        } else {
            &[]
        }
    }

    /// Moves the cursor forward after a read of `n` readable bytes.
    pub(crate) fn consume(&mut self, n: usize) {
        debug_assert!(self.position + n <= self.valid);
        self.position += n;
    }

    /// Room left between the cursor and the end of the buffer.
    pub(crate) fn remaining_capacity(&self) -> usize { self.capacity() - self.position }

    /// Copies as much of `data` as fits at the cursor, growing the valid
    /// region and marking the window dirty. Returns the number of bytes taken.
    ///
    /// A cursor left past `valid` by a seek zero-fills the gap first, so bytes
    /// from an earlier load never reach storage.
    pub(crate) fn put(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.remaining_capacity());
        if n == 0 {
            return 0;
        }

        if self.position > self.valid {
            self.buf[self.valid..self.position].fill(0);
        }

        let end = self.position + n;
        self.buf[self.position..end].copy_from_slice(&data[..n]);
        self.position = end;
        self.valid = self.valid.max(end);
        self.dirty = true;
        n
    }

    /// Content that must be written back at `offset`.
    pub(crate) fn contents(&self) -> &[u8] { &self.buf[..self.valid] }

    pub(crate) fn mark_clean(&mut self) { self.dirty = false; }

    /// Buffer to load fresh content into. Callers must follow with
    /// [`Window::loaded`] or [`Window::load_failed`].
    pub(crate) fn load_target(&mut self) -> &mut [u8] {
        debug_assert!(!self.dirty);
        &mut self.buf
    }

    /// Re-anchors the window at `offset` after `bytes_read` bytes were loaded.
    pub(crate) fn loaded(&mut self, offset: u64, bytes_read: usize) {
        self.offset = offset;
        self.position = 0;
        self.valid = bytes_read.min(self.capacity());
        self.dirty = false;
        self.hits_end = bytes_read < self.capacity();
        self.stale = false;
    }

    /// Leaves an empty window at `offset` that will be reloaded on next access.
    pub(crate) fn load_failed(&mut self, offset: u64) {
        self.offset = offset;
        self.position = 0;
        self.valid = 0;
        self.dirty = false;
        self.hits_end = false;
        self.stale = true;
    }
}
