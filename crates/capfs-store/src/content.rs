//! Growable file content.

/// Owned, growable byte content of one file.
///
/// `append` and `truncate` are the only mutators; the length is always the
/// length of the stored bytes.
#[derive(Debug, Default, Clone)]
pub struct ContentBuffer {
    bytes: Vec<u8>,
}

impl ContentBuffer {
    /// Creates an empty buffer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Appends bytes, growing the buffer as needed.
    pub fn append(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Discards all content.
    pub fn truncate(&mut self) {
        self.bytes.clear();
    }

    /// Returns the content length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if there is no content.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns up to `max` bytes starting at `offset`.
    pub fn chunk(&self, offset: usize, max: usize) -> &[u8] {
        let start = offset.min(self.bytes.len());
        let end = start.saturating_add(max).min(self.bytes.len());
        &self.bytes[start..end]
    }

    /// Returns the whole content.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}
