use std::fmt;

/// Upper bound on the up-front allocation; larger buffers grow on demand.
const PREALLOC_LIMIT: usize = 4096;

/// Accumulates incoming text and keeps it within a character budget.
///
/// When the buffer grows past `max_size` characters it keeps only its newest
/// `max_size / 2` characters. Oldest content is always dropped first.
#[derive(Clone)]
pub struct StreamBuffer {
    buf: String,
    chars: usize,
    max_size: usize,
}

impl StreamBuffer {
    /// Creates an empty buffer bounded at `max_size` characters.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(2);
        Self {
            buf: String::with_capacity(max_size.saturating_add(16).min(PREALLOC_LIMIT)),
            chars: 0,
            max_size,
        }
    }

    /// Appends a fragment, then trims.
    pub fn append(&mut self, fragment: &str) {
        self.buf.push_str(fragment);
        self.chars += fragment.chars().count();
        self.trim();
    }

    /// Enforces the size bound. Returns true if anything was discarded.
    pub fn trim(&mut self) -> bool {
        if self.chars <= self.max_size {
            return false;
        }

        let keep = self.max_size / 2;
        let skip = self.chars - keep;
        let cut = self
            .buf
            .char_indices()
            .nth(skip)
            .map_or(self.buf.len(), |(idx, _)| idx);
        self.buf.drain(..cut);
        self.chars = keep;
        true
    }

    /// Drops everything before byte offset `end` (as returned by the extractor), then trims.
    pub fn consume(&mut self, end: usize) {
        let end = end.min(self.buf.len());
        if !self.buf.is_char_boundary(end) {
            return;
        }
        let removed = self.buf[..end].chars().count();
        self.buf.drain(..end);
        self.chars -= removed;
        self.trim();
    }

    /// Empties the buffer.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.chars = 0;
    }

    /// Current contents.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Length in characters.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.chars
    }

    /// Returns true if the buffer holds no text.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.chars == 0
    }

    /// Configured character bound.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }
}

impl fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("len", &self.chars)
            .field("max_size", &self.max_size)
            .field("contents", &self.buf)
            .finish()
    }
}
