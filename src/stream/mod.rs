//! Serial text ingestion.
//!
//! Raw fragments accumulate in a [`StreamBuffer`]; a [`ReadingExtractor`] pulls
//! complete `li<digits>di<digits>` tags out of it, oldest first.

/// Bounded working buffer.
pub mod buffer;
/// Tag grammar scanner.
pub mod extractor;

pub use buffer::StreamBuffer;
pub use extractor::{Extracted, ReadingExtractor, TAG_PATTERN};
