use std::sync::OnceLock;

use regex::Regex;

use crate::error::ExtractError;
use crate::reading::Reading;

use super::buffer::StreamBuffer;

/// The reading tag grammar.
///
/// A tag is only complete once a non-digit follows the distance run; the
/// terminator itself is not part of the consumed region since it may start the
/// next tag.
pub const TAG_PATTERN: &str = r"li([0-9]+)di([0-9]+)[^0-9]";

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(TAG_PATTERN).expect("tag grammar is a valid regex"))
}

/// Result of one successful scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted {
    /// A complete tag decoded into a reading.
    Reading {
        /// Decoded values.
        reading: Reading,
        /// Byte offset just past the distance digits.
        end: usize,
    },
    /// A complete tag whose digits could not be parsed; the region is skipped.
    Discarded {
        /// Why the digits were rejected.
        error: ExtractError,
        /// Byte offset just past the distance digits.
        end: usize,
    },
}

impl Extracted {
    /// Byte offset the caller should consume up to.
    #[must_use]
    pub const fn end(&self) -> usize {
        match self {
            Self::Reading { end, .. } | Self::Discarded { end, .. } => *end,
        }
    }

    /// The decoded reading, if any.
    #[must_use]
    pub const fn reading(&self) -> Option<Reading> {
        match self {
            Self::Reading { reading, .. } => Some(*reading),
            Self::Discarded { .. } => None,
        }
    }
}

/// Scans text for `li<digits>di<digits>` tags.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadingExtractor;

impl ReadingExtractor {
    /// Creates an extractor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Finds the leftmost complete tag in `text`.
    ///
    /// Returns `None` when no complete tag exists; the caller should wait for
    /// more data. Never mutates anything.
    #[must_use]
    pub fn try_extract(&self, text: &str) -> Option<Extracted> {
        let caps = tag_regex().captures(text)?;
        let light = caps.get(1)?;
        let distance = caps.get(2)?;
        let end = distance.end();

        let parsed = parse_field(light.as_str(), "light")
            .and_then(|light| parse_field(distance.as_str(), "distance").map(|distance| Reading { light, distance }));

        Some(match parsed {
            Ok(reading) => Extracted::Reading { reading, end },
            Err(error) => Extracted::Discarded { error, end },
        })
    }

    /// Repeatedly extracts from `buffer`, consuming each matched region, until
    /// no complete tag remains. Results are in stream order.
    pub fn drain(&self, buffer: &mut StreamBuffer) -> Vec<Extracted> {
        let mut out = Vec::new();
        while let Some(found) = self.try_extract(buffer.as_str()) {
            buffer.consume(found.end());
            out.push(found);
        }
        out
    }
}

fn parse_field(digits: &str, field: &'static str) -> Result<u64, ExtractError> {
    digits.parse::<u64>().map_err(|_| ExtractError::NumericOverflow {
        field,
        digits: digits.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(items: &[Extracted]) -> Vec<Reading> {
        items.iter().filter_map(Extracted::reading).collect()
    }

    #[test]
    fn extracts_terminated_tag() {
        let ex = ReadingExtractor::new();
        let found = ex.try_extract("li512di40\r\n").unwrap();
        assert_eq!(
            found,
            Extracted::Reading {
                reading: Reading::new(512, 40),
                end: 9,
            }
        );
    }

    #[test]
    fn trailing_digit_run_is_incomplete() {
        let ex = ReadingExtractor::new();
        assert_eq!(ex.try_extract("li1023di0"), None);
        assert!(ex.try_extract("li1023di007.").is_some());
    }

    #[test]
    fn skips_garbage_before_tag() {
        let ex = ReadingExtractor::new();
        let found = ex.try_extract("xxlili9di-li7di3 ").unwrap();
        assert_eq!(found.reading(), Some(Reading::new(7, 3)));
        assert_eq!(found.end(), 16);
    }

    #[test]
    fn terminator_may_start_next_tag() {
        let ex = ReadingExtractor::new();
        let mut buf = StreamBuffer::new(100);
        buf.append("li1di2li3di4.");
        let got = ex.drain(&mut buf);
        assert_eq!(readings(&got), vec![Reading::new(1, 2), Reading::new(3, 4)]);
        assert_eq!(buf.as_str(), ".");
    }

    #[test]
    fn no_match_is_idempotent() {
        let ex = ReadingExtractor::new();
        let mut buf = StreamBuffer::new(100);
        buf.append("li12dx34 noise di9");
        for _ in 0..5 {
            assert!(ex.drain(&mut buf).is_empty());
            assert_eq!(buf.as_str(), "li12dx34 noise di9");
        }
    }

    #[test]
    fn rejects_signs_and_decimals() {
        let ex = ReadingExtractor::new();
        assert_eq!(ex.try_extract("li-5di3."), None);
        assert_eq!(ex.try_extract("li5di+3."), None);
        assert_eq!(ex.try_extract("li5.0di3."), None);
    }

    #[test]
    fn non_ascii_digits_do_not_match() {
        let ex = ReadingExtractor::new();
        assert_eq!(ex.try_extract("li٣di٤."), None);
    }

    #[test]
    fn overflow_is_discarded_and_scanning_continues() {
        let ex = ReadingExtractor::new();
        let mut buf = StreamBuffer::new(200);
        let huge = "9".repeat(30);
        buf.append(&format!("li{huge}di1;li4di5;"));

        let got = ex.drain(&mut buf);
        assert_eq!(got.len(), 2);
        assert!(matches!(
            &got[0],
            Extracted::Discarded {
                error: ExtractError::NumericOverflow { field: "light", digits: 30 },
                ..
            }
        ));
        assert_eq!(got[1].reading(), Some(Reading::new(4, 5)));
        assert_eq!(buf.as_str(), ";");
    }

    #[test]
    fn tag_split_across_appends() {
        let ex = ReadingExtractor::new();
        let mut buf = StreamBuffer::new(100);
        let mut all = Vec::new();
        for part in ["l", "i10", "23d", "i0", "07", "\n"] {
            buf.append(part);
            all.extend(ex.drain(&mut buf));
        }
        assert_eq!(readings(&all), vec![Reading::new(1023, 7)]);
    }
}
