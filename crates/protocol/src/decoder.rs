//! Fixed-width header decoding.
//!
//! Each object kind declares its header as a [`HeaderLayout`]: an ordered
//! list of fixed-width fields, each followed by one separator byte. The
//! receiver reads exactly [`HeaderLayout::wire_len`] bytes from the link
//! and hands them to [`HeaderLayout::decode`].

use crate::constants::{ARCHIVE_NAME_WIDTH, NUMERIC_FIELD_WIDTH, SENTINEL, SEPARATOR_LEN};
use crate::error::DecodeError;

/// One fixed-width header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Declared object size, ASCII decimal.
    Size,
    /// Declared CRC-32 of the whole object, ASCII decimal.
    Checksum,
    /// Destination name of the given width, padded.
    Name(usize),
}

impl Field {
    /// Number of bytes the field occupies on the wire (separator excluded).
    pub const fn width(self) -> usize {
        match self {
            Self::Size | Self::Checksum => NUMERIC_FIELD_WIDTH,
            Self::Name(width) => width,
        }
    }
}

/// Ordered field list describing one header kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderLayout {
    fields: &'static [Field],
}

/// Config objects: size, checksum.
pub const CONFIG_LAYOUT: HeaderLayout = HeaderLayout::new(&[Field::Size, Field::Checksum]);

/// Labeled blobs: size, checksum (the label arrives on its own line first).
pub const LABELED_BLOB_LAYOUT: HeaderLayout = HeaderLayout::new(&[Field::Size, Field::Checksum]);

/// Archive entries: size, 26-byte name, checksum.
pub const ARCHIVE_LAYOUT: HeaderLayout = HeaderLayout::new(&[
    Field::Size,
    Field::Name(ARCHIVE_NAME_WIDTH),
    Field::Checksum,
]);

/// Values extracted from a header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedHeader {
    pub size: u64,
    pub checksum: u32,
    /// Present only for layouts with a [`Field::Name`].
    pub name: Option<String>,
}

impl HeaderLayout {
    pub const fn new(fields: &'static [Field]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    /// Total bytes on the wire, separators included.
    pub const fn wire_len(&self) -> usize {
        let mut total = 0;
        let mut i = 0;
        while i < self.fields.len() {
            total += self.fields[i].width() + SEPARATOR_LEN;
            i += 1;
        }
        total
    }

    /// Decodes a header block of exactly [`wire_len`](Self::wire_len) bytes.
    pub fn decode(&self, bytes: &[u8]) -> Result<DecodedHeader, DecodeError> {
        let expected = self.wire_len();
        if bytes.len() != expected {
            return Err(DecodeError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }

        let mut header = DecodedHeader::default();
        let mut rest = bytes;
        for field in self.fields {
            let (value, tail) = rest.split_at(field.width());
            rest = &tail[SEPARATOR_LEN..];
            match field {
                Field::Size => header.size = parse_decimal_field(value)?,
                Field::Checksum => header.checksum = parse_checksum(value)?,
                Field::Name(_) => header.name = Some(parse_name(value)?),
            }
        }
        Ok(header)
    }
}

/// Parses an ASCII-decimal field.
///
/// Surrounding whitespace is ignored, so both zero- and space-padded values
/// decode. An optional leading `+` is accepted; signs, blanks and anything
/// non-numeric are not.
pub fn parse_decimal_field(bytes: &[u8]) -> Result<u64, DecodeError> {
    let trimmed = bytes.trim_ascii();
    let digits = trimmed.strip_prefix(b"+").unwrap_or(trimmed);
    let invalid = || DecodeError::InvalidNumber(String::from_utf8_lossy(bytes).into_owned());

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    digits.iter().try_fold(0u64, |acc, d| {
        acc.checked_mul(10)
            .and_then(|acc| acc.checked_add(u64::from(d - b'0')))
            .ok_or_else(invalid)
    })
}

/// Parses a decimal CRC-32 value (header field or per-fragment line).
pub fn parse_checksum(bytes: &[u8]) -> Result<u32, DecodeError> {
    let value = parse_decimal_field(bytes)?;
    u32::try_from(value).map_err(|_| DecodeError::ChecksumRange(value))
}

fn parse_name(bytes: &[u8]) -> Result<String, DecodeError> {
    let name = std::str::from_utf8(bytes)
        .map_err(|_| DecodeError::InvalidName)?
        .trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0');
    if name.is_empty() {
        return Err(DecodeError::EmptyName);
    }
    Ok(name.to_owned())
}

/// Offset of the first in-band sentinel within `fragment`, if any.
pub fn find_sentinel(fragment: &[u8]) -> Option<usize> {
    fragment
        .windows(SENTINEL.len())
        .position(|window| window == SENTINEL)
}
