//! Wire protocol for bulk-object ingestion over the node's serial link.
//!
//! Everything here is pure: constants, control tokens and the fixed-width
//! header decoder. Link I/O and persistence live in `loranode-transfer`.
//!
//! # Wire format
//!
//! ```text
//! CONFIG:        <name>.json\n  SIZE(10)\n CRC(10)\n  <data...> END\n
//! LABELED BLOB:  START\n <label>\n SIZE(10)\n CRC(10)\n <data...> END\n
//! ARCHIVE ENTRY: START\n            -> LISTEN\n
//!                SIZE(10)\n NAME(26)\n CRC(10)\n
//!                repeat { <fragment crc>\n <fragment> -> ACK\n | NACK\n }
//!                END\n               -> OK\n
//! ```
//!
//! Numeric fields are ASCII decimal, padded to their fixed width. A data
//! stream may be cut short by an in-band `END` inside a fragment.

pub mod constants;
pub mod decoder;
pub mod error;

pub use constants::{
    ARCHIVE_NAME_WIDTH, CHUNK_SIZE, ControlToken, NUMERIC_FIELD_WIDTH, SENTINEL, SEPARATOR_LEN,
};
pub use decoder::{
    ARCHIVE_LAYOUT, CONFIG_LAYOUT, DecodedHeader, Field, HeaderLayout, LABELED_BLOB_LAYOUT,
    find_sentinel, parse_checksum, parse_decimal_field,
};
pub use error::DecodeError;
