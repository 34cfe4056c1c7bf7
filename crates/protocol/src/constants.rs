use std::time::Duration;

/// Maximum number of payload bytes requested from the link in one read.
pub const CHUNK_SIZE: usize = 512;

/// Width of the ASCII-decimal size and checksum fields.
pub const NUMERIC_FIELD_WIDTH: usize = 10;

/// Width of the archive entry name field (space padded).
pub const ARCHIVE_NAME_WIDTH: usize = 26;

/// Bytes skipped after every fixed-width field (the sender's newline).
pub const SEPARATOR_LEN: usize = 1;

/// In-band end-of-data marker. May appear inside a fragment.
pub const SENTINEL: &[u8] = b"END";

/// Per-read timeout of the node's UART.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2000);

/// Pause between retries after an empty read.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Literal control lines exchanged with the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlToken {
    /// Host: a labeled blob or archive entry follows.
    Start,
    /// Host: end of data. Also the in-band sentinel.
    End,
    /// Host: no more objects in this session.
    Finished,
    /// Node: ready for the archive entry header.
    Listen,
    /// Node: archive fragment accepted.
    Ack,
    /// Node: archive fragment rejected, resend it.
    Nack,
    /// Node: archive entry stored.
    Ok,
}

impl ControlToken {
    const ALL: [ControlToken; 7] = [
        Self::Start,
        Self::End,
        Self::Finished,
        Self::Listen,
        Self::Ack,
        Self::Nack,
        Self::Ok,
    ];

    /// The literal token without line terminator.
    pub const fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Start => b"START",
            Self::End => b"END",
            Self::Finished => b"Finished",
            Self::Listen => b"LISTEN",
            Self::Ack => b"ACK",
            Self::Nack => b"NACK",
            Self::Ok => b"OK",
        }
    }

    /// The token as a standalone line, as written to the link.
    pub const fn line(self) -> &'static [u8] {
        match self {
            Self::Start => b"START\n",
            Self::End => b"END\n",
            Self::Finished => b"Finished\n",
            Self::Listen => b"LISTEN\n",
            Self::Ack => b"ACK\n",
            Self::Nack => b"NACK\n",
            Self::Ok => b"OK\n",
        }
    }

    /// Matches a received line against the known tokens.
    ///
    /// Surrounding ASCII whitespace (including `\r\n`) is ignored; the rest
    /// must match exactly.
    pub fn parse(line: &[u8]) -> Option<Self> {
        let line = line.trim_ascii();
        Self::ALL.into_iter().find(|t| t.as_bytes() == line)
    }
}

impl std::fmt::Display for ControlToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Tokens are ASCII.
        f.write_str(std::str::from_utf8(self.as_bytes()).unwrap_or_default())
    }
}
