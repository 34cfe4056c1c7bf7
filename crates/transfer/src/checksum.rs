//! CRC-32 integrity strategies.
//!
//! The host computes checksums with zlib's CRC-32 (`binascii.crc32`), which
//! is the IEEE polynomial implemented by `crc32fast`.

use crc32fast::Hasher;

/// CRC-32 of `data` in one shot.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Common interface of the checksum strategies.
pub trait IntegrityCheck {
    /// Feeds `bytes` and returns the value this strategy now reports.
    fn update(&mut self, bytes: &[u8]) -> u32;

    /// Current value.
    fn value(&self) -> u32;
}

/// Running CRC over every byte of one object, across fragment boundaries.
#[derive(Clone, Default)]
pub struct Cumulative {
    hasher: Hasher,
}

impl std::fmt::Debug for Cumulative {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cumulative")
            .field("value", &self.value())
            .finish()
    }
}

impl Cumulative {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IntegrityCheck for Cumulative {
    fn update(&mut self, bytes: &[u8]) -> u32 {
        self.hasher.update(bytes);
        self.value()
    }

    fn value(&self) -> u32 {
        self.hasher.clone().finalize()
    }
}

/// CRC of a single fragment, reseeded on every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct PerFragment {
    last: u32,
}

impl PerFragment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks one fragment against the checksum the host advertised for it.
    pub fn verify(&mut self, fragment: &[u8], advertised: u32) -> bool {
        self.update(fragment) == advertised
    }
}

impl IntegrityCheck for PerFragment {
    fn update(&mut self, bytes: &[u8]) -> u32 {
        self.last = crc32(bytes);
        self.last
    }

    fn value(&self) -> u32 {
        self.last
    }
}
