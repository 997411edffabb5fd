//! Driver for MediaTek L76-family GNSS receiver modules.
//!
//! The receiver streams NMEA 0183 sentences and accepts PMTK command
//! sentences. This crate parses the stream into typed records and folds
//! them into a queryable fix session; on the way out it encodes the
//! module's command set. It is transport-agnostic: bytes come in through
//! [`bus::ByteSource`] and go out through [`bus::ByteSink`], so the same
//! driver runs over I2C, UART, or a test mock.

#![cfg_attr(not(test), no_std)]

use core::fmt::{self, Write};

use tinyvec::ArrayVec;

pub mod bus;
pub mod nmea;
pub mod receiver;
pub mod session;

pub use nmea::{MtkCommand, NmeaError, NmeaParser, ParsedSentence, SentenceKind, Talker};
pub use receiver::L76Gnss;
pub use session::FixSession;

/// Bus address the module answers on when wired as an I2C peripheral.
pub const DEFAULT_I2C_ADDR: u8 = 0x10;

/// Fixed-capacity `core::fmt::Write` sink. Writes past the end are
/// silently truncated.
pub struct FmtBuf<const N: usize = 64>(pub ArrayVec<[u8; N]>);

impl<const N: usize> Write for FmtBuf<N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            let _ = self.0.try_push(b);
        }
        Ok(())
    }
}

impl<const N: usize> FmtBuf<N> {
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(self.0.as_slice()).ok()
    }

    pub fn new() -> Self {
        Self(Default::default())
    }
}

impl<const N: usize> Default for FmtBuf<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// A resolved position in signed decimal degrees.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
    /// Altitude above mean sea level in meters, when the fix carried one.
    pub alt: Option<f32>,
}
