//! NMEA 0183 / PMTK wire protocol: framing, checksums, typed sentences,
//! command encoding.

use tinyvec::ArrayVec;

pub mod generator;
pub mod parser;
pub mod sentences;

pub use generator::{CommandError, CommandFrame, MtkCommand};
pub use parser::{Feed, NmeaParser};
pub use sentences::ParsedSentence;

/// Longest sentence body the parser will accumulate. The standard caps
/// frames at 82 bytes; some firmware extensions run longer.
pub const MAX_SENTENCE_LEN: usize = 100;

/// Upper bound on fields kept per sentence (GSV with a trailing signal
/// ID is the widest supported layout at 20).
pub const MAX_FIELDS: usize = 24;

#[derive(Default, Debug, Copy, Clone)]
pub struct NmeaBuf(pub ArrayVec<[u8; MAX_SENTENCE_LEN]>);

#[cfg(feature = "defmt")]
impl defmt::Format for NmeaBuf {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{}", self.0.as_slice())
    }
}

impl core::ops::Deref for NmeaBuf {
    type Target = ArrayVec<[u8; MAX_SENTENCE_LEN]>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl core::ops::DerefMut for NmeaBuf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Running XOR over the sentence body (the bytes between `$` and `*`).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct NmeaChecksum(pub u8);

impl NmeaChecksum {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next(self, byte: u8) -> Self {
        Self(self.0 ^ byte)
    }

    pub fn compute(body: &[u8]) -> Self {
        body.iter().fold(Self::new(), |sum, &b| sum.next(b))
    }

    /// The two uppercase hex digits that follow `*` on the wire.
    pub fn to_ascii(self) -> [u8; 2] {
        const HEX: &[u8; 16] = b"0123456789ABCDEF";
        [
            HEX[usize::from(self.0 >> 4)],
            HEX[usize::from(self.0 & 0xf)],
        ]
    }

    /// Checks `body` against the hex digit pair from the wire,
    /// case-insensitively. Malformed digits compare unequal rather than
    /// erroring.
    pub fn verify(body: &[u8], hi: u8, lo: u8) -> bool {
        match (hex_val(hi), hex_val(lo)) {
            (Some(h), Some(l)) => Self::compute(body).0 == (h << 4) | l,
            _ => false,
        }
    }
}

impl PartialEq<u8> for NmeaChecksum {
    fn eq(&self, other: &u8) -> bool {
        self.0 == *other
    }
}

pub(crate) fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

/// Per-frame parse failures. All of these are soft: the parser reports
/// the value and keeps scanning for the next `$`.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NmeaError {
    /// Frame structure violated: terminator before `*`, stray control
    /// byte in the body, or a non-hex checksum digit.
    #[error("malformed sentence")]
    Malformed,
    /// Structurally valid frame whose type tag this crate does not know.
    #[error("unrecognized sentence type")]
    UnknownType,
    #[error("checksum mismatch (expect {expect:02X}, saw {saw:02X})")]
    ChecksumMismatch { expect: u8, saw: u8 },
    /// A structurally required field (GSV page numbering) failed to parse.
    #[error("invalid field format")]
    FieldFormat,
    /// Body overran [`MAX_SENTENCE_LEN`]; the parser resynchronized.
    #[error("sentence too long")]
    TooLong,
}

/// Two-letter system prefix of a standard sentence, or [`Talker::Mtk`]
/// for proprietary PMTK traffic.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Talker {
    Gps,
    Glonass,
    Galileo,
    Beidou,
    /// `GN`: combined multi-system solution.
    Gnss,
    Mtk,
    Other([u8; 2]),
}

impl Default for Talker {
    fn default() -> Self {
        Talker::Gnss
    }
}

impl Talker {
    pub(crate) fn from_prefix(prefix: [u8; 2]) -> Self {
        match &prefix {
            b"GP" => Talker::Gps,
            b"GL" => Talker::Glonass,
            b"GA" => Talker::Galileo,
            b"GB" | b"BD" => Talker::Beidou,
            b"GN" => Talker::Gnss,
            _ => Talker::Other(prefix),
        }
    }
}

/// Sentence types this crate parses into records.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SentenceKind {
    /// Fix data: position, quality, satellites used, HDOP, altitude.
    Gga,
    /// Recommended minimum: position, speed, course, date.
    Rmc,
    /// Course and speed over ground.
    Vtg,
    /// Geographic position and status.
    Gll,
    /// Active satellites and dilution of precision.
    Gsa,
    /// Satellites in view, multi-part.
    Gsv,
    /// PMTK001 command acknowledgement.
    MtkAck,
    /// PMTK010 system notice (startup, wakeup).
    MtkSys,
}

impl SentenceKind {
    pub(crate) const COUNT: usize = 8;

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_known_vectors() {
        assert_eq!(NmeaChecksum::compute(b"PMTK101"), 0x32);
        assert_eq!(NmeaChecksum::compute(b"PMTK161,0"), 0x28);
        assert_eq!(
            NmeaChecksum::compute(b"PMTK314,1,1,1,1,1,5,0,0,0,0,0,0,0,0,0,0,0,0,0"),
            0x2C
        );
        assert_eq!(
            NmeaChecksum::compute(b"GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,"),
            0x47
        );
    }

    #[test]
    fn checksum_incremental_matches_oneshot() {
        let body = b"GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W";
        let stepped = body.iter().fold(NmeaChecksum::new(), |sum, &b| sum.next(b));
        assert_eq!(stepped, NmeaChecksum::compute(body));
        assert_eq!(stepped, 0x6A);
    }

    #[test]
    fn verify_is_case_insensitive() {
        assert!(NmeaChecksum::verify(b"PMTK101", b'3', b'2'));
        assert!(NmeaChecksum::verify(b"GPVTG,089.0,T,,,15.2,N,,,A", b'1', b'2'));
        assert!(NmeaChecksum::verify(b"PMTK314,1,1,1,1,1,5,0,0,0,0,0,0,0,0,0,0,0,0,0", b'2', b'c'));
        assert!(!NmeaChecksum::verify(b"PMTK101", b'3', b'3'));
    }

    #[test]
    fn verify_rejects_bad_hex() {
        assert!(!NmeaChecksum::verify(b"PMTK101", b'3', b'G'));
        assert!(!NmeaChecksum::verify(b"PMTK101", b'*', b'2'));
    }

    #[test]
    fn verify_accepts_own_emission() {
        let bodies: &[&[u8]] = &[
            b"",
            b"PMTK101",
            b"GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,",
            b"GNRMC,,V,,,,,,,,,,N",
        ];
        for body in bodies {
            let [hi, lo] = NmeaChecksum::compute(body).to_ascii();
            assert!(NmeaChecksum::verify(body, hi, lo));
        }
    }

    #[test]
    fn ascii_is_zero_padded() {
        assert_eq!(NmeaChecksum(0x0B).to_ascii(), *b"0B");
        assert_eq!(NmeaChecksum(0xF0).to_ascii(), *b"F0");
    }
}
