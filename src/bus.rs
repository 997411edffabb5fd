//! Transport seam between the driver and whatever carries the bytes.
//!
//! The L76 family exposes the same NMEA/PMTK byte streams over UART and
//! over an I2C register window, so the driver only asks for two
//! capabilities: drain pending receive bytes, and push command bytes out.
//! Implement these for the concrete bus; [`MockBus`] covers tests.

use tinyvec::ArrayVec;

/// Pull side: bytes the receiver has produced since the last call.
pub trait ByteSource {
    type Error;

    /// Reads pending bytes into `buf`, returning how many were written.
    ///
    /// Returns `Ok(0)` when nothing is pending. Must not block waiting
    /// for data; polling cadence is the caller's concern.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Push side: command frames headed to the receiver.
pub trait ByteSink {
    type Error;

    /// Writes the whole frame or fails.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// In-memory bus for tests: serves a scripted receive stream in bounded
/// chunks and records every transmitted byte.
///
/// The chunk limit mimics the module's register window; a real I2C read
/// returns at most one window per transaction.
pub struct MockBus<'a> {
    rx: &'a [u8],
    pos: usize,
    chunk: usize,
    tx: ArrayVec<[u8; 256]>,
}

impl<'a> MockBus<'a> {
    /// A bus that serves `rx` as fast as the caller's buffer allows.
    pub fn new(rx: &'a [u8]) -> Self {
        Self::with_chunk(rx, usize::MAX)
    }

    /// A bus that serves `rx` at most `chunk` bytes per read.
    pub fn with_chunk(rx: &'a [u8], chunk: usize) -> Self {
        MockBus {
            rx,
            pos: 0,
            chunk,
            tx: ArrayVec::new(),
        }
    }

    /// Everything written through [`ByteSink`] so far.
    pub fn sent(&self) -> &[u8] {
        self.tx.as_slice()
    }

    /// True once the scripted receive stream has been fully served.
    pub fn rx_done(&self) -> bool {
        self.pos == self.rx.len()
    }
}

impl ByteSource for MockBus<'_> {
    type Error = core::convert::Infallible;

    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let remaining = &self.rx[self.pos..];
        let n = remaining.len().min(buf.len()).min(self.chunk);
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl ByteSink for MockBus<'_> {
    type Error = core::convert::Infallible;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        for &b in bytes {
            let _ = self.tx.try_push(b);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_serves_in_chunks() {
        let mut bus = MockBus::with_chunk(b"abcdefg", 3);
        let mut buf = [0u8; 16];

        assert_eq!(bus.read_available(&mut buf), Ok(3));
        assert_eq!(&buf[..3], b"abc");
        assert_eq!(bus.read_available(&mut buf), Ok(3));
        assert_eq!(&buf[..3], b"def");
        assert_eq!(bus.read_available(&mut buf), Ok(1));
        assert_eq!(&buf[..1], b"g");
        assert_eq!(bus.read_available(&mut buf), Ok(0));
        assert!(bus.rx_done());
    }

    #[test]
    fn mock_respects_caller_buffer() {
        let mut bus = MockBus::new(b"abcdefg");
        let mut buf = [0u8; 4];

        assert_eq!(bus.read_available(&mut buf), Ok(4));
        assert_eq!(&buf, b"abcd");
        assert_eq!(bus.read_available(&mut buf), Ok(3));
        assert_eq!(&buf[..3], b"efg");
    }

    #[test]
    fn mock_records_writes() {
        let mut bus = MockBus::new(b"");
        bus.write_all(b"$PMTK101*32\r\n").unwrap();
        bus.write_all(b"$PMTK161,0*28\r\n").unwrap();
        assert_eq!(bus.sent(), b"$PMTK101*32\r\n$PMTK161,0*28\r\n");
    }
}
