//! Driver facade: one object owning the bus and the running session.

use crate::bus::{ByteSink, ByteSource};
use crate::nmea::{CommandError, MtkCommand};
use crate::session::FixSession;
use crate::Coordinates;

/// Bytes asked from the bus per poll, sized to the module's register
/// window (an I2C read returns at most this much per transaction).
pub const READ_CHUNK: usize = 128;

#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReceiverError<E> {
    /// Command arguments rejected before anything was written.
    #[error("command rejected: {0}")]
    Command(#[from] CommandError),
    #[error("bus transfer failed")]
    Bus(E),
}

/// Driver for an L76-family receiver behind any [`ByteSource`] /
/// [`ByteSink`] transport. For the common I2C wiring the module sits at
/// [`crate::DEFAULT_I2C_ADDR`].
///
/// The driver never waits: [`poll`](Self::poll) drains what the bus has
/// and returns. Call it from whatever loop or timer the application
/// already runs.
pub struct L76Gnss<B> {
    bus: B,
    session: FixSession,
}

impl<B> L76Gnss<B> {
    pub fn new(bus: B) -> Self {
        L76Gnss {
            bus,
            session: FixSession::new(),
        }
    }

    pub fn session(&self) -> &FixSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut FixSession {
        &mut self.session
    }

    /// Tears the driver down and hands the bus back.
    pub fn release(self) -> B {
        self.bus
    }

    pub fn is_fixed(&self) -> bool {
        self.session.is_fixed()
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.session.coordinates()
    }
}

impl<B: ByteSource> L76Gnss<B> {
    /// One read of up to [`READ_CHUNK`] bytes, fed into the session.
    /// Returns how many bytes the bus had for us; 0 means idle.
    pub fn poll(&mut self) -> Result<usize, ReceiverError<B::Error>> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self
            .bus
            .read_available(&mut chunk)
            .map_err(ReceiverError::Bus)?;
        self.session.feed(&chunk[..n]);
        Ok(n)
    }

    /// Polls until the bus reports idle, returning total bytes consumed.
    pub fn poll_until_idle(&mut self) -> Result<usize, ReceiverError<B::Error>> {
        let mut total = 0;
        loop {
            let n = self.poll()?;
            if n == 0 {
                return Ok(total);
            }
            total += n;
        }
    }
}

impl<B: ByteSink> L76Gnss<B> {
    /// Encodes and writes one command. Validation happens first; a
    /// rejected command leaves the bus untouched.
    pub fn send(&mut self, cmd: MtkCommand) -> Result<(), ReceiverError<B::Error>> {
        let frame = cmd.encode()?;
        self.bus
            .write_all(frame.as_bytes())
            .map_err(ReceiverError::Bus)
    }

    /// Restart keeping all stored satellite data.
    pub fn hot_start(&mut self) -> Result<(), ReceiverError<B::Error>> {
        self.send(MtkCommand::HotStart)
    }

    /// Restart discarding ephemeris.
    pub fn warm_start(&mut self) -> Result<(), ReceiverError<B::Error>> {
        self.send(MtkCommand::WarmStart)
    }

    /// Restart discarding everything but user settings.
    pub fn cold_start(&mut self) -> Result<(), ReceiverError<B::Error>> {
        self.send(MtkCommand::ColdStart)
    }

    /// Factory restart, user settings included.
    pub fn full_cold_start(&mut self) -> Result<(), ReceiverError<B::Error>> {
        self.send(MtkCommand::FullColdStart)
    }

    /// Puts the receiver into standby; any byte on the bus wakes it.
    pub fn enter_standby(&mut self) -> Result<(), ReceiverError<B::Error>> {
        self.send(MtkCommand::EnterStandby)
    }

    /// Leaves periodic power saving.
    pub fn set_always_on(&mut self) -> Result<(), ReceiverError<B::Error>> {
        self.send(MtkCommand::SetAlwaysOn)
    }

    /// Configures duty-cycled operation. `mode` 0 is always-on, 1 is
    /// periodic standby, 2 is periodic backup; the interval pairs are
    /// milliseconds awake/asleep, normal and extended.
    pub fn set_periodic_mode(
        &mut self,
        mode: u8,
        run_ms: u32,
        sleep_ms: u32,
        run_ext_ms: u32,
        sleep_ext_ms: u32,
    ) -> Result<(), ReceiverError<B::Error>> {
        self.send(MtkCommand::SetPeriodicMode {
            mode,
            run_ms,
            sleep_ms,
            run_ext_ms,
            sleep_ext_ms,
        })
    }
}
