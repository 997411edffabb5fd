use core::fmt::Write;

use tinyvec::ArrayVec;

use super::NmeaChecksum;
use crate::FmtBuf;

/// Longest encoded command frame, `$` through `\r\n`.
pub const MAX_COMMAND_LEN: usize = 64;

/// The PMTK commands the receiver accepts from this driver.
///
/// Restart variants differ in how much stored data survives: hot keeps
/// everything, warm drops ephemeris, cold also drops almanac and last
/// position, full-cold additionally clears user settings.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MtkCommand {
    HotStart,
    WarmStart,
    ColdStart,
    FullColdStart,
    /// Stop producing sentences until woken by bus activity.
    EnterStandby,
    /// Leave periodic power saving.
    SetAlwaysOn,
    /// Duty-cycled operation: awake `run_ms`, asleep `sleep_ms`, with the
    /// extended pair taking over when the sky stays out of reach.
    SetPeriodicMode {
        mode: u8,
        run_ms: u32,
        sleep_ms: u32,
        run_ext_ms: u32,
        sleep_ext_ms: u32,
    },
}

/// Command arguments the receiver would reject; caught before anything
/// touches the bus.
#[derive(thiserror::Error, Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    #[error("periodic mode {0} out of range (0..=2)")]
    InvalidMode(u8),
    #[error("periodic intervals must be at least 1 ms")]
    InvalidInterval,
}

impl MtkCommand {
    /// The PMTK command number, as echoed back in acknowledgements.
    pub fn number(self) -> u16 {
        match self {
            MtkCommand::HotStart => 101,
            MtkCommand::WarmStart => 102,
            MtkCommand::ColdStart => 103,
            MtkCommand::FullColdStart => 104,
            MtkCommand::EnterStandby => 161,
            MtkCommand::SetAlwaysOn | MtkCommand::SetPeriodicMode { .. } => 225,
        }
    }

    pub fn validate(self) -> Result<(), CommandError> {
        if let MtkCommand::SetPeriodicMode {
            mode,
            run_ms,
            sleep_ms,
            run_ext_ms,
            sleep_ext_ms,
        } = self
        {
            if mode > 2 {
                return Err(CommandError::InvalidMode(mode));
            }
            if run_ms == 0 || sleep_ms == 0 || run_ext_ms == 0 || sleep_ext_ms == 0 {
                return Err(CommandError::InvalidInterval);
            }
        }
        Ok(())
    }

    fn write_body(self, out: &mut FmtBuf<MAX_COMMAND_LEN>) {
        let _ = match self {
            MtkCommand::HotStart => write!(out, "PMTK101"),
            MtkCommand::WarmStart => write!(out, "PMTK102"),
            MtkCommand::ColdStart => write!(out, "PMTK103"),
            MtkCommand::FullColdStart => write!(out, "PMTK104"),
            MtkCommand::EnterStandby => write!(out, "PMTK161,0"),
            MtkCommand::SetAlwaysOn => write!(out, "PMTK225,0"),
            MtkCommand::SetPeriodicMode {
                mode,
                run_ms,
                sleep_ms,
                run_ext_ms,
                sleep_ext_ms,
            } => write!(
                out,
                "PMTK225,{mode},{run_ms},{sleep_ms},{run_ext_ms},{sleep_ext_ms}"
            ),
        };
    }

    /// Validates and formats the command as a ready-to-send frame.
    pub fn encode(self) -> Result<CommandFrame, CommandError> {
        self.validate()?;
        let mut f = FmtBuf::<MAX_COMMAND_LEN>::new();
        let _ = f.write_char('$');
        self.write_body(&mut f);
        let sum = NmeaChecksum::compute(&f.0.as_slice()[1..]);
        let _ = write!(f, "*{:02X}\r\n", sum.0);
        Ok(CommandFrame(f.0))
    }
}

/// An encoded `$<body>*<checksum>\r\n` frame.
#[derive(Debug, Copy, Clone)]
pub struct CommandFrame(ArrayVec<[u8; MAX_COMMAND_LEN]>);

impl CommandFrame {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
