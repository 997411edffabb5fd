//! Typed decodings of the sentences the receiver emits.
//!
//! Every numeric field is optional: the module sends empty fields while
//! it is still acquiring, and an empty field decodes to `None`, never to
//! a fabricated zero. Values are passed through as reported; nothing here
//! range-checks what the receiver claims.

use chrono::{NaiveDate, NaiveTime};
use tinyvec::ArrayVec;

use super::parser::Sentence;
use super::{NmeaError, SentenceKind, Talker};

/// One decoded sentence, owned and detached from the parse buffer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ParsedSentence {
    Gga(Gga),
    Rmc(Rmc),
    Vtg(Vtg),
    Gll(Gll),
    Gsa(Gsa),
    Gsv(GsvPage),
    MtkAck(MtkAck),
    MtkSys(MtkSys),
}

impl ParsedSentence {
    pub fn kind(&self) -> SentenceKind {
        match self {
            ParsedSentence::Gga(_) => SentenceKind::Gga,
            ParsedSentence::Rmc(_) => SentenceKind::Rmc,
            ParsedSentence::Vtg(_) => SentenceKind::Vtg,
            ParsedSentence::Gll(_) => SentenceKind::Gll,
            ParsedSentence::Gsa(_) => SentenceKind::Gsa,
            ParsedSentence::Gsv(_) => SentenceKind::Gsv,
            ParsedSentence::MtkAck(_) => SentenceKind::MtkAck,
            ParsedSentence::MtkSys(_) => SentenceKind::MtkSys,
        }
    }
}

pub(crate) fn parse(s: &Sentence<'_>) -> Result<ParsedSentence, NmeaError> {
    Ok(match s.kind {
        SentenceKind::Gga => ParsedSentence::Gga(Gga::parse(s)),
        SentenceKind::Rmc => ParsedSentence::Rmc(Rmc::parse(s)),
        SentenceKind::Vtg => ParsedSentence::Vtg(Vtg::parse(s)),
        SentenceKind::Gll => ParsedSentence::Gll(Gll::parse(s)),
        SentenceKind::Gsa => ParsedSentence::Gsa(Gsa::parse(s)),
        SentenceKind::Gsv => ParsedSentence::Gsv(GsvPage::parse(s)?),
        SentenceKind::MtkAck => ParsedSentence::MtkAck(MtkAck::parse(s)?),
        SentenceKind::MtkSys => ParsedSentence::MtkSys(MtkSys::parse(s)?),
    })
}

/// Fix data: time, position, fix quality, satellites used, HDOP,
/// altitude.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Gga {
    pub time: Option<NaiveTime>,
    /// Latitude in signed decimal degrees, south negative.
    pub lat: Option<f64>,
    /// Longitude in signed decimal degrees, west negative.
    pub lon: Option<f64>,
    /// Receiver-reported quality indicator, 0 while there is no fix.
    pub quality: Option<u8>,
    pub sats_used: Option<u8>,
    pub hdop: Option<f32>,
    /// Meters above mean sea level.
    pub altitude: Option<f32>,
    pub geoid_sep: Option<f32>,
}

impl Gga {
    pub fn has_fix(&self) -> bool {
        self.quality.unwrap_or(0) >= 1
    }

    fn parse(s: &Sentence<'_>) -> Self {
        Gga {
            time: time_of_day(s.field(0)),
            lat: coordinate(s.field(1), s.field(2)),
            lon: coordinate(s.field(3), s.field(4)),
            quality: num(s.field(5)),
            sats_used: num(s.field(6)),
            hdop: num(s.field(7)),
            altitude: num(s.field(8)),
            geoid_sep: num(s.field(10)),
        }
    }
}

/// Recommended minimum: position, speed, course and the only sentence
/// carrying the UTC date.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Rmc {
    pub time: Option<NaiveTime>,
    /// Status field: `A` means the receiver vouches for the data.
    pub valid: bool,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Speed over ground in knots.
    pub speed_knots: Option<f32>,
    /// Course over ground in degrees true.
    pub course: Option<f32>,
    pub date: Option<NaiveDate>,
    /// Positioning mode, absent on firmware predating NMEA 2.3.
    pub mode: Option<FixMode>,
}

impl Rmc {
    fn parse(s: &Sentence<'_>) -> Self {
        Rmc {
            time: time_of_day(s.field(0)),
            valid: s.field(1) == "A",
            lat: coordinate(s.field(2), s.field(3)),
            lon: coordinate(s.field(4), s.field(5)),
            speed_knots: num(s.field(6)),
            course: num(s.field(7)),
            date: date(s.field(8)),
            mode: FixMode::from_field(s.field(11)),
        }
    }
}

/// Course and speed over ground.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Vtg {
    pub course_true: Option<f32>,
    pub course_magnetic: Option<f32>,
    pub speed_knots: Option<f32>,
    pub speed_kmh: Option<f32>,
    pub mode: Option<FixMode>,
}

impl Vtg {
    fn parse(s: &Sentence<'_>) -> Self {
        Vtg {
            course_true: num(s.field(0)),
            course_magnetic: num(s.field(2)),
            speed_knots: num(s.field(4)),
            speed_kmh: num(s.field(6)),
            mode: FixMode::from_field(s.field(8)),
        }
    }
}

/// Geographic position and status.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Gll {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub time: Option<NaiveTime>,
    pub valid: bool,
    pub mode: Option<FixMode>,
}

impl Gll {
    fn parse(s: &Sentence<'_>) -> Self {
        Gll {
            lat: coordinate(s.field(0), s.field(1)),
            lon: coordinate(s.field(2), s.field(3)),
            time: time_of_day(s.field(4)),
            valid: s.field(5) == "A",
            mode: FixMode::from_field(s.field(6)),
        }
    }
}

/// How the position was computed, from the mode field of RMC/GLL/VTG.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixMode {
    Autonomous,
    Differential,
    Estimated,
    NotValid,
    Unknown,
}

impl FixMode {
    fn from_field(field: &str) -> Option<Self> {
        match field {
            "" => None,
            "A" => Some(FixMode::Autonomous),
            "D" => Some(FixMode::Differential),
            "E" => Some(FixMode::Estimated),
            "N" => Some(FixMode::NotValid),
            _ => Some(FixMode::Unknown),
        }
    }

    /// Whether this mode counts as a usable fix.
    pub fn is_valid(self) -> bool {
        matches!(
            self,
            FixMode::Autonomous | FixMode::Differential | FixMode::Estimated
        )
    }
}

/// Fix dimensionality reported by GSA.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FixType {
    NoFix,
    Fix2D,
    Fix3D,
}

/// Active-satellite set and dilution of precision. Arrives complete in
/// one sentence and replaces the previous set wholesale.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Gsa {
    /// `A` = receiver picks 2D/3D itself, `M` = forced.
    pub automatic: Option<bool>,
    pub fix_type: Option<FixType>,
    /// PRNs of the satellites used in the solution, up to 12.
    pub in_use: ArrayVec<[u16; 12]>,
    pub pdop: Option<f32>,
    pub hdop: Option<f32>,
    pub vdop: Option<f32>,
    /// NMEA 4.1 system ID distinguishing constellations.
    pub system_id: Option<u8>,
}

impl Gsa {
    fn parse(s: &Sentence<'_>) -> Self {
        let mut in_use = ArrayVec::new();
        for i in 2..14 {
            if let Some(prn) = num::<u16>(s.field(i)) {
                let _ = in_use.try_push(prn);
            }
        }
        Gsa {
            automatic: match s.field(0) {
                "A" => Some(true),
                "M" => Some(false),
                _ => None,
            },
            fix_type: match s.field(1) {
                "1" => Some(FixType::NoFix),
                "2" => Some(FixType::Fix2D),
                "3" => Some(FixType::Fix3D),
                _ => None,
            },
            in_use,
            pdop: num(s.field(14)),
            hdop: num(s.field(15)),
            vdop: num(s.field(16)),
            system_id: num(s.field(17)),
        }
    }
}

/// One satellite as described by GSV.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SatelliteInfo {
    pub prn: u16,
    /// Degrees above the horizon.
    pub elevation: Option<i8>,
    /// Degrees from true north.
    pub azimuth: Option<u16>,
    /// Carrier-to-noise density in dB-Hz; absent while not tracked.
    pub snr: Option<u8>,
}

/// One page of a satellites-in-view report. A full report spans
/// `total_pages` consecutive pages of up to four satellites each;
/// aggregation into a complete set happens in the session.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct GsvPage {
    pub talker: Talker,
    pub total_pages: u8,
    /// 1-based page number.
    pub page: u8,
    pub in_view: Option<u8>,
    pub sats: ArrayVec<[SatelliteInfo; 4]>,
    /// NMEA 4.1 signal ID trailing the descriptors.
    pub signal_id: Option<u8>,
}

impl GsvPage {
    fn parse(s: &Sentence<'_>) -> Result<Self, NmeaError> {
        // The page numbering is what aggregation hangs on; a page that
        // cannot say where it belongs is unusable.
        let total_pages: u8 = num(s.field(0)).ok_or(NmeaError::FieldFormat)?;
        let page: u8 = num(s.field(1)).ok_or(NmeaError::FieldFormat)?;
        if page == 0 || total_pages == 0 || page > total_pages {
            return Err(NmeaError::FieldFormat);
        }

        let mut sats = ArrayVec::new();
        let mut idx = 3;
        for _ in 0..4 {
            if idx + 4 > s.field_count() {
                break;
            }
            if let Some(prn) = num::<u16>(s.field(idx)) {
                let _ = sats.try_push(SatelliteInfo {
                    prn,
                    elevation: num(s.field(idx + 1)),
                    azimuth: num(s.field(idx + 2)),
                    snr: num(s.field(idx + 3)),
                });
            }
            idx += 4;
        }
        let signal_id = if s.field_count() > idx {
            num(s.field(idx))
        } else {
            None
        };

        Ok(GsvPage {
            talker: s.talker,
            total_pages,
            page,
            in_view: num(s.field(2)),
            sats,
            signal_id,
        })
    }
}

/// PMTK001: the receiver's answer to a command.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MtkAck {
    /// Number of the command being acknowledged, e.g. 225.
    pub command: u16,
    pub status: AckStatus,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckStatus {
    InvalidCommand,
    UnsupportedCommand,
    Failed,
    Success,
}

impl MtkAck {
    fn parse(s: &Sentence<'_>) -> Result<Self, NmeaError> {
        let command = num(s.field(0)).ok_or(NmeaError::FieldFormat)?;
        let status = match s.field(1) {
            "0" => AckStatus::InvalidCommand,
            "1" => AckStatus::UnsupportedCommand,
            "2" => AckStatus::Failed,
            "3" => AckStatus::Success,
            _ => return Err(NmeaError::FieldFormat),
        };
        Ok(MtkAck { command, status })
    }
}

/// PMTK010 system notice; `message` 1 is the boot banner, 2 follows a
/// wake from standby.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MtkSys {
    pub message: u16,
}

impl MtkSys {
    pub fn is_startup(self) -> bool {
        self.message == 1
    }

    fn parse(s: &Sentence<'_>) -> Result<Self, NmeaError> {
        let message = num(s.field(0)).ok_or(NmeaError::FieldFormat)?;
        Ok(MtkSys { message })
    }
}

fn num<T: core::str::FromStr>(field: &str) -> Option<T> {
    if field.is_empty() {
        None
    } else {
        field.parse().ok()
    }
}

/// `ddmm.mmmm`/`dddmm.mmmm` plus hemisphere letter to signed decimal
/// degrees. The receiver's values are taken at face value.
fn coordinate(value: &str, hemisphere: &str) -> Option<f64> {
    let raw: f64 = num(value)?;
    let degrees = (raw / 100.0) as u32 as f64;
    let minutes = raw - degrees * 100.0;
    let signed = match hemisphere {
        "S" | "W" => -(degrees + minutes / 60.0),
        _ => degrees + minutes / 60.0,
    };
    Some(signed)
}

/// `hhmmss` with an optional fractional part.
fn time_of_day(field: &str) -> Option<NaiveTime> {
    let (whole, frac) = match field.split_once('.') {
        Some((w, f)) => (w, f),
        None => (field, ""),
    };
    if whole.len() != 6 {
        return None;
    }
    let h: u32 = whole.get(0..2)?.parse().ok()?;
    let m: u32 = whole.get(2..4)?.parse().ok()?;
    let s: u32 = whole.get(4..6)?.parse().ok()?;
    let millis: u32 = if frac.is_empty() {
        0
    } else {
        let digits = frac.get(..frac.len().min(3))?;
        let val: u32 = digits.parse().ok()?;
        match digits.len() {
            1 => val * 100,
            2 => val * 10,
            _ => val,
        }
    };
    NaiveTime::from_hms_milli_opt(h, m, s, millis)
}

/// `ddmmyy`, with the two-digit year pinned to the 2000s.
fn date(field: &str) -> Option<NaiveDate> {
    if field.len() != 6 {
        return None;
    }
    let d: u32 = field.get(0..2)?.parse().ok()?;
    let m: u32 = field.get(2..4)?.parse().ok()?;
    let y: i32 = field.get(4..6)?.parse().ok()?;
    NaiveDate::from_ymd_opt(2000 + y, m, d)
}
