//! Receiver state folded out of the sentence stream.
//!
//! A [`FixSession`] eats raw bytes and keeps the latest coherent picture:
//! a merged fix record, the active-satellite set, the last completed
//! satellites-in-view report and per-kind latest records. Queries never
//! block; they answer from whatever has arrived so far.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tinyvec::ArrayVec;

use crate::nmea::sentences::{
    FixMode, Gga, Gll, Gsa, GsvPage, ParsedSentence, Rmc, SatelliteInfo, Vtg,
};
use crate::nmea::{NmeaError, NmeaParser, SentenceKind, Talker};
use crate::Coordinates;

/// Most satellites one view set can hold (9 pages of 4 descriptors).
pub const MAX_SATS_IN_VIEW: usize = 36;

/// Current merged receiver state. Arriving sentences overwrite the
/// fields they carry; fields they leave empty keep their last value.
/// Only `valid` is refreshed unconditionally by every fix-bearing
/// sentence, so a lost fix shows immediately while the last known
/// position stays readable.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct FixData {
    pub valid: bool,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude: Option<f32>,
    pub time: Option<NaiveTime>,
    pub date: Option<NaiveDate>,
    pub speed_knots: Option<f32>,
    pub course: Option<f32>,
    pub sats_used: Option<u8>,
    pub quality: Option<u8>,
    pub pdop: Option<f32>,
    pub hdop: Option<f32>,
    pub vdop: Option<f32>,
    pub mode: Option<FixMode>,
}

/// A completed satellites-in-view report, aggregated from one GSV page
/// sequence.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct SatelliteView {
    /// Constellation the report came from.
    pub talker: Talker,
    pub in_view: u8,
    pub sats: ArrayVec<[SatelliteInfo; MAX_SATS_IN_VIEW]>,
    pub signal_id: Option<u8>,
}

#[derive(Debug, Copy, Clone)]
struct ViewAssembly {
    total_pages: u8,
    next_page: u8,
    set: SatelliteView,
}

/// Per-frame outcome counters, kept since construction or [`FixSession::reset`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub accepted: u32,
    pub malformed: u32,
    pub bad_checksum: u32,
    pub unknown_type: u32,
    pub field_format: u32,
    pub too_long: u32,
}

impl SessionStats {
    fn note_error(&mut self, err: NmeaError) {
        match err {
            NmeaError::Malformed => self.malformed += 1,
            NmeaError::ChecksumMismatch { .. } => self.bad_checksum += 1,
            NmeaError::UnknownType => self.unknown_type += 1,
            NmeaError::FieldFormat => self.field_format += 1,
            NmeaError::TooLong => self.too_long += 1,
        }
    }

    pub fn rejected(&self) -> u32 {
        self.malformed + self.bad_checksum + self.unknown_type + self.field_format + self.too_long
    }
}

/// What happened to one completed frame, as seen by a
/// [`FixSession::feed_with`] observer.
#[derive(Debug, Copy, Clone)]
pub enum FrameEvent<'a> {
    Accepted(&'a ParsedSentence),
    Rejected(NmeaError),
}

/// Streaming receiver-state tracker. Construct as many as there are
/// receivers; the session holds no global state.
#[derive(Default)]
pub struct FixSession {
    parser: NmeaParser,
    fix: FixData,
    in_use: Option<Gsa>,
    in_view: Option<SatelliteView>,
    pending_view: Option<ViewAssembly>,
    last: [Option<ParsedSentence>; SentenceKind::COUNT],
    last_update: Option<SentenceKind>,
    stats: SessionStats,
}

impl FixSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw receiver bytes, in whatever chunks the transport
    /// delivered them.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.feed_with(bytes, |_| {});
    }

    /// Like [`feed`](Self::feed), reporting every completed frame to
    /// `observer`.
    pub fn feed_with(&mut self, bytes: &[u8], mut observer: impl FnMut(FrameEvent<'_>)) {
        for &b in bytes {
            match self.parser.feed_byte(b) {
                Some(Ok(record)) => {
                    self.apply(&record);
                    observer(FrameEvent::Accepted(&record));
                }
                Some(Err(err)) => {
                    self.stats.note_error(err);
                    #[cfg(feature = "defmt")]
                    defmt::debug!("dropped sentence: {}", err);
                    observer(FrameEvent::Rejected(err));
                }
                None => {}
            }
        }
    }

    /// Folds one record into the session. `feed` calls this for every
    /// parsed frame; pipelines with their own parser may call it
    /// directly.
    pub fn apply(&mut self, record: &ParsedSentence) {
        match record {
            ParsedSentence::Gga(gga) => self.apply_gga(gga),
            ParsedSentence::Rmc(rmc) => self.apply_rmc(rmc),
            ParsedSentence::Vtg(vtg) => self.apply_vtg(vtg),
            ParsedSentence::Gll(gll) => self.apply_gll(gll),
            ParsedSentence::Gsa(gsa) => self.apply_gsa(gsa),
            ParsedSentence::Gsv(page) => self.apply_gsv(page),
            ParsedSentence::MtkAck(_) | ParsedSentence::MtkSys(_) => {}
        }
        self.stats.accepted += 1;
        self.last[record.kind().index()] = Some(*record);
        self.last_update = Some(record.kind());
    }

    /// Forgets everything, including half-assembled view sets and any
    /// frame split across the last feed.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn apply_gga(&mut self, gga: &Gga) {
        merge(&mut self.fix.time, gga.time);
        merge(&mut self.fix.lat, gga.lat);
        merge(&mut self.fix.lon, gga.lon);
        merge(&mut self.fix.quality, gga.quality);
        merge(&mut self.fix.sats_used, gga.sats_used);
        merge(&mut self.fix.hdop, gga.hdop);
        merge(&mut self.fix.altitude, gga.altitude);
        self.fix.valid = gga.has_fix();
    }

    fn apply_rmc(&mut self, rmc: &Rmc) {
        merge(&mut self.fix.time, rmc.time);
        merge(&mut self.fix.lat, rmc.lat);
        merge(&mut self.fix.lon, rmc.lon);
        merge(&mut self.fix.speed_knots, rmc.speed_knots);
        merge(&mut self.fix.course, rmc.course);
        merge(&mut self.fix.date, rmc.date);
        merge(&mut self.fix.mode, rmc.mode);
        self.fix.valid = rmc.valid;
    }

    fn apply_vtg(&mut self, vtg: &Vtg) {
        merge(&mut self.fix.course, vtg.course_true);
        merge(&mut self.fix.speed_knots, vtg.speed_knots);
        merge(&mut self.fix.mode, vtg.mode);
        // old firmware omits the mode; then VTG says nothing about validity
        if let Some(mode) = vtg.mode {
            self.fix.valid = mode.is_valid();
        }
    }

    fn apply_gll(&mut self, gll: &Gll) {
        merge(&mut self.fix.lat, gll.lat);
        merge(&mut self.fix.lon, gll.lon);
        merge(&mut self.fix.time, gll.time);
        merge(&mut self.fix.mode, gll.mode);
        self.fix.valid = gll.valid;
    }

    fn apply_gsa(&mut self, gsa: &Gsa) {
        // the DOP triple also belongs to the merged fix picture
        merge(&mut self.fix.pdop, gsa.pdop);
        merge(&mut self.fix.hdop, gsa.hdop);
        merge(&mut self.fix.vdop, gsa.vdop);
        self.in_use = Some(*gsa);
    }

    fn apply_gsv(&mut self, page: &GsvPage) {
        if page.page == 1 {
            // a fresh page 1 always wins, discarding any incomplete set
            self.pending_view = Some(ViewAssembly {
                total_pages: page.total_pages,
                next_page: 1,
                set: SatelliteView {
                    talker: page.talker,
                    in_view: page.in_view.unwrap_or(0),
                    sats: ArrayVec::new(),
                    signal_id: None,
                },
            });
        }
        let Some(assembly) = self.pending_view.as_mut() else {
            // continuation of a sequence whose start we never saw
            return;
        };
        if page.page != assembly.next_page
            || page.total_pages != assembly.total_pages
            || page.talker != assembly.set.talker
        {
            self.pending_view = None;
            return;
        }

        for sat in page.sats.iter() {
            let _ = assembly.set.sats.try_push(*sat);
        }
        merge(&mut assembly.set.signal_id, page.signal_id);

        // the counter only advances while pages remain; the last page of a
        // full-length sequence (total 255) must not push it past u8::MAX
        if page.page != assembly.total_pages {
            assembly.next_page += 1;
            return;
        }

        if let Some(assembly) = self.pending_view.take() {
            let mut set = assembly.set;
            if set.in_view == 0 {
                set.in_view = set.sats.len() as u8;
            }
            self.in_view = Some(set);
        }
    }

    /// Whether the most recent fix-bearing sentence reported a usable fix.
    pub fn is_fixed(&self) -> bool {
        self.fix.valid
    }

    /// Last known position, once latitude and longitude have both been
    /// seen. Stays available when the fix is later lost.
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.fix.lat, self.fix.lon) {
            (Some(lat), Some(lon)) => Some(Coordinates {
                lat,
                lon,
                alt: self.fix.altitude,
            }),
            _ => None,
        }
    }

    /// The whole merged record, for callers that want the raw fields.
    pub fn fix(&self) -> &FixData {
        &self.fix
    }

    pub fn utc_time(&self) -> Option<NaiveTime> {
        self.fix.time
    }

    /// Full UTC date-time; needs an RMC date and any time-of-day.
    pub fn utc_datetime(&self) -> Option<DateTime<Utc>> {
        let date = self.fix.date?;
        let time = self.fix.time?;
        Some(DateTime::from_naive_utc_and_offset(
            NaiveDateTime::new(date, time),
            Utc,
        ))
    }

    pub fn speed_knots(&self) -> Option<f32> {
        self.fix.speed_knots
    }

    pub fn speed_kmh(&self) -> Option<f32> {
        self.fix.speed_knots.map(|kn| kn * 1.852)
    }

    /// Course over ground in degrees true.
    pub fn course(&self) -> Option<f32> {
        self.fix.course
    }

    /// Last completed satellites-in-view report. Available with or
    /// without a fix.
    pub fn satellites_in_view(&self) -> Option<&SatelliteView> {
        self.in_view.as_ref()
    }

    /// Latest active-satellite set (GSA), replaced wholesale on arrival.
    pub fn satellites_in_use(&self) -> Option<&Gsa> {
        self.in_use.as_ref()
    }

    /// Latest record of the given kind, for diagnostics.
    pub fn last_record(&self, kind: SentenceKind) -> Option<&ParsedSentence> {
        self.last[kind.index()].as_ref()
    }

    pub fn last_update_kind(&self) -> Option<SentenceKind> {
        self.last_update
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }
}

fn merge<T>(dst: &mut Option<T>, src: Option<T>) {
    if src.is_some() {
        *dst = src;
    }
}
