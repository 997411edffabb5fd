//! Replays a receiver session end to end: boot banner, acquisition,
//! fix, satellite bookkeeping and a command exchange, all through the
//! driver over a mock bus serving small chunked reads.

use chrono::NaiveDate;
use l76_gnss::bus::MockBus;
use l76_gnss::nmea::sentences::ParsedSentence;
use l76_gnss::nmea::NmeaChecksum;
use l76_gnss::{FixSession, L76Gnss, SentenceKind, Talker};

fn frame(body: &str) -> Vec<u8> {
    let hex = NmeaChecksum::compute(body.as_bytes()).to_ascii();
    let mut out = vec![b'$'];
    out.extend_from_slice(body.as_bytes());
    out.push(b'*');
    out.extend_from_slice(&hex);
    out.extend_from_slice(b"\r\n");
    out
}

/// Cold start through first fix, the way the module actually talks.
fn acquisition_frames() -> Vec<Vec<u8>> {
    vec![
        frame("PMTK010,001"),
        // acquiring: everything empty, no fix yet
        frame("GPGGA,,,,,,0,00,99.99,,,,,,"),
        frame("GPRMC,,V,,,,,,,,,,N"),
        frame("GPGSA,A,1,,,,,,,,,,,,,99.99,99.99,99.99"),
        // sky comes into view
        frame("GPGSV,3,1,12,01,40,083,46,02,17,308,41,12,07,344,39,14,22,228,45"),
        frame("GPGSV,3,2,12,15,30,050,47,17,45,100,42,19,25,212,40,21,60,170,43"),
        frame("GPGSV,3,3,12,22,42,067,42,24,14,311,43,27,05,244,38,31,10,301,36"),
        // fix acquired
        frame("GPRMC,110324.000,A,5231.216,N,01321.202,E,0.5,78.3,150624,,,A"),
        frame("GPGGA,110325.000,5231.216,N,01321.202,E,1,07,1.1,38.2,M,44.1,M,,"),
        frame("GPGSA,A,3,01,02,12,14,15,17,19,,,,,,2.0,1.1,1.7"),
        frame("GPVTG,78.3,T,,M,0.5,N,0.9,K,A"),
        frame("GPGLL,5231.216,N,01321.202,E,110326.000,A,A"),
    ]
}

#[test]
fn acquisition_replay_reaches_a_queryable_fix() {
    let frames = acquisition_frames();
    let stream: Vec<u8> = frames.concat();

    // 13-byte reads guarantee every frame arrives split
    let mut gnss = L76Gnss::new(MockBus::with_chunk(&stream, 13));
    let total = gnss.poll_until_idle().unwrap();
    assert_eq!(total, stream.len());

    let session = gnss.session();
    assert_eq!(session.stats().accepted as usize, frames.len());
    assert_eq!(session.stats().rejected(), 0);

    assert!(gnss.is_fixed());
    let coords = gnss.coordinates().unwrap();
    assert!((coords.lat - 52.520_266).abs() < 0.0001);
    assert!((coords.lon - 13.353_366).abs() < 0.0001);
    assert_eq!(coords.alt, Some(38.2));

    let dt = session.utc_datetime().unwrap();
    assert_eq!(
        dt.naive_utc(),
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(11, 3, 26)
            .unwrap()
    );

    assert_eq!(session.speed_knots(), Some(0.5));
    assert_eq!(session.course(), Some(78.3));

    let view = session.satellites_in_view().unwrap();
    assert_eq!(view.talker, Talker::Gps);
    assert_eq!(view.sats.len(), 12);
    assert_eq!(view.in_view, 12);

    let in_use = session.satellites_in_use().unwrap();
    assert_eq!(in_use.in_use.as_slice(), &[1, 2, 12, 14, 15, 17, 19]);
    assert_eq!(in_use.hdop, Some(1.1));
    assert_eq!(session.fix().pdop, Some(2.0));
    assert_eq!(session.fix().vdop, Some(1.7));

    match session.last_record(SentenceKind::MtkSys) {
        Some(ParsedSentence::MtkSys(sys)) => assert!(sys.is_startup()),
        other => panic!("expected boot banner, got {other:?}"),
    }
}

#[test]
fn acquisition_prefix_alone_reports_no_fix() {
    let frames = acquisition_frames();
    let prefix: Vec<u8> = frames[..7].concat();

    let mut session = FixSession::new();
    session.feed(&prefix);

    assert!(!session.is_fixed());
    assert_eq!(session.coordinates(), None);
    assert_eq!(session.utc_datetime(), None);
    // the sky view is already complete before the first fix
    assert_eq!(session.satellites_in_view().unwrap().sats.len(), 12);
}

#[test]
fn one_corrupted_frame_costs_exactly_one_record() {
    let frames = acquisition_frames();
    let mut stream = Vec::new();
    for (i, f) in frames.iter().enumerate() {
        let mut f = f.clone();
        if i == 8 {
            // flip one payload byte so the checksum no longer matches
            let mid = f.len() / 2;
            f[mid] ^= 0x01;
        }
        stream.extend_from_slice(&f);
    }

    let mut session = FixSession::new();
    session.feed(&stream);

    assert_eq!(session.stats().accepted as usize, frames.len() - 1);
    assert_eq!(session.stats().rejected(), 1);
    // the stream as a whole still ends in a valid fix
    assert!(session.is_fixed());
}

#[test]
fn command_exchange_over_the_same_bus() {
    let ack = frame("PMTK001,225,3");
    let mut gnss = L76Gnss::new(MockBus::with_chunk(&ack, 5));

    gnss.set_periodic_mode(1, 5_000, 25_000, 30_000, 60_000).unwrap();
    gnss.poll_until_idle().unwrap();

    match gnss.session().last_record(SentenceKind::MtkAck) {
        Some(ParsedSentence::MtkAck(a)) => assert_eq!(a.command, 225),
        other => panic!("expected ack, got {other:?}"),
    }

    let bus = gnss.release();
    assert_eq!(bus.sent(), frame("PMTK225,1,5000,25000,30000,60000").as_slice());
}
