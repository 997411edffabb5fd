use super::{
    hex_val, sentences, NmeaBuf, NmeaChecksum, NmeaError, SentenceKind, Talker, MAX_FIELDS,
};
use tinyvec::ArrayVec;

// States are named for the portion of the frame which was *last received*
#[derive(Copy, Clone)]
enum ParserState {
    Idle,
    Body {
        checksum: NmeaChecksum,
    },
    Star {
        expect: NmeaChecksum,
    },
    HexHi {
        expect: NmeaChecksum,
        hi: u8,
    },
}
use ParserState::*;

/// Per-byte NMEA framer and parser.
///
/// Feed it bytes in any chunking; frames may be split anywhere, including
/// inside the checksum digits. Each completed frame comes out as one
/// `Result`: a typed record, or the error that made the frame a skip.
pub struct NmeaParser {
    state: ParserState,
    buf: NmeaBuf,
}

impl NmeaParser {
    pub fn new() -> Self {
        Self {
            state: Idle,
            buf: NmeaBuf::default(),
        }
    }

    /// Drops any frame in progress and waits for the next `$`.
    pub fn reset(&mut self) {
        self.state = Idle;
        self.buf.clear();
    }

    fn step(&mut self, b: u8) -> Option<Result<(), NmeaError>> {
        // '$' always wins: the previous frame, if any, was cut short.
        if b == b'$' {
            let aborted = match self.state {
                Idle => false,
                Body { .. } => !self.buf.is_empty(),
                Star { .. } | HexHi { .. } => true,
            };
            self.buf.clear();
            self.state = Body {
                checksum: NmeaChecksum::new(),
            };
            return aborted.then(|| Err(NmeaError::Malformed));
        }

        match self.state {
            Idle => None,
            Body { checksum } => match b {
                b'*' => {
                    self.state = Star { expect: checksum };
                    None
                }
                b'\r' | b'\n' => {
                    self.state = Idle;
                    Some(Err(NmeaError::Malformed))
                }
                0x20..=0x7e => {
                    if self.buf.try_push(b).is_some() {
                        self.state = Idle;
                        Some(Err(NmeaError::TooLong))
                    } else {
                        self.state = Body {
                            checksum: checksum.next(b),
                        };
                        None
                    }
                }
                _ => {
                    self.state = Idle;
                    Some(Err(NmeaError::Malformed))
                }
            },
            Star { expect } => {
                if hex_val(b).is_some() {
                    self.state = HexHi { expect, hi: b };
                    None
                } else {
                    self.state = Idle;
                    Some(Err(NmeaError::Malformed))
                }
            }
            HexHi { expect, hi } => {
                self.state = Idle;
                match (hex_val(hi), hex_val(b)) {
                    (Some(h), Some(l)) => {
                        let saw = (h << 4) | l;
                        if expect == saw {
                            Some(Ok(()))
                        } else {
                            Some(Err(NmeaError::ChecksumMismatch {
                                expect: expect.0,
                                saw,
                            }))
                        }
                    }
                    _ => Some(Err(NmeaError::Malformed)),
                }
            }
        }
    }

    /// Advances the framer by one byte. Returns a value exactly when a
    /// frame completed (well or badly) at this byte.
    pub fn feed_byte(&mut self, b: u8) -> Option<Result<sentences::ParsedSentence, NmeaError>> {
        self.step(b)
            .map(|r| r.and_then(|()| parse_body(self.buf.as_slice())))
    }

    /// Lazily parses `bytes`, yielding one item per completed frame.
    /// Unconsumed trailing bytes stay buffered for the next call.
    pub fn feed<'p, 'b>(&'p mut self, bytes: &'b [u8]) -> Feed<'p, 'b> {
        Feed {
            parser: self,
            bytes,
        }
    }
}

impl Default for NmeaParser {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Feed<'p, 'b> {
    parser: &'p mut NmeaParser,
    bytes: &'b [u8],
}

impl Iterator for Feed<'_, '_> {
    type Item = Result<sentences::ParsedSentence, NmeaError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((&b, rest)) = self.bytes.split_first() {
            self.bytes = rest;
            if let Some(result) = self.parser.feed_byte(b) {
                return Some(result);
            }
        }
        None
    }
}

/// A checksum-valid frame body split into address and fields.
pub struct Sentence<'a> {
    pub talker: Talker,
    pub kind: SentenceKind,
    fields: ArrayVec<[&'a str; MAX_FIELDS]>,
}

impl<'a> Sentence<'a> {
    /// Field `i` counted from the first field after the address, or `""`
    /// when the sentence has fewer fields. Trailing fields a sentence
    /// layout does not define are simply never asked for.
    pub fn field(&self, i: usize) -> &'a str {
        self.fields.get(i).copied().unwrap_or("")
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// Splits a checksum-valid body into talker, kind and raw fields.
///
/// Empty fields are kept (they mean "no data yet"); fields beyond
/// [`MAX_FIELDS`] are dropped, which only ever discards vendor padding.
pub fn tokenize(body: &[u8]) -> Result<Sentence<'_>, NmeaError> {
    let body = core::str::from_utf8(body).map_err(|_| NmeaError::Malformed)?;
    let mut parts = body.split(',');
    let address = parts.next().unwrap_or("");
    let (talker, kind) = parse_address(address)?;

    let mut fields = ArrayVec::new();
    for part in parts {
        if fields.try_push(part).is_some() {
            break;
        }
    }

    Ok(Sentence {
        talker,
        kind,
        fields,
    })
}

fn parse_address(address: &str) -> Result<(Talker, SentenceKind), NmeaError> {
    let bytes = address.as_bytes();
    if bytes.first() == Some(&b'P') {
        let kind = match address {
            "PMTK001" => SentenceKind::MtkAck,
            "PMTK010" => SentenceKind::MtkSys,
            _ => return Err(NmeaError::UnknownType),
        };
        return Ok((Talker::Mtk, kind));
    }

    if bytes.len() != 5 {
        return Err(NmeaError::UnknownType);
    }
    let kind = match &bytes[2..5] {
        b"GGA" => SentenceKind::Gga,
        b"RMC" => SentenceKind::Rmc,
        b"VTG" => SentenceKind::Vtg,
        b"GLL" => SentenceKind::Gll,
        b"GSA" => SentenceKind::Gsa,
        b"GSV" => SentenceKind::Gsv,
        _ => return Err(NmeaError::UnknownType),
    };
    Ok((Talker::from_prefix([bytes[0], bytes[1]]), kind))
}

fn parse_body(body: &[u8]) -> Result<sentences::ParsedSentence, NmeaError> {
    let sentence = tokenize(body)?;
    sentences::parse(&sentence)
}
