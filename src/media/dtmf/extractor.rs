use super::{ExtractionResult, ToneSymbol};
use rtp_rs::RtpReader;
use tracing::trace;

pub const DEFAULT_CLOCK_RATE: u32 = 8000;
pub const DEFAULT_EVENT_PAYLOAD_TYPE: u8 = 101;

// RFC 4733 event payload: event(8) | E(1) R(1) volume(6) | duration(16)
const EVENT_PAYLOAD_LEN: usize = 4;
const END_OF_EVENT_MASK: u8 = 0x80;
const VOLUME_MASK: u8 = 0x3F;

/// Resolves the tone carried by one frame.
///
/// Implementations hold no per-stream state: the same input always yields
/// the same result, and input that cannot be understood is `NoTone`.
pub trait ToneExtractor: Send + Sync {
    fn extract(&self, data: &[u8], duration: u64) -> ExtractionResult;
}

/// A decoded telephone-event payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelephoneEvent {
    pub event: u8,
    pub end: bool,
    /// Power level as carried on the wire, in -dBm0 (0..=63)
    pub volume: u8,
    /// Duration in RTP timestamp units
    pub duration: u16,
}

impl TelephoneEvent {
    pub fn parse(payload: &[u8]) -> Option<Self> {
        if payload.len() < EVENT_PAYLOAD_LEN {
            return None;
        }
        Some(Self {
            event: payload[0],
            end: payload[1] & END_OF_EVENT_MASK != 0,
            volume: payload[1] & VOLUME_MASK,
            duration: u16::from_be_bytes([payload[2], payload[3]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        let mut flags = self.volume & VOLUME_MASK;
        if self.end {
            flags |= END_OF_EVENT_MASK;
        }
        let duration = self.duration.to_be_bytes();
        [self.event, flags, duration[0], duration[1]]
    }

    /// The keypad symbol, or `None` for non-DTMF events (flash, tones).
    pub fn symbol(&self) -> Option<ToneSymbol> {
        ToneSymbol::from_event_code(self.event)
    }

    pub fn duration_ms(&self, clock_rate: u32) -> u32 {
        if clock_rate == 0 {
            return 0;
        }
        (self.duration as u64 * 1000 / clock_rate as u64) as u32
    }
}

/// Extracts tones from bare telephone-event payloads.
#[derive(Debug, Clone)]
pub struct TelephoneEventExtractor {
    clock_rate: u32,
}

impl TelephoneEventExtractor {
    pub fn new(clock_rate: u32) -> Self {
        Self { clock_rate }
    }

    pub fn clock_rate(&self) -> u32 {
        self.clock_rate
    }
}

impl Default for TelephoneEventExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_RATE)
    }
}

impl ToneExtractor for TelephoneEventExtractor {
    fn extract(&self, data: &[u8], _duration: u64) -> ExtractionResult {
        let event = match TelephoneEvent::parse(data) {
            Some(event) => event,
            None => return ExtractionResult::NoTone,
        };
        match event.symbol() {
            Some(symbol) => ExtractionResult::Tone {
                symbol,
                volume: -(event.volume as i32),
                duration: event.duration_ms(self.clock_rate),
            },
            None => {
                trace!("Ignoring non-DTMF telephone event {}", event.event);
                ExtractionResult::NoTone
            }
        }
    }
}

/// Extracts tones from complete RTP packets carrying telephone events.
#[derive(Debug, Clone)]
pub struct RtpEventExtractor {
    payload_type: u8,
    events: TelephoneEventExtractor,
}

impl RtpEventExtractor {
    pub fn new(payload_type: u8, clock_rate: u32) -> Self {
        Self {
            payload_type,
            events: TelephoneEventExtractor::new(clock_rate),
        }
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }
}

impl Default for RtpEventExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_PAYLOAD_TYPE, DEFAULT_CLOCK_RATE)
    }
}

impl ToneExtractor for RtpEventExtractor {
    fn extract(&self, data: &[u8], duration: u64) -> ExtractionResult {
        let reader = match RtpReader::new(data) {
            Ok(r) => r,
            Err(e) => {
                trace!("Not an RTP packet: {:?}", e);
                return ExtractionResult::NoTone;
            }
        };
        if reader.payload_type() != self.payload_type {
            return ExtractionResult::NoTone;
        }
        self.events.extract(reader.payload(), duration)
    }
}
