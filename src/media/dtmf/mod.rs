//! Out-of-band DTMF detection.
//!
//! A [`DtmfDetector`] is fed one frame at a time by the media pipeline. Each
//! frame goes through a [`ToneExtractor`], the resolved symbol is filtered by
//! a [`DebounceGate`] and, when the gate fires, every registered
//! [`DtmfDetectorListener`] is told about the digit exactly once.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

mod debounce;
mod extractor;
mod listeners;
mod provider;

pub use debounce::DebounceGate;
pub use extractor::{
    RtpEventExtractor, TelephoneEvent, TelephoneEventExtractor, ToneExtractor,
    DEFAULT_CLOCK_RATE, DEFAULT_EVENT_PAYLOAD_TYPE,
};
pub use listeners::ListenerRegistry;
pub use provider::{DtmfDetectorProvider, Rfc2833DtmfDetectorProvider};

pub const DEFAULT_TONE_INTERVAL: u32 = 200;

/// One of the sixteen keypad symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToneSymbol {
    #[serde(rename = "0")]
    Zero,
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "*")]
    Star,
    #[serde(rename = "#")]
    Pound,
    A,
    B,
    C,
    D,
}

// Indexed by RFC 4733 event code
const EVENT_SYMBOLS: [ToneSymbol; 16] = [
    ToneSymbol::Zero,
    ToneSymbol::One,
    ToneSymbol::Two,
    ToneSymbol::Three,
    ToneSymbol::Four,
    ToneSymbol::Five,
    ToneSymbol::Six,
    ToneSymbol::Seven,
    ToneSymbol::Eight,
    ToneSymbol::Nine,
    ToneSymbol::Star,
    ToneSymbol::Pound,
    ToneSymbol::A,
    ToneSymbol::B,
    ToneSymbol::C,
    ToneSymbol::D,
];

impl ToneSymbol {
    pub fn all() -> &'static [ToneSymbol] {
        &EVENT_SYMBOLS
    }

    /// Maps a telephone-event code (0-15) to its symbol.
    pub fn from_event_code(code: u8) -> Option<Self> {
        EVENT_SYMBOLS.get(code as usize).copied()
    }

    pub fn event_code(&self) -> u8 {
        *self as u8
    }

    pub fn as_char(&self) -> char {
        match self {
            ToneSymbol::Star => '*',
            ToneSymbol::Pound => '#',
            ToneSymbol::A => 'A',
            ToneSymbol::B => 'B',
            ToneSymbol::C => 'C',
            ToneSymbol::D => 'D',
            digit => (b'0' + digit.event_code()) as char,
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            '0'..='9' => Self::from_event_code(c as u8 - b'0'),
            '*' => Some(ToneSymbol::Star),
            '#' => Some(ToneSymbol::Pound),
            'A' => Some(ToneSymbol::A),
            'B' => Some(ToneSymbol::B),
            'C' => Some(ToneSymbol::C),
            'D' => Some(ToneSymbol::D),
            _ => None,
        }
    }
}

impl fmt::Display for ToneSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for ToneSymbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c)
                .ok_or_else(|| Error::parse(format!("invalid DTMF symbol: {}", s))),
            _ => Err(Error::parse(format!("invalid DTMF symbol: {}", s))),
        }
    }
}

/// Outcome of running a [`ToneExtractor`] on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionResult {
    NoTone,
    Tone {
        symbol: ToneSymbol,
        /// Power level in dBm0
        volume: i32,
        duration: u32,
    },
}

impl ExtractionResult {
    pub fn symbol(&self) -> Option<ToneSymbol> {
        match self {
            ExtractionResult::NoTone => None,
            ExtractionResult::Tone { symbol, .. } => Some(*symbol),
        }
    }
}

/// Observer of detected digits.
///
/// Listeners are invoked on the frame delivery thread and must return
/// quickly. An error or a panic is logged and does not stop delivery to the
/// remaining listeners.
#[cfg_attr(test, mockall::automock)]
pub trait DtmfDetectorListener: Send + Sync {
    fn on_dtmf_detected(&self, tone: ToneSymbol) -> anyhow::Result<()>;
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct DtmfOption {
    /// Reported tone volume (dBm0)
    pub tone_volume: i32,
    /// Reported nominal tone duration (ms)
    pub tone_duration: u32,
    /// Minimum accumulated frame time between two fires (ms)
    pub tone_interval: u32,
}

impl Default for DtmfOption {
    fn default() -> Self {
        Self {
            tone_volume: 0,
            tone_duration: 0,
            tone_interval: DEFAULT_TONE_INTERVAL,
        }
    }
}

pub struct DtmfDetector {
    option: DtmfOption,
    extractor: Box<dyn ToneExtractor>,
    gate: Mutex<DebounceGate>,
    listeners: ListenerRegistry,
}

impl DtmfDetector {
    pub fn new(tone_interval: u32) -> Self {
        Self::with_option(DtmfOption {
            tone_interval,
            ..Default::default()
        })
    }

    pub fn with_option(option: DtmfOption) -> Self {
        Self {
            gate: Mutex::new(DebounceGate::new(option.tone_interval)),
            option,
            extractor: Box::new(TelephoneEventExtractor::default()),
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn ToneExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Processes one frame lasting `duration` ms.
    ///
    /// Returns the symbol when this frame fired a notification. Listeners have
    /// already been notified by the time this returns.
    pub fn detect(&self, data: &[u8], duration: i64) -> Result<Option<ToneSymbol>> {
        if duration < 0 {
            return Err(Error::invalid_argument(format!(
                "frame duration must not be negative: {}",
                duration
            )));
        }

        let extraction = self.extractor.extract(data, duration as u64);
        let fired = self.gate().advance(&extraction, duration as u64);

        if let Some(tone) = fired {
            trace!(
                "Fire DTMF tone {} to {} listener(s)",
                tone,
                self.listeners.len()
            );
            self.listeners.notify_all(tone);
        }
        Ok(fired)
    }

    pub fn dbi(&self) -> i32 {
        self.option.tone_volume
    }

    pub fn tone_duration(&self) -> u32 {
        self.option.tone_duration
    }

    pub fn tone_interval(&self) -> u32 {
        self.option.tone_interval
    }

    pub fn observe(&self, listener: Arc<dyn DtmfDetectorListener>) -> bool {
        self.listeners.register(listener)
    }

    pub fn forget<L>(&self, listener: &Arc<L>) -> bool
    where
        L: DtmfDetectorListener + ?Sized,
    {
        self.listeners.unregister(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_waiting(&self) -> bool {
        self.gate().is_waiting()
    }

    pub fn last_tone(&self) -> Option<ToneSymbol> {
        self.gate().last_tone()
    }

    pub fn elapsed(&self) -> u64 {
        self.gate().elapsed()
    }

    fn gate(&self) -> MutexGuard<'_, DebounceGate> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for DtmfDetector {
    fn default() -> Self {
        Self::new(DEFAULT_TONE_INTERVAL)
    }
}
