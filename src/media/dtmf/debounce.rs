use super::{ExtractionResult, ToneSymbol};
use tracing::trace;

/// Cooldown filter between a fired tone and the next one.
///
/// After a fire the gate is waiting: every frame is dropped, whatever it
/// carries, until the accumulated frame duration reaches the interval. The
/// frame that completes the interval is evaluated as if the gate were idle.
/// A different symbol arriving while waiting is dropped as well.
#[derive(Debug, Clone)]
pub struct DebounceGate {
    interval: u64,
    last_tone: Option<ToneSymbol>,
    elapsed: u64,
    waiting: bool,
}

impl DebounceGate {
    pub fn new(interval: u32) -> Self {
        Self {
            interval: interval as u64,
            last_tone: None,
            elapsed: 0,
            waiting: false,
        }
    }

    /// Feeds one frame's extraction result and duration (ms) through the gate.
    /// Returns the symbol to fire, if any.
    pub fn advance(&mut self, extraction: &ExtractionResult, duration: u64) -> Option<ToneSymbol> {
        if self.waiting {
            self.elapsed = self.elapsed.saturating_add(duration);
            self.waiting = self.elapsed < self.interval;
            if self.waiting {
                return None;
            }
            trace!(
                "Waiting: {} [last tone={:?}, elapsed time={}]",
                self.waiting,
                self.last_tone,
                self.elapsed
            );
        }

        let tone = extraction.symbol()?;
        self.elapsed = 0;
        self.last_tone = Some(tone);
        self.waiting = true;
        trace!(
            "Waiting: {} [last tone={}, elapsed time={}]",
            self.waiting,
            tone,
            self.elapsed
        );
        Some(tone)
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    pub fn last_tone(&self) -> Option<ToneSymbol> {
        self.last_tone
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }
}
