use crate::event::{EventSender, SessionEvent};
use crate::media::dtmf::{DtmfDetector, DtmfDetectorListener, ToneSymbol};
use crate::media::processor::Processor;
use crate::{AudioFrame, Samples, TrackId};
use anyhow::Result;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Duration assumed for the first frame of a stream (ms)
const FIRST_FRAME_DURATION: i64 = 20;

/// Turns frame arrival timestamps (ms) into frame durations.
///
/// The clock only moves forward: a late frame lasts 0 ms and does not become
/// the reference for the frames after it.
#[derive(Debug, Default)]
pub struct FrameClock {
    latest: Option<u64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, timestamp: u64) -> i64 {
        match self.latest {
            None => {
                self.latest = Some(timestamp);
                FIRST_FRAME_DURATION
            }
            Some(prev) if timestamp > prev => {
                self.latest = Some(timestamp);
                (timestamp - prev) as i64
            }
            Some(_) => 0,
        }
    }
}

/// Pipeline stage feeding every frame of one track to a [`DtmfDetector`].
///
/// Frame durations come from the distance between consecutive frame
/// timestamps. Frames that are not telephone events still reach the detector
/// with an empty payload so the debounce interval keeps running through
/// silence.
pub struct DtmfProcessor {
    detector: Arc<DtmfDetector>,
    payload_type: u8,
    clock: Mutex<FrameClock>,
}

impl DtmfProcessor {
    pub fn new(detector: Arc<DtmfDetector>, payload_type: u8) -> Self {
        Self {
            detector,
            payload_type,
            clock: Mutex::new(FrameClock::new()),
        }
    }

    pub fn detector(&self) -> &Arc<DtmfDetector> {
        &self.detector
    }

    fn frame_duration(&self, timestamp: u64) -> i64 {
        self.clock
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .advance(timestamp)
    }
}

impl Processor for DtmfProcessor {
    fn process_frame(&self, frame: &mut AudioFrame) -> Result<()> {
        let duration = self.frame_duration(frame.timestamp);
        let payload: &[u8] = match &frame.samples {
            Samples::RTP {
                payload_type,
                payload,
                ..
            } if *payload_type == self.payload_type => payload.as_slice(),
            _ => &[],
        };
        if let Some(tone) = self.detector.detect(payload, duration)? {
            debug!(track_id = %frame.track_id, "DTMF detected: {}", tone);
        }
        Ok(())
    }
}

/// Publishes detected digits as [`SessionEvent::DTMF`] on the session bus.
pub struct EventSenderListener {
    track_id: TrackId,
    sender: EventSender,
}

impl EventSenderListener {
    pub fn new(track_id: TrackId, sender: EventSender) -> Self {
        Self { track_id, sender }
    }
}

impl DtmfDetectorListener for EventSenderListener {
    fn on_dtmf_detected(&self, tone: ToneSymbol) -> Result<()> {
        let event = SessionEvent::DTMF {
            track_id: self.track_id.clone(),
            timestamp: crate::get_timestamp(),
            digit: tone.to_string(),
        };
        // no subscribers is not a failure
        self.sender.send(event).ok();
        Ok(())
    }
}
