//! Replays a text capture of media frames through a detector.
//!
//! Each non-empty line holds one frame: a leading number and the frame bytes
//! in hex, separated by whitespace. Lines starting with `#` are comments.
//!
//! With [`CaptureFormat::Durations`] the number is the frame duration in
//! milliseconds. With [`CaptureFormat::Timestamps`] it is the arrival time of
//! the packet in milliseconds and the duration is the gap to the latest
//! earlier packet (20 ms for the first one). A pcap of an RTP stream converts
//! to the latter with e.g.
//!
//! ```text
//! tshark -r call.pcap -Y rtp -T fields -e frame.time_relative -e udp.payload \
//!     | awk '{ printf "%d %s\n", $1 * 1000, $2 }'
//! ```
//!
//! and replays with `dtmf.input = "rtp"` so the RTP header is parsed.
use crate::error::{Error, Result};
use crate::media::dtmf::{DtmfDetector, ToneSymbol};
use crate::media::dtmf_processor::FrameClock;
use std::io::BufRead;
use tracing::info;

/// Meaning of the leading number of each capture line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureFormat {
    /// Frame duration (ms)
    #[default]
    Durations,
    /// Packet arrival time (ms)
    Timestamps,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub duration: i64,
    pub data: Vec<u8>,
}

pub fn parse_line(line: &str) -> Result<Option<CapturedFrame>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut parts = line.split_whitespace();
    let duration = parts
        .next()
        .ok_or_else(|| Error::parse("missing frame duration"))?
        .parse::<i64>()
        .map_err(|e| Error::parse(format!("bad frame duration: {}", e)))?;
    let hex_data: String = parts.collect();
    let data = hex::decode(&hex_data)
        .map_err(|e| Error::parse(format!("bad frame data: {}", e)))?;
    Ok(Some(CapturedFrame { duration, data }))
}

/// Feeds every frame of `reader` to `detector` and returns the fired tones in
/// order.
pub fn replay<R: BufRead>(
    detector: &DtmfDetector,
    reader: R,
    format: CaptureFormat,
) -> Result<Vec<ToneSymbol>> {
    let mut clock = FrameClock::new();
    let mut tones = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let frame = match parse_line(&line) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => return Err(Error::parse(format!("line {}: {}", lineno + 1, e))),
        };
        let duration = match format {
            CaptureFormat::Durations => frame.duration,
            CaptureFormat::Timestamps => {
                let timestamp = u64::try_from(frame.duration).map_err(|_| {
                    Error::parse(format!(
                        "line {}: negative timestamp {}",
                        lineno + 1,
                        frame.duration
                    ))
                })?;
                clock.advance(timestamp)
            }
        };
        if let Some(tone) = detector.detect(&frame.data, duration)? {
            info!("line {}: DTMF {}", lineno + 1, tone);
            tones.push(tone);
        }
    }
    Ok(tones)
}
