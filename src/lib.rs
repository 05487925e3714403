use serde::{Deserialize, Serialize};

pub mod config;
pub mod error;
pub mod event;
pub mod media;
pub mod replay;

pub use error::{Error, Result};

pub type TrackId = String;
pub type Sample = i16;
pub type PcmBuf = Vec<Sample>;
pub type PayloadBuf = Vec<u8>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Samples {
    PCM {
        samples: PcmBuf,
    },
    RTP {
        sequence_number: u16,
        payload_type: u8,
        payload: PayloadBuf,
    },
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFrame {
    pub track_id: TrackId,
    pub samples: Samples,
    /// Capture time of the frame in milliseconds
    pub timestamp: u64,
    pub sample_rate: u32,
}

// get timestamp in milliseconds
pub fn get_timestamp() -> u64 {
    let now = std::time::SystemTime::now();
    now.duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
