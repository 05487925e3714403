use crate::error::{Error, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(version, about = "Replay captured RTP frames through the DTMF detector")]
pub struct Cli {
    #[clap(long)]
    pub conf: Option<String>,
    /// Capture file, one `<duration_ms> <hex payload>` frame per line
    #[clap(long)]
    pub input: String,
    /// The first column of the capture holds packet arrival times (ms)
    #[clap(long)]
    pub timestamps: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub log_file: Option<String>,
    pub dtmf: DtmfConfig,
}

/// What the frames handed to the detector contain.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DtmfInput {
    /// Bare telephone-event payloads, RTP header already stripped
    #[default]
    Payload,
    /// Complete RTP packets
    Rtp,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DtmfConfig {
    pub enabled: bool,
    /// Nominal tone duration reported by detectors (ms)
    pub tone_duration: u32,
    /// Debounce interval between two reported tones (ms)
    pub tone_interval: u32,
    /// Negotiated telephone-event payload type
    pub payload_type: u8,
    pub clock_rate: u32,
    pub input: DtmfInput,
}

impl Default for DtmfConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tone_duration: 80,
            tone_interval: 20,
            payload_type: 101,
            clock_rate: 8000,
            input: DtmfInput::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            log_file: None,
            dtmf: DtmfConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("{}: {}", e, path)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.dtmf.clock_rate == 0 {
            return Err(Error::config("dtmf.clock_rate must be positive"));
        }
        Ok(config)
    }
}
