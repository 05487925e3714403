use super::{DtmfDetector, DtmfOption, RtpEventExtractor, TelephoneEventExtractor, ToneExtractor};
use crate::config::{DtmfConfig, DtmfInput};
use tracing::info;

/// Creates one detector per media stream.
pub trait DtmfDetectorProvider: Send + Sync {
    fn provide(&self) -> DtmfDetector;
}

pub struct Rfc2833DtmfDetectorProvider {
    config: DtmfConfig,
}

impl Rfc2833DtmfDetectorProvider {
    /// Returns `None` when RFC 2833 detection is disabled.
    pub fn from_config(config: &DtmfConfig) -> Option<Self> {
        if !config.enabled {
            info!("RFC 2833 DTMF detector disabled");
            return None;
        }
        info!(
            "RFC 2833 DTMF detector enabled: tone_duration={}ms tone_interval={}ms payload_type={} input={:?}",
            config.tone_duration, config.tone_interval, config.payload_type, config.input
        );
        Some(Self {
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &DtmfConfig {
        &self.config
    }

    fn create_extractor(&self) -> Box<dyn ToneExtractor> {
        match self.config.input {
            DtmfInput::Payload => Box::new(TelephoneEventExtractor::new(self.config.clock_rate)),
            DtmfInput::Rtp => Box::new(RtpEventExtractor::new(
                self.config.payload_type,
                self.config.clock_rate,
            )),
        }
    }
}

impl DtmfDetectorProvider for Rfc2833DtmfDetectorProvider {
    fn provide(&self) -> DtmfDetector {
        let option = DtmfOption {
            tone_volume: 0,
            tone_duration: self.config.tone_duration,
            tone_interval: self.config.tone_interval,
        };
        DtmfDetector::with_option(option).with_extractor(self.create_extractor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::dtmf::{TelephoneEvent, ToneSymbol};

    #[test]
    fn test_disabled_provider() {
        let config = DtmfConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(Rfc2833DtmfDetectorProvider::from_config(&config).is_none());
    }

    #[test]
    fn test_provider_uses_configuration() {
        let config = DtmfConfig {
            tone_duration: 120,
            tone_interval: 60,
            ..Default::default()
        };
        let provider = Rfc2833DtmfDetectorProvider::from_config(&config).unwrap();
        assert_eq!(provider.config().tone_interval, 60);
        let detector = provider.provide();
        assert_eq!(detector.dbi(), 0);
        assert_eq!(detector.tone_duration(), 120);
        assert_eq!(detector.tone_interval(), 60);
    }

    #[test]
    fn test_each_detector_has_its_own_state() {
        let provider = Rfc2833DtmfDetectorProvider::from_config(&DtmfConfig::default()).unwrap();
        let first = provider.provide();
        let second = provider.provide();
        let payload = TelephoneEvent {
            event: 8,
            end: false,
            volume: 5,
            duration: 160,
        }
        .to_bytes();

        assert_eq!(first.detect(&payload, 20).unwrap(), Some(ToneSymbol::Eight));
        assert!(first.is_waiting());
        assert!(!second.is_waiting());
        assert_eq!(second.detect(&payload, 20).unwrap(), Some(ToneSymbol::Eight));
    }

    #[test]
    fn test_rtp_input_provider() {
        let config = DtmfConfig {
            input: DtmfInput::Rtp,
            payload_type: 96,
            ..Default::default()
        };
        let detector = Rfc2833DtmfDetectorProvider::from_config(&config)
            .unwrap()
            .provide();
        let mut packet = vec![0x80, 96, 0, 1, 0, 0, 0, 160, 0, 0, 0, 1];
        packet.extend_from_slice(&[0x0B, 0x0A, 0x00, 0xA0]);

        // a bare payload is not an RTP packet
        assert_eq!(detector.detect(&[0x0B, 0x0A, 0x00, 0xA0], 20).unwrap(), None);
        assert_eq!(detector.detect(&packet, 20).unwrap(), Some(ToneSymbol::Pound));
    }
}
