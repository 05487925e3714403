use anyhow::{anyhow, Result};
use clap::Parser;
use dtmfdetect::config::{Cli, Config};
use dtmfdetect::media::dtmf::{DtmfDetectorProvider, Rfc2833DtmfDetectorProvider};
use dtmfdetect::replay::{self, CaptureFormat};
use std::fs::File;
use std::io::BufReader;
use tracing::{info, level_filters::LevelFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.conf {
        Some(ref conf) => Config::load(conf)?,
        None => Config::default(),
    };

    let mut log_fmt = tracing_subscriber::fmt();
    if let Some(ref level) = config.log_level {
        if let Ok(lv) = level.as_str().parse::<LevelFilter>() {
            log_fmt = log_fmt.with_max_level(lv);
        }
    }

    // keep the guard alive so buffered log lines are flushed on exit
    let _guard = if let Some(ref log_file) = config.log_file {
        let file = File::create(log_file).map_err(|e| anyhow!("{}: {}", e, log_file))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        log_fmt.with_writer(non_blocking).try_init().ok();
        Some(guard)
    } else {
        log_fmt.try_init().ok();
        None
    };

    let provider = Rfc2833DtmfDetectorProvider::from_config(&config.dtmf)
        .ok_or_else(|| anyhow!("RFC 2833 DTMF detection is disabled in configuration"))?;
    let detector = provider.provide();

    let format = if cli.timestamps {
        CaptureFormat::Timestamps
    } else {
        CaptureFormat::Durations
    };
    info!("Replaying {} ({:?})", cli.input, format);
    let input = File::open(&cli.input).map_err(|e| anyhow!("{}: {}", e, cli.input))?;
    let tones = replay::replay(&detector, BufReader::new(input), format)?;

    let digits: String = tones.iter().map(|t| t.as_char()).collect();
    info!("Detected {} digit(s): {}", tones.len(), digits);
    println!("{}", digits);
    Ok(())
}
