// src/main.rs
// Demo runner: synthetic 8-channel recording -> assessment -> JSON report on stdout.
// Usage: neuroscreen [config.json]
use anyhow::{Context, Result};
use log::info;
use neuroscreen::analysis::SyntheticSource;
use neuroscreen::{ExternalScore, ScreeningConfig, ScreeningPipeline};

const DEMO_SEED: u64 = 42;
const DEMO_RATE_HZ: f64 = 256.0;
const DEMO_CHANNELS: usize = 8;
const DEMO_SECONDS: f64 = 60.0;

fn load_config() -> Result<ScreeningConfig> {
    match std::env::args().nth(1) {
        Some(path) => ScreeningConfig::from_path(&path)
            .with_context(|| format!("loading configuration from {path}")),
        None => Ok(ScreeningConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config = load_config()?;
    let pipeline = ScreeningPipeline::new(config).context("building pipeline")?;

    // Alpha-dominant resting recording with some theta and beta activity.
    let mut source = SyntheticSource::new(DEMO_SEED, DEMO_RATE_HZ, DEMO_CHANNELS, DEMO_SECONDS)
        .with_tone(2.0, 6.0)
        .with_tone(6.0, 8.0)
        .with_tone(10.0, 20.0)
        .with_tone(20.0, 9.0)
        .with_tone(38.0, 2.0)
        .with_noise(4.0);
    let external = [
        ExternalScore::questionnaire(55.0, 0.3),
        ExternalScore::cognitive(35.0, 0.2),
    ];

    info!(
        "running demo assessment: {DEMO_CHANNELS} channels, {DEMO_SECONDS} s at {DEMO_RATE_HZ} Hz"
    );
    let result = pipeline
        .assess_next(&mut source, &external)
        .context("assessment failed")?
        .context("signal source produced no recording")?;
    let json = serde_json::to_string_pretty(&result).context("serializing report")?;
    println!("{json}");
    Ok(())
}
