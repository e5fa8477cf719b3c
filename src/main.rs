//! Reelcap: records a playing demo through the frame capture hooks

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reelcap::capture::CaptureManager;
use reelcap::encoder::{EncoderLauncher, FfmpegLauncher, MemoryLauncher, PipeLedger};
use reelcap::host::DemoHost;
use reelcap::{Config, GlobalPreferences, CONFIG};

#[derive(Parser, Debug)]
#[command(name = "reelcap", about = "Capture a demo playback to ProRes or image sequences")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE", default_value = "reelcap.toml")]
    config: PathBuf,

    /// Stream frames into memory instead of an encoder process
    #[arg(long)]
    dry_run: bool,

    /// Stop after this many frame opportunities
    #[arg(long, value_name = "N")]
    max_frames: Option<u64>,

    /// Override the configured output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reelcap=debug"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_timer(fmt::time::uptime()));

    #[cfg(feature = "profiling")]
    let registry = registry.with(tracing_tracy::TracyLayer::default());

    registry.init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let args = Args::parse();
    info!("Reelcap launching...");

    let mut config = Config::load(Some(args.config.as_path()))?;
    if let Some(output) = args.output {
        config.output.directory = Some(output);
    }
    CONFIG.store(Arc::new(config.clone()));

    let mut host = DemoHost::new(config.demo.resolution(), config.demo.end_tick);

    let mut ledger: Option<PipeLedger> = None;
    let launcher: Box<dyn EncoderLauncher> = if args.dry_run {
        let launcher = MemoryLauncher::new();
        ledger = Some(launcher.ledger());
        Box::new(launcher)
    } else {
        Box::new(FfmpegLauncher::new(config.encoder.binary()))
    };

    let mut manager = CaptureManager::new(config.capture, launcher, Box::new(GlobalPreferences));
    manager.initialize(&mut host);

    manager.start_capture(&mut host)?;

    let mut opportunities = 0u64;
    while manager.is_capturing() {
        if args.max_frames.is_some_and(|max| opportunities >= max) {
            manager.stop_capture(&mut host);
            break;
        }
        host.run_frame(&mut manager);
        opportunities += 1;
    }

    info!(
        "Captured {} frames over {} ms of demo time into {}",
        manager.captured_frame_count(),
        host.sim_time_ms(),
        manager.output_directory().display()
    );
    if let Some(ledger) = ledger {
        for record in ledger.records() {
            info!(
                "Pass {}: {} frames, {} bytes -> {}",
                record.pass_index,
                record.frames,
                record.bytes,
                record.output.display()
            );
        }
    }

    Ok(())
}
