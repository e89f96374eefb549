use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use neural_backdrop::app::BackdropApp;
use neural_backdrop::config::NetworkConfig;
use neural_backdrop::driver::DriverMode;
use neural_backdrop::driver::worker::OffloadPayload;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Simulate and paint on the UI thread.
    Inline,
    /// Simulate on a worker thread and stream frames back.
    Offloaded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Payload {
    State,
    Commands,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON file overriding the built-in tunables.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = Mode::Inline)]
    mode: Mode,
    /// What the worker sends back in offloaded mode.
    #[arg(long, value_enum, default_value_t = Payload::State)]
    payload: Payload,
    /// Seed for a reproducible run.
    #[arg(long)]
    seed: Option<u64>,
    /// Simulation frame rate cap.
    #[arg(long)]
    fps: Option<f64>,
    #[arg(long)]
    show_fps: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("neural_backdrop=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => NetworkConfig::load(path)?,
        None => NetworkConfig::default(),
    };
    if let Some(fps) = args.fps {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(anyhow!("--fps must be a positive number, got {fps}"));
        }
        config.timing.frame_interval_ms = 1000.0 / fps;
    }

    let mode = match (args.mode, args.payload) {
        (Mode::Inline, _) => DriverMode::Inline,
        (Mode::Offloaded, Payload::State) => DriverMode::Offloaded(OffloadPayload::State),
        (Mode::Offloaded, Payload::Commands) => DriverMode::Offloaded(OffloadPayload::Commands),
    };
    tracing::info!(
        nodes = config.nodes.count,
        frame_interval_ms = config.timing.frame_interval_ms,
        "configuration loaded"
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };

    let seed = args.seed;
    let show_fps = args.show_fps;
    eframe::run_native(
        "neural-backdrop",
        options,
        Box::new(move |cc| Ok(Box::new(BackdropApp::new(cc, config, mode, seed, show_fps)))),
    )
    .map_err(|error| anyhow!("window loop failed: {error}"))
}
