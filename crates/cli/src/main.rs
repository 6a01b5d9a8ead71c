use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facewatch_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use facewatch_core::capture::infrastructure::still_image_loader::StillImageLoader;
use facewatch_core::detection::infrastructure::replay_inference_gateway::ReplayInferenceGateway;
use facewatch_core::pipeline::cycle_logger::StdoutCycleLogger;
use facewatch_core::pipeline::detection_scheduler::DetectionScheduler;
use facewatch_core::rendering::infrastructure::raster_overlay_surface::{
    OverlayCanvas, OverlayStyle, RasterOverlaySurface,
};
use facewatch_core::shared::config::DetectorConfig;
use facewatch_core::shared::constants::IMAGE_EXTENSIONS;
use facewatch_core::state::domain::app_state::AppState;
use facewatch_core::state::domain::state_store::StateStore;
use facewatch_core::state::infrastructure::in_memory_store::InMemoryStore;

/// Face detection with age, gender and expression overlays.
#[derive(Parser)]
#[command(name = "facewatch")]
struct Cli {
    /// Still image (one-shot) or directory of frames (live).
    input: PathBuf,

    /// Recorded face results (JSON) replayed as the model output.
    #[arg(long)]
    detections: PathBuf,

    /// Where to write the annotated image (one-shot) or final overlay (live).
    #[arg(long)]
    output: Option<PathBuf>,

    /// TrueType/OpenType font for label text.
    #[arg(long)]
    font: Option<PathBuf>,

    /// JSON config file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Live cadence in milliseconds.
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Hide the expression part of a label below this probability (0.0-1.0).
    #[arg(long)]
    min_expression_probability: Option<f64>,

    /// Stop live detection after this many seconds.
    #[arg(long)]
    duration_secs: Option<f64>,

    /// Simulated inference latency in milliseconds.
    #[arg(long, default_value = "0")]
    latency_ms: u64,

    /// Write the final application state as JSON.
    #[arg(long)]
    state_json: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = build_config(&cli)?;

    let store = Arc::new(InMemoryStore::new());
    log_state_changes(&store);

    let mut surface = RasterOverlaySurface::new(OverlayStyle::from_config(&config));
    if let Some(font) = &cli.font {
        surface = surface.with_font_file(font)?;
    }
    let canvas = surface.canvas();

    let gateway = ReplayInferenceGateway::from_file(&cli.detections)
        .with_latency(Duration::from_millis(cli.latency_ms));

    let runtime = tokio::runtime::Runtime::new()?;
    let detection: Result<(), Box<dyn std::error::Error>> = runtime.block_on(async {
        let scheduler = DetectionScheduler::new(
            Arc::new(gateway),
            Box::new(surface),
            store.clone(),
            &config,
        )
        .with_logger(Box::new(StdoutCycleLogger::new()));

        scheduler.load_models().await?;

        if cli.input.is_dir() {
            run_live(&cli, &scheduler, &canvas).await
        } else {
            run_still(&cli, &config, &scheduler, &canvas).await
        }
    });
    detection?;

    let state = store.snapshot();
    log::info!(
        "Session totals: {} female, {} male",
        state.gender_count.female,
        state.gender_count.male
    );
    if let Some(path) = &cli.state_json {
        write_state(&state, path)?;
    }
    Ok(())
}

async fn run_still(
    cli: &Cli,
    config: &DetectorConfig,
    scheduler: &DetectionScheduler,
    canvas: &OverlayCanvas,
) -> Result<(), Box<dyn std::error::Error>> {
    let loader = StillImageLoader::from_config(config);
    let analysis = scheduler.analyze_image(&loader, &cli.input).await?;
    log::info!("{} face(s) in {}", analysis.report.faces(), cli.input.display());

    if let Some(output) = &cli.output {
        canvas.save_composite(&analysis.frame, output)?;
        log::info!("Output written to {}", output.display());
    }
    scheduler.log_summary();
    Ok(())
}

async fn run_live(
    cli: &Cli,
    scheduler: &DetectionScheduler,
    canvas: &OverlayCanvas,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ImageSequenceSource::open(&cli.input)?;
    scheduler.start_live(Box::new(source))?;

    match cli.duration_secs {
        Some(secs) => {
            tokio::select! {
                _ = scheduler.wait_until_exhausted() => {}
                _ = tokio::time::sleep(Duration::from_secs_f64(secs)) => {
                    log::info!("Duration of {secs}s elapsed");
                }
            }
        }
        None => scheduler.wait_until_exhausted().await,
    }

    // Stopping clears the overlay, so capture it first.
    let overlay = canvas.snapshot();
    scheduler.stop();

    if let Some(output) = &cli.output {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        overlay.save(output)?;
        log::info!("Final overlay written to {}", output.display());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<DetectorConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => DetectorConfig::load(path)?,
        None => DetectorConfig::default(),
    };
    if let Some(ms) = cli.interval_ms {
        config.interval_ms = ms;
    }
    if let Some(p) = cli.min_expression_probability {
        config.min_expression_probability = p;
    }
    config.validate()?;
    Ok(config)
}

/// Logs each status change published to the store.
fn log_state_changes(store: &InMemoryStore) {
    let updates = store.subscribe();
    std::thread::spawn(move || {
        let mut last_message: Option<String> = None;
        let mut last_streaming = false;
        for state in updates.iter() {
            if state.is_streaming != last_streaming {
                last_streaming = state.is_streaming;
                log::info!(
                    "Stream {}",
                    if last_streaming { "started" } else { "stopped" }
                );
            }
            let message = state.detection_status.as_ref().map(|s| s.message.clone());
            if message != last_message {
                if let Some(text) = &message {
                    log::info!("Status: {text}");
                }
                last_message = message;
            }
        }
    });
}

fn write_state(state: &AppState, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)?;
    log::info!("State written to {}", path.display());
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if cli.input.is_file() && !is_image(&cli.input) {
        return Err(format!(
            "Input must be a JPEG/PNG image or a directory of frames, got {}",
            cli.input.display()
        )
        .into());
    }
    if !cli.detections.is_file() {
        return Err(format!("Detections file not found: {}", cli.detections.display()).into());
    }
    if let Some(font) = &cli.font {
        if !font.is_file() {
            return Err(format!("Font file not found: {}", font.display()).into());
        }
    }
    if cli.interval_ms == Some(0) {
        return Err("Interval must be greater than 0 ms".into());
    }
    if let Some(p) = cli.min_expression_probability {
        if !(0.0..=1.0).contains(&p) {
            return Err(format!(
                "Minimum expression probability must be between 0.0 and 1.0, got {p}"
            )
            .into());
        }
    }
    if let Some(secs) = cli.duration_secs {
        if !(secs.is_finite() && secs > 0.0) {
            return Err(format!("Duration must be a positive number of seconds, got {secs}").into());
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
