//! Birdlens - on-device bird classification and detection.
//!
//! This crate turns an image URI into either a species prediction or a set of
//! bird bounding boxes using two ONNX models: an image classifier fed a
//! center-cropped, normalized tensor, and a YOLO-style detector fed a
//! letterboxed tensor. Models are copied out of the application bundle into
//! a local cache once, and each gets a session on the best available
//! execution provider.

#![warn(missing_docs)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod imaging;
pub mod inference;
pub mod labels;
pub mod pipeline;
pub mod postprocess;
pub mod tensor;

use clap::Parser;
use cli::{Cli, Command, ConfigAction, GlobalArgs};
use config::{Config, config_file_path, load_config_file, save_config, validate_config};
use inference::{ExecutionProvider, InferenceDevice, ModelKind, SessionStatus, provider_chain};
use labels::Labels;
use pipeline::{ClassificationResult, DetectionResult, InferenceContext};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for birdlens CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet);

    let config_path = match &cli.global.config {
        Some(path) => path.clone(),
        None => config_file_path()?,
    };

    if let Command::Config { action } = cli.command {
        return handle_config_command(action, &config_path);
    }

    let mut config = load_effective_config(&config_path, &cli.global)?;
    let json = cli.global.json;
    match cli.command {
        Command::Providers => handle_providers_command(&config, json),
        Command::Classify { image, top_k } => {
            if let Some(k) = top_k {
                config.classification.top_k = usize::from(k);
            }
            block_on(classify_command(&config, &image, json))
        }
        Command::Detect { image, threshold } => {
            block_on(detect_command(&config, &image, threshold, json))
        }
        Command::Warm => block_on(warm_command(&config)),
        Command::Config { .. } => Ok(()),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // ORT is silent by default because provider fallback is expected.
    // -v shows ORT warnings, -vv info, -vvv debug.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace,ort=debug".to_string(),
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

/// Load the config file and apply command-line overrides.
fn load_effective_config(path: &Path, global: &GlobalArgs) -> Result<Config> {
    let mut config = load_config_file(path)?;

    if let Some(dir) = &global.cache_dir {
        config.cache.dir = Some(dir.clone());
    }
    if global.cpu {
        config.inference.device = InferenceDevice::Cpu;
        config.inference.providers = None;
    }

    validate_config(&config)?;
    Ok(config)
}

fn block_on<F: std::future::Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| Error::JsonSerialize { source: e })?;
    println!("{text}");
    Ok(())
}

fn load_labels(config: &Config) -> Result<Labels> {
    config
        .classification
        .labels
        .as_deref()
        .map(Labels::from_file)
        .transpose()
        .map(Option::unwrap_or_default)
}

#[derive(Serialize)]
struct LabeledPrediction {
    index: usize,
    label: Option<String>,
    confidence: f32,
}

#[derive(Serialize)]
struct ClassificationReport<'a> {
    image: &'a str,
    label: Option<String>,
    #[serde(flatten)]
    result: &'a ClassificationResult,
    ranked: Vec<LabeledPrediction>,
}

async fn classify_command(config: &Config, image: &str, json: bool) -> Result<()> {
    imaging::ensure_source(image)?;
    let labels = load_labels(config)?;

    let context = InferenceContext::from_config(config)?;
    context
        .sessions()
        .create_session(ModelKind::Classification)
        .await?;
    let result = context.classify_image(image).await?;

    if json {
        let ranked = result
            .top
            .iter()
            .map(|p| LabeledPrediction {
                index: p.index,
                label: labels.get(p.index).map(str::to_string),
                confidence: p.confidence,
            })
            .collect();
        return print_json(&ClassificationReport {
            image,
            label: labels.get(result.index).map(str::to_string),
            result: &result,
            ranked,
        });
    }

    println!(
        "{}: {} ({:.1}%)",
        image,
        labels.name_or_index(result.index),
        result.confidence * 100.0
    );
    for (rank, p) in result.top.iter().enumerate() {
        println!(
            "  {:>2}. {:<40} {:>6.2}%",
            rank + 1,
            labels.name_or_index(p.index),
            p.confidence * 100.0
        );
    }
    println!(
        "Inference: {:.1} ms",
        result.inference_time.as_secs_f64() * 1000.0
    );
    Ok(())
}

#[derive(Serialize)]
struct DetectionReport<'a> {
    image: &'a str,
    threshold: f32,
    #[serde(flatten)]
    result: &'a DetectionResult,
}

async fn detect_command(
    config: &Config,
    image: &str,
    threshold: Option<f32>,
    json: bool,
) -> Result<()> {
    imaging::ensure_source(image)?;

    let context = InferenceContext::from_config(config)?;
    context.sessions().create_session(ModelKind::Detection).await?;
    let result = context.detect_birds(image, threshold).await?;
    let threshold = threshold.unwrap_or(config.detection.threshold);

    if json {
        return print_json(&DetectionReport {
            image,
            threshold,
            result: &result,
        });
    }

    println!(
        "{} ({}x{}): {} bird(s) at threshold {:.2}",
        image,
        result.original_width,
        result.original_height,
        result.boxes.len(),
        threshold
    );
    for b in &result.boxes {
        println!(
            "  [{:>7.1}, {:>7.1}, {:>7.1}, {:>7.1}]  {:>6.0}x{:<6.0} score {:.3}  class {}",
            b.x1(),
            b.y1(),
            b.x2(),
            b.y2(),
            b.width(),
            b.height(),
            b.score(),
            b.class_id()
        );
    }
    println!(
        "Inference: {:.1} ms",
        result.inference_time.as_secs_f64() * 1000.0
    );
    Ok(())
}

async fn warm_command(config: &Config) -> Result<()> {
    let context = InferenceContext::from_config(config)?;
    let readiness = context.initialize().await;

    for kind in ModelKind::ALL {
        match context.sessions().status(kind) {
            SessionStatus::Ready { provider } => println!("{kind}: ready on {provider}"),
            SessionStatus::Failed { reason } => println!("{kind}: failed ({reason})"),
            other => println!("{kind}: {other:?}"),
        }
    }

    readiness.classification.and(readiness.detection)?;
    info!("All sessions ready");
    Ok(())
}

#[derive(Serialize)]
struct ProviderEntry {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    supported: bool,
}

#[derive(Serialize)]
struct ProvidersReport {
    device: InferenceDevice,
    chain: Vec<&'static str>,
    providers: Vec<ProviderEntry>,
}

fn handle_providers_command(config: &Config, json: bool) -> Result<()> {
    let chain = provider_chain(
        config.inference.device,
        config.inference.providers.as_deref(),
    );

    if json {
        return print_json(&ProvidersReport {
            device: config.inference.device,
            chain: chain.iter().map(|p| p.id()).collect(),
            providers: ExecutionProvider::ALL
                .iter()
                .map(|p| {
                    let meta = p.metadata();
                    ProviderEntry {
                        id: meta.id,
                        name: meta.name,
                        description: meta.description,
                        supported: p.supported_on_target(),
                    }
                })
                .collect(),
        });
    }

    println!("Execution providers on this platform:");
    println!();
    for provider in ExecutionProvider::ALL {
        let marker = if provider.supported_on_target() { "✓" } else { "-" };
        println!("  {marker} {}", provider.metadata().description);
    }

    println!();
    println!(
        "Try order (device = {}): {}",
        config.inference.device,
        chain.iter().map(|p| p.id()).collect::<Vec<_>>().join(" → ")
    );
    println!();
    println!("Note: availability is decided when a session is created; a provider");
    println!("      that fails to load falls through to the next one in order.");
    Ok(())
}

fn handle_config_command(action: ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Init => {
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), path)?;
                println!("Created configuration file: {}", path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config_file(path)?;
            if let Err(e) = validate_config(&config) {
                warn!("{e}");
            }
            let text =
                toml::to_string_pretty(&config).map_err(|e| Error::ConfigSerialize { source: e })?;
            print!("{text}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}
