mod cli;

use gifsmith::{
    artifacts,
    config::{self, Config},
    conversion::{self, ConversionRequest, ConversionRequestBuilder, ParamOverrides},
    intake::Intake,
    server,
};
use gifsmith_common::error::ENGINE_LOAD_REMEDIATION;
use gifsmith_common::units::format_bytes;
use gifsmith_engine::{check_tool, EngineHandle, FfmpegEngine, ProgressReporter};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use futures::StreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "gifsmith=trace,gifsmith_engine=trace,gifsmith_common=debug,tower_http=debug"
                .to_string()
        } else {
            "gifsmith=info,gifsmith_engine=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Convert {
            input,
            output,
            quality,
            start,
            duration,
            fps,
            dry_run,
        } => {
            let overrides = ParamOverrides {
                quality,
                start_time: start,
                duration,
                frame_rate: fps,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_file(
                &input,
                output,
                &overrides,
                cli.config.as_deref(),
                dry_run,
            ))
        }
        Commands::Serve { host, port } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;

            // Override host/port from CLI if specified
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            tracing::info!("Starting gifsmith server");
            tracing::info!(
                "Server will listen on {}:{}",
                config.server.host,
                config.server.port
            );

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(server::start_server(config))
        }
        Commands::CheckEngine => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check_engine(cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("gifsmith {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn build_engine(config: &Config) -> Result<Arc<EngineHandle>> {
    let engine = FfmpegEngine::new(config.engine.to_ffmpeg_config())
        .context("Failed to prepare the ffmpeg engine")?;
    Ok(Arc::new(EngineHandle::new(Arc::new(engine))))
}

/// Print percentages from `reporter` to stderr until it is dropped.
fn spawn_progress_printer(
    label: &'static str,
    reporter: &ProgressReporter,
) -> tokio::task::JoinHandle<()> {
    let mut updates = reporter.subscribe();
    tokio::spawn(async move {
        while let Some(pct) = updates.next().await {
            eprint!("\r{}: {}%", label, pct);
            let _ = std::io::stderr().flush();
        }
        eprintln!();
    })
}

async fn convert_file(
    input: &Path,
    output: Option<PathBuf>,
    overrides: &ParamOverrides,
    config_path: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let params = overrides.apply(config.defaults.params())?;
    let instructions = conversion::plan(&params)?;

    let intake = Intake::from_config(&config.intake);
    let (media_type, size) = intake.inspect_file(input).await?;

    tracing::info!("Processing file: {:?}", input);
    println!(
        "File: {} ({}, {})",
        input.display(),
        media_type,
        format_bytes(size)
    );
    println!(
        "Quality: {} (width {}, {} fps)",
        params.quality,
        params.quality.profile().target_width,
        params.quality.profile().target_frame_rate
    );
    println!("Window: {}s from {}s", params.duration, params.start_time);
    println!(
        "Estimated size: at most {}",
        format_bytes(instructions.estimated_max_bytes())
    );

    if dry_run {
        println!("\n[DRY RUN] ffmpeg {}", instructions);
        return Ok(());
    }

    let source = intake.accept_file(input).await?;
    let builder = ConversionRequestBuilder::new(build_engine(&config)?, intake);

    let load_progress = ProgressReporter::new();
    let printer = spawn_progress_printer("Loading engine", &load_progress);
    let loaded = builder.engine().ensure_loaded(&load_progress).await;
    drop(load_progress);
    let _ = printer.await;
    if let Err(e) = loaded {
        print_remediation();
        return Err(e).context("Engine could not be loaded");
    }

    let progress = ProgressReporter::new();
    let printer = spawn_progress_printer("Converting", &progress);
    let result = builder
        .execute_with_progress(ConversionRequest::new(source, params), &progress)
        .await;
    drop(progress);
    let _ = printer.await;
    let result = result?;

    let output = output
        .unwrap_or_else(|| PathBuf::from(artifacts::download_name(chrono::Utc::now())));
    tokio::fs::write(&output, &result.bytes)
        .await
        .with_context(|| format!("Failed to write output file: {:?}", output))?;

    println!("\nConversion complete!");
    println!("Output: {} ({})", output.display(), format_bytes(result.len()));

    Ok(())
}

async fn check_engine(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!("Checking ffmpeg engine...\n");

    let engine = FfmpegEngine::new(config.engine.to_ffmpeg_config())
        .context("Failed to prepare the ffmpeg engine")?;
    let engine = Arc::new(engine);
    let handle = EngineHandle::new(engine.clone());

    let progress = ProgressReporter::new();
    let printer = spawn_progress_printer("Loading engine", &progress);
    let loaded = handle.ensure_loaded(&progress).await;
    drop(progress);
    let _ = printer.await;

    match loaded {
        Ok(()) => {
            let binary = engine
                .binary()
                .context("Engine reported ready without a binary")?;
            let info = check_tool(&binary);
            print!("✓ ffmpeg");
            if let Some(ref version) = info.version {
                print!(" ({})", version.lines().next().unwrap_or(""));
            }
            println!(" - {}", binary.display());
            println!("\nThe engine is ready.");
            Ok(())
        }
        Err(e) => {
            println!("✗ ffmpeg - {}", e);
            print_remediation();
            Err(e).context("Engine could not be loaded")
        }
    }
}

fn print_remediation() {
    eprintln!("\nAlternative options:");
    for hint in ENGINE_LOAD_REMEDIATION {
        eprintln!("  - {}", hint);
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config_summary(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            print_config_summary(&config);
        }
    }

    Ok(())
}

fn print_config_summary(config: &Config) {
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!(
        "  Engine: {}",
        config
            .engine
            .ffmpeg_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "ffmpeg from PATH".to_string())
    );
    println!("  Mirrors: {}", config.engine.mirrors.len());
    println!(
        "  Max upload: {}",
        format_bytes(config.intake.max_payload_bytes)
    );
    println!(
        "  Defaults: {} quality, {}s from {}s at {} fps",
        config.defaults.quality,
        config.defaults.duration,
        config.defaults.start_time,
        config.defaults.frame_rate
    );
}
