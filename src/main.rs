//! vidlore CLI entry point.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vidlore::cli::commands::{self, IngestOverrides};
use vidlore::cli::{Cli, Commands};
use vidlore::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load_from(cli.config.as_ref())?;

    // -v flags win over the configured level; RUST_LOG wins over both
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("vidlore={}", log_level)),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    std::fs::create_dir_all(settings.temp_dir())?;

    match cli.command {
        Commands::Ingest {
            path,
            output,
            interval,
            max_frames,
            window,
            no_captions,
        } => {
            let overrides = IngestOverrides {
                interval,
                max_frames,
                window,
                no_captions,
            };
            commands::run_ingest(&path, output, overrides, settings).await?;
        }

        Commands::Sample {
            video,
            out_dir,
            interval,
            max_frames,
        } => {
            commands::run_sample(&video, &out_dir, interval, max_frames, settings).await?;
        }

        Commands::Transcribe {
            video,
            output,
            format,
        } => {
            commands::run_transcribe(&video, output, &format, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, settings, cli.config.as_deref())?;
        }
    }

    Ok(())
}
