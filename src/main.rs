use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::Result;
use log::{LevelFilter, debug, info};

use subtitler::config::Config;
use subtitler::server::{self, AppState};
use subtitler::youtube::InnerTubeFetcher;
use subtitler::{SubtitleExtractor, output};

mod cli;

use cli::{Cli, Command, OutputFormat};

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("subtitler.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    let default_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("subtitler")
        .join("logs")
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config.with_env())
}

fn build_extractor(config: &Config) -> Result<SubtitleExtractor> {
    let fetcher = InnerTubeFetcher::new()?;
    Ok(SubtitleExtractor::new(Arc::new(fetcher)).with_default_languages(config.default_languages()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // A missing .env is fine
    let dotenv = dotenvy::dotenv();
    setup_logging(cli.verbose)?;
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Command::Serve { ref bind } => {
            let api_key = config.require_api_key()?;
            let addr = bind.as_deref().unwrap_or_else(|| config.bind_addr());
            let state = AppState::new(build_extractor(&config)?, api_key);
            server::serve(state, addr).await?;
        }
        Command::Extract {
            ref video,
            ref languages,
            format,
            output: ref out_path,
        } => {
            let extractor = build_extractor(&config)?;
            let transcript = extractor.fetch_transcript(video, Some(languages.as_slice())).await?;

            let rendered = match format {
                OutputFormat::Text => output::render_text(&transcript.segments),
                OutputFormat::Json => output::render_json(&transcript)?,
            };

            if let Some(path) = out_path {
                std::fs::write(path, &rendered)?;
                if cli.verbose {
                    eprintln!("Output written to: {}", path.display());
                }
            } else {
                println!("{rendered}");
            }
        }
    }

    Ok(())
}
