use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "subtitler",
    about = "YouTube subtitle extraction service",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Config file (defaults to ~/.config/subtitler/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:8000
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Fetch subtitles for one video and print them
    Extract {
        /// YouTube video URL or video ID
        video: String,

        /// Preferred caption language, in priority order (repeatable)
        #[arg(short, long = "lang")]
        languages: Vec<String>,

        /// Output format: text (default), json
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write output to file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_extract() {
        let cli = Cli::try_parse_from(["subtitler", "extract", "dQw4w9WgXcQ", "-l", "es", "-l", "en", "-f", "json"])
            .unwrap();
        match cli.command {
            Command::Extract {
                video,
                languages,
                format,
                output,
            } => {
                assert_eq!(video, "dQw4w9WgXcQ");
                assert_eq!(languages, vec!["es", "en"]);
                assert_eq!(format, OutputFormat::Json);
                assert!(output.is_none());
            }
            Command::Serve { .. } => panic!("expected extract"),
        }
    }

    #[test]
    fn test_parse_serve_with_global_flags() {
        let cli = Cli::try_parse_from(["subtitler", "serve", "--bind", "0.0.0.0:9000", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Serve { bind: Some(ref b) } if b == "0.0.0.0:9000"));
    }
}
