use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::SourceBackend;

#[derive(Parser)]
#[command(
    name = "transcript-resolver",
    about = "Transcript Resolver - Fetch YouTube captions as clean plain text",
    version,
    long_about = "Resolves the best caption track of a YouTube video for a list of preferred languages and returns it as normalized plain text, with a stable error vocabulary when that is not possible."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Configuration file (defaults to ./config.yaml, then the user config directory)
    #[arg(long, global = true, value_name = "FILE", env = "TRANSCRIPT_RESOLVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Caption source backend, overriding the configuration
    #[arg(long, global = true, value_enum, env = "TRANSCRIPT_RESOLVER_BACKEND")]
    pub backend: Option<SourceBackend>,

    /// Deadline for one resolution in seconds (0 disables it), overriding the configuration
    #[arg(long, global = true, value_name = "SECS", env = "TRANSCRIPT_RESOLVER_TIMEOUT")]
    pub timeout: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the transcript of one video
    Fetch {
        /// Video id or YouTube URL
        #[arg(value_name = "VIDEO")]
        video: String,

        /// Preferred caption language, most preferred first (repeatable)
        #[arg(short = 'l', long = "lang", value_name = "LANG")]
        languages: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },

    /// Resolve JSON-lines requests from a file or stdin, writing JSON-lines responses to stdout
    Batch {
        /// Input file (reads stdin if not specified)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Maximum concurrent resolutions, overriding the configuration
        #[arg(short, long, value_name = "COUNT")]
        concurrency: Option<usize>,
    },

    /// Liveness probe; never contacts the caption source
    Health,

    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// JSON response object
    Json,
    /// Human-readable text
    Text,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_fetch_collects_languages_in_order() {
        let cli = Cli::try_parse_from([
            "transcript-resolver",
            "fetch",
            "dQw4w9WgXcQ",
            "-l",
            "en-US",
            "--lang",
            "en",
            "--backend",
            "yt-dlp",
        ])
        .unwrap();

        assert_eq!(cli.backend, Some(SourceBackend::YtDlp));
        match cli.command {
            Commands::Fetch { video, languages, format } => {
                assert_eq!(video, "dQw4w9WgXcQ");
                assert_eq!(languages, vec!["en-US", "en"]);
                assert!(matches!(format, OutputFormat::Json));
            }
            _ => panic!("expected fetch"),
        }
    }
}
