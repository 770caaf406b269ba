use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tokio::io::{AsyncBufRead, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transcript_resolver::config::SourceBackend;
use transcript_resolver::{
    batch, captions, output, Cli, Commands, Config, HealthResponse, ResolutionService,
    TranscriptResponse,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let config_path = cli.config.as_deref();

    match cli.command {
        // The liveness probe must not depend on configuration or the caption source
        Commands::Health => {
            println!("{}", serde_json::to_string(&HealthResponse::ok())?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { show, init } => run_config(config_path, show, init),
        Commands::Fetch {
            video,
            languages,
            format,
        } => {
            let config = load_config(config_path, cli.backend, cli.timeout)?;
            let service = build_service(&config).await?;

            let interrupted = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };

            let outcome = service.resolve_until(&video, &languages, interrupted).await;
            let response = TranscriptResponse::from(outcome);
            output::print_to_console(&response, &format)?;

            Ok(if response.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Batch { input, concurrency } => {
            let config = load_config(config_path, cli.backend, cli.timeout)?;
            let service = build_service(&config).await?;

            let reader: Box<dyn AsyncBufRead + Unpin + Send> = match input {
                Some(path) => Box::new(BufReader::new(
                    fs_err::tokio::File::open(&path)
                        .await
                        .context("Failed to open batch input")?,
                )),
                None => Box::new(BufReader::new(tokio::io::stdin())),
            };

            let concurrency = concurrency.unwrap_or(config.service.max_concurrent_requests);
            let summary =
                batch::run_batch(&service, reader, tokio::io::stdout(), concurrency, !cli.quiet).await?;

            tracing::info!(
                "Batch finished: {} request(s), {} succeeded, {} failed",
                summary.total,
                summary.succeeded,
                summary.failed
            );

            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load configuration and apply command-line overrides
fn load_config(path: Option<&Path>, backend: Option<SourceBackend>, timeout: Option<u64>) -> Result<Config> {
    let mut config = Config::load(path)?;

    if let Some(backend) = backend {
        config.source.backend = backend;
    }
    if let Some(timeout) = timeout {
        config.service.resolve_timeout_secs = timeout;
    }

    config.validate()?;
    Ok(config)
}

async fn build_service(config: &Config) -> Result<ResolutionService> {
    let source = captions::build_source(&config.source).await?;
    ResolutionService::from_config(source, config)
}

fn run_config(explicit: Option<&Path>, show: bool, init: bool) -> Result<ExitCode> {
    if init {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Config::config_path().context("Could not determine config directory")?,
        };

        if path.exists() {
            anyhow::bail!("Config file already exists: {}", path.display());
        }

        Config::default().save(&path)?;
        println!("Configuration written to: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = Config::load(explicit)?;
    if show {
        config.display();
    } else {
        match explicit.map(Path::to_path_buf).or_else(Config::config_path) {
            Some(path) => println!("Config file: {}", path.display()),
            None => println!("No config directory available; using defaults"),
        }
        println!("Run with --show to print the active configuration or --init to create a file.");
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbose: bool, log_json: bool) {
    let default_filter = if verbose {
        "transcript_resolver=debug"
    } else {
        "transcript_resolver=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(log_json.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}
