//! `evalrs-host` — boots one artifact and evaluates expressions through it.
//!
//! ```text
//! evalrs-host --config evalrs.toml "z*z + c" "1+2"
//! ```
//!
//! Set `RUST_LOG=debug` to trace the loader's state transitions.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evalrs_runtime::{FileSource, HostSession, LoadState, LoaderConfig};

#[derive(Parser)]
#[command(name = "evalrs-host")]
#[command(version, about = "Boot an evaluation module and call its entry point", long_about = None)]
struct Cli {
    /// Loader configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Artifact path, overriding the configuration
    #[arg(short, long)]
    artifact: Option<PathBuf>,

    /// Expressions to evaluate once the module is ready
    expressions: Vec<String>,
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match LoaderConfig::from_file(path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("{}", err);
                return ExitCode::from(2);
            }
        },
        None => LoaderConfig::default(),
    };
    if let Some(artifact) = cli.artifact {
        config.artifact = artifact;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("failed to start runtime: {}", err);
            return ExitCode::from(2);
        }
    };

    let mut session = HostSession::new(&config);
    let source = FileSource::from_config(&config);
    let state = runtime.block_on(session.boot(&source));

    // Evaluate even after a failed boot: the caller sees the same
    // "not defined" error a host page would.
    for expression in &cli.expressions {
        match session.evaluate(expression) {
            Ok(value) => match serde_json::to_string(&value) {
                Ok(json) => println!("{}", json),
                Err(_) => println!("{}", value),
            },
            Err(err) => eprintln!("{}: {}", expression, err),
        }
    }

    if state == LoadState::Ready {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
