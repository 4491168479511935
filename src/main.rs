//! stowage command-line interface.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use stowage::constants;

#[derive(Parser)]
#[command(name = "stowage", version, about = "Typed key-value storage over volatile and durable backends")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = constants::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reference key-value service
    Serve {
        /// Listen address (overrides server.listen)
        #[arg(long)]
        listen: Option<String>,
        /// Database file (overrides server.data_path)
        #[arg(long)]
        data: Option<PathBuf>,
        /// Prometheus scrape address (overrides server.metrics_listen)
        #[arg(long)]
        metrics_listen: Option<String>,
    },
    /// Print the JSON value stored under a key
    Get {
        key: String,
        #[command(flatten)]
        opts: commands::kv::OpOptions,
    },
    /// Store a JSON value under a key
    Put {
        key: String,
        /// Value as JSON (e.g. '"text"', '42', '{"a":1}')
        value: String,
        #[command(flatten)]
        opts: commands::kv::OpOptions,
    },
    /// Remove a key
    Delete {
        key: String,
        #[command(flatten)]
        opts: commands::kv::OpOptions,
    },
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stowage=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Serve {
            listen,
            data,
            metrics_listen,
        } => {
            commands::serve::execute(
                &cli.config,
                commands::serve::Overrides {
                    listen,
                    data,
                    metrics_listen,
                },
            )
            .await
        },
        Commands::Get { key, opts } => commands::kv::get(&cli.config, &key, &opts).await,
        Commands::Put { key, value, opts } => {
            commands::kv::put(&cli.config, &key, &value, &opts).await
        },
        Commands::Delete { key, opts } => commands::kv::delete(&cli.config, &key, &opts).await,
    }
}
