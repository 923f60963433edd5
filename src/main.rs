use clap::{Parser, Subcommand};
use listening_pipeline::app::ports::CredentialProvider;
use listening_pipeline::infra::{EnvTokenProvider, StaticTokenProvider};
use listening_pipeline::{logging, Orchestrator, PipelineConfig, RunStatus};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "listening-pipeline")]
#[command(about = "Fold new listening-history batches into the cumulative dataset")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Directory for rotated JSON logs
    #[arg(long, global = true, default_value = "logs")]
    log_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every new batch and print the run outcome as JSON
    Run {
        /// Bearer token for the metadata service (otherwise read from the configured env var)
        #[arg(long)]
        token: Option<String>,
    },
    /// List batch ids that have not been processed yet
    Pending,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let log_guard = logging::init_logging(&cli.log_dir);

    let config = PipelineConfig::load(&cli.config)?;
    info!(
        source = %config.storage.source_root.display(),
        dest = %config.storage.dest_root.display(),
        "Loaded configuration"
    );

    match cli.command {
        Commands::Run { token } => {
            let credentials: Arc<dyn CredentialProvider> = match token {
                Some(token) => Arc::new(StaticTokenProvider::new(token)),
                None => Arc::new(EnvTokenProvider::new(config.metadata.token_env.clone())),
            };
            let orchestrator = Orchestrator::from_config(&config, credentials)?;
            let outcome = orchestrator.invoke().await;
            println!("{}", serde_json::to_string(&outcome)?);
            if outcome.status == RunStatus::Failed {
                drop(log_guard);
                std::process::exit(1);
            }
        }
        Commands::Pending => {
            // No token needed to list batches
            let credentials = Arc::new(StaticTokenProvider::new(""));
            let orchestrator = Orchestrator::from_config(&config, credentials)?;
            for id in orchestrator.pending().await? {
                println!("{}", id);
            }
        }
    }

    Ok(())
}
