mod server_config;
mod spectator_task;
mod web_server;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use common::config::ConfigManager;
use common::context::AppContext;
use common::games::SessionRng;
use common::store::{FileStore, KeyValueStore, MemoryStore};
use common::{error_log, log, logger};
use server_config::{DEFAULT_CONFIG_PATH, ServerConfig};
use spectator_task::SpectatorTask;

#[derive(Parser)]
#[command(name = "snake_arcade_server")]
struct Args {
    #[arg(long)]
    use_log_prefix: bool,

    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Fixes the random seed for food, bots and names.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let prefix = if args.use_log_prefix {
        Some("Server".to_string())
    } else {
        None
    };
    logger::init_logger(prefix);

    let config_manager: ConfigManager<_, ServerConfig> =
        ConfigManager::from_yaml_file(&args.config);
    let config = config_manager.get_config()?;
    log!("Loaded config from {}", args.config.display());

    let store: Arc<dyn KeyValueStore> = match config.store.data_file {
        Some(ref path) => {
            log!("Persisting sessions and high scores to {}", path.display());
            Arc::new(FileStore::open(path)?)
        }
        None => Arc::new(MemoryStore::new()),
    };

    let rng = args.seed.map(SessionRng::new).unwrap_or_else(SessionRng::from_entropy);
    let context = AppContext::init(config.context_config(), store, rng);

    let spectator_task = SpectatorTask::new(Arc::clone(&context));
    tokio::spawn(async move {
        spectator_task.run().await;
    });

    let addr = config.socket_addr()?;
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error_log!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        log!("Shutdown signal received");
    };

    web_server::run_web_server(context, addr, shutdown_signal).await?;

    log!("Server shut down gracefully");

    Ok(())
}
