use git_gateway::config::AppConfig;
use git_gateway::http::HttpServer;
use git_gateway::serve::AppCore;
use log::{error, info};
use tokio::select;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Loads `config.toml` (or `$CONFIG_FILE`), sets up logging from `RUST_LOG` and serves
/// the smart HTTP endpoints until the server stops or CTRL+C is received.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenv::dotenv().ok();
    let tracing_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(EnvFilter::new(tracing_level));
    tracing_subscriber::registry().with(fmt_layer).init();

    let config = AppConfig::load()?;
    let core = AppCore::from_config(&config)?;
    info!(
        "serving repositories from {} as {}",
        core.locator.root().display(),
        config.git.binary
    );
    let server = HttpServer::new(&config.http, core);
    select! {
        res = server.run() => {
            if let Err(e) = res {
                error!("HTTP server error: {}", e);
            } else {
                info!("HTTP server exited.");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }
    Ok(())
}
