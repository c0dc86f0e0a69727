use finance_planner::server::{router, AppState};
use finance_planner::{MemoryStore, ServiceConfig};
use log::{error, info};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        error!("finance-functions stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> finance_planner::Result<()> {
    let config = ServiceConfig::from_env()?;
    info!(
        "Using gateway {} (chat model {}, vision model {})",
        config.llm_base_url, config.chat_model, config.vision_model
    );

    let bind_address = config.bind_address.clone();
    let state = AppState::new(config, Arc::new(MemoryStore::new()))?;

    let listener = tokio::net::TcpListener::bind(bind_address.as_str()).await?;
    info!("Listening on {}", bind_address);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
