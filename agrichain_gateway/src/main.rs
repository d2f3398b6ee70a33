use agrichain_gateway::api::start_server;
use agrichain_gateway::config::{Args, GatewayConfig};
use anyhow::Result;
use clap::Parser;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = GatewayConfig::from(Args::parse());

    info!("Starting AgriChain Gateway...");
    info!("Environment: {:?}", config.environment);
    info!("Network: {} (chain id {})", config.chain.network.name(), config.chain.network.chain_id());
    info!("Chain RPC: {}", config.chain.rpc_url);
    info!("Storage gateway: {}", config.storage.gateway_url);
    info!("Allowed origin: {}", config.frontend_url);

    start_server(config).await
}
