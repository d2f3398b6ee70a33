//! Gateway configuration
//!
//! Everything process-wide (storage credential, chain RPC endpoint, contract
//! address, CORS origin) is read once at startup into an immutable
//! [`GatewayConfig`] and handed to every component by reference.

use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::time::Duration;

/// Chain network the gateway reports and health-checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 314,
            Network::Testnet => 314159,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }
}

/// Runtime environment; controls how much internal detail error responses carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

/// AgriChain Gateway Arguments
#[derive(Parser, Debug, Clone)]
#[clap(name = "agrichain-gateway")]
#[clap(about = "AgriChain Gateway - farmer records, wallet auth and content-addressed uploads")]
pub struct Args {
    /// Port to listen on
    #[clap(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Runtime environment
    #[clap(long, env = "APP_ENV", value_enum, default_value = "development")]
    pub environment: Environment,

    /// Allowed cross-origin caller
    #[clap(long, env = "FRONTEND_URL", default_value = "http://localhost:3000")]
    pub frontend_url: String,

    /// Bearer credential for the storage gateway
    #[clap(long, env = "LIGHTHOUSE_API_KEY", default_value = "", hide_env_values = true)]
    pub lighthouse_api_key: String,

    /// Storage add-endpoint
    #[clap(
        long,
        env = "LIGHTHOUSE_UPLOAD_URL",
        default_value = "https://node.lighthouse.storage/api/v0/add"
    )]
    pub lighthouse_upload_url: String,

    /// Storage account API base
    #[clap(long, env = "LIGHTHOUSE_API_URL", default_value = "https://api.lighthouse.storage")]
    pub lighthouse_api_url: String,

    /// Public gateway serving blobs by content id
    #[clap(
        long,
        env = "LIGHTHOUSE_GATEWAY_URL",
        default_value = "https://gateway.lighthouse.storage/ipfs"
    )]
    pub lighthouse_gateway_url: String,

    /// Upper bound for any single storage request
    #[clap(long, env = "STORAGE_TIMEOUT_SECS", default_value = "60")]
    pub storage_timeout_secs: u64,

    /// Which chain network to use
    #[clap(long, env = "NETWORK", value_enum, default_value = "testnet")]
    pub network: Network,

    #[clap(long, env = "MAINNET_RPC_URL", default_value = "https://api.node.glif.io/rpc/v1")]
    pub mainnet_rpc_url: String,

    #[clap(
        long,
        env = "TESTNET_RPC_URL",
        default_value = "https://api.calibration.node.glif.io/rpc/v1"
    )]
    pub testnet_rpc_url: String,

    /// Ledger contract address
    #[clap(
        long,
        env = "CONTRACT_ADDRESS",
        default_value = "0x0000000000000000000000000000000000000000"
    )]
    pub contract_address: String,

    /// Maximum accepted request body for uploads, in bytes
    #[clap(long, env = "MAX_UPLOAD_BYTES", default_value = "104857600")]
    pub max_upload_bytes: usize,
}

/// Storage gateway settings
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub api_key: String,
    pub upload_url: String,
    pub api_url: String,
    pub gateway_url: String,
    pub timeout: Duration,
}

impl StorageConfig {
    /// Public URL for a content id
    pub fn access_url(&self, content_id: &str) -> String {
        format!("{}/{}", self.gateway_url.trim_end_matches('/'), content_id)
    }
}

/// Chain settings
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub network: Network,
    pub rpc_url: String,
    pub contract_address: String,
}

/// Immutable gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub environment: Environment,
    pub frontend_url: String,
    pub max_upload_bytes: usize,
    pub storage: StorageConfig,
    pub chain: ChainConfig,
}

impl GatewayConfig {
    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    /// Whether the storage credential is present at all
    pub fn has_storage_credential(&self) -> bool {
        !self.storage.api_key.trim().is_empty()
    }
}

impl From<Args> for GatewayConfig {
    fn from(args: Args) -> Self {
        let rpc_url = match args.network {
            Network::Mainnet => args.mainnet_rpc_url,
            Network::Testnet => args.testnet_rpc_url,
        };

        Self {
            port: args.port,
            environment: args.environment,
            frontend_url: args.frontend_url,
            max_upload_bytes: args.max_upload_bytes,
            storage: StorageConfig {
                api_key: args.lighthouse_api_key,
                upload_url: args.lighthouse_upload_url,
                api_url: args.lighthouse_api_url,
                gateway_url: args.lighthouse_gateway_url,
                timeout: Duration::from_secs(args.storage_timeout_secs),
            },
            chain: ChainConfig {
                network: args.network,
                rpc_url,
                contract_address: args.contract_address,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            port: 5000,
            environment: Environment::Development,
            frontend_url: "http://localhost:3000".into(),
            lighthouse_api_key: String::new(),
            lighthouse_upload_url: "https://upload.test/api/v0/add".into(),
            lighthouse_api_url: "https://api.test".into(),
            lighthouse_gateway_url: "https://gw.example/ipfs/".into(),
            storage_timeout_secs: 5,
            network: Network::Testnet,
            mainnet_rpc_url: "https://mainnet.test/rpc".into(),
            testnet_rpc_url: "https://testnet.test/rpc".into(),
            contract_address: "0x0000000000000000000000000000000000000000".into(),
            max_upload_bytes: 1024,
        }
    }

    #[test]
    fn test_network_selects_rpc_url() {
        let config = GatewayConfig::from(Args {
            network: Network::Mainnet,
            ..args()
        });
        assert_eq!(config.chain.network, Network::Mainnet);
        assert_eq!(config.chain.rpc_url, "https://mainnet.test/rpc");
        assert_eq!(config.chain.network.chain_id(), 314);

        let config = GatewayConfig::from(args());
        assert_eq!(config.chain.rpc_url, "https://testnet.test/rpc");
        assert_eq!(config.chain.network.chain_id(), 314159);
    }

    #[test]
    fn test_access_url_joins_gateway() {
        let config = GatewayConfig::from(args());
        assert_eq!(config.storage.access_url("bafy123"), "https://gw.example/ipfs/bafy123");
        assert_eq!(config.storage.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_explicit_flags_are_parsed() {
        let args = Args::try_parse_from([
            "agrichain-gateway",
            "--environment",
            "production",
            "--network",
            "mainnet",
            "--port",
            "8080",
        ])
        .unwrap();
        assert_eq!(args.environment, Environment::Production);
        assert_eq!(args.network, Network::Mainnet);
        assert_eq!(args.port, 8080);
        assert!(!GatewayConfig::from(args).is_development());
    }
}
