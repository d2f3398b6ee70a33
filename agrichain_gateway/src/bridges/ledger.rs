//! Chain ledger description and RPC health check
//!
//! The registry contract is the authority for farmer, crop and supply-chain
//! anchors. This client only knows the call shapes and can ask the RPC
//! node for its head block.

use crate::config::ChainConfig;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use sha3::{Digest, Keccak256};
use std::time::Duration;

const RPC_TIMEOUT: Duration = Duration::from_secs(5);

/// One registry contract entry point
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct LedgerCall {
    pub name: &'static str,
    pub signature: &'static str,
    pub view: bool,
}

pub const LEDGER_CALLS: &[LedgerCall] = &[
    LedgerCall {
        name: "registerFarmer",
        signature: "registerFarmer(string,string,string)",
        view: false,
    },
    LedgerCall {
        name: "registerCrop",
        signature: "registerCrop(string,string,string)",
        view: false,
    },
    LedgerCall {
        name: "createSupplyChain",
        signature: "createSupplyChain(string,string,string)",
        view: false,
    },
    LedgerCall {
        name: "updateSupplyChain",
        signature: "updateSupplyChain(string,string)",
        view: false,
    },
    LedgerCall {
        name: "getFarmer",
        signature: "getFarmer(address)",
        view: true,
    },
];

impl LedgerCall {
    pub fn selector(&self) -> String {
        function_selector(self.signature)
    }
}

/// `0x` plus the first four bytes of keccak-256 over the signature
pub fn function_selector(signature: &str) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(signature.as_bytes());
    let hash = hasher.finalize();
    format!("0x{}", hex::encode(&hash[..4]))
}

/// Entry exposed on `/network/info`
#[derive(Debug, Clone, Serialize)]
pub struct LedgerCallInfo {
    pub name: &'static str,
    pub signature: &'static str,
    pub selector: String,
    pub view: bool,
}

pub struct LedgerClient {
    client: reqwest::Client,
    chain: ChainConfig,
}

impl LedgerClient {
    pub fn new(chain: ChainConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .context("building RPC client")?;
        Ok(Self { client, chain })
    }

    pub fn chain(&self) -> &ChainConfig {
        &self.chain
    }

    pub fn interface(&self) -> Vec<LedgerCallInfo> {
        LEDGER_CALLS
            .iter()
            .map(|call| LedgerCallInfo {
                name: call.name,
                signature: call.signature,
                selector: call.selector(),
                view: call.view,
            })
            .collect()
    }

    /// Head block reported by the configured RPC node
    pub async fn block_number(&self) -> Result<u64> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "eth_blockNumber",
            "params": [],
            "id": 1
        });

        let response = self
            .client
            .post(&self.chain.rpc_url)
            .json(&payload)
            .send()
            .await
            .context("RPC call failed")?;

        let body: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse RPC response")?;

        if let Some(error) = body.get("error") {
            return Err(anyhow!("RPC error: {}", error));
        }

        let result = body["result"]
            .as_str()
            .ok_or_else(|| anyhow!("No result in response"))?;
        parse_quantity(result)
    }

    /// `true` when the RPC node answers `eth_blockNumber`
    pub async fn is_reachable(&self) -> bool {
        match self.block_number().await {
            Ok(block) => {
                log::debug!("{} head block {}", self.chain.network.name(), block);
                true
            }
            Err(e) => {
                log::warn!("Chain RPC {} unreachable: {:#}", self.chain.rpc_url, e);
                false
            }
        }
    }
}

/// Decode a JSON-RPC hex quantity such as `0x1b4`
fn parse_quantity(raw: &str) -> Result<u64> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("quantity {} lacks 0x prefix", raw))?;
    u64::from_str_radix(digits, 16).with_context(|| format!("invalid quantity {}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;

    #[test]
    fn test_function_selector() {
        // ERC-20 transfer, a well-known selector
        assert_eq!(function_selector("transfer(address,uint256)"), "0xa9059cbb");
        assert_eq!(function_selector("balanceOf(address)"), "0x70a08231");
    }

    #[test]
    fn test_selectors_are_distinct() {
        let mut selectors: Vec<String> = LEDGER_CALLS.iter().map(LedgerCall::selector).collect();
        selectors.sort();
        selectors.dedup();
        assert_eq!(selectors.len(), LEDGER_CALLS.len());
        assert!(selectors.iter().all(|s| s.len() == 10));
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert!(parse_quantity("1b4").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_rpc_reports_false() {
        let client = LedgerClient::new(ChainConfig {
            network: Network::Testnet,
            rpc_url: "http://127.0.0.1:9".to_string(),
            contract_address: "0x0000000000000000000000000000000000000000".to_string(),
        })
        .unwrap();

        assert!(!client.is_reachable().await);
        assert_eq!(client.interface().len(), LEDGER_CALLS.len());
    }
}
