use alloy_primitives::address;
use ee_api_types::Address;
use serde::Deserialize;
use tracing::debug;

/// Deployed PropertyRegistry contract on the local development chain.
pub const DEFAULT_CONTRACT_ADDRESS: Address = address!("eEE5aCADD42cd1512d877347E4Ee178bcd42fCC9");

pub const RPC_URL_ENV: &str = "ESTATE_RPC_URL";

/// Where the registry lives. The client performs no discovery; this is the
/// whole of its network configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    pub address: Address,
    pub chain_id: u64,
    pub chain_name: String,
    pub rpc_url: String,
    pub confirmation_poll_ms: u64,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT_ADDRESS,
            chain_id: 1337,
            chain_name: "Ganache Local".to_owned(),
            rpc_url: "http://127.0.0.1:7545".to_owned(),
            confirmation_poll_ms: 1_000,
        }
    }
}

impl ContractConfig {
    /// Defaults, with the RPC endpoint taken from `ESTATE_RPC_URL` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var(RPC_URL_ENV) {
            if !url.trim().is_empty() {
                config.rpc_url = url.trim().trim_end_matches('/').to_owned();
                debug!(rpc_url = %config.rpc_url, "rpc endpoint taken from {RPC_URL_ENV}");
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_local_deployment() {
        let config = ContractConfig::default();
        assert_eq!(config.address.to_checksum(None), "0xeEE5aCADD42cd1512d877347E4Ee178bcd42fCC9");
        assert_eq!(config.chain_id, 0x539);
    }

    #[test]
    fn partial_json_keeps_defaults() -> anyhow::Result<()> {
        let config: ContractConfig = serde_json::from_str(r#"{ "rpc_url": "http://node:8545" }"#)?;
        assert_eq!(config.rpc_url, "http://node:8545");
        assert_eq!(config.address, DEFAULT_CONTRACT_ADDRESS);
        Ok(())
    }

    #[test]
    fn address_override_accepts_lowercase_hex() -> anyhow::Result<()> {
        let config: ContractConfig =
            serde_json::from_str(r#"{ "address": "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed" }"#)?;
        assert_eq!(config.address.to_checksum(None), "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed");
        assert_eq!(config.chain_name, "Ganache Local");
        Ok(())
    }
}
