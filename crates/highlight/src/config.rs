//! Ledger configuration, loaded from TOML.
//!
//! ```toml
//! rpc_timeout_secs = 10
//!
//! [storage]
//! type = "sqlite"
//! path = "highlight.db"
//!
//! [evm_rpc]
//! 1 = "https://eth.example.org"
//!
//! [starknet_rpc]
//! SN_MAIN = "https://starknet.example.org"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use highlight_store::{Adapter, MemoryAdapter, RedisAdapter, SqliteAdapter};
use highlight_verify::{
    EvmRpcCaller, JsonRpcClient, Providers, SignatureVerifier, StarknetRpcCaller,
};
use serde::Deserialize;

use crate::error::{HighlightError, Result};

/// Which adapter backs the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    #[default]
    Memory,
    Sqlite {
        path: PathBuf,
    },
    Redis {
        url: String,
        #[serde(default = "default_heartbeat_secs")]
        heartbeat_secs: u64,
    },
}

fn default_heartbeat_secs() -> u64 {
    10
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub storage: StorageConfig,
    /// EVM chain id -> JSON-RPC URL, for contract wallets.
    pub evm_rpc: BTreeMap<String, String>,
    /// Starknet chain id (`SN_MAIN` or hex) -> JSON-RPC URL.
    pub starknet_rpc: BTreeMap<String, String>,
    pub rpc_timeout_secs: u64,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            evm_rpc: BTreeMap::new(),
            starknet_rpc: BTreeMap::new(),
            rpc_timeout_secs: 10,
        }
    }
}

impl HighlightConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| HighlightError::Config(e.to_string()))
    }

    /// Read and parse the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| HighlightError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Open the configured adapter.
    pub async fn open_adapter(&self) -> Result<Arc<dyn Adapter>> {
        let adapter: Arc<dyn Adapter> = match &self.storage {
            StorageConfig::Memory => Arc::new(MemoryAdapter::new()),
            StorageConfig::Sqlite { path } => Arc::new(SqliteAdapter::open(path)?),
            StorageConfig::Redis {
                url,
                heartbeat_secs,
            } => {
                let adapter = RedisAdapter::connect(url).await?;
                Arc::new(adapter.with_heartbeat(Duration::from_secs((*heartbeat_secs).max(1))))
            }
        };
        tracing::info!(storage = ?self.storage, "adapter opened");
        Ok(adapter)
    }

    /// A verifier with one caller per configured chain.
    pub fn build_verifier(&self) -> Result<SignatureVerifier> {
        let timeout = Duration::from_secs(self.rpc_timeout_secs);
        let client = |url: &str| {
            JsonRpcClient::with_timeout(url, timeout)
                .map_err(|e| HighlightError::Config(format!("{url}: {e}")))
        };

        let mut providers = Providers::new();
        for (chain, url) in &self.evm_rpc {
            let chain_id = parse_evm_chain(chain)?;
            providers.add_evm(chain_id, EvmRpcCaller::from_client(client(url.as_str())?));
        }
        for (chain, url) in &self.starknet_rpc {
            providers
                .add_starknet(chain, StarknetRpcCaller::from_client(client(url.as_str())?))
                .ok_or_else(|| HighlightError::Config(format!("invalid starknet chain id {chain}")))?;
        }
        Ok(SignatureVerifier::new(providers))
    }
}

fn parse_evm_chain(chain: &str) -> Result<u64> {
    let parsed = match chain.strip_prefix("0x") {
        Some(digits) => u64::from_str_radix(digits, 16).ok(),
        None => chain.parse().ok(),
    };
    parsed.ok_or_else(|| HighlightError::Config(format!("invalid evm chain id {chain}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use highlight_core::NumberOrString;

    #[test]
    fn test_defaults() {
        let config = HighlightConfig::from_toml_str("").unwrap();
        assert_eq!(config, HighlightConfig::default());
        assert_eq!(config.storage, StorageConfig::Memory);
        assert_eq!(StorageConfig::default(), StorageConfig::Memory);
    }

    #[test]
    fn test_full_file() {
        let config = HighlightConfig::from_toml_str(
            r#"
            rpc_timeout_secs = 3

            [storage]
            type = "redis"
            url = "redis://127.0.0.1/"

            [evm_rpc]
            1 = "http://127.0.0.1:8545"
            "0xa" = "http://127.0.0.1:8546"

            [starknet_rpc]
            SN_MAIN = "http://127.0.0.1:5050"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.storage,
            StorageConfig::Redis {
                url: "redis://127.0.0.1/".into(),
                heartbeat_secs: 10
            }
        );
        assert_eq!(config.rpc_timeout_secs, 3);

        let verifier = config.build_verifier().unwrap();
        let providers = verifier.providers();
        assert!(providers.evm(&NumberOrString::Number(1)).is_some());
        assert!(providers.evm(&NumberOrString::Number(10)).is_some());
        assert!(providers.starknet(&"0x534e5f4d41494e".into()).is_some());
    }

    #[test]
    fn test_bad_chain_id() {
        let config = HighlightConfig::from_toml_str(
            r#"
            [evm_rpc]
            mainnet = "http://127.0.0.1:8545"
            "#,
        )
        .unwrap();
        assert!(matches!(config.build_verifier(), Err(HighlightError::Config(_))));
    }

    #[test]
    fn test_unknown_storage_type() {
        let result = HighlightConfig::from_toml_str("[storage]\ntype = \"etcd\"\n");
        assert!(matches!(result, Err(HighlightError::Config(_))));
    }

    #[tokio::test]
    async fn test_open_sqlite_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let config = HighlightConfig {
            storage: StorageConfig::Sqlite {
                path: dir.path().join("ledger.db"),
            },
            ..Default::default()
        };

        let adapter = config.open_adapter().await.unwrap();
        adapter.set("k", serde_json::json!(1)).await.unwrap();
        assert_eq!(adapter.get("k").await.unwrap(), Some(serde_json::json!(1)));
    }
}
