//! Resolution of the target network: RPC endpoint, proxy, and the
//! network-specific deposit contract the factory is initialized with

use std::fmt::{self, Display};

use alloy::{primitives::Address, transports::http::reqwest::Url};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{
        ALCHEMY_API_KEY_ENV_VAR, ALCHEMY_MAINNET_URL_PREFIX, GOERLI_ETH_DEPOSIT_ADDRESS,
        GOERLI_RPC_URL_ENV_VAR, LOCAL_RPC_URL, MAINNET_ETH_DEPOSIT_ADDRESS,
    },
    errors::ScriptError,
};

/// The networks the scripts know how to deploy to
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Ethereum mainnet
    Mainnet,
    /// The Goerli test network
    Goerli,
    /// A local development node
    Local,
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Goerli => write!(f, "goerli"),
            Network::Local => write!(f, "local"),
        }
    }
}

impl Network {
    /// The canonical beacon chain deposit contract of this network, if it has one
    pub fn eth_deposit_address(&self) -> Option<Address> {
        match self {
            Network::Mainnet => Some(MAINNET_ETH_DEPOSIT_ADDRESS),
            Network::Goerli => Some(GOERLI_ETH_DEPOSIT_ADDRESS),
            Network::Local => None,
        }
    }

    /// The default RPC URL of this network, read from `env` where it
    /// depends on a secret or deployment-specific value
    fn default_rpc_url(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ScriptError> {
        match self {
            Network::Mainnet => env(ALCHEMY_API_KEY_ENV_VAR)
                .filter(|key| !key.is_empty())
                .map(|key| format!("{ALCHEMY_MAINNET_URL_PREFIX}{key}"))
                .ok_or_else(|| {
                    ScriptError::Configuration(format!(
                        "{ALCHEMY_API_KEY_ENV_VAR} must be set to deploy to {self} without --rpc-url"
                    ))
                }),
            Network::Goerli => env(GOERLI_RPC_URL_ENV_VAR)
                .filter(|url| !url.is_empty())
                .ok_or_else(|| {
                    ScriptError::Configuration(format!(
                        "{GOERLI_RPC_URL_ENV_VAR} must be set to deploy to {self} without --rpc-url"
                    ))
                }),
            Network::Local => Ok(LOCAL_RPC_URL.to_string()),
        }
    }
}

/// A fully resolved target network
#[derive(Clone, Debug)]
pub struct NetworkConfig {
    /// The selected network
    pub network: Network,
    /// The JSON-RPC endpoint
    pub rpc_url: Url,
    /// An optional HTTP proxy all RPC traffic is routed through
    pub http_proxy: Option<Url>,
    /// The deposit contract passed to the factory initializer
    pub eth_deposit_address: Address,
}

impl NetworkConfig {
    /// Resolve a network from CLI overrides, falling back to the process environment
    pub fn resolve(
        network: Network,
        rpc_url: Option<&str>,
        http_proxy: Option<&str>,
        eth_deposit_address: Option<Address>,
    ) -> Result<Self, ScriptError> {
        Self::resolve_with_env(network, rpc_url, http_proxy, eth_deposit_address, |key| {
            std::env::var(key).ok()
        })
    }

    /// Resolve a network, reading environment variables through `env`
    pub fn resolve_with_env(
        network: Network,
        rpc_url: Option<&str>,
        http_proxy: Option<&str>,
        eth_deposit_address: Option<Address>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ScriptError> {
        let rpc_url = match rpc_url {
            Some(url) => url.to_string(),
            None => network.default_rpc_url(env)?,
        };
        // The URL may embed an API key, so it is not echoed back on failure
        let rpc_url = Url::parse(&rpc_url)
            .map_err(|e| ScriptError::Configuration(format!("invalid RPC URL for {network}: {e}")))?;

        let http_proxy = http_proxy
            .map(|proxy| {
                Url::parse(proxy)
                    .map_err(|e| ScriptError::Configuration(format!("invalid HTTP proxy: {e}")))
            })
            .transpose()?;

        let eth_deposit_address = eth_deposit_address
            .or_else(|| network.eth_deposit_address())
            .ok_or_else(|| {
                ScriptError::Configuration(format!(
                    "no deposit contract is known for {network}, pass --eth-deposit-address"
                ))
            })?;

        Ok(Self {
            network,
            rpc_url,
            http_proxy,
            eth_deposit_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::{Network, NetworkConfig};
    use crate::{
        constants::{GOERLI_ETH_DEPOSIT_ADDRESS, MAINNET_ETH_DEPOSIT_ADDRESS},
        errors::ScriptError,
    };

    /// An environment with nothing set
    fn empty_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_mainnet_url_from_api_key() {
        let config = NetworkConfig::resolve_with_env(Network::Mainnet, None, None, None, |key| {
            (key == "ALCHEMY_API_KEY").then(|| "secret".to_string())
        })
        .unwrap();

        assert_eq!(config.rpc_url.as_str(), "https://eth-mainnet.g.alchemy.com/v2/secret");
        assert_eq!(config.eth_deposit_address, MAINNET_ETH_DEPOSIT_ADDRESS);
    }

    #[test]
    fn test_missing_goerli_url() {
        let res = NetworkConfig::resolve_with_env(Network::Goerli, None, None, None, empty_env);
        assert!(matches!(res, Err(ScriptError::Configuration(_))));
    }

    #[test]
    fn test_rpc_url_override() {
        let config = NetworkConfig::resolve_with_env(
            Network::Goerli,
            Some("http://10.0.0.1:8545"),
            Some("http://127.0.0.1:3128"),
            None,
            empty_env,
        )
        .unwrap();

        assert_eq!(config.rpc_url.as_str(), "http://10.0.0.1:8545/");
        assert!(config.http_proxy.is_some());
        assert_eq!(config.eth_deposit_address, GOERLI_ETH_DEPOSIT_ADDRESS);
    }

    #[test]
    fn test_local_requires_deposit_address() {
        let res = NetworkConfig::resolve_with_env(Network::Local, None, None, None, empty_env);
        assert!(matches!(res, Err(ScriptError::Configuration(_))));

        let deposit = Address::repeat_byte(0xdd);
        let config =
            NetworkConfig::resolve_with_env(Network::Local, None, None, Some(deposit), empty_env)
                .unwrap();
        assert_eq!(config.eth_deposit_address, deposit);
    }

    #[test]
    fn test_invalid_rpc_url() {
        let res = NetworkConfig::resolve_with_env(
            Network::Local,
            Some("not a url"),
            None,
            Some(Address::ZERO),
            empty_env,
        );
        assert!(matches!(res, Err(ScriptError::Configuration(_))));
    }
}
