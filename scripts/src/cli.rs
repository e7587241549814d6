//! Definitions of CLI arguments and commands for deploy scripts

use std::path::PathBuf;

use alloy::primitives::Address;
use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{deploy_network_command, verify_network_command},
    config::{Network, NetworkConfig},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_NUM_CONFIRMATIONS, DEPLOYER_KEY_ENV_VAR,
        FACTORY_ADMIN_KEY_ENV_VAR, HTTP_PROXY_ENV_VAR,
    },
    errors::ScriptError,
    utils::parse_address,
};

/// Deploys and initializes the LSD network factory
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// The network to operate on
    #[command(flatten)]
    pub network: NetworkArgs,

    /// A file of environment variables loaded before the arguments are parsed
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Arguments selecting the network and how it is reached
#[derive(Args)]
pub struct NetworkArgs {
    /// The network to operate on. Defaults to `local` for deployments and to the
    /// recorded network for verification
    #[arg(long, global = true, value_enum, env = "DEPLOY_NETWORK")]
    pub network: Option<Network>,

    /// Network RPC URL, overriding the network's default endpoint
    #[arg(long, global = true, env = "RPC_URL", hide_env_values = true)]
    pub rpc_url: Option<String>,

    /// An HTTP proxy to route RPC traffic through
    #[arg(long, global = true, env = HTTP_PROXY_ENV_VAR)]
    pub http_proxy: Option<String>,
}

impl NetworkArgs {
    /// The network to operate on, falling back to `recorded` when none was
    /// selected. A selection that disagrees with `recorded` is an error
    pub fn select(&self, recorded: Option<Network>) -> Result<Network, ScriptError> {
        match (self.network, recorded) {
            (Some(selected), Some(recorded)) if selected != recorded => {
                Err(ScriptError::Configuration(format!(
                    "network {selected} does not match the recorded network {recorded}"
                )))
            }
            (Some(network), _) | (None, Some(network)) => Ok(network),
            (None, None) => Ok(Network::Local),
        }
    }

    /// Resolve the selected network, with an optional override of its deposit contract
    pub fn resolve(
        &self,
        recorded: Option<Network>,
        eth_deposit_address: Option<Address>,
    ) -> Result<NetworkConfig, ScriptError> {
        NetworkConfig::resolve(
            self.select(recorded)?,
            self.rpc_url.as_deref(),
            self.http_proxy.as_deref(),
            eth_deposit_address,
        )
    }
}

/// The commands the scripts can run
#[derive(Subcommand)]
pub enum Command {
    /// Deploy the logic contracts and the factory proxy, then initialize the factory
    DeployNetwork(DeployNetworkArgs),
    /// Check a recorded deployment against on-chain state
    VerifyNetwork(VerifyNetworkArgs),
}

impl Command {
    /// Run the command against the selected network
    pub async fn run(self, network: &NetworkArgs) -> Result<(), ScriptError> {
        match self {
            Command::DeployNetwork(args) => {
                let config = network.resolve(None, args.eth_deposit_address)?;
                deploy_network_command(args, config).await
            }
            Command::VerifyNetwork(args) => verify_network_command(args, network).await,
        }
    }
}

/// Deploy and initialize a new network factory
#[derive(Args)]
pub struct DeployNetworkArgs {
    /// Private key of the deployer, which signs every transaction
    #[arg(long, env = DEPLOYER_KEY_ENV_VAR, hide_env_values = true)]
    pub deployer_key: Option<String>,

    /// Private key of the factory admin
    #[arg(long, env = FACTORY_ADMIN_KEY_ENV_VAR, hide_env_values = true)]
    pub factory_admin_key: Option<String>,

    /// Directory holding the compiled contract artifacts
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: PathBuf,

    /// Beacon chain deposit contract, required on networks without a known one
    #[arg(long, value_parser = parse_address)]
    pub eth_deposit_address: Option<Address>,

    /// Number of confirmations to wait for on each transaction
    #[arg(long, default_value_t = DEFAULT_NUM_CONFIRMATIONS)]
    pub confirmations: u64,

    /// File to record the deployed addresses in
    #[arg(long)]
    pub deployments_path: Option<PathBuf>,
}

/// Verify a recorded network factory deployment
#[derive(Args)]
pub struct VerifyNetworkArgs {
    /// The deployments file written by `deploy-network`
    #[arg(long)]
    pub deployments_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;
    use clap::{CommandFactory, Parser};

    use super::{Cli, Command, NetworkArgs};
    use crate::{config::Network, errors::ScriptError};

    /// Network arguments selecting `network`, if any
    fn network_args(network: Option<Network>) -> NetworkArgs {
        NetworkArgs {
            network,
            rpc_url: None,
            http_proxy: None,
        }
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_deploy_network() {
        let cli = Cli::try_parse_from([
            "deploy",
            "--network",
            "goerli",
            "deploy-network",
            "--eth-deposit-address",
            "0xff50ed3d0ec03ac01d4c79aad74928bff48a7b2b",
            "--confirmations",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.network.network, Some(Network::Goerli));
        match cli.command {
            Command::DeployNetwork(args) => {
                assert_eq!(args.confirmations, 3);
                assert!(args.eth_deposit_address.is_some());
                assert_eq!(args.artifacts.to_str(), Some("artifacts"));
            }
            Command::VerifyNetwork(_) => panic!("parsed the wrong command"),
        }
    }

    #[test]
    fn test_rejects_malformed_deposit_address() {
        let res = Cli::try_parse_from([
            "deploy",
            "deploy-network",
            "--eth-deposit-address",
            "0x1234",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_network_defaults_to_local() {
        assert_eq!(network_args(None).select(None).unwrap(), Network::Local);
        assert_eq!(network_args(Some(Network::Goerli)).select(None).unwrap(), Network::Goerli);
    }

    #[test]
    fn test_recorded_network_is_used_when_none_selected() {
        let args = network_args(None);
        assert_eq!(args.select(Some(Network::Mainnet)).unwrap(), Network::Mainnet);

        let deposit = Address::repeat_byte(0xdd);
        let config = args.resolve(Some(Network::Local), Some(deposit)).unwrap();
        assert_eq!(config.network, Network::Local);
        assert_eq!(config.eth_deposit_address, deposit);
    }

    #[test]
    fn test_selection_must_match_recorded_network() {
        let args = network_args(Some(Network::Local));
        assert_eq!(args.select(Some(Network::Local)).unwrap(), Network::Local);
        assert!(matches!(
            args.select(Some(Network::Goerli)),
            Err(ScriptError::Configuration(_))
        ));
    }
}
