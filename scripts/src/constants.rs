//! Constants used in the deploy scripts

use alloy::primitives::{address, b256, Address, B256};

/// The storage slot containing the implementation address in an ERC-1967 proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const PROXY_IMPLEMENTATION_STORAGE_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// The number of bytes stored in a single storage slot
pub const NUM_BYTES_STORAGE_SLOT: usize = 32;

/// The number of bytes in an Ethereum address
pub const NUM_BYTES_ADDRESS: usize = 20;

/// The default number of confirmations to wait for on each transaction
pub const DEFAULT_NUM_CONFIRMATIONS: u64 = 1;

/// The beacon chain deposit contract on Ethereum mainnet
pub const MAINNET_ETH_DEPOSIT_ADDRESS: Address =
    address!("00000000219ab540356cBB839Cbe05303d7705Fa");

/// The beacon chain deposit contract on Goerli
pub const GOERLI_ETH_DEPOSIT_ADDRESS: Address =
    address!("ff50ed3d0ec03ac01d4c79aad74928bff48a7b2b");

/// The Alchemy mainnet endpoint, to which the API key is appended
pub const ALCHEMY_MAINNET_URL_PREFIX: &str = "https://eth-mainnet.g.alchemy.com/v2/";

/// The default RPC URL of a local development node
pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:8545";

/// The environment variable holding the Alchemy API key
pub const ALCHEMY_API_KEY_ENV_VAR: &str = "ALCHEMY_API_KEY";

/// The environment variable holding the Goerli RPC URL
pub const GOERLI_RPC_URL_ENV_VAR: &str = "GOERLI_RPC_URL";

/// The environment variable holding the deployer's private key
pub const DEPLOYER_KEY_ENV_VAR: &str = "ACCOUNT_DEPLOYER";

/// The environment variable holding the factory admin's private key
pub const FACTORY_ADMIN_KEY_ENV_VAR: &str = "ACCOUNT_FACTORY_ADMIN";

/// The environment variable holding an HTTP proxy for RPC traffic
pub const HTTP_PROXY_ENV_VAR: &str = "HTTP_NETWORK_PROXY";

/// The default directory holding the compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The directory of build metadata emitted next to the artifacts, which is
/// skipped when searching for contract artifacts
pub const BUILD_INFO_DIR: &str = "build-info";

/// The extension of a contract artifact file
pub const ARTIFACT_EXTENSION: &str = "json";

/// The extension of a Solidity source directory in the artifacts tree
pub const SOLIDITY_SOURCE_EXTENSION: &str = "sol";

/// The name of the factory's one-time initializer
pub const INITIALIZER_FUNCTION_NAME: &str = "init";

/// The revert message fragment used by initializer guards
pub const ALREADY_INITIALIZED_MESSAGE: &str = "already initialized";

/// The status of a fully initialized network in the deployments file
pub const STATUS_INITIALIZED: &str = "initialized";

/// The status of an aborted deployment in the deployments file
pub const STATUS_FAILED: &str = "failed";
