//! Definitions of errors that can occur during the deployment of the network contracts

use alloy::primitives::Address;
use thiserror::Error;

use crate::types::{AddressLedger, ContractRole, ProxyBinding};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Missing or invalid credentials, endpoint, or network parameters
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A contract's compiled artifact could not be located
    #[error("artifact for `{contract}` not found under {search_path}")]
    ArtifactNotFound {
        /// The name of the contract whose artifact is missing
        contract: &'static str,
        /// The directory that was searched
        search_path: String,
    },
    /// Error parsing a Solidity compilation artifact
    #[error("error parsing artifact: {0}")]
    ArtifactParsing(String),
    /// Error constructing calldata or constructor arguments
    #[error("error constructing calldata: {0}")]
    CalldataConstruction(String),
    /// A creation transaction could not be submitted or confirmed
    #[error("error deploying contract: {0}")]
    ContractDeployment(String),
    /// A creation transaction was rejected on-chain
    #[error("deployment of {role} reverted: {reason}")]
    DeploymentReverted {
        /// The role whose deployment reverted
        role: ContractRole,
        /// The revert reason reported by the node
        reason: String,
    },
    /// The proxy does not point at the expected implementation
    #[error("proxy {proxy:#x} points at {actual:#x}, expected {expected:#x}")]
    ProxyMisconfigured {
        /// The proxy address
        proxy: Address,
        /// The expected implementation
        expected: Address,
        /// The implementation read from the proxy's storage
        actual: Address,
    },
    /// A stage required a role that has not been deployed
    #[error("no deployment recorded for {0}")]
    MissingLedgerEntry(ContractRole),
    /// A ledger entry would duplicate a role or an address
    #[error("ledger conflict: {0}")]
    LedgerConflict(String),
    /// The factory initializer was invoked on an initialized proxy
    #[error("network factory at {0:#x} is already initialized")]
    AlreadyInitialized(Address),
    /// A transaction other than a creation was rejected on-chain
    #[error("transaction reverted: {0}")]
    RevertedTransaction(String),
    /// Error calling a contract method or reading chain state
    #[error("error interacting with contract: {0}")]
    ContractInteraction(String),
    /// On-chain state does not match the deployment
    #[error("verification failed: {0}")]
    Verification(String),
    /// Error reading the deployments file
    #[error("error reading deployments: {0}")]
    ReadDeployments(String),
    /// Error writing the deployments file
    #[error("error writing deployments: {0}")]
    WriteDeployments(String),
}

/// A failed deployment run, carrying everything that was confirmed before
/// the failing stage so that it can be reported for manual recovery
#[derive(Debug, Error)]
#[error("{source}")]
pub struct DeploymentFailure {
    /// The ledger as of the failure
    pub ledger: AddressLedger,
    /// The proxy, if it was deployed before the failure
    pub proxy: Option<ProxyBinding>,
    /// The error that aborted the run
    #[source]
    pub source: ScriptError,
}

impl DeploymentFailure {
    /// Wrap a stage error together with the partial deployment state
    pub fn new(ledger: AddressLedger, proxy: Option<ProxyBinding>, source: ScriptError) -> Self {
        Self {
            ledger,
            proxy,
            source,
        }
    }
}
