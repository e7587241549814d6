//! Reporting of a deployment's outcome: structured log events, a summary on
//! stdout, and an optional JSON deployments file

use std::path::Path;

use alloy::primitives::Address;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
    config::Network,
    constants::{STATUS_FAILED, STATUS_INITIALIZED},
    errors::{DeploymentFailure, ScriptError},
    types::{AddressLedger, ContractRole, DeployedContract, NetworkDeployment, ProxyBinding},
    utils::write_deployments,
};

/// The parameters a deployment ran with
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeploymentContext {
    /// The target network
    pub network: Network,
    /// The chain id reported by the endpoint
    pub chain_id: u64,
    /// The account that signed every transaction
    pub deployer: Address,
    /// The account the factory was handed to
    pub factory_admin: Address,
    /// The deposit contract the factory was initialized with
    pub eth_deposit_address: Address,
}

/// A deployed contract as recorded in the deployments file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedContract {
    /// The role the contract was deployed for
    pub role: ContractRole,
    /// The deployment itself
    #[serde(flatten)]
    pub deployed: DeployedContract,
}

/// The contents of the deployments file
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// The target network
    pub network: Network,
    /// The chain id reported by the endpoint
    pub chain_id: u64,
    /// The account that signed every transaction
    pub deployer: Address,
    /// The account the factory was handed to
    pub factory_admin: Address,
    /// The deposit contract the factory was initialized with
    pub eth_deposit_address: Address,
    /// Every confirmed contract, in deployment order
    pub contracts: Vec<RecordedContract>,
    /// The network factory proxy, if it was deployed
    pub network_factory: Option<Address>,
    /// `initialized` once every stage succeeded, `failed` otherwise
    pub status: String,
    /// The error that aborted the deployment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeploymentRecord {
    /// Build the record of a deployment, successful or partial
    pub fn new(
        context: &DeploymentContext,
        ledger: &AddressLedger,
        proxy: Option<&ProxyBinding>,
        error: Option<&ScriptError>,
    ) -> Self {
        let contracts = ledger
            .entries()
            .map(|(role, deployed)| RecordedContract {
                role,
                deployed: deployed.clone(),
            })
            .chain(proxy.map(|binding| RecordedContract {
                role: ContractRole::NetworkFactoryProxy,
                deployed: binding.proxy.clone(),
            }))
            .collect();

        let initialized = error.is_none() && proxy.is_some_and(|binding| binding.initialized);
        let status = if initialized { STATUS_INITIALIZED } else { STATUS_FAILED };

        Self {
            network: context.network,
            chain_id: context.chain_id,
            deployer: context.deployer,
            factory_admin: context.factory_admin,
            eth_deposit_address: context.eth_deposit_address,
            contracts,
            network_factory: proxy.map(ProxyBinding::address),
            status: status.to_string(),
            error: error.map(ToString::to_string),
        }
    }

    /// Rebuild the ledger of logic contracts from the record
    pub fn ledger(&self) -> Result<AddressLedger, ScriptError> {
        self.contracts
            .iter()
            .filter(|recorded| recorded.role != ContractRole::NetworkFactoryProxy)
            .try_fold(AddressLedger::default(), |ledger, recorded| {
                ledger.with_deployment(recorded.role, recorded.deployed.clone())
            })
    }

    /// A human-readable summary of the record
    pub fn summary(&self) -> String {
        let contracts = self
            .contracts
            .iter()
            .map(|recorded| {
                format!(
                    "  {:<24} {:<20} {:#x}",
                    recorded.role.to_string(),
                    recorded.deployed.contract,
                    recorded.deployed.address
                )
            })
            .join("\n");

        let factory = self
            .network_factory
            .map(|address| format!("{address:#x}"))
            .unwrap_or_else(|| "not deployed".to_string());

        let mut summary = format!(
            "Network factory deployment on {} (chain {}): {}\n{contracts}\nLsdNetworkFactory: {factory}",
            self.network, self.chain_id, self.status
        );
        if let Some(error) = &self.error {
            summary.push_str(&format!("\nError: {error}"));
        }

        summary
    }
}

/// Report a completed deployment, writing the deployments file if a path is given
pub fn report_deployment(
    context: &DeploymentContext,
    deployment: &NetworkDeployment,
    deployments_path: Option<&Path>,
) -> Result<(), ScriptError> {
    let record =
        DeploymentRecord::new(context, &deployment.ledger, Some(&deployment.proxy), None);
    emit(&record);

    if let Some(path) = deployments_path {
        write_deployments(path, &record)?;
        info!(path = %path.display(), "wrote deployments file");
    }

    Ok(())
}

/// Report an aborted deployment with everything confirmed before the failure.
///
/// Failing to write the deployments file here is logged rather than returned,
/// so that the deployment error stays the one surfaced to the caller.
pub fn report_failure(
    context: &DeploymentContext,
    failure: &DeploymentFailure,
    deployments_path: Option<&Path>,
) {
    let record = DeploymentRecord::new(
        context,
        &failure.ledger,
        failure.proxy.as_ref(),
        Some(&failure.source),
    );
    emit(&record);
    error!(error = %failure.source, "deployment aborted");

    if let Some(path) = deployments_path {
        match write_deployments(path, &record) {
            Ok(()) => info!(path = %path.display(), "wrote partial deployments file"),
            Err(e) => error!(path = %path.display(), error = %e, "could not write deployments file"),
        }
    }
}

/// Log one event per recorded contract and print the summary
fn emit(record: &DeploymentRecord) {
    for recorded in &record.contracts {
        info!(
            role = %recorded.role,
            contract = %recorded.deployed.contract,
            address = %recorded.deployed.address,
            tx = %recorded.deployed.tx_hash,
            "deployment"
        );
    }

    if let Some(factory) = record.network_factory {
        info!(address = %factory, status = %record.status, "network factory");
    }

    println!("{}", record.summary());
}
