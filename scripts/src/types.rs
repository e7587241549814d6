//! Type definitions used throughout the scripts

use std::fmt::{self, Display};

use alloy::primitives::{Address, Bytes, TxHash};
use serde::{Deserialize, Serialize};

use crate::{errors::ScriptError, solidity::INetworkFactory::initCall};

/// The closed set of contracts deployed by the network factory scripts
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractRole {
    /// The fee pool logic contract
    FeePoolLogic,
    /// The network balances logic contract
    NetworkBalancesLogic,
    /// The network proposal logic contract
    NetworkProposalLogic,
    /// The node deposit logic contract
    NodeDepositLogic,
    /// The user deposit logic contract
    UserDepositLogic,
    /// The network withdrawal logic contract
    NetworkWithdrawalLogic,
    /// The network factory logic contract, pointed at by the proxy
    NetworkFactoryLogic,
    /// The ERC-1967 proxy fronting the network factory
    NetworkFactoryProxy,
}

impl ContractRole {
    /// Every role, in deployment order
    pub const ALL: [ContractRole; 8] = [
        ContractRole::FeePoolLogic,
        ContractRole::NetworkBalancesLogic,
        ContractRole::NetworkProposalLogic,
        ContractRole::NodeDepositLogic,
        ContractRole::UserDepositLogic,
        ContractRole::NetworkWithdrawalLogic,
        ContractRole::NetworkFactoryLogic,
        ContractRole::NetworkFactoryProxy,
    ];

    /// The logic contracts, in the order they are deployed.
    ///
    /// The factory logic comes last, it is deployed like the others but is
    /// consumed by the proxy rather than by the initializer.
    pub const LOGIC: [ContractRole; 7] = [
        ContractRole::FeePoolLogic,
        ContractRole::NetworkBalancesLogic,
        ContractRole::NetworkProposalLogic,
        ContractRole::NodeDepositLogic,
        ContractRole::UserDepositLogic,
        ContractRole::NetworkWithdrawalLogic,
        ContractRole::NetworkFactoryLogic,
    ];

    /// The name of the compiled contract backing this role
    pub fn contract_name(&self) -> &'static str {
        match self {
            ContractRole::FeePoolLogic => "FeePool",
            ContractRole::NetworkBalancesLogic => "NetworkBalances",
            ContractRole::NetworkProposalLogic => "NetworkProposal",
            ContractRole::NodeDepositLogic => "NodeDeposit",
            ContractRole::UserDepositLogic => "UserDeposit",
            ContractRole::NetworkWithdrawalLogic => "NetworkWithdrawal",
            ContractRole::NetworkFactoryLogic => "LsdNetworkFactory",
            ContractRole::NetworkFactoryProxy => "ERC1967Proxy",
        }
    }
}

impl Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractRole::FeePoolLogic => write!(f, "FeePoolLogic"),
            ContractRole::NetworkBalancesLogic => write!(f, "NetworkBalancesLogic"),
            ContractRole::NetworkProposalLogic => write!(f, "NetworkProposalLogic"),
            ContractRole::NodeDepositLogic => write!(f, "NodeDepositLogic"),
            ContractRole::UserDepositLogic => write!(f, "UserDepositLogic"),
            ContractRole::NetworkWithdrawalLogic => write!(f, "NetworkWithdrawalLogic"),
            ContractRole::NetworkFactoryLogic => write!(f, "LsdNetworkFactoryLogic"),
            ContractRole::NetworkFactoryProxy => write!(f, "LsdNetworkFactory"),
        }
    }
}

/// A contract whose creation transaction has been confirmed
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContract {
    /// The name of the compiled contract
    pub contract: String,
    /// The address the contract was created at
    pub address: Address,
    /// The hash of the creation transaction
    pub tx_hash: TxHash,
}

/// An ordered record of the contracts confirmed so far, keyed by role.
///
/// The ledger is a value: recording a deployment produces a new ledger and
/// leaves the original untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AddressLedger {
    /// The confirmed deployments, in deployment order
    entries: Vec<(ContractRole, DeployedContract)>,
}

impl AddressLedger {
    /// Returns a new ledger with `contract` recorded under `role`.
    ///
    /// Errors if the role is already recorded, or if another role already
    /// resolves to the same address.
    pub fn with_deployment(
        &self,
        role: ContractRole,
        contract: DeployedContract,
    ) -> Result<Self, ScriptError> {
        if let Some(existing) = self.get(role) {
            return Err(ScriptError::LedgerConflict(format!(
                "{role} already deployed at {:#x}",
                existing.address
            )));
        }

        if let Some((other, _)) = self
            .entries
            .iter()
            .find(|(_, deployed)| deployed.address == contract.address)
        {
            return Err(ScriptError::LedgerConflict(format!(
                "{role} and {other} both resolve to {:#x}",
                contract.address
            )));
        }

        let mut entries = self.entries.clone();
        entries.push((role, contract));
        Ok(Self { entries })
    }

    /// The deployment recorded under `role`, if any
    pub fn get(&self, role: ContractRole) -> Option<&DeployedContract> {
        self.entries
            .iter()
            .find_map(|(r, deployed)| (*r == role).then_some(deployed))
    }

    /// The address recorded under `role`.
    ///
    /// A missing role is a precondition failure of the calling stage.
    pub fn address_of(&self, role: ContractRole) -> Result<Address, ScriptError> {
        self.get(role)
            .map(|deployed| deployed.address)
            .ok_or(ScriptError::MissingLedgerEntry(role))
    }

    /// The recorded deployments, in deployment order
    pub fn entries(&self) -> impl Iterator<Item = (ContractRole, &DeployedContract)> {
        self.entries.iter().map(|(role, deployed)| (*role, deployed))
    }

    /// The number of recorded deployments
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The network factory proxy together with the construction it was given
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyBinding {
    /// The deployed proxy
    pub proxy: DeployedContract,
    /// The implementation the proxy was constructed with
    pub logic: Address,
    /// The initialization payload passed to the proxy constructor
    pub init_payload: Bytes,
    /// Whether the factory initializer has succeeded through this proxy
    pub initialized: bool,
}

impl ProxyBinding {
    /// The address of the proxy
    pub fn address(&self) -> Address {
        self.proxy.address
    }

    /// The factory interface at the proxy address
    pub fn factory(&self) -> NetworkFactoryHandle {
        NetworkFactoryHandle::at(self.proxy.address)
    }
}

/// A completed deployment: every logic contract plus the initialized proxy
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkDeployment {
    /// The logic contracts, in deployment order
    pub ledger: AddressLedger,
    /// The network factory proxy
    pub proxy: ProxyBinding,
}

/// A proxy address viewed under the network factory's interface
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NetworkFactoryHandle {
    /// The address calls are sent to
    address: Address,
}

impl NetworkFactoryHandle {
    /// View `address` as a network factory
    pub fn at(address: Address) -> Self {
        Self { address }
    }

    /// The address calls are sent to
    pub fn address(&self) -> Address {
        self.address
    }
}

/// The arguments of the factory initializer, in the order the interface declares them
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct InitializerArgs {
    /// The administrator of the network factory
    pub factory_admin: Address,
    /// The beacon chain deposit contract
    pub eth_deposit: Address,
    /// The fee pool logic contract
    pub fee_pool_logic: Address,
    /// The network balances logic contract
    pub network_balances_logic: Address,
    /// The network proposal logic contract
    pub network_proposal_logic: Address,
    /// The node deposit logic contract
    pub node_deposit_logic: Address,
    /// The user deposit logic contract
    pub user_deposit_logic: Address,
    /// The network withdrawal logic contract
    pub network_withdrawal_logic: Address,
}

impl InitializerArgs {
    /// Collect the initializer arguments, looking every logic contract up by role
    pub fn from_ledger(
        factory_admin: Address,
        eth_deposit: Address,
        ledger: &AddressLedger,
    ) -> Result<Self, ScriptError> {
        Ok(Self {
            factory_admin,
            eth_deposit,
            fee_pool_logic: ledger.address_of(ContractRole::FeePoolLogic)?,
            network_balances_logic: ledger.address_of(ContractRole::NetworkBalancesLogic)?,
            network_proposal_logic: ledger.address_of(ContractRole::NetworkProposalLogic)?,
            node_deposit_logic: ledger.address_of(ContractRole::NodeDepositLogic)?,
            user_deposit_logic: ledger.address_of(ContractRole::UserDepositLogic)?,
            network_withdrawal_logic: ledger.address_of(ContractRole::NetworkWithdrawalLogic)?,
        })
    }

    /// The initializer call carrying these arguments
    pub fn to_call(&self) -> initCall {
        initCall {
            factoryAdmin: self.factory_admin,
            ethDepositAddress: self.eth_deposit,
            feePoolLogicAddress: self.fee_pool_logic,
            networkBalancesLogicAddress: self.network_balances_logic,
            networkProposalLogicAddress: self.network_proposal_logic,
            nodeDepositLogicAddress: self.node_deposit_logic,
            userDepositLogicAddress: self.user_deposit_logic,
            networkWithdrawalLogicAddress: self.network_withdrawal_logic,
        }
    }
}
