//! An in-memory chain for driving the deploy stages in tests

#![allow(dead_code)]

use std::sync::Mutex;

use alloy::{
    json_abi::JsonAbi,
    primitives::{address, keccak256, Address, Bytes, TxHash, B256},
    sol_types::{Revert, SolCall, SolError, SolValue},
};
use scripts::{
    artifacts::{ContractBlueprint, ContractRegistry},
    client::{ChainClient, ChainError, CreationReceipt},
    constants::PROXY_IMPLEMENTATION_STORAGE_SLOT,
    solidity::{INetworkFactory, InvalidInitialization},
    types::ContractRole,
};
use serde_json::json;

/// The deployer account of the mock chain
pub const DEPLOYER: Address = address!("dededededededededededededededededededede");

/// The runtime code prefix identifying the proxy's creation code
pub const PROXY_BYTECODE: [u8; 4] = [0x60, 0x80, 0xff, 0xee];

/// A transaction the mock chain has processed, successfully or not
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockTx {
    /// A contract creation
    Creation {
        /// The creation code
        init_code: Bytes,
        /// Whether the creation was confirmed
        success: bool,
    },
    /// A call to an existing contract
    Call {
        /// The callee
        to: Address,
        /// The calldata
        calldata: Bytes,
        /// Whether the call was confirmed
        success: bool,
    },
}

impl MockTx {
    /// Whether the transaction is a creation of the proxy
    pub fn is_proxy_creation(&self) -> bool {
        matches!(self, MockTx::Creation { init_code, .. } if init_code.starts_with(&PROXY_BYTECODE))
    }
}

/// The mutable state of the mock chain
#[derive(Default)]
struct ChainState {
    /// The deployer's next nonce
    nonce: u64,
    /// Every submitted transaction, in order
    transactions: Vec<MockTx>,
    /// The implementation slot of every deployed proxy
    proxies: Vec<(Address, Address)>,
    /// The initializer arguments of every initialized proxy
    initialized: Vec<(Address, INetworkFactory::initCall)>,
    /// The index of a creation to revert
    revert_creation_at: Option<usize>,
    /// An implementation to report for every proxy instead of the real one
    implementation_override: Option<Address>,
}

/// A chain that creates contracts at `CREATE` addresses of the deployer and
/// emulates the ERC-1967 proxy and network factory
#[derive(Default)]
pub struct MockChain {
    /// The chain state
    state: Mutex<ChainState>,
}

impl MockChain {
    /// A fresh chain
    pub fn new() -> Self {
        Self::default()
    }

    /// Revert the creation with the given zero-based index
    pub fn revert_creation_at(self, index: usize) -> Self {
        self.state.lock().unwrap().revert_creation_at = Some(index);
        self
    }

    /// Report `implementation` from the implementation slot of every proxy
    pub fn with_implementation_override(self, implementation: Address) -> Self {
        self.state.lock().unwrap().implementation_override = Some(implementation);
        self
    }

    /// Every transaction submitted so far
    pub fn transactions(&self) -> Vec<MockTx> {
        self.state.lock().unwrap().transactions.clone()
    }

    /// The number of creation transactions submitted so far
    pub fn num_creations(&self) -> usize {
        self.transactions()
            .iter()
            .filter(|tx| matches!(tx, MockTx::Creation { .. }))
            .count()
    }

    /// The initializer arguments the factory at `proxy` was initialized with
    pub fn init_args(&self, proxy: Address) -> Option<INetworkFactory::initCall> {
        self.state
            .lock()
            .unwrap()
            .initialized
            .iter()
            .find_map(|(addr, args)| (*addr == proxy).then(|| args.clone()))
    }
}

impl ChainClient for MockChain {
    async fn deploy(&self, init_code: Bytes) -> Result<CreationReceipt, ChainError> {
        let mut state = self.state.lock().unwrap();
        let index = state
            .transactions
            .iter()
            .filter(|tx| matches!(tx, MockTx::Creation { .. }))
            .count();

        let nonce = state.nonce;
        state.nonce += 1;

        if state.revert_creation_at == Some(index) {
            state.transactions.push(MockTx::Creation {
                init_code,
                success: false,
            });
            return Err(ChainError::Reverted {
                reason: "execution reverted".to_string(),
                data: None,
            });
        }

        let address = DEPLOYER.create(nonce);
        if init_code.starts_with(&PROXY_BYTECODE) {
            let (logic, _data) =
                <(Address, Bytes)>::abi_decode_params(&init_code[PROXY_BYTECODE.len()..])
                    .map_err(|e| ChainError::Reverted {
                        reason: e.to_string(),
                        data: None,
                    })?;
            state.proxies.push((address, logic));
        }

        state.transactions.push(MockTx::Creation {
            init_code,
            success: true,
        });
        Ok(CreationReceipt {
            address,
            tx_hash: keccak256(nonce.to_be_bytes()),
        })
    }

    async fn send(&self, to: Address, calldata: Bytes) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock().unwrap();
        let nonce = state.nonce;
        state.nonce += 1;

        let outcome = execute_init(&state, to, &calldata);
        let success = outcome.is_ok();
        state.transactions.push(MockTx::Call {
            to,
            calldata,
            success,
        });

        let args = outcome?;
        state.initialized.push((to, args));
        Ok(keccak256(nonce.to_be_bytes()))
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ChainError> {
        let state = self.state.lock().unwrap();
        let args = state
            .initialized
            .iter()
            .find_map(|(addr, args)| (*addr == to).then_some(args));

        let selector: [u8; 4] = calldata
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| ChainError::Reverted {
                reason: "missing selector".to_string(),
                data: None,
            })?;

        let getters: [([u8; 4], Getter); 8] = [
            (INetworkFactory::factoryAdminCall::SELECTOR, |a| a.factoryAdmin),
            (INetworkFactory::ethDepositAddressCall::SELECTOR, |a| a.ethDepositAddress),
            (INetworkFactory::feePoolLogicAddressCall::SELECTOR, |a| a.feePoolLogicAddress),
            (
                INetworkFactory::networkBalancesLogicAddressCall::SELECTOR,
                |a| a.networkBalancesLogicAddress,
            ),
            (
                INetworkFactory::networkProposalLogicAddressCall::SELECTOR,
                |a| a.networkProposalLogicAddress,
            ),
            (INetworkFactory::nodeDepositLogicAddressCall::SELECTOR, |a| a.nodeDepositLogicAddress),
            (INetworkFactory::userDepositLogicAddressCall::SELECTOR, |a| a.userDepositLogicAddress),
            (
                INetworkFactory::networkWithdrawalLogicAddressCall::SELECTOR,
                |a| a.networkWithdrawalLogicAddress,
            ),
        ];
        let get = getters
            .iter()
            .find_map(|(s, get)| (*s == selector).then_some(*get))
            .ok_or_else(|| ChainError::Reverted {
                reason: "unknown selector".to_string(),
                data: None,
            })?;

        // An uninitialized factory returns zeroed state
        let ret = args.map(get).unwrap_or(Address::ZERO);
        Ok(ret.abi_encode().into())
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError> {
        let state = self.state.lock().unwrap();
        if slot != PROXY_IMPLEMENTATION_STORAGE_SLOT {
            return Ok(B256::ZERO);
        }

        let implementation = state
            .proxies
            .iter()
            .find_map(|(proxy, logic)| (*proxy == address).then_some(*logic))
            .map(|logic| state.implementation_override.unwrap_or(logic))
            .unwrap_or(Address::ZERO);

        Ok(B256::left_padding_from(implementation.as_slice()))
    }
}

/// A getter of the factory's state
type Getter = fn(&INetworkFactory::initCall) -> Address;

/// Run the factory initializer against the chain state, without applying it
fn execute_init(
    state: &ChainState,
    to: Address,
    calldata: &[u8],
) -> Result<INetworkFactory::initCall, ChainError> {
    if !state.proxies.iter().any(|(proxy, _)| *proxy == to) {
        return Err(ChainError::Reverted {
            reason: "call to non-contract".to_string(),
            data: None,
        });
    }

    if state.initialized.iter().any(|(proxy, _)| *proxy == to) {
        return Err(ChainError::Reverted {
            reason: "execution reverted".to_string(),
            data: Some(InvalidInitialization {}.abi_encode().into()),
        });
    }

    let args = INetworkFactory::initCall::abi_decode(calldata).map_err(|e| ChainError::Reverted {
        reason: e.to_string(),
        data: None,
    })?;

    if args.factoryAdmin == Address::ZERO {
        let revert = Revert {
            reason: "factory admin is the zero address".to_string(),
        };
        return Err(ChainError::Reverted {
            reason: "execution reverted".to_string(),
            data: Some(revert.abi_encode().into()),
        });
    }

    Ok(args)
}

/// The ABI of the factory initializer
fn init_abi() -> serde_json::Value {
    let inputs: Vec<_> = [
        "factoryAdmin",
        "ethDepositAddress",
        "feePoolLogicAddress",
        "networkBalancesLogicAddress",
        "networkProposalLogicAddress",
        "nodeDepositLogicAddress",
        "userDepositLogicAddress",
        "networkWithdrawalLogicAddress",
    ]
    .iter()
    .map(|name| json!({ "name": name, "type": "address", "internalType": "address" }))
    .collect();

    json!([{
        "type": "function",
        "name": "init",
        "inputs": inputs,
        "outputs": [],
        "stateMutability": "nonpayable"
    }])
}

/// The ABI of the ERC-1967 proxy
fn proxy_abi() -> serde_json::Value {
    json!([{
        "type": "constructor",
        "inputs": [
            { "name": "implementation", "type": "address", "internalType": "address" },
            { "name": "_data", "type": "bytes", "internalType": "bytes" }
        ],
        "stateMutability": "payable"
    }])
}

/// A registry whose logic contracts carry distinct placeholder bytecode and
/// whose proxy is recognized by the mock chain
pub fn registry() -> ContractRegistry {
    let blueprints = ContractRole::ALL.iter().enumerate().map(|(i, role)| {
        let (abi, bytecode) = match role {
            ContractRole::NetworkFactoryProxy => (proxy_abi(), Bytes::copy_from_slice(&PROXY_BYTECODE)),
            ContractRole::NetworkFactoryLogic => (init_abi(), Bytes::from(vec![0x60, i as u8])),
            _ => (json!([]), Bytes::from(vec![0x60, i as u8])),
        };
        let abi: JsonAbi = serde_json::from_value(abi).unwrap();
        ContractBlueprint::new(*role, abi, bytecode).unwrap()
    });

    ContractRegistry::from_blueprints(blueprints).unwrap()
}
