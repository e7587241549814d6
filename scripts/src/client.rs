//! The chain access used by the deploy stages.
//!
//! Every stage talks to the chain through [`ChainClient`], so the stages can
//! be driven against a node or against an in-memory chain in tests.

use alloy::{
    network::{ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, B256, U256},
    providers::{DynProvider, Provider},
    rpc::types::TransactionRequest,
    transports::{RpcError, TransportErrorKind},
};
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by a [`ChainClient`]
#[derive(Debug, Error)]
pub enum ChainError {
    /// The transaction was rejected on-chain, or would be
    #[error("{reason}")]
    Reverted {
        /// A human-readable description of the rejection
        reason: String,
        /// The raw revert data, when the node returned any
        data: Option<Bytes>,
    },
    /// The node could not be reached, or returned an unexpected response
    #[error("{0}")]
    Transport(String),
}

/// A confirmed contract creation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CreationReceipt {
    /// The address of the created contract
    pub address: Address,
    /// The hash of the creation transaction
    pub tx_hash: TxHash,
}

/// The operations the deploy stages need from a chain.
///
/// Transaction methods only return once the transaction has reached a
/// terminal state, i.e. it was confirmed or it reverted.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// Submit a contract creation with the given init code and wait for it to confirm
    async fn deploy(&self, init_code: Bytes) -> Result<CreationReceipt, ChainError>;

    /// Submit a call to `to` and wait for it to confirm
    async fn send(&self, to: Address, calldata: Bytes) -> Result<TxHash, ChainError>;

    /// Execute a read-only call against the latest block
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ChainError>;

    /// Read a storage slot of `address` at the latest block
    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError>;
}

/// A [`ChainClient`] backed by a JSON-RPC provider
#[derive(Clone)]
pub struct RpcChainClient {
    /// The provider, carrying the sender's wallet when transactions are sent
    provider: DynProvider,
    /// The address transactions are sent from
    sender: Option<Address>,
    /// The number of confirmations to wait for on every transaction
    confirmations: u64,
}

impl RpcChainClient {
    /// Create a client that signs transactions as `sender`
    pub fn new(provider: DynProvider, sender: Address, confirmations: u64) -> Self {
        Self {
            provider,
            sender: Some(sender),
            confirmations,
        }
    }

    /// Create a client that can only read chain state
    pub fn read_only(provider: DynProvider) -> Self {
        Self {
            provider,
            sender: None,
            confirmations: 0,
        }
    }

    /// The underlying provider
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Build a transaction request from the configured sender
    fn request(&self) -> Result<TransactionRequest, ChainError> {
        let sender = self
            .sender
            .ok_or_else(|| ChainError::Transport("client has no sender attached".to_string()))?;
        Ok(TransactionRequest::default().with_from(sender))
    }

    /// Submit a transaction and block until it reaches a terminal state
    async fn submit(&self, tx: TransactionRequest) -> Result<SubmittedTx, ChainError> {
        let pending = self.provider.send_transaction(tx).await.map_err(rpc_error)?;
        let tx_hash = *pending.tx_hash();
        debug!(tx = %tx_hash, "transaction submitted, waiting for confirmation");

        let receipt = pending
            .with_required_confirmations(self.confirmations.max(1))
            .get_receipt()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        if !receipt.status() {
            return Err(ChainError::Reverted {
                reason: format!("transaction {tx_hash:#x} reverted"),
                data: None,
            });
        }

        Ok(SubmittedTx {
            tx_hash,
            contract_address: receipt.contract_address(),
        })
    }
}

/// The outcome of a confirmed transaction
struct SubmittedTx {
    /// The transaction hash
    tx_hash: TxHash,
    /// The created contract, for creation transactions
    contract_address: Option<Address>,
}

impl ChainClient for RpcChainClient {
    async fn deploy(&self, init_code: Bytes) -> Result<CreationReceipt, ChainError> {
        let tx = self.request()?.with_deploy_code(init_code);
        let submitted = self.submit(tx).await?;

        let address = submitted.contract_address.ok_or_else(|| {
            ChainError::Transport(format!(
                "receipt of {:#x} carries no contract address",
                submitted.tx_hash
            ))
        })?;

        Ok(CreationReceipt {
            address,
            tx_hash: submitted.tx_hash,
        })
    }

    async fn send(&self, to: Address, calldata: Bytes) -> Result<TxHash, ChainError> {
        let tx = self.request()?.with_to(to).with_input(calldata);
        Ok(self.submit(tx).await?.tx_hash)
    }

    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes, ChainError> {
        let tx = TransactionRequest::default().with_to(to).with_input(calldata);
        self.provider.call(tx).await.map_err(rpc_error)
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256, ChainError> {
        self.provider
            .get_storage_at(address, U256::from_be_bytes(slot.0))
            .await
            .map(|value| B256::from(value.to_be_bytes::<32>()))
            .map_err(rpc_error)
    }
}

/// Classify an RPC error, separating on-chain rejections from transport failures
fn rpc_error(err: RpcError<TransportErrorKind>) -> ChainError {
    match err.as_error_resp() {
        Some(payload) => {
            let data = payload.as_revert_data();
            if data.is_some() || payload.message.contains("revert") {
                ChainError::Reverted {
                    reason: payload.message.to_string(),
                    data,
                }
            } else {
                ChainError::Transport(err.to_string())
            }
        }
        None => ChainError::Transport(err.to_string()),
    }
}
