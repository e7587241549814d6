//! Implementations of the deploy stages and of the commands built on them

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, Bytes},
    sol_types::{decode_revert_reason, SolCall, SolError, SolValue},
};
use tracing::{info, warn};

use crate::{
    artifacts::ContractRegistry,
    cli::{DeployNetworkArgs, NetworkArgs, VerifyNetworkArgs},
    client::{ChainClient, ChainError, RpcChainClient},
    config::NetworkConfig,
    constants::{ALREADY_INITIALIZED_MESSAGE, PROXY_IMPLEMENTATION_STORAGE_SLOT},
    errors::{DeploymentFailure, ScriptError},
    report::{report_deployment, report_failure, DeploymentContext, DeploymentRecord},
    signers::{fetch_chain_id, resolve_signers},
    solidity::{self, INetworkFactory},
    types::{
        AddressLedger, ContractRole, DeployedContract, InitializerArgs, NetworkDeployment,
        ProxyBinding,
    },
    utils::{address_from_storage_word, read_deployments, setup_provider},
};

// ----------
// | Stages |
// ----------

/// Deploy the logic contract of `role`, returning a new ledger recording it
pub async fn deploy_logic_contract(
    client: &impl ChainClient,
    registry: &ContractRegistry,
    ledger: &AddressLedger,
    role: ContractRole,
) -> Result<AddressLedger, ScriptError> {
    let blueprint = registry.blueprint(role);
    let init_code = blueprint.deployment_code(&[])?;

    let receipt = client
        .deploy(init_code)
        .await
        .map_err(|e| deployment_error(role, e))?;

    info!(
        role = %role,
        contract = role.contract_name(),
        address = %receipt.address,
        tx = %receipt.tx_hash,
        "deployed logic contract"
    );

    ledger.with_deployment(
        role,
        DeployedContract {
            contract: role.contract_name().to_string(),
            address: receipt.address,
            tx_hash: receipt.tx_hash,
        },
    )
}

/// Deploy the ERC-1967 proxy in front of the factory logic, with an empty
/// initialization payload.
///
/// The returned binding is uninitialized and its implementation slot is not
/// yet checked, see [`check_proxy_implementation`].
pub async fn deploy_factory_proxy(
    client: &impl ChainClient,
    registry: &ContractRegistry,
    ledger: &AddressLedger,
) -> Result<ProxyBinding, ScriptError> {
    let role = ContractRole::NetworkFactoryProxy;
    let logic = ledger.address_of(ContractRole::NetworkFactoryLogic)?;
    let init_payload = Bytes::new();

    let init_code = registry.blueprint(role).deployment_code(&[
        DynSolValue::Address(logic),
        DynSolValue::Bytes(init_payload.to_vec()),
    ])?;

    let receipt = client
        .deploy(init_code)
        .await
        .map_err(|e| deployment_error(role, e))?;

    info!(
        role = %role,
        contract = role.contract_name(),
        address = %receipt.address,
        implementation = %logic,
        tx = %receipt.tx_hash,
        "deployed network factory proxy"
    );

    Ok(ProxyBinding {
        proxy: DeployedContract {
            contract: role.contract_name().to_string(),
            address: receipt.address,
            tx_hash: receipt.tx_hash,
        },
        logic,
        init_payload,
        initialized: false,
    })
}

/// Read back the proxy's ERC-1967 implementation slot and check that it
/// points at the logic the proxy was constructed with
pub async fn check_proxy_implementation(
    client: &impl ChainClient,
    binding: &ProxyBinding,
) -> Result<(), ScriptError> {
    let actual = implementation_of(client, binding.address()).await?;
    if actual != binding.logic {
        return Err(ScriptError::ProxyMisconfigured {
            proxy: binding.address(),
            expected: binding.logic,
            actual,
        });
    }

    Ok(())
}

/// Invoke the factory initializer through the proxy, handing the factory to
/// `factory_admin` and registering every logic contract in the ledger.
///
/// Returns the binding marked as initialized. The initializer is one-shot, so
/// a rejection is never retried.
pub async fn initialize_factory(
    client: &impl ChainClient,
    binding: &ProxyBinding,
    ledger: &AddressLedger,
    factory_admin: Address,
    eth_deposit: Address,
) -> Result<ProxyBinding, ScriptError> {
    let factory = binding.factory();
    let args = InitializerArgs::from_ledger(factory_admin, eth_deposit, ledger)?;
    let calldata = Bytes::from(args.to_call().abi_encode());

    let tx_hash = client
        .send(factory.address(), calldata)
        .await
        .map_err(|e| initializer_error(factory.address(), e))?;

    info!(
        factory = %factory.address(),
        admin = %factory_admin,
        eth_deposit = %eth_deposit,
        tx = %tx_hash,
        "initialized network factory"
    );

    Ok(ProxyBinding {
        initialized: true,
        ..binding.clone()
    })
}

/// Check the on-chain state of a deployed network against what it was
/// deployed with. Issues no transactions.
pub async fn verify_network(
    client: &impl ChainClient,
    proxy: Address,
    factory_logic: Address,
    expected: &InitializerArgs,
) -> Result<(), ScriptError> {
    let implementation = implementation_of(client, proxy).await?;
    check_field("implementation", factory_logic, implementation)?;

    check_getter(client, proxy, INetworkFactory::factoryAdminCall {}, expected.factory_admin)
        .await?;
    check_getter(client, proxy, INetworkFactory::ethDepositAddressCall {}, expected.eth_deposit)
        .await?;
    check_getter(
        client,
        proxy,
        INetworkFactory::feePoolLogicAddressCall {},
        expected.fee_pool_logic,
    )
    .await?;
    check_getter(
        client,
        proxy,
        INetworkFactory::networkBalancesLogicAddressCall {},
        expected.network_balances_logic,
    )
    .await?;
    check_getter(
        client,
        proxy,
        INetworkFactory::networkProposalLogicAddressCall {},
        expected.network_proposal_logic,
    )
    .await?;
    check_getter(
        client,
        proxy,
        INetworkFactory::nodeDepositLogicAddressCall {},
        expected.node_deposit_logic,
    )
    .await?;
    check_getter(
        client,
        proxy,
        INetworkFactory::userDepositLogicAddressCall {},
        expected.user_deposit_logic,
    )
    .await?;
    check_getter(
        client,
        proxy,
        INetworkFactory::networkWithdrawalLogicAddressCall {},
        expected.network_withdrawal_logic,
    )
    .await?;

    info!(factory = %proxy, "verified network factory state");
    Ok(())
}

/// Run every stage in order: the logic contracts, the proxy, the initializer,
/// then verification of the resulting state.
///
/// The first failing stage aborts the run. The returned failure carries
/// everything confirmed up to that point.
pub async fn deploy_network(
    client: &impl ChainClient,
    registry: &ContractRegistry,
    factory_admin: Address,
    eth_deposit: Address,
) -> Result<NetworkDeployment, DeploymentFailure> {
    let mut ledger = AddressLedger::default();
    for role in ContractRole::LOGIC {
        ledger = deploy_logic_contract(client, registry, &ledger, role)
            .await
            .map_err(|e| DeploymentFailure::new(ledger.clone(), None, e))?;
    }

    let proxy = deploy_factory_proxy(client, registry, &ledger)
        .await
        .map_err(|e| DeploymentFailure::new(ledger.clone(), None, e))?;

    // From here on the proxy exists on-chain and is part of every failure
    check_proxy_implementation(client, &proxy)
        .await
        .map_err(|e| DeploymentFailure::new(ledger.clone(), Some(proxy.clone()), e))?;

    let proxy = initialize_factory(client, &proxy, &ledger, factory_admin, eth_deposit)
        .await
        .map_err(|e| DeploymentFailure::new(ledger.clone(), Some(proxy.clone()), e))?;

    let expected = InitializerArgs::from_ledger(factory_admin, eth_deposit, &ledger)
        .map_err(|e| DeploymentFailure::new(ledger.clone(), Some(proxy.clone()), e))?;
    verify_network(client, proxy.address(), proxy.logic, &expected)
        .await
        .map_err(|e| DeploymentFailure::new(ledger.clone(), Some(proxy.clone()), e))?;

    Ok(NetworkDeployment { ledger, proxy })
}

// ------------
// | Commands |
// ------------

/// Resolve the deployment's actors and artifacts, deploy the network, and
/// report the outcome, whether it succeeded or not
pub async fn deploy_network_command(
    args: DeployNetworkArgs,
    config: NetworkConfig,
) -> Result<(), ScriptError> {
    // Everything that can be checked offline is checked before connecting
    let registry = ContractRegistry::load(&args.artifacts)?;
    let signers = resolve_signers(
        args.deployer_key.as_deref(),
        args.factory_admin_key.as_deref(),
        &config,
        args.confirmations,
    )
    .await?;

    let context = DeploymentContext {
        network: config.network,
        chain_id: signers.deployer.chain_id(),
        deployer: signers.deployer.address(),
        factory_admin: signers.admin.address(),
        eth_deposit_address: config.eth_deposit_address,
    };
    info!(
        network = %context.network,
        chain_id = context.chain_id,
        eth_deposit = %context.eth_deposit_address,
        "deploying network factory"
    );

    match deploy_network(
        &signers.client,
        &registry,
        context.factory_admin,
        context.eth_deposit_address,
    )
    .await
    {
        Ok(deployment) => report_deployment(&context, &deployment, args.deployments_path.as_deref()),
        Err(failure) => {
            report_failure(&context, &failure, args.deployments_path.as_deref());
            Err(failure.source)
        }
    }
}

/// Verify a previously recorded deployment against on-chain state
pub async fn verify_network_command(
    args: VerifyNetworkArgs,
    network: &NetworkArgs,
) -> Result<(), ScriptError> {
    let record: DeploymentRecord = read_deployments(&args.deployments_path)?;
    let config = network.resolve(Some(record.network), Some(record.eth_deposit_address))?;
    let proxy = record.network_factory.ok_or_else(|| {
        ScriptError::Verification(format!(
            "{} records no network factory proxy",
            args.deployments_path.display()
        ))
    })?;
    let ledger = record.ledger()?;

    let provider = setup_provider(&config, None)?;
    let chain_id = fetch_chain_id(&provider, &config).await?;
    if chain_id != record.chain_id {
        warn!(
            expected = record.chain_id,
            actual = chain_id,
            "deployments file was recorded against a different chain"
        );
    }

    let client = RpcChainClient::read_only(provider);
    let expected =
        InitializerArgs::from_ledger(record.factory_admin, record.eth_deposit_address, &ledger)?;
    verify_network(
        &client,
        proxy,
        ledger.address_of(ContractRole::NetworkFactoryLogic)?,
        &expected,
    )
    .await
}

// -----------
// | Helpers |
// -----------

/// Read the implementation address out of a proxy's ERC-1967 slot
async fn implementation_of(
    client: &impl ChainClient,
    proxy: Address,
) -> Result<Address, ScriptError> {
    let word = client
        .storage_at(proxy, PROXY_IMPLEMENTATION_STORAGE_SLOT)
        .await
        .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
    Ok(address_from_storage_word(word))
}

/// Call an address-returning getter on the factory and compare the result
/// with its expected value
async fn check_getter<C: SolCall>(
    client: &impl ChainClient,
    factory: Address,
    call: C,
    expected: Address,
) -> Result<(), ScriptError> {
    let ret = client
        .call(factory, call.abi_encode().into())
        .await
        .map_err(|e| ScriptError::ContractInteraction(format!("{}: {e}", C::SIGNATURE)))?;
    let actual = Address::abi_decode(&ret)
        .map_err(|e| ScriptError::ContractInteraction(format!("{}: {e}", C::SIGNATURE)))?;

    check_field(C::SIGNATURE, expected, actual)
}

/// Compare an on-chain value with its expected value
fn check_field(name: &str, expected: Address, actual: Address) -> Result<(), ScriptError> {
    if expected != actual {
        return Err(ScriptError::Verification(format!(
            "{name} returned {actual:#x}, expected {expected:#x}"
        )));
    }

    Ok(())
}

/// Map a failed creation of `role` into a script error
fn deployment_error(role: ContractRole, err: ChainError) -> ScriptError {
    match err {
        ChainError::Reverted { reason, .. } => ScriptError::DeploymentReverted { role, reason },
        ChainError::Transport(e) => ScriptError::ContractDeployment(format!("{role}: {e}")),
    }
}

/// Map a failed initializer call into a script error, singling out a repeated
/// initialization
fn initializer_error(factory: Address, err: ChainError) -> ScriptError {
    match err {
        ChainError::Reverted { reason, data } => {
            let data: Option<&[u8]> = data
                .as_ref()
                .map(|data| &data[..])
                .filter(|data| !data.is_empty());
            if is_already_initialized(&reason, data) {
                return ScriptError::AlreadyInitialized(factory);
            }

            let reason = data.and_then(decode_revert_reason).unwrap_or(reason);
            ScriptError::RevertedTransaction(reason)
        }
        ChainError::Transport(e) => ScriptError::ContractInteraction(e),
    }
}

/// Whether a revert signals that the initializer already ran, judging by its
/// revert data when the node returned any
fn is_already_initialized(reason: &str, data: Option<&[u8]>) -> bool {
    let Some(data) = data else {
        return reason.contains(ALREADY_INITIALIZED_MESSAGE);
    };

    if data.starts_with(&solidity::InvalidInitialization::SELECTOR)
        || data.starts_with(&solidity::AlreadyInitialized::SELECTOR)
    {
        return true;
    }

    decode_revert_reason(data)
        .map(|decoded| decoded.contains(ALREADY_INITIALIZED_MESSAGE))
        .unwrap_or(false)
}
