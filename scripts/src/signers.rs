//! Resolution of the two actors of a deployment: the deployer, which signs
//! every transaction, and the factory admin, which is handed control of the
//! network factory by the initializer

use std::{
    fmt::{self, Debug, Formatter},
    str::FromStr,
};

use alloy::{
    primitives::Address,
    providers::{DynProvider, Provider},
    signers::local::PrivateKeySigner,
};
use tracing::info;

use crate::{
    client::RpcChainClient,
    config::NetworkConfig,
    constants::{DEPLOYER_KEY_ENV_VAR, FACTORY_ADMIN_KEY_ENV_VAR},
    errors::ScriptError,
    utils::setup_provider,
};

/// A credentialed actor bound to a network
#[derive(Clone)]
pub struct Identity {
    /// The signing key
    signer: PrivateKeySigner,
    /// The chain the identity was resolved against
    chain_id: u64,
}

impl Identity {
    /// The public address of the identity
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// The chain the identity was resolved against
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// The signing key
    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

// Only the address is printed, never the key
impl Debug for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("address", &self.address())
            .field("chain_id", &self.chain_id)
            .finish()
    }
}

/// The resolved actors of a deployment, and the deployer's connection
pub struct Signers {
    /// The identity signing every deployment transaction
    pub deployer: Identity,
    /// The identity the network factory is administered by
    pub admin: Identity,
    /// The deployer's connection to the network
    pub client: RpcChainClient,
}

/// Parse a private key, naming the variable it came from on failure
pub fn parse_signer(key: Option<&str>, name: &str) -> Result<PrivateKeySigner, ScriptError> {
    let key = key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| ScriptError::Configuration(format!("{name} is not set")))?;

    // The parse error is dropped, it may echo parts of the key
    PrivateKeySigner::from_str(key)
        .map_err(|_| ScriptError::Configuration(format!("{name} is not a valid private key")))
}

/// Resolve the deployer and admin identities against the configured network.
///
/// Fails before any transaction is sent if either key is missing or malformed,
/// if both keys are the same, or if the endpoint cannot be reached.
pub async fn resolve_signers(
    deployer_key: Option<&str>,
    admin_key: Option<&str>,
    config: &NetworkConfig,
    confirmations: u64,
) -> Result<Signers, ScriptError> {
    let deployer = parse_signer(deployer_key, DEPLOYER_KEY_ENV_VAR)?;
    let admin = parse_signer(admin_key, FACTORY_ADMIN_KEY_ENV_VAR)?;
    if deployer.address() == admin.address() {
        return Err(ScriptError::Configuration(format!(
            "{DEPLOYER_KEY_ENV_VAR} and {FACTORY_ADMIN_KEY_ENV_VAR} must be distinct accounts"
        )));
    }

    let provider = setup_provider(config, Some(deployer.clone()))?;
    let chain_id = fetch_chain_id(&provider, config).await?;

    let deployer = Identity {
        signer: deployer,
        chain_id,
    };
    let admin = Identity {
        signer: admin,
        chain_id,
    };

    info!(address = %deployer.address(), chain_id, "deployer account");
    info!(address = %admin.address(), chain_id, "factory admin account");

    let client = RpcChainClient::new(provider, deployer.address(), confirmations);
    Ok(Signers {
        deployer,
        admin,
        client,
    })
}

/// Query the chain id, which doubles as a reachability check of the endpoint
pub async fn fetch_chain_id(
    provider: &DynProvider,
    config: &NetworkConfig,
) -> Result<u64, ScriptError> {
    provider.get_chain_id().await.map_err(|e| {
        ScriptError::Configuration(format!("{} endpoint is unreachable: {e}", config.network))
    })
}
