//! Utilities for the deploy scripts.

use std::{fs, io::ErrorKind, path::Path, str::FromStr};

use alloy::{
    primitives::{Address, B256},
    providers::{DynProvider, ProviderBuilder},
    rpc::client::RpcClient,
    signers::local::PrivateKeySigner,
    transports::http::{reqwest, Http},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::NetworkConfig,
    constants::{NUM_BYTES_ADDRESS, NUM_BYTES_STORAGE_SLOT},
    errors::ScriptError,
};

/// Sets up the provider with which the contracts are deployed and queried.
///
/// When a signer is given, transactions are signed with it and nonces are
/// fetched from the node before every transaction.
pub fn setup_provider(
    config: &NetworkConfig,
    signer: Option<PrivateKeySigner>,
) -> Result<DynProvider, ScriptError> {
    let mut http_client = reqwest::Client::builder();
    if let Some(proxy) = &config.http_proxy {
        let proxy = reqwest::Proxy::all(proxy.clone())
            .map_err(|e| ScriptError::Configuration(format!("invalid HTTP proxy: {e}")))?;
        http_client = http_client.proxy(proxy);
    }
    let http_client = http_client
        .build()
        .map_err(|e| ScriptError::Configuration(format!("error building HTTP client: {e}")))?;

    let transport = Http::with_client(http_client, config.rpc_url.clone());
    let is_local = transport.guess_local();
    let rpc_client = RpcClient::new(transport, is_local);

    let provider = match signer {
        Some(signer) => DynProvider::new(
            ProviderBuilder::new()
                .wallet(signer)
                .with_simple_nonce_management()
                .connect_client(rpc_client),
        ),
        None => DynProvider::new(ProviderBuilder::new().connect_client(rpc_client)),
    };

    Ok(provider)
}

/// Extract the address held in the low-order bytes of a storage word
pub fn address_from_storage_word(word: B256) -> Address {
    Address::from_slice(&word[NUM_BYTES_STORAGE_SLOT - NUM_BYTES_ADDRESS..NUM_BYTES_STORAGE_SLOT])
}

/// Load an env file into the process environment.
///
/// A missing file is skipped, any other failure to read or parse it is an error.
pub fn load_env_file(path: &Path) -> Result<(), ScriptError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(()),
        Err(dotenvy::Error::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ScriptError::Configuration(format!("{}: {e}", path.display()))),
    }
}

/// Parse a hex address given on the command line
pub fn parse_address(address: &str) -> Result<Address, ScriptError> {
    Address::from_str(address)
        .map_err(|e| ScriptError::CalldataConstruction(format!("invalid address {address}: {e}")))
}

/// Read a JSON deployments file
pub fn read_deployments<T: DeserializeOwned>(file_path: &Path) -> Result<T, ScriptError> {
    let contents = fs::read_to_string(file_path)
        .map_err(|e| ScriptError::ReadDeployments(format!("{}: {e}", file_path.display())))?;
    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ReadDeployments(format!("{}: {e}", file_path.display())))
}

/// Write a JSON deployments file, replacing any previous contents
pub fn write_deployments<T: Serialize>(file_path: &Path, deployments: &T) -> Result<(), ScriptError> {
    if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| ScriptError::WriteDeployments(format!("{}: {e}", parent.display())))?;
    }

    let contents = serde_json::to_string_pretty(deployments)
        .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;
    fs::write(file_path, contents)
        .map_err(|e| ScriptError::WriteDeployments(format!("{}: {e}", file_path.display())))
}
