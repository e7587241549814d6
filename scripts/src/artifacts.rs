//! Loading of compiled contract artifacts into deployable blueprints.
//!
//! Artifacts are produced by an external build and are read-only here. Both
//! the Hardhat layout (`"bytecode": "0x…"`) and the Foundry layout
//! (`"bytecode": { "object": "0x…" }`) are understood.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::JsonAbi,
    primitives::Bytes,
    sol_types::SolCall,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    constants::{
        ARTIFACT_EXTENSION, BUILD_INFO_DIR, INITIALIZER_FUNCTION_NAME, SOLIDITY_SOURCE_EXTENSION,
    },
    errors::ScriptError,
    solidity::INetworkFactory::initCall,
    types::ContractRole,
};

/// The subset of a compilation artifact needed for deployment
#[derive(Deserialize)]
struct ArtifactFile {
    /// The contract ABI
    abi: JsonAbi,
    /// The creation bytecode
    bytecode: ArtifactBytecode,
}

/// The creation bytecode, in either of the supported layouts
#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactBytecode {
    /// Hardhat: the bytecode as a hex string
    Hex(Bytes),
    /// Foundry: the bytecode nested under `object`
    Object {
        /// The bytecode as a hex string
        object: Bytes,
    },
}

impl ArtifactBytecode {
    /// Unwrap the bytecode
    fn into_bytes(self) -> Bytes {
        match self {
            ArtifactBytecode::Hex(bytes) | ArtifactBytecode::Object { object: bytes } => bytes,
        }
    }
}

/// A deployable contract type: its ABI and creation bytecode
#[derive(Clone, Debug)]
pub struct ContractBlueprint {
    /// The role this blueprint is deployed as
    role: ContractRole,
    /// The contract ABI
    abi: JsonAbi,
    /// The creation bytecode
    bytecode: Bytes,
}

impl ContractBlueprint {
    /// Create a blueprint, rejecting empty creation bytecode (interfaces and
    /// abstract contracts compile to none)
    pub fn new(role: ContractRole, abi: JsonAbi, bytecode: Bytes) -> Result<Self, ScriptError> {
        if bytecode.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "`{}` has no creation bytecode",
                role.contract_name()
            )));
        }

        Ok(Self {
            role,
            abi,
            bytecode,
        })
    }

    /// Parse a blueprint from the contents of an artifact file
    pub fn from_artifact_json(role: ContractRole, json: &str) -> Result<Self, ScriptError> {
        let artifact: ArtifactFile = serde_json::from_str(json).map_err(|e| {
            ScriptError::ArtifactParsing(format!("`{}`: {e}", role.contract_name()))
        })?;
        Self::new(role, artifact.abi, artifact.bytecode.into_bytes())
    }

    /// The role this blueprint is deployed as
    pub fn role(&self) -> ContractRole {
        self.role
    }

    /// The contract ABI
    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    /// The creation bytecode, without constructor arguments
    pub fn bytecode(&self) -> &Bytes {
        &self.bytecode
    }

    /// The init code of a creation transaction: the bytecode followed by the
    /// constructor arguments encoded against the ABI's constructor
    pub fn deployment_code(&self, args: &[DynSolValue]) -> Result<Bytes, ScriptError> {
        let encoded_args = match self.abi.constructor() {
            Some(constructor) => constructor.abi_encode_input(args).map_err(|e| {
                ScriptError::CalldataConstruction(format!(
                    "`{}` constructor: {e}",
                    self.role.contract_name()
                ))
            })?,
            None if args.is_empty() => Vec::new(),
            None => {
                return Err(ScriptError::CalldataConstruction(format!(
                    "`{}` has no constructor but {} arguments were given",
                    self.role.contract_name(),
                    args.len()
                )))
            }
        };

        let mut code = self.bytecode.to_vec();
        code.extend_from_slice(&encoded_args);
        Ok(code.into())
    }
}

/// One blueprint for every role the deployment needs
#[derive(Clone, Debug)]
pub struct ContractRegistry {
    /// The blueprints, keyed by role
    blueprints: HashMap<ContractRole, ContractBlueprint>,
}

impl ContractRegistry {
    /// Build a registry from already-parsed blueprints.
    ///
    /// Every role must be covered, and the factory's initializer must match
    /// the one the scripts encode.
    pub fn from_blueprints(
        blueprints: impl IntoIterator<Item = ContractBlueprint>,
    ) -> Result<Self, ScriptError> {
        let blueprints: HashMap<_, _> = blueprints.into_iter().map(|b| (b.role(), b)).collect();

        if let Some(missing) = ContractRole::ALL.iter().find(|r| !blueprints.contains_key(r)) {
            return Err(ScriptError::ArtifactNotFound {
                contract: missing.contract_name(),
                search_path: "<provided blueprints>".to_string(),
            });
        }

        let registry = Self { blueprints };
        registry.check_initializer()?;
        Ok(registry)
    }

    /// Load every role's artifact from the given directory
    pub fn load(artifacts_dir: &Path) -> Result<Self, ScriptError> {
        if !artifacts_dir.is_dir() {
            return Err(ScriptError::Configuration(format!(
                "artifacts directory {} does not exist",
                artifacts_dir.display()
            )));
        }

        let mut blueprints = Vec::with_capacity(ContractRole::ALL.len());
        for role in ContractRole::ALL {
            let path = find_artifact(artifacts_dir, role.contract_name())?;
            debug!(role = %role, path = %path.display(), "loading artifact");

            let json = fs::read_to_string(&path)
                .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))?;
            blueprints.push(ContractBlueprint::from_artifact_json(role, &json)?);
        }

        info!(artifacts = %artifacts_dir.display(), "loaded contract artifacts");
        Self::from_blueprints(blueprints)
    }

    /// The blueprint of the given role
    pub fn blueprint(&self, role: ContractRole) -> &ContractBlueprint {
        // Construction guarantees every role is present
        &self.blueprints[&role]
    }

    /// Check that the factory ABI declares the initializer the scripts encode,
    /// so that arguments are never sent in an order the contract does not expect
    fn check_initializer(&self) -> Result<(), ScriptError> {
        let factory = self.blueprint(ContractRole::NetworkFactoryLogic);
        let initializers = factory
            .abi()
            .function(INITIALIZER_FUNCTION_NAME)
            .map(Vec::as_slice)
            .unwrap_or_default();

        if initializers.iter().any(|f| f.selector().0 == initCall::SELECTOR) {
            return Ok(());
        }

        let found = initializers.iter().map(|f| f.signature()).collect::<Vec<_>>();
        Err(ScriptError::ArtifactParsing(format!(
            "`{}` does not declare {}, found {found:?}",
            factory.role().contract_name(),
            initCall::SIGNATURE
        )))
    }
}

/// Locate the artifact of `contract_name` under `dir`.
///
/// Prefers artifacts nested under a `<contract_name>.sol` directory, which is
/// where both Hardhat and Foundry place them.
fn find_artifact(dir: &Path, contract_name: &'static str) -> Result<PathBuf, ScriptError> {
    let file_name = format!("{contract_name}.{ARTIFACT_EXTENSION}");
    let mut candidates = Vec::new();
    collect_files_named(dir, &file_name, &mut candidates)?;
    candidates.sort();

    let source_dir = format!("{contract_name}.{SOLIDITY_SOURCE_EXTENSION}");
    let preferred: Vec<_> = candidates
        .iter()
        .filter(|path| {
            path.parent()
                .and_then(Path::file_name)
                .is_some_and(|parent| parent.to_str() == Some(source_dir.as_str()))
        })
        .collect();

    match (preferred.as_slice(), candidates.as_slice()) {
        ([path], _) => Ok((*path).clone()),
        ([], [path]) => Ok(path.clone()),
        ([], []) => Err(ScriptError::ArtifactNotFound {
            contract: contract_name,
            search_path: dir.display().to_string(),
        }),
        _ => Err(ScriptError::ArtifactParsing(format!(
            "`{contract_name}` is ambiguous, found {candidates:?}"
        ))),
    }
}

/// Recursively collect the files named `file_name` under `dir`
fn collect_files_named(
    dir: &Path,
    file_name: &str,
    found: &mut Vec<PathBuf>,
) -> Result<(), ScriptError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", dir.display())))?;

    for entry in entries {
        let path = entry
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?
            .path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

        if path.is_dir() {
            if name != BUILD_INFO_DIR {
                collect_files_named(&path, file_name, found)?;
            }
        } else if name == file_name {
            found.push(path);
        }
    }

    Ok(())
}
