//! Loading compiled contracts from Foundry build artifacts

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::Bytes;
use serde::Deserialize;
use walkdir::WalkDir;

use crate::{
    constants::{ARTIFACT_EXTENSION, SOLIDITY_EXTENSION},
    errors::ScriptError,
    types::ContractIdentity,
};

/// The subset of a Foundry artifact the scripts read
#[derive(Deserialize)]
struct FoundryArtifact {
    /// The creation bytecode
    bytecode: ArtifactBytecode,
}

/// A bytecode entry of a Foundry artifact
#[derive(Deserialize)]
struct ArtifactBytecode {
    /// The hex-encoded bytecode
    object: String,
}

/// A source of contract creation bytecode
#[derive(Clone, Debug, Default)]
pub struct Artifacts {
    /// The Foundry output directory, `out` by default
    out_dir: PathBuf,
    /// Bytecode supplied in memory, taking precedence over the output directory
    preloaded: HashMap<String, Bytes>,
}

impl Artifacts {
    /// Reads artifacts from the given Foundry output directory
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            preloaded: HashMap::new(),
        }
    }

    /// Serves the given artifact name / bytecode pairs without touching disk
    pub fn preloaded<I, S>(bytecodes: I) -> Self
    where
        I: IntoIterator<Item = (S, Bytes)>,
        S: Into<String>,
    {
        Self {
            out_dir: PathBuf::new(),
            preloaded: bytecodes
                .into_iter()
                .map(|(name, code)| (name.into(), code))
                .collect(),
        }
    }

    /// The creation bytecode of the contract backing `identity`
    pub fn bytecode(&self, identity: ContractIdentity) -> Result<Bytes, ScriptError> {
        let name = identity.artifact_name();
        if let Some(code) = self.preloaded.get(name) {
            return Ok(code.clone());
        }

        let path = self.artifact_path(name);
        let contents = fs::read_to_string(&path)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))?;
        let artifact: FoundryArtifact = serde_json::from_str(&contents)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {e}", path.display())))?;

        let object = artifact.bytecode.object;
        let code = hex::decode(object.trim_start_matches("0x")).map_err(|e| {
            ScriptError::ArtifactParsing(format!("{name} bytecode is not plain hex: {e}"))
        })?;
        if code.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "{name} has no creation bytecode"
            )));
        }

        Ok(code.into())
    }

    /// The Foundry artifact path for a contract, `<out>/<Name>.sol/<Name>.json`
    fn artifact_path(&self, name: &str) -> PathBuf {
        self.out_dir
            .join(format!("{name}.{SOLIDITY_EXTENSION}"))
            .join(format!("{name}.{ARTIFACT_EXTENSION}"))
    }
}

/// Finds the Solidity source declaring `contract_name` under `sources_dir`,
/// returning it in the `<path>:<Name>` form explorers expect
pub fn find_contract_path(sources_dir: &Path, contract_name: &str) -> Result<String, ScriptError> {
    let file_name = format!("{contract_name}.{SOLIDITY_EXTENSION}");
    for entry in WalkDir::new(sources_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
        if entry.file_type().is_file() && entry.file_name() == file_name.as_str() {
            return Ok(format!("{}:{contract_name}", entry.path().display()));
        }
    }

    Err(ScriptError::ArtifactParsing(format!(
        "contract path not found for {contract_name} under {}",
        sources_dir.display()
    )))
}
