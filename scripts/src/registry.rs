//! The deployments store: every deployed contract's address and constructor
//! arguments, keyed by label or identity and persisted as JSON.
//!
//! The file has the shape
//! `{ "deployments": { "<key>": { "contract", "address", "constructorArgs", "label"? } } }`.
//! It is read once at startup and rewritten after every change, so an
//! interrupted run leaves behind exactly the contracts it managed to deploy.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::Address;
use serde::Deserialize;
use tracing::debug;

use crate::{
    constants::DEPLOYMENTS_KEY,
    errors::ScriptError,
    types::{storage_key, ContractIdentity, DeploymentRecord},
};

/// The on-disk layout of the deployments file
#[derive(Default, Deserialize)]
struct DeploymentsFile {
    /// Records keyed by storage key
    #[serde(rename = "deployments", default)]
    deployments: BTreeMap<String, DeploymentRecord>,
}

/// The persisted set of deployment records
#[derive(Debug, Default)]
pub struct DeploymentRegistry {
    /// The backing file, if any
    path: Option<PathBuf>,
    /// Records keyed by storage key
    records: BTreeMap<String, DeploymentRecord>,
}

impl DeploymentRegistry {
    /// Opens the deployments file at `path`, starting empty if it does not exist yet
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ScriptError> {
        let path = path.into();
        let records = if path.exists() {
            read_deployments_file(&path)?.deployments
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), records = records.len(), "loaded deployments");
        Ok(Self {
            path: Some(path),
            records,
        })
    }

    /// A registry which is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// The record stored under `key`
    pub fn get(&self, key: &str) -> Option<&DeploymentRecord> {
        self.records.get(key)
    }

    /// The record stored for `identity` under its default key
    pub fn get_identity(&self, identity: ContractIdentity) -> Option<&DeploymentRecord> {
        self.get(&storage_key(identity, None))
    }

    /// The address stored for `identity`, failing if none is recorded
    pub fn require(&self, identity: ContractIdentity) -> Result<Address, ScriptError> {
        self.get_identity(identity)
            .map(|record| record.address)
            .ok_or_else(|| {
                ScriptError::DependencyUnavailable(format!(
                    "no {identity} address supplied or recorded in the deployments file"
                ))
            })
    }

    /// All records, ordered by key
    pub fn records(&self) -> impl Iterator<Item = &DeploymentRecord> {
        self.records.values()
    }

    /// `(key, address)` for every record, ordered by key
    pub fn addresses(&self) -> Vec<(String, Address)> {
        self.records
            .iter()
            .map(|(key, record)| (key.clone(), record.address))
            .collect()
    }

    /// Stores `record` under its key, replacing any previous entry, and flushes to disk
    pub fn persist(&mut self, record: DeploymentRecord) -> Result<(), ScriptError> {
        let key = record.key();
        self.records.insert(key.clone(), record);
        self.flush()?;

        debug!(%key, "persisted deployment");
        Ok(())
    }

    /// Writes every record to the backing file
    fn flush(&self) -> Result<(), ScriptError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut file = serde_json::Map::new();
        file.insert(
            DEPLOYMENTS_KEY.to_string(),
            serde_json::to_value(&self.records)
                .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?,
        );
        let contents = serde_json::to_string_pretty(&file)
            .map_err(|e| ScriptError::WriteDeployments(e.to_string()))?;

        fs::write(path, contents).map_err(|e| ScriptError::WriteDeployments(e.to_string()))
    }
}

/// Reads and parses a deployments file
fn read_deployments_file(path: &Path) -> Result<DeploymentsFile, ScriptError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ReadDeployments(format!("{}: {e}", path.display())))?;
    if contents.trim().is_empty() {
        return Ok(DeploymentsFile::default());
    }

    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ReadDeployments(format!("{}: {e}", path.display())))
}
