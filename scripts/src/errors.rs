//! Definitions of errors that can occur during the execution of the governance deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use alloy_primitives::Address;
use itertools::Itertools;

use crate::types::GovernanceStep;

/// Errors that can occur during the execution of the governance deploy scripts
#[derive(Debug)]
pub enum ScriptError {
    /// Error reading the deployments file
    ReadDeployments(String),
    /// Error writing the deployments file
    WriteDeployments(String),
    /// Error parsing a Foundry compilation artifact
    ArtifactParsing(String),
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error constructing calldata for a contract method or constructor
    CalldataConstruction(String),
    /// Error submitting a contract deployment
    ContractDeployment(String),
    /// Error submitting a call to, or reading from, a contract
    ContractInteraction(String),
    /// The ledger included a deployment or call but it reverted
    TransactionReverted(String),
    /// A contract address required by a step is neither supplied nor recorded
    DependencyUnavailable(String),
    /// A caller-supplied parameter is malformed or out of range
    InvalidParameter(String),
    /// The block explorer rejected a verification attempt
    Verification(String),
    /// Error de/serializing calldata or return data
    Serde(String),
    /// An orchestration step failed after earlier steps had completed
    StepFailed {
        /// The step that failed
        step: GovernanceStep,
        /// Every contract present in the deployments store when the step failed
        deployed: Vec<(String, Address)>,
        /// The underlying failure
        source: Box<ScriptError>,
    },
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ReadDeployments(s) => write!(f, "error reading deployments: {}", s),
            ScriptError::WriteDeployments(s) => write!(f, "error writing deployments: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::TransactionReverted(s) => write!(f, "transaction reverted: {}", s),
            ScriptError::DependencyUnavailable(s) => write!(f, "dependency unavailable: {}", s),
            ScriptError::InvalidParameter(s) => write!(f, "invalid parameter: {}", s),
            ScriptError::Verification(s) => write!(f, "verification failed: {}", s),
            ScriptError::Serde(s) => write!(f, "error de/serializing calldata: {}", s),
            ScriptError::StepFailed {
                step,
                deployed,
                source,
            } => {
                write!(f, "{} step failed: {}", step, source)?;
                if deployed.is_empty() {
                    write!(f, " (no contracts deployed)")
                } else {
                    let listing = deployed
                        .iter()
                        .map(|(key, address)| format!("{key}={address}"))
                        .join(", ");
                    write!(f, " (already deployed: {})", listing)
                }
            }
        }
    }
}

impl Error for ScriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ScriptError::StepFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
