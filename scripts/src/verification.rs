//! Best-effort source verification of deployed contracts on a block explorer.
//!
//! A contract is already live by the time it is verified, so nothing here ever
//! fails a deployment. Each request runs through a small state machine:
//!
//! - `Attempting`: wait the configured delay, then submit
//! - `Succeeded`: the explorer accepted the source
//! - `FatalAborted`: the explorer returned an error retrying cannot fix
//! - `Exhausted`: every attempt failed with a transient error
//!
//! Before the first attempt the engine waits once more so the explorer can
//! index the freshly broadcast contract.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
    path::PathBuf,
    time::Duration,
};

use alloy_primitives::Address;
use clap::ValueEnum;
use itertools::Itertools;
use tokio::{process::Command, time::sleep};
use tracing::{error, info, warn};

use crate::{
    artifacts::find_contract_path,
    constants::{
        DEFAULT_VERIFY_ATTEMPTS, DEFAULT_VERIFY_DELAY_MS, EXPLORER_INDEXING_DELAY,
        FATAL_VERIFICATION_ERRORS, FORGE_COMMAND, VERIFY_CONTRACT_COMMAND,
    },
    errors::ScriptError,
    types::{encode_constructor_args, ConstructorArg, ContractIdentity},
};

/// A request to verify one deployed contract
#[derive(Clone, Debug)]
pub struct VerificationRequest {
    /// The contract's identity, naming its Solidity source
    pub identity: ContractIdentity,
    /// The deployed address
    pub address: Address,
    /// The constructor arguments used at deployment
    pub constructor_args: Vec<ConstructorArg>,
    /// Linked libraries, `<path>:<Name>` to address
    pub libraries: Option<BTreeMap<String, Address>>,
}

/// A block explorer accepting source verification submissions
#[allow(async_fn_in_trait)]
pub trait ExplorerService {
    /// Checks that a request can be submitted at all, before any attempt is made.
    ///
    /// A failure here is not retried.
    fn check_request(&self, _request: &VerificationRequest) -> Result<(), ScriptError> {
        Ok(())
    }

    /// Submits a single verification attempt
    async fn submit_verification(&self, request: &VerificationRequest)
        -> Result<(), ScriptError>;
}

/// How verification attempts are spaced and when they give up
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// The total number of attempts
    pub max_attempts: u32,
    /// The wait before every attempt
    pub delay: Duration,
    /// The one-time wait before the first attempt
    pub indexing_delay: Duration,
    /// Substrings marking an explorer error as not worth retrying
    pub fatal_patterns: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_VERIFY_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_VERIFY_DELAY_MS),
            indexing_delay: EXPLORER_INDEXING_DELAY,
            fatal_patterns: FATAL_VERIFICATION_ERRORS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl RetryPolicy {
    /// Whether an explorer error message matches a fatal pattern
    pub fn is_fatal(&self, message: &str) -> bool {
        self.fatal_patterns
            .iter()
            .any(|pattern| message.contains(pattern.as_str()))
    }
}

/// The mutable part of an in-flight verification
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts left before giving up
    pub attempts_remaining: u32,
    /// The wait before the next attempt
    pub delay: Duration,
}

/// The terminal state of a verification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The explorer accepted the source
    Succeeded {
        /// The number of attempts made
        attempts: u32,
    },
    /// The explorer returned a fatal error, no further attempts were made
    FatalAborted {
        /// The number of attempts made
        attempts: u32,
        /// The fatal error message
        message: String,
    },
    /// Every attempt failed
    Exhausted {
        /// The number of attempts made
        attempts: u32,
        /// The last error message, if any attempt was made
        last_error: Option<String>,
    },
}

impl VerificationOutcome {
    /// Whether the contract ended up verified
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Succeeded { .. })
    }

    /// The number of attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            VerificationOutcome::Succeeded { attempts }
            | VerificationOutcome::FatalAborted { attempts, .. }
            | VerificationOutcome::Exhausted { attempts, .. } => *attempts,
        }
    }
}

/// Verifies a contract, retrying transient explorer errors.
///
/// Never fails: the outcome is logged and returned for inspection.
pub async fn verify_with_retry<E: ExplorerService>(
    explorer: &E,
    request: &VerificationRequest,
    policy: &RetryPolicy,
) -> VerificationOutcome {
    let contract = request.identity;
    let address = request.address;
    if policy.max_attempts == 0 {
        warn!(%contract, %address, "verification skipped, no attempts configured");
        return VerificationOutcome::Exhausted {
            attempts: 0,
            last_error: None,
        };
    }

    if let Err(e) = explorer.check_request(request) {
        let message = e.to_string();
        error!(%contract, %address, %message, "cannot submit verification");
        return VerificationOutcome::FatalAborted {
            attempts: 0,
            message,
        };
    }

    info!(
        %contract,
        %address,
        wait_secs = policy.indexing_delay.as_secs(),
        "waiting for the explorer to index the contract"
    );
    sleep(policy.indexing_delay).await;

    let mut state = RetryState {
        attempts_remaining: policy.max_attempts,
        delay: policy.delay,
    };
    let mut attempts = 0;
    let mut last_error = None;

    while state.attempts_remaining > 0 {
        sleep(state.delay).await;
        attempts += 1;

        let message = match explorer.submit_verification(request).await {
            Ok(()) => {
                info!(%contract, %address, attempts, "contract verified");
                return VerificationOutcome::Succeeded { attempts };
            }
            Err(e) => e.to_string(),
        };

        if policy.is_fatal(&message) {
            error!(%contract, %address, %message, "fatal verification error, skipping retries");
            return VerificationOutcome::FatalAborted { attempts, message };
        }

        state.attempts_remaining -= 1;
        warn!(
            %contract,
            %address,
            %message,
            attempts_remaining = state.attempts_remaining,
            "verification attempt failed"
        );
        last_error = Some(message);
    }

    error!(%contract, %address, attempts, "verification failed after all retries");
    VerificationOutcome::Exhausted {
        attempts,
        last_error,
    }
}

// -------------------
// | Forge verifier |
// -------------------

/// The explorer flavours `forge verify-contract` can submit to
#[derive(ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum VerifierKind {
    /// A Blockscout instance
    #[default]
    Blockscout,
    /// Etherscan or an Etherscan-compatible explorer
    Etherscan,
    /// Sourcify
    Sourcify,
}

impl Display for VerifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifierKind::Blockscout => write!(f, "blockscout"),
            VerifierKind::Etherscan => write!(f, "etherscan"),
            VerifierKind::Sourcify => write!(f, "sourcify"),
        }
    }
}

/// Submits verifications by shelling out to `forge verify-contract`
#[derive(Clone, Debug)]
pub struct ForgeVerifier {
    /// The explorer flavour
    pub verifier: VerifierKind,
    /// The explorer's verification API url
    pub verifier_url: Option<String>,
    /// The explorer API key
    pub api_key: Option<String>,
    /// The RPC url of the chain the contracts live on
    pub rpc_url: String,
    /// The directory holding the Solidity sources
    pub sources_dir: PathBuf,
}

impl ForgeVerifier {
    /// Builds the `forge verify-contract` argument list for a request
    fn args(&self, request: &VerificationRequest) -> Result<Vec<String>, ScriptError> {
        let contract_path = find_contract_path(&self.sources_dir, request.identity.artifact_name())?;

        let mut args = vec![
            VERIFY_CONTRACT_COMMAND.to_string(),
            format!("{:#x}", request.address),
            contract_path,
            "--verifier".to_string(),
            self.verifier.to_string(),
            "--rpc-url".to_string(),
            self.rpc_url.clone(),
            "--watch".to_string(),
        ];

        if !request.constructor_args.is_empty() {
            args.push("--constructor-args".to_string());
            args.push(hex::encode(encode_constructor_args(&request.constructor_args)));
        }
        if let Some(url) = &self.verifier_url {
            args.push("--verifier-url".to_string());
            args.push(url.clone());
        }
        if let Some(key) = &self.api_key {
            args.push("--etherscan-api-key".to_string());
            args.push(key.clone());
        }
        if let Some(libraries) = &request.libraries {
            for (library, address) in libraries {
                args.push("--libraries".to_string());
                args.push(format!("{library}:{address:#x}"));
            }
        }

        Ok(args)
    }
}

impl ExplorerService for ForgeVerifier {
    fn check_request(&self, request: &VerificationRequest) -> Result<(), ScriptError> {
        find_contract_path(&self.sources_dir, request.identity.artifact_name()).map(|_| ())
    }

    async fn submit_verification(
        &self,
        request: &VerificationRequest,
    ) -> Result<(), ScriptError> {
        let args = self.args(request)?;
        info!(
            contract = %request.identity,
            address = %request.address,
            args = %request.constructor_args.iter().join(", "),
            "submitting verification"
        );

        let output = Command::new(FORGE_COMMAND)
            .args(&args)
            .output()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?;

        if output.status.success() {
            return Ok(());
        }

        // forge reports explorer errors on either stream
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        Err(ScriptError::Verification(format!(
            "{} {}",
            stderr.trim(),
            stdout.trim()
        )))
    }
}
