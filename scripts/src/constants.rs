//! Constants used in the governance deploy scripts

use std::time::Duration;

use alloy_primitives::{address, Address};

// ---------------
// | Ledger / RPC |
// ---------------

/// The number of confirmations to wait for on every deployment and call
pub const NUM_CONFIRMATIONS: u64 = 1;

/// The gas limit used for the proxy `initialize(address,address,bytes)` call
pub const PROXY_INITIALIZE_GAS_LIMIT: u64 = 1_000_000;

/// The signature of the mock token initializer
pub const MOCK_TOKEN_INITIALIZE_SIGNATURE: &str = "initialize(address,address,address)";

/// The placeholder token address passed to the mock token initializer
pub const ONE_ADDRESS: Address = address!("0000000000000000000000000000000000000001");

// -------------
// | Artifacts |
// -------------

/// The deployments key in the deployments file
pub const DEPLOYMENTS_KEY: &str = "deployments";

/// The default path of the deployments file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";

/// The default Foundry build output directory
pub const DEFAULT_ARTIFACTS_DIR: &str = "out";

/// The default Solidity sources directory
pub const DEFAULT_SOURCES_DIR: &str = "contracts";

/// The extension of a Solidity source file
pub const SOLIDITY_EXTENSION: &str = "sol";

/// The extension of a Foundry artifact file
pub const ARTIFACT_EXTENSION: &str = "json";

// ------------------
// | Executor setup |
// ------------------

/// The denominator of every basis-point parameter passed to the executor.
///
/// A value of 100 represents 1%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Time between queueing and execution, in seconds (7 days)
pub const DEFAULT_EXECUTION_DELAY: &str = "604800";

/// Grace period after the execution delay, in seconds (5 days)
pub const DEFAULT_GRACE_PERIOD: &str = "432000";

/// Minimum allowed execution delay, in seconds
pub const DEFAULT_MINIMUM_DELAY: &str = "10";

/// Maximum allowed execution delay, in seconds (30 days)
pub const DEFAULT_MAXIMUM_DELAY: &str = "2592000";

/// Voting period, in seconds (10 days)
pub const DEFAULT_VOTE_DURATION: &str = "864000";

/// Voting power required to create a proposal, in basis points (1.25%)
pub const DEFAULT_PROPOSITION_THRESHOLD: &str = "125";

/// Required difference between for and against votes, in basis points (6.5%)
pub const DEFAULT_VOTE_DIFFERENTIAL: &str = "650";

/// Minimum participation, in basis points (6.5%)
pub const DEFAULT_MINIMUM_QUORUM: &str = "650";

/// Number of blocks between proposal creation and the start of voting
pub const DEFAULT_VOTING_DELAY: &str = "15";

/// The voting period used by the development migration, in seconds
pub const DEV_VOTE_DURATION: &str = "1000";

// ----------------
// | Verification |
// ----------------

/// The one-time wait before the first verification attempt, letting the
/// explorer index the freshly deployed contract
pub const EXPLORER_INDEXING_DELAY: Duration = Duration::from_secs(10);

/// The default number of verification attempts
pub const DEFAULT_VERIFY_ATTEMPTS: u32 = 10;

/// The default delay before each verification attempt, in milliseconds
pub const DEFAULT_VERIFY_DELAY_MS: u64 = 5_000;

/// Explorer error messages which retrying cannot resolve
pub const FATAL_VERIFICATION_ERRORS: [&str; 2] = [
    "The address provided as argument contains a contract, but its bytecode",
    "Rate limit reached",
];

/// The name of the `forge` command
pub const FORGE_COMMAND: &str = "forge";

/// The `forge` subcommand used to verify a deployed contract
pub const VERIFY_CONTRACT_COMMAND: &str = "verify-contract";
