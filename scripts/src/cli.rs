//! Definitions of CLI arguments and commands for deploy scripts

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::{
    commands::{
        deploy_executor, deploy_flash_attacks, deploy_governance, deploy_helper, deploy_main,
        deploy_mocked_token, deploy_strategy, init_governance, migrate_dev,
    },
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_DEPLOYMENTS_PATH, DEFAULT_EXECUTION_DELAY,
        DEFAULT_GRACE_PERIOD, DEFAULT_MAXIMUM_DELAY, DEFAULT_MINIMUM_DELAY,
        DEFAULT_MINIMUM_QUORUM, DEFAULT_PROPOSITION_THRESHOLD, DEFAULT_SOURCES_DIR,
        DEFAULT_VERIFY_ATTEMPTS, DEFAULT_VERIFY_DELAY_MS, DEFAULT_VOTE_DIFFERENTIAL,
        DEFAULT_VOTE_DURATION, DEFAULT_VOTING_DELAY, DEV_VOTE_DURATION,
    },
    deployer::Deployer,
    errors::ScriptError,
    ledger::LedgerClient,
    types::MockToken,
    verification::{ExplorerService, VerifierKind},
};

/// Deploys and wires the governance contracts
#[derive(Parser)]
pub struct Cli {
    /// Private key of the deployer
    #[arg(short, long, env = "PKEY")]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = "http://localhost:8545")]
    pub rpc_url: String,

    /// Path to the deployments file
    #[arg(short, long, default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments: String,

    /// Foundry output directory holding the contract artifacts
    #[arg(long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts: String,

    /// Directory holding the Solidity sources, used for verification
    #[arg(long, default_value = DEFAULT_SOURCES_DIR)]
    pub sources: String,

    /// The block explorer flavour to verify on
    #[arg(long, value_enum, default_value_t = VerifierKind::default())]
    pub verifier: VerifierKind,

    /// The block explorer's verification API url
    #[arg(long, env = "VERIFIER_URL")]
    pub verifier_url: Option<String>,

    /// The block explorer API key
    #[arg(long, env = "EXPLORER_API_KEY")]
    pub explorer_api_key: Option<String>,

    /// Number of verification attempts per contract
    #[arg(long, default_value_t = DEFAULT_VERIFY_ATTEMPTS)]
    pub verify_attempts: u32,

    /// Delay before each verification attempt, in milliseconds
    #[arg(long, default_value_t = DEFAULT_VERIFY_DELAY_MS)]
    pub verify_delay_ms: u64,

    /// Deploy governance contracts again even if the deployments file holds them
    #[arg(long)]
    pub redeploy: bool,

    /// Do not print the deployed addresses
    #[arg(long)]
    pub silent: bool,

    /// The script to run
    #[command(subcommand)]
    pub command: Command,
}

/// The deploy scripts
#[derive(Subcommand)]
pub enum Command {
    /// Deploy the full governance and hand ownership to the executor
    DeployMain(DeployMainArgs),
    /// Deploy the governance strategy
    DeployStrategy(DeployStrategyArgs),
    /// Deploy the executor
    DeployExecutor(DeployExecutorArgs),
    /// Deploy the governance core
    DeployGovernance(DeployGovernanceArgs),
    /// Deploy the governance helper
    DeployHelper(DeployHelperArgs),
    /// Deploy a mock token behind a proxy
    DeployMockedToken(DeployMockedTokenArgs),
    /// Deploy the flash attack test contract
    DeployFlashAttacks(DeployFlashAttacksArgs),
    /// Authorize the executor and hand it ownership of the governance core
    InitGovernance(InitGovernanceArgs),
    /// Deploy a development governance over mocked tokens
    MigrateDev(MigrateDevArgs),
}

impl Command {
    /// Runs the command against the given deployer
    pub async fn run<L: LedgerClient, E: ExplorerService>(
        self,
        deployer: &mut Deployer<L, E>,
        silent: bool,
    ) -> Result<(), ScriptError> {
        match self {
            Command::DeployMain(args) => deploy_main(args, deployer, silent).await,
            Command::DeployStrategy(args) => deploy_strategy(args, deployer, silent).await,
            Command::DeployExecutor(args) => deploy_executor(args, deployer, silent).await,
            Command::DeployGovernance(args) => deploy_governance(args, deployer, silent).await,
            Command::DeployHelper(args) => deploy_helper(args, deployer, silent).await,
            Command::DeployMockedToken(args) => deploy_mocked_token(args, deployer, silent).await,
            Command::DeployFlashAttacks(args) => {
                deploy_flash_attacks(args, deployer, silent).await
            }
            Command::InitGovernance(args) => init_governance(args, deployer, silent).await,
            Command::MigrateDev(args) => migrate_dev(args, deployer, silent).await,
        }
    }
}

/// Deploy the governance helper
#[derive(Args)]
pub struct DeployHelperArgs {
    /// Verify the deployed contract on the block explorer
    #[arg(long)]
    pub verify: bool,
}

/// The executor's constructor parameters, as decimal strings
#[derive(Args)]
pub struct ExecutorParamArgs {
    /// Delay between queueing and execution, in seconds
    #[arg(long, default_value = DEFAULT_EXECUTION_DELAY)]
    pub delay: String,

    /// Window after the delay in which a proposal can be executed, in seconds
    #[arg(long, default_value = DEFAULT_GRACE_PERIOD)]
    pub grace_period: String,

    /// Lowest delay the admin may set, in seconds
    #[arg(long, default_value = DEFAULT_MINIMUM_DELAY)]
    pub minimum_delay: String,

    /// Highest delay the admin may set, in seconds
    #[arg(long, default_value = DEFAULT_MAXIMUM_DELAY)]
    pub maximum_delay: String,

    /// Power needed to create a proposal, in basis points (100 = 1%)
    #[arg(long, default_value = DEFAULT_PROPOSITION_THRESHOLD)]
    pub proposition_threshold: String,

    /// Duration of a vote, in seconds
    #[arg(long, default_value = DEFAULT_VOTE_DURATION)]
    pub vote_duration: String,

    /// Required margin of for over against votes, in basis points
    #[arg(long, default_value = DEFAULT_VOTE_DIFFERENTIAL)]
    pub vote_differential: String,

    /// Minimum participation, in basis points
    #[arg(long, default_value = DEFAULT_MINIMUM_QUORUM)]
    pub minimum_quorum: String,
}

/// Deploy strategy, executor, governance core and helper, then hand
/// ownership of the governance core to the executor
#[derive(Args)]
pub struct DeployMainArgs {
    /// Governance token address in hex
    #[arg(long)]
    pub token: String,

    /// Staked governance token address in hex
    #[arg(long)]
    pub staked_token: String,

    /// Executor admin address, the deployer by default
    #[arg(long)]
    pub admin: Option<String>,

    /// Guardian address, the deployer by default
    #[arg(long)]
    pub guardian: Option<String>,

    /// Blocks between proposal creation and voting
    #[arg(long, default_value = DEFAULT_VOTING_DELAY)]
    pub voting_delay: String,

    /// The executor's parameters
    #[command(flatten)]
    pub executor: ExecutorParamArgs,

    /// Verify the deployed contracts on the block explorer
    #[arg(long)]
    pub verify: bool,
}

/// Deploy the governance strategy
#[derive(Args)]
pub struct DeployStrategyArgs {
    /// Governance token address in hex
    #[arg(long)]
    pub token: String,

    /// Staked governance token address in hex
    #[arg(long)]
    pub staked_token: String,

    /// Verify the deployed contracts on the block explorer
    #[arg(long)]
    pub verify: bool,
}

/// Deploy the executor
#[derive(Args)]
pub struct DeployExecutorArgs {
    /// Executor admin address, the deployer by default
    #[arg(long)]
    pub admin: Option<String>,

    /// The executor's parameters
    #[command(flatten)]
    pub executor: ExecutorParamArgs,

    /// Verify the deployed contracts on the block explorer
    #[arg(long)]
    pub verify: bool,
}

/// Deploy the governance core
#[derive(Args)]
pub struct DeployGovernanceArgs {
    /// Strategy address in hex, read from the deployments file by default
    #[arg(long)]
    pub strategy: Option<String>,

    /// Guardian address, the deployer by default
    #[arg(long)]
    pub guardian: Option<String>,

    /// Blocks between proposal creation and voting
    #[arg(long, default_value = DEFAULT_VOTING_DELAY)]
    pub voting_delay: String,

    /// Initially authorized executor addresses in hex
    #[arg(long, value_delimiter = ',')]
    pub executors: Vec<String>,

    /// Verify the deployed contracts on the block explorer
    #[arg(long)]
    pub verify: bool,
}

/// The mock tokens deployable from the command line
#[derive(ValueEnum, Copy, Clone)]
pub enum MockTokenKind {
    /// The mock governance token
    Governance,
    /// The mock staked governance token
    Staked,
}

impl From<MockTokenKind> for MockToken {
    fn from(kind: MockTokenKind) -> Self {
        match kind {
            MockTokenKind::Governance => MockToken::Governance,
            MockTokenKind::Staked => MockToken::Staked,
        }
    }
}

/// Deploy a mock token behind a proxy
#[derive(Args)]
pub struct DeployMockedTokenArgs {
    /// Which mock token to deploy
    #[arg(long, value_enum)]
    pub kind: MockTokenKind,

    /// Minter address, the deployer by default
    #[arg(long)]
    pub minter: Option<String>,

    /// Verify the deployed contracts on the block explorer
    #[arg(long)]
    pub verify: bool,
}

/// Deploy the flash attack test contract
#[derive(Args)]
pub struct DeployFlashAttacksArgs {
    /// Token address in hex
    #[arg(long)]
    pub token: String,

    /// Minter address in hex
    #[arg(long)]
    pub minter: String,

    /// Governance core address in hex
    #[arg(long)]
    pub governance: String,

    /// Verify the deployed contracts on the block explorer
    #[arg(long)]
    pub verify: bool,
}

/// Authorize the executor on the governance core and, optionally, make it the owner
#[derive(Args)]
pub struct InitGovernanceArgs {
    /// Governance core address in hex, read from the deployments file by default
    #[arg(long)]
    pub governance: Option<String>,

    /// Executor address in hex, read from the deployments file by default
    #[arg(long)]
    pub executor: Option<String>,

    /// Transfer ownership of the governance core to the executor
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub executor_as_owner: bool,
}

/// Deploy mocked tokens and a full governance over them for development
#[derive(Args)]
pub struct MigrateDevArgs {
    /// Minter of the mock tokens, the deployer by default
    #[arg(long)]
    pub minter: Option<String>,

    /// Blocks between proposal creation and voting
    #[arg(long, default_value = DEFAULT_VOTING_DELAY)]
    pub voting_delay: String,

    /// Duration of a vote, in seconds
    #[arg(long, default_value = DEV_VOTE_DURATION)]
    pub vote_duration: String,

    /// Transfer ownership of the governance core to the executor
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub executor_as_owner: bool,

    /// Verify the deployed contracts on the block explorer
    #[arg(long)]
    pub verify: bool,
}
