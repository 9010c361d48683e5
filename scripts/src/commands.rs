//! Implementations of the various deploy scripts

use alloy_primitives::Address;
use tracing::info;

use crate::{
    cli::{
        DeployExecutorArgs, DeployFlashAttacksArgs, DeployGovernanceArgs, DeployHelperArgs,
        DeployMainArgs, DeployMockedTokenArgs, DeployStrategyArgs, ExecutorParamArgs,
        InitGovernanceArgs, MigrateDevArgs,
    },
    deployer::Deployer,
    errors::ScriptError,
    ledger::LedgerClient,
    orchestrator::{DevMigration, ExecutorParams, GovernancePlan},
    types::{ContractIdentity, GovernanceDeploymentBundle, MockToken},
    utils::{parse_address, parse_address_or, parse_bps, parse_decimal},
    verification::ExplorerService,
};

/// Deploys the full governance and hands ownership to the executor
pub async fn deploy_main<L: LedgerClient, E: ExplorerService>(
    args: DeployMainArgs,
    deployer: &mut Deployer<L, E>,
    silent: bool,
) -> Result<(), ScriptError> {
    let sender = deployer.sender();
    let admin = parse_address_or("admin", args.admin.as_deref(), sender)?;
    let plan = GovernancePlan {
        token: parse_address("token", &args.token)?,
        staked_token: parse_address("staked token", &args.staked_token)?,
        executor: executor_params(&args.executor, admin)?,
        voting_delay: parse_decimal("voting delay", &args.voting_delay)?,
        guardian: parse_address_or("guardian", args.guardian.as_deref(), sender)?,
    };

    let bundle = deployer.deploy_full_governance(&plan, args.verify).await?;
    deployer
        .init_governance(bundle.governance.address, bundle.executor.address, true)
        .await?;

    if !silent {
        log_bundle(&bundle);
    }
    Ok(())
}

/// Deploys the governance strategy
pub async fn deploy_strategy<L: LedgerClient, E: ExplorerService>(
    args: DeployStrategyArgs,
    deployer: &mut Deployer<L, E>,
    silent: bool,
) -> Result<(), ScriptError> {
    let token = parse_address("token", &args.token)?;
    let staked_token = parse_address("staked token", &args.staked_token)?;

    let strategy = deployer
        .deploy_strategy(token, staked_token, args.verify)
        .await?;

    if !silent {
        info!("Strategy address: {:#x}", strategy.address);
    }
    Ok(())
}

/// Deploys the executor
pub async fn deploy_executor<L: LedgerClient, E: ExplorerService>(
    args: DeployExecutorArgs,
    deployer: &mut Deployer<L, E>,
    silent: bool,
) -> Result<(), ScriptError> {
    let admin = parse_address_or("admin", args.admin.as_deref(), deployer.sender())?;
    let params = executor_params(&args.executor, admin)?;

    let executor = deployer.deploy_executor(&params, args.verify).await?;

    if !silent {
        info!("Executor address: {:#x}", executor.address);
    }
    Ok(())
}

/// Deploys the governance core, reading the strategy from the deployments file if not given
pub async fn deploy_governance<L: LedgerClient, E: ExplorerService>(
    args: DeployGovernanceArgs,
    deployer: &mut Deployer<L, E>,
    silent: bool,
) -> Result<(), ScriptError> {
    let strategy = address_or_recorded(
        deployer,
        "strategy",
        args.strategy.as_deref(),
        ContractIdentity::GovernanceStrategy,
    )?;
    let guardian = parse_address_or("guardian", args.guardian.as_deref(), deployer.sender())?;
    let voting_delay = parse_decimal("voting delay", &args.voting_delay)?;
    let executors = args
        .executors
        .iter()
        .map(|executor| parse_address("executor", executor))
        .collect::<Result<Vec<_>, _>>()?;

    let governance = deployer
        .deploy_governance_core(strategy, voting_delay, guardian, executors, args.verify)
        .await?;

    if !silent {
        info!("Governance address: {:#x}", governance.address);
    }
    Ok(())
}

/// Deploys the governance helper
pub async fn deploy_helper<L: LedgerClient, E: ExplorerService>(
    args: DeployHelperArgs,
    deployer: &mut Deployer<L, E>,
    silent: bool,
) -> Result<(), ScriptError> {
    let helper = deployer.deploy_helper(args.verify).await?;

    if !silent {
        info!("Governance helper address: {:#x}", helper.address);
    }
    Ok(())
}

/// Deploys a mock token behind a proxy
pub async fn deploy_mocked_token<L: LedgerClient, E: ExplorerService>(
    args: DeployMockedTokenArgs,
    deployer: &mut Deployer<L, E>,
    silent: bool,
) -> Result<(), ScriptError> {
    let minter = parse_address_or("minter", args.minter.as_deref(), deployer.sender())?;
    let kind = MockToken::from(args.kind);

    let token = deployer
        .deploy_mocked_token(kind, minter, args.verify)
        .await?;

    if !silent {
        info!("{} address: {:#x}", kind.identity(), token.address());
        info!(
            "{} address: {:#x}",
            kind.implementation_label(),
            token.implementation.address
        );
    }
    Ok(())
}

/// Deploys the flash attack test contract
pub async fn deploy_flash_attacks<L: LedgerClient, E: ExplorerService>(
    args: DeployFlashAttacksArgs,
    deployer: &mut Deployer<L, E>,
    silent: bool,
) -> Result<(), ScriptError> {
    let token = parse_address("token", &args.token)?;
    let minter = parse_address("minter", &args.minter)?;
    let governance = parse_address("governance", &args.governance)?;

    let flash_attacks = deployer
        .deploy_flash_attacks(token, minter, governance, args.verify)
        .await?;

    if !silent {
        info!("FlashAttacks address: {:#x}", flash_attacks.address);
    }
    Ok(())
}

/// Authorizes the executor and optionally hands it ownership of the governance core
pub async fn init_governance<L: LedgerClient, E: ExplorerService>(
    args: InitGovernanceArgs,
    deployer: &mut Deployer<L, E>,
    silent: bool,
) -> Result<(), ScriptError> {
    let governance = address_or_recorded(
        deployer,
        "governance",
        args.governance.as_deref(),
        ContractIdentity::GovernanceCore,
    )?;
    let executor = address_or_recorded(
        deployer,
        "executor",
        args.executor.as_deref(),
        ContractIdentity::Executor,
    )?;

    let status = deployer
        .init_governance(governance, executor, args.executor_as_owner)
        .await?;

    if !silent {
        info!("Executor authorized: {}", status.executor_authorized);
        info!("Governance owner: {:#x}", status.owner);
    }
    Ok(())
}

/// Deploys a development governance over mocked tokens
pub async fn migrate_dev<L: LedgerClient, E: ExplorerService>(
    args: MigrateDevArgs,
    deployer: &mut Deployer<L, E>,
    silent: bool,
) -> Result<(), ScriptError> {
    let migration = DevMigration {
        minter: parse_address_or("minter", args.minter.as_deref(), deployer.sender())?,
        voting_delay: parse_decimal("voting delay", &args.voting_delay)?,
        vote_duration: parse_decimal("vote duration", &args.vote_duration)?,
        executor_as_owner: args.executor_as_owner,
    };

    let bundle = deployer.migrate_dev(&migration, args.verify).await?;

    if !silent {
        log_bundle(&bundle);
        info!("Contracts deployed for development");
    }
    Ok(())
}

/// Parses the executor's decimal-string parameters and checks them
fn executor_params(args: &ExecutorParamArgs, admin: Address) -> Result<ExecutorParams, ScriptError> {
    let params = ExecutorParams {
        admin,
        delay: parse_decimal("delay", &args.delay)?,
        grace_period: parse_decimal("grace period", &args.grace_period)?,
        minimum_delay: parse_decimal("minimum delay", &args.minimum_delay)?,
        maximum_delay: parse_decimal("maximum delay", &args.maximum_delay)?,
        proposition_threshold: parse_bps("proposition threshold", &args.proposition_threshold)?,
        vote_duration: parse_decimal("vote duration", &args.vote_duration)?,
        vote_differential: parse_bps("vote differential", &args.vote_differential)?,
        minimum_quorum: parse_bps("minimum quorum", &args.minimum_quorum)?,
    };
    params.validate()?;

    Ok(params)
}

/// Parses an address argument, falling back to the address recorded for `identity`
fn address_or_recorded<L: LedgerClient, E: ExplorerService>(
    deployer: &Deployer<L, E>,
    name: &str,
    value: Option<&str>,
    identity: ContractIdentity,
) -> Result<Address, ScriptError> {
    match value {
        Some(value) => parse_address(name, value),
        None => deployer.registry().require(identity),
    }
}

/// Prints the addresses of a governance deployment
fn log_bundle(bundle: &GovernanceDeploymentBundle) {
    info!("Deployed addresses:");
    info!("- Governance: {:#x}", bundle.governance.address);
    info!("- Executor: {:#x}", bundle.executor.address);
    info!("- Governance strategy: {:#x}", bundle.strategy.address);
    info!("- Governance helper: {:#x}", bundle.helper.address);
}
