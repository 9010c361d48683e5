//! The governance deployment sequence and the wiring that follows it.
//!
//! Contracts are deployed in dependency order, each step consuming the address
//! produced by the previous one:
//!
//! strategy -> executor -> governance core -> helper
//!
//! Ownership of the governance core is handed to the executor afterwards, in
//! two separate transactions.

use alloy_primitives::{Address, U256};
use tracing::{info, warn};

use crate::{
    constants::{
        BPS_DENOMINATOR, DEFAULT_EXECUTION_DELAY, DEFAULT_GRACE_PERIOD, DEFAULT_MAXIMUM_DELAY,
        DEFAULT_MINIMUM_DELAY, DEFAULT_MINIMUM_QUORUM, DEFAULT_PROPOSITION_THRESHOLD,
        DEFAULT_VOTE_DIFFERENTIAL, DEFAULT_VOTE_DURATION, MOCK_TOKEN_INITIALIZE_SIGNATURE,
        ONE_ADDRESS,
    },
    deployer::Deployer,
    errors::ScriptError,
    ledger::{read_call, send_and_confirm, CallOptions, LedgerClient},
    proxy::{ProxyHandle, UpgradeableDeployment},
    solidity::IGovernanceCore,
    types::{
        ConstructorArg, ContractIdentity, DeploymentRecord, GovernanceDeploymentBundle,
        GovernanceStep, MockToken,
    },
    utils::parse_decimal,
    verification::ExplorerService,
};

/// The executor's constructor parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorParams {
    /// The executor's admin
    pub admin: Address,
    /// The delay between queueing and execution, in seconds
    pub delay: U256,
    /// The window after the delay in which a proposal can be executed, in seconds
    pub grace_period: U256,
    /// The lowest delay the admin may set, in seconds
    pub minimum_delay: U256,
    /// The highest delay the admin may set, in seconds
    pub maximum_delay: U256,
    /// The power needed to create a proposal, in basis points
    pub proposition_threshold: U256,
    /// The duration of a vote, in seconds
    pub vote_duration: U256,
    /// The required margin of for over against votes, in basis points
    pub vote_differential: U256,
    /// The minimum participation, in basis points
    pub minimum_quorum: U256,
}

impl ExecutorParams {
    /// The production parameters: a 7 day delay, 5 day grace period, 10 day votes,
    /// a 1.25% proposition threshold and 6.5% differential and quorum
    pub fn with_defaults(admin: Address) -> Result<Self, ScriptError> {
        Ok(Self {
            admin,
            delay: parse_decimal("delay", DEFAULT_EXECUTION_DELAY)?,
            grace_period: parse_decimal("grace period", DEFAULT_GRACE_PERIOD)?,
            minimum_delay: parse_decimal("minimum delay", DEFAULT_MINIMUM_DELAY)?,
            maximum_delay: parse_decimal("maximum delay", DEFAULT_MAXIMUM_DELAY)?,
            proposition_threshold: parse_decimal(
                "proposition threshold",
                DEFAULT_PROPOSITION_THRESHOLD,
            )?,
            vote_duration: parse_decimal("vote duration", DEFAULT_VOTE_DURATION)?,
            vote_differential: parse_decimal("vote differential", DEFAULT_VOTE_DIFFERENTIAL)?,
            minimum_quorum: parse_decimal("minimum quorum", DEFAULT_MINIMUM_QUORUM)?,
        })
    }

    /// Checks the delay bounds and the basis-point fields
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.minimum_delay > self.delay || self.delay > self.maximum_delay {
            return Err(ScriptError::InvalidParameter(format!(
                "delay {} outside [{}, {}]",
                self.delay, self.minimum_delay, self.maximum_delay
            )));
        }

        let denominator = U256::from(BPS_DENOMINATOR);
        for (name, value) in [
            ("proposition threshold", self.proposition_threshold),
            ("vote differential", self.vote_differential),
            ("minimum quorum", self.minimum_quorum),
        ] {
            if value > denominator {
                return Err(ScriptError::InvalidParameter(format!(
                    "{name} {value} exceeds the basis-point denominator {BPS_DENOMINATOR}"
                )));
            }
        }

        Ok(())
    }

    /// The constructor arguments, in declaration order
    pub fn to_args(&self) -> Vec<ConstructorArg> {
        vec![
            self.admin.into(),
            self.delay.into(),
            self.grace_period.into(),
            self.minimum_delay.into(),
            self.maximum_delay.into(),
            self.proposition_threshold.into(),
            self.vote_duration.into(),
            self.vote_differential.into(),
            self.minimum_quorum.into(),
        ]
    }
}

/// The inputs of a full governance deployment
#[derive(Clone, Debug)]
pub struct GovernancePlan {
    /// The governance token
    pub token: Address,
    /// The staked governance token
    pub staked_token: Address,
    /// The executor's parameters
    pub executor: ExecutorParams,
    /// The number of blocks between proposal creation and voting
    pub voting_delay: U256,
    /// The guardian allowed to cancel proposals
    pub guardian: Address,
}

/// The inputs of a development deployment on mocked tokens
#[derive(Clone, Debug)]
pub struct DevMigration {
    /// The minter of both mock tokens
    pub minter: Address,
    /// The number of blocks between proposal creation and voting
    pub voting_delay: U256,
    /// The duration of a vote, in seconds
    pub vote_duration: U256,
    /// Whether ownership of the governance core moves to the executor
    pub executor_as_owner: bool,
}

/// The authorization state of a governance core as read from the ledger
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GovernanceStatus {
    /// Whether the executor is authorized
    pub executor_authorized: bool,
    /// The current owner
    pub owner: Address,
}

impl<L: LedgerClient, E: ExplorerService> Deployer<L, E> {
    /// Deploys the strategy over a token and its staked counterpart
    pub async fn deploy_strategy(
        &mut self,
        token: Address,
        staked_token: Address,
        verify: bool,
    ) -> Result<DeploymentRecord, ScriptError> {
        let args = vec![token.into(), staked_token.into()];
        self.deploy(ContractIdentity::GovernanceStrategy, args, verify, None)
            .await
    }

    /// Deploys the executor, checking its parameters before any transaction is sent
    pub async fn deploy_executor(
        &mut self,
        params: &ExecutorParams,
        verify: bool,
    ) -> Result<DeploymentRecord, ScriptError> {
        params.validate()?;
        self.deploy(ContractIdentity::Executor, params.to_args(), verify, None)
            .await
    }

    /// Deploys the governance core with an initial, possibly empty, executor list
    pub async fn deploy_governance_core(
        &mut self,
        strategy: Address,
        voting_delay: U256,
        guardian: Address,
        executors: Vec<Address>,
        verify: bool,
    ) -> Result<DeploymentRecord, ScriptError> {
        let args = vec![
            strategy.into(),
            voting_delay.into(),
            guardian.into(),
            executors.into(),
        ];
        self.deploy(ContractIdentity::GovernanceCore, args, verify, None)
            .await
    }

    /// Deploys the governance helper
    pub async fn deploy_helper(&mut self, verify: bool) -> Result<DeploymentRecord, ScriptError> {
        self.deploy(ContractIdentity::GovernanceHelper, vec![], verify, None)
            .await
    }

    /// Deploys strategy, executor, governance core and helper in order.
    ///
    /// A failing step halts the run with a [`ScriptError::StepFailed`] listing
    /// every contract already in the deployments store.
    pub async fn deploy_full_governance(
        &mut self,
        plan: &GovernancePlan,
        verify: bool,
    ) -> Result<GovernanceDeploymentBundle, ScriptError> {
        plan.executor.validate()?;

        let strategy = self
            .deploy_strategy(plan.token, plan.staked_token, verify)
            .await
            .map_err(|e| self.halt(GovernanceStep::Strategy, e))?;
        let executor = self
            .deploy_executor(&plan.executor, verify)
            .await
            .map_err(|e| self.halt(GovernanceStep::Executor, e))?;
        let governance = self
            .deploy_governance_core(
                strategy.address,
                plan.voting_delay,
                plan.guardian,
                vec![executor.address],
                verify,
            )
            .await
            .map_err(|e| self.halt(GovernanceStep::GovernanceCore, e))?;
        let helper = self
            .deploy_helper(verify)
            .await
            .map_err(|e| self.halt(GovernanceStep::Helper, e))?;

        Ok(GovernanceDeploymentBundle {
            strategy,
            executor,
            governance,
            helper,
        })
    }

    /// Authorizes `executor` on the governance core
    pub async fn authorize_executor(
        &self,
        governance: Address,
        executor: Address,
    ) -> Result<(), ScriptError> {
        let call = IGovernanceCore::authorizeExecutorsCall {
            executors: vec![executor],
        };
        send_and_confirm(self.ledger(), governance, &call, CallOptions::default()).await?;

        info!(%governance, %executor, "executor authorized");
        Ok(())
    }

    /// Transfers ownership of the governance core
    pub async fn transfer_ownership(
        &self,
        governance: Address,
        new_owner: Address,
    ) -> Result<(), ScriptError> {
        let call = IGovernanceCore::transferOwnershipCall { newOwner: new_owner };
        send_and_confirm(self.ledger(), governance, &call, CallOptions::default()).await?;

        info!(%governance, %new_owner, "ownership transferred");
        Ok(())
    }

    /// Authorizes `executor` and, if `executor_as_owner`, makes it the owner of the
    /// governance core, then reads the resulting state back.
    ///
    /// Steps already reflected on the ledger are skipped, so a re-run sends nothing
    /// once the executor owns the governance core.
    pub async fn init_governance(
        &self,
        governance: Address,
        executor: Address,
        executor_as_owner: bool,
    ) -> Result<GovernanceStatus, ScriptError> {
        let current = self.governance_status(governance, executor).await?;
        if current.owner == executor {
            info!(%governance, %executor, "ownership already handed to the executor");
            return Ok(current);
        }

        if current.executor_authorized {
            info!(%governance, %executor, "executor already authorized");
        } else {
            self.authorize_executor(governance, executor).await?;
        }
        if executor_as_owner {
            // An interruption here leaves the executor authorized but not owner
            warn!(%governance, %executor, "executor authorized, transferring ownership");
            self.transfer_ownership(governance, executor).await?;
        }

        let status = self.governance_status(governance, executor).await?;
        info!(
            %governance,
            %executor,
            authorized = status.executor_authorized,
            owner = %status.owner,
            "governance initialized"
        );
        Ok(status)
    }

    /// Reads whether `executor` is authorized and who owns the governance core
    pub async fn governance_status(
        &self,
        governance: Address,
        executor: Address,
    ) -> Result<GovernanceStatus, ScriptError> {
        let executor_authorized = read_call(
            self.ledger(),
            governance,
            &IGovernanceCore::isExecutorAuthorizedCall { executor },
        )
        .await?;
        let owner = read_call(self.ledger(), governance, &IGovernanceCore::ownerCall {}).await?;

        Ok(GovernanceStatus {
            executor_authorized,
            owner,
        })
    }

    /// Deploys a mock token behind a proxy, with a fresh transfer hook as its governance
    pub async fn deploy_mocked_token(
        &mut self,
        kind: MockToken,
        minter: Address,
        verify: bool,
    ) -> Result<ProxyHandle, ScriptError> {
        let hook = self
            .deploy(
                ContractIdentity::MockTransferHook,
                vec![],
                verify,
                Some(kind.transfer_hook_label()),
            )
            .await?;

        let admin = self.sender();
        self.deploy_upgradeable(UpgradeableDeployment {
            proxy_label: kind.identity().to_string(),
            implementation: kind.identity(),
            implementation_label: Some(kind.implementation_label().to_string()),
            initializer_signature: MOCK_TOKEN_INITIALIZE_SIGNATURE.to_string(),
            initializer_args: vec![minter.into(), hook.address.into(), ONE_ADDRESS.into()],
            admin,
            verify,
        })
        .await
    }

    /// Deploys the flash attack test contract
    pub async fn deploy_flash_attacks(
        &mut self,
        token: Address,
        minter: Address,
        governance: Address,
        verify: bool,
    ) -> Result<DeploymentRecord, ScriptError> {
        let args = vec![token.into(), minter.into(), governance.into()];
        self.deploy(ContractIdentity::FlashAttacks, args, verify, None)
            .await
    }

    /// Deploys a complete development governance over freshly mocked tokens.
    ///
    /// The governance core starts with no executors; the executor is administered
    /// by the governance core and authorized once deployed. A re-run over a recorded
    /// strategy reuses its tokens instead of mocking new ones.
    pub async fn migrate_dev(
        &mut self,
        migration: &DevMigration,
        verify: bool,
    ) -> Result<GovernanceDeploymentBundle, ScriptError> {
        let (token, staked_token) = match self.recorded_tokens() {
            Some(tokens) => {
                info!("strategy already deployed, reusing its mock tokens");
                tokens
            }
            None => (
                self.deploy_dev_token(MockToken::Governance, migration.minter, verify)
                    .await?,
                self.deploy_dev_token(MockToken::Staked, migration.minter, verify)
                    .await?,
            ),
        };

        let strategy = self
            .deploy_strategy(token, staked_token, verify)
            .await
            .map_err(|e| self.halt(GovernanceStep::Strategy, e))?;
        let guardian = self.sender();
        let governance = self
            .deploy_governance_core(
                strategy.address,
                migration.voting_delay,
                guardian,
                vec![],
                verify,
            )
            .await
            .map_err(|e| self.halt(GovernanceStep::GovernanceCore, e))?;
        let helper = self
            .deploy_helper(verify)
            .await
            .map_err(|e| self.halt(GovernanceStep::Helper, e))?;

        let mut params = ExecutorParams::with_defaults(governance.address)?;
        params.vote_duration = migration.vote_duration;
        let executor = self
            .deploy_executor(&params, verify)
            .await
            .map_err(|e| self.halt(GovernanceStep::Executor, e))?;

        self.init_governance(
            governance.address,
            executor.address,
            migration.executor_as_owner,
        )
        .await?;

        Ok(GovernanceDeploymentBundle {
            strategy,
            executor,
            governance,
            helper,
        })
    }

    /// The token and staked token the recorded strategy was deployed over, if the
    /// strategy would be reused
    fn recorded_tokens(&self) -> Option<(Address, Address)> {
        let strategy = self.recorded_singleton(ContractIdentity::GovernanceStrategy)?;
        match strategy.constructor_args.as_slice() {
            [ConstructorArg::Address(token), ConstructorArg::Address(staked_token)] => {
                Some((*token, *staked_token))
            }
            _ => None,
        }
    }

    /// Deploys a development mock token, reporting the step on failure
    async fn deploy_dev_token(
        &mut self,
        kind: MockToken,
        minter: Address,
        verify: bool,
    ) -> Result<Address, ScriptError> {
        self.deploy_mocked_token(kind, minter, verify)
            .await
            .map(|handle| handle.address())
            .map_err(|e| self.halt(GovernanceStep::MockToken(kind), e))
    }
}
