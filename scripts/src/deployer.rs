//! The deployment context shared by every script: ledger, artifacts,
//! deployments store, and explorer.

use alloy_primitives::Address;
use tracing::{info, warn};

use crate::{
    artifacts::Artifacts,
    errors::ScriptError,
    ledger::{deploy_and_confirm, LedgerClient},
    registry::DeploymentRegistry,
    types::{
        encode_constructor_args, storage_key, ConstructorArg, ContractIdentity, DeploymentRecord,
        GovernanceStep,
    },
    verification::{
        verify_with_retry, ExplorerService, RetryPolicy, VerificationOutcome, VerificationRequest,
    },
};

/// Deploys contracts, records them, and optionally verifies them
pub struct Deployer<L, E> {
    /// The ledger contracts are deployed to
    ledger: L,
    /// The explorer contracts are verified on
    explorer: E,
    /// The source of creation bytecode
    artifacts: Artifacts,
    /// The deployments store
    registry: DeploymentRegistry,
    /// The verification retry policy
    retry_policy: RetryPolicy,
    /// Whether singletons already in the store are deployed again
    redeploy: bool,
}

impl<L: LedgerClient, E: ExplorerService> Deployer<L, E> {
    /// Creates a deployer which reuses recorded singletons
    pub fn new(ledger: L, explorer: E, artifacts: Artifacts, registry: DeploymentRegistry) -> Self {
        Self {
            ledger,
            explorer,
            artifacts,
            registry,
            retry_policy: RetryPolicy::default(),
            redeploy: false,
        }
    }

    /// Sets the verification retry policy
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Deploys singletons even when the store already holds them
    pub fn with_redeploy(mut self, redeploy: bool) -> Self {
        self.redeploy = redeploy;
        self
    }

    /// The ledger client
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// The deployments store
    pub fn registry(&self) -> &DeploymentRegistry {
        &self.registry
    }

    /// The account deploying contracts
    pub fn sender(&self) -> Address {
        self.ledger.sender()
    }

    /// The recorded singleton a deploy of `identity` would reuse, if any
    pub fn recorded_singleton(&self, identity: ContractIdentity) -> Option<&DeploymentRecord> {
        self.reusable(&storage_key(identity, None), identity)
    }

    /// The record stored under `key` when `identity` is a singleton and
    /// redeploying is off
    fn reusable(&self, key: &str, identity: ContractIdentity) -> Option<&DeploymentRecord> {
        if !identity.is_singleton() || self.redeploy {
            return None;
        }
        self.registry.get(key)
    }

    /// Deploys `identity` with `args` and records it under `label ?? identity`.
    ///
    /// Singletons already present in the store are returned as recorded, without
    /// a deploy transaction, unless the deployer was built with `with_redeploy(true)`.
    pub async fn deploy(
        &mut self,
        identity: ContractIdentity,
        args: Vec<ConstructorArg>,
        verify: bool,
        label: Option<&str>,
    ) -> Result<DeploymentRecord, ScriptError> {
        let key = storage_key(identity, label);
        if let Some(existing) = self.reusable(&key, identity) {
            if existing.constructor_args != args {
                warn!(
                    %key,
                    address = %existing.address,
                    "recorded constructor arguments differ from the requested ones, reusing the recorded contract"
                );
            }
            info!(%key, address = %existing.address, "already deployed, skipping");
            return Ok(existing.clone());
        }

        info!(%key, "deploying");
        let bytecode = self.artifacts.bytecode(identity)?;
        let deployed =
            deploy_and_confirm(&self.ledger, &key, bytecode, encode_constructor_args(&args))
                .await?;
        info!(%key, address = %deployed.address, tx_hash = %deployed.tx_hash, "deployed");

        self.record(identity, deployed.address, args, verify, label)
            .await
    }

    /// Records an already-deployed contract and, if asked, verifies it.
    ///
    /// Persisting is local and happens first; verification is best-effort and
    /// its failure never fails the call.
    pub async fn record(
        &mut self,
        identity: ContractIdentity,
        address: Address,
        constructor_args: Vec<ConstructorArg>,
        verify: bool,
        label: Option<&str>,
    ) -> Result<DeploymentRecord, ScriptError> {
        let record = DeploymentRecord {
            identity,
            address,
            constructor_args,
            label: label.map(str::to_string),
        };
        self.registry.persist(record.clone())?;

        if verify {
            let request = VerificationRequest {
                identity,
                address,
                constructor_args: record.constructor_args.clone(),
                libraries: None,
            };
            self.verify(&request).await;
        }

        Ok(record)
    }

    /// Verifies a contract on the explorer, logging but swallowing failures
    pub async fn verify(&self, request: &VerificationRequest) -> VerificationOutcome {
        let outcome = verify_with_retry(&self.explorer, request, &self.retry_policy).await;
        if !outcome.is_verified() {
            warn!(
                contract = %request.identity,
                address = %request.address,
                attempts = outcome.attempts(),
                "continuing without verification"
            );
        }

        outcome
    }

    /// A halt report for `step`: the failure plus every contract already deployed
    pub(crate) fn halt(&self, step: GovernanceStep, source: ScriptError) -> ScriptError {
        ScriptError::StepFailed {
            step,
            deployed: self.registry.addresses(),
            source: Box::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy_primitives::{address, U256};
    use eyre::Result;

    use super::*;
    use crate::mock::{test_deployer, test_deployer_with, MockLedger, ScriptedExplorer};

    #[tokio::test]
    async fn test_deploy_persists_record_with_args() -> Result<()> {
        let mut deployer = test_deployer(ScriptedExplorer::always_succeeding());
        let token = address!("00000000000000000000000000000000000000aa");

        let record = deployer
            .deploy(
                ContractIdentity::GovernanceStrategy,
                vec![token.into(), U256::from(7).into()],
                false,
                None,
            )
            .await?;

        assert_eq!(deployer.registry().get("GovernanceStrategy"), Some(&record));
        let deploys = deployer.ledger().deploys();
        assert_eq!(deploys.len(), 1);
        assert_eq!(deploys[0].address, record.address);
        assert_eq!(deploys[0].bytecode.as_ref(), b"GovernanceStrategy");
        assert_eq!(
            deploys[0].constructor_args,
            encode_constructor_args(&record.constructor_args)
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_singleton_with_changed_args_is_reused_as_recorded() -> Result<()> {
        let mut deployer = test_deployer(ScriptedExplorer::always_succeeding());
        let old_token = address!("00000000000000000000000000000000000000aa");
        let new_token = address!("00000000000000000000000000000000000000bb");

        let first = deployer
            .deploy(ContractIdentity::GovernanceStrategy, vec![old_token.into()], false, None)
            .await?;
        let second = deployer
            .deploy(ContractIdentity::GovernanceStrategy, vec![new_token.into()], false, None)
            .await?;

        assert_eq!(second, first);
        assert_eq!(second.constructor_args, vec![ConstructorArg::Address(old_token)]);
        assert_eq!(deployer.ledger().deploys().len(), 1);
        assert_eq!(
            deployer.recorded_singleton(ContractIdentity::GovernanceStrategy),
            Some(&first)
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_verification_does_not_fail_deploy() -> Result<()> {
        let explorer = ScriptedExplorer::always_failing("backend unavailable");
        let mut deployer = test_deployer(explorer).with_retry_policy(RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(10),
            ..Default::default()
        });

        let record = deployer
            .deploy(ContractIdentity::GovernanceHelper, vec![], true, None)
            .await?;

        assert_eq!(deployer.explorer.attempts(), 2);
        assert!(deployer.registry().get_identity(ContractIdentity::GovernanceHelper).is_some());
        assert_eq!(record.identity, ContractIdentity::GovernanceHelper);
        Ok(())
    }

    #[tokio::test]
    async fn test_no_verification_without_flag() -> Result<()> {
        let mut deployer = test_deployer(ScriptedExplorer::always_succeeding());
        deployer
            .deploy(ContractIdentity::MockTransferHook, vec![], false, None)
            .await?;

        assert_eq!(deployer.explorer.attempts(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reverted_deploy_records_nothing() {
        let ledger = MockLedger::default();
        ledger.revert_deploys_of(b"Executor");
        let mut deployer = test_deployer_with(
            ledger,
            ScriptedExplorer::always_succeeding(),
            DeploymentRegistry::in_memory(),
        );

        let res = deployer
            .deploy(ContractIdentity::Executor, vec![], false, None)
            .await;

        assert!(matches!(res, Err(ScriptError::TransactionReverted(_))));
        assert!(deployer.registry().get_identity(ContractIdentity::Executor).is_none());
    }

    #[tokio::test]
    async fn test_non_singletons_always_redeploy() -> Result<()> {
        let mut deployer = test_deployer(ScriptedExplorer::always_succeeding());
        let first = deployer
            .deploy(ContractIdentity::MockTransferHook, vec![], false, None)
            .await?;
        let second = deployer
            .deploy(ContractIdentity::MockTransferHook, vec![], false, None)
            .await?;

        assert_ne!(first.address, second.address);
        assert_eq!(deployer.ledger().deploys().len(), 2);
        Ok(())
    }
}
