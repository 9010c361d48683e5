//! Deployment of upgradeable contracts behind an
//! `InitializableAdminUpgradeabilityProxy`.
//!
//! An upgradeable deployment is three transactions: the proxy shell, the
//! implementation, and one `initialize(logic, admin, data)` call on the proxy
//! which binds the implementation and runs its initializer in the proxy's
//! storage. If that last call fails the proxy stays deployed but unbound, and
//! both records remain in the deployments store for manual follow-up.

use alloy_primitives::Address;
use tracing::{error, info};

use crate::{
    constants::PROXY_INITIALIZE_GAS_LIMIT,
    deployer::Deployer,
    errors::ScriptError,
    ledger::{send_and_confirm, CallOptions, LedgerClient},
    solidity::IInitializableAdminUpgradeabilityProxy,
    types::{encode_function_call, ConstructorArg, ContractIdentity, DeploymentRecord},
    verification::ExplorerService,
};

/// What to deploy behind a proxy and how to initialize it
#[derive(Clone, Debug)]
pub struct UpgradeableDeployment {
    /// The storage key of the proxy
    pub proxy_label: String,
    /// The implementation contract
    pub implementation: ContractIdentity,
    /// The storage key of the implementation, defaulting to its identity
    pub implementation_label: Option<String>,
    /// The initializer's Solidity signature, e.g. `initialize(address,address,address)`
    pub initializer_signature: String,
    /// The initializer's arguments
    pub initializer_args: Vec<ConstructorArg>,
    /// The admin of the proxy
    pub admin: Address,
    /// Whether to verify the proxy and the implementation
    pub verify: bool,
}

/// The two records of an initialized upgradeable deployment
#[derive(Clone, Debug)]
pub struct ProxyHandle {
    /// The proxy contract
    pub proxy: DeploymentRecord,
    /// The implementation the proxy delegates to
    pub implementation: DeploymentRecord,
}

impl ProxyHandle {
    /// The address callers interact with
    pub fn address(&self) -> Address {
        self.proxy.address
    }
}

impl<L: LedgerClient, E: ExplorerService> Deployer<L, E> {
    /// Deploys a proxy and an implementation, then binds and initializes them in one call
    pub async fn deploy_upgradeable(
        &mut self,
        deployment: UpgradeableDeployment,
    ) -> Result<ProxyHandle, ScriptError> {
        let data = encode_function_call(
            &deployment.initializer_signature,
            &deployment.initializer_args,
        )?;
        let proxy = self
            .deploy(
                ContractIdentity::InitializableAdminUpgradeabilityProxy,
                vec![],
                deployment.verify,
                Some(&deployment.proxy_label),
            )
            .await?;
        let implementation = self
            .deploy(
                deployment.implementation,
                vec![],
                deployment.verify,
                deployment.implementation_label.as_deref(),
            )
            .await?;

        let call = IInitializableAdminUpgradeabilityProxy::initializeCall {
            logic: implementation.address,
            admin: deployment.admin,
            data,
        };
        let options = CallOptions {
            gas_limit: Some(PROXY_INITIALIZE_GAS_LIMIT),
        };

        send_and_confirm(self.ledger(), proxy.address, &call, options)
            .await
            .inspect_err(|e| {
                error!(
                    proxy = %proxy.address,
                    implementation = %implementation.address,
                    error = %e,
                    "proxy left uninitialized"
                )
            })?;

        info!(
            label = %deployment.proxy_label,
            proxy = %proxy.address,
            implementation = %implementation.address,
            "proxy initialized"
        );
        Ok(ProxyHandle {
            proxy,
            implementation,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;
    use alloy_sol_types::SolCall;
    use eyre::Result;

    use super::*;
    use crate::{
        constants::{MOCK_TOKEN_INITIALIZE_SIGNATURE, ONE_ADDRESS},
        ledger::read_call,
        mock::{
            test_deployer, test_deployer_with, IGovernanceTokenMock, MockLedger,
            ScriptedExplorer, MOCK_SENDER,
        },
        registry::DeploymentRegistry,
    };

    const MINTER: Address = address!("00000000000000000000000000000000000000d1");
    const HOOK: Address = address!("00000000000000000000000000000000000000d2");

    /// A mock governance token behind a proxy
    fn token_deployment() -> UpgradeableDeployment {
        UpgradeableDeployment {
            proxy_label: "GovernanceTokenMock".to_string(),
            implementation: ContractIdentity::GovernanceTokenMock,
            implementation_label: Some("GovernanceTokenMockImpl".to_string()),
            initializer_signature: MOCK_TOKEN_INITIALIZE_SIGNATURE.to_string(),
            initializer_args: vec![MINTER.into(), HOOK.into(), ONE_ADDRESS.into()],
            admin: MOCK_SENDER,
            verify: false,
        }
    }

    #[tokio::test]
    async fn test_proxy_observes_initializer_state() -> Result<()> {
        let mut deployer = test_deployer(ScriptedExplorer::always_succeeding());
        let handle = deployer.deploy_upgradeable(token_deployment()).await?;

        assert_ne!(handle.address(), handle.implementation.address);
        let ledger = deployer.ledger();
        let proxy = ledger.proxy(handle.address()).unwrap();
        assert_eq!(proxy.implementation, Some(handle.implementation.address));
        assert_eq!(proxy.admin, Some(MOCK_SENDER));

        let minter =
            read_call(ledger, handle.address(), &IGovernanceTokenMock::minterCall {}).await?;
        let governance =
            read_call(ledger, handle.address(), &IGovernanceTokenMock::governanceCall {}).await?;
        assert_eq!(minter, MINTER);
        assert_eq!(governance, HOOK);

        // The implementation's own storage is untouched
        let implementation_minter = read_call(
            ledger,
            handle.implementation.address,
            &IGovernanceTokenMock::minterCall {},
        )
        .await?;
        assert_eq!(implementation_minter, Address::ZERO);
        Ok(())
    }

    #[tokio::test]
    async fn test_records_proxy_and_implementation_separately() -> Result<()> {
        let mut deployer = test_deployer(ScriptedExplorer::always_succeeding());
        let handle = deployer.deploy_upgradeable(token_deployment()).await?;

        let registry = deployer.registry();
        let proxy = registry.get("GovernanceTokenMock").unwrap();
        assert_eq!(proxy.identity, ContractIdentity::InitializableAdminUpgradeabilityProxy);
        assert_eq!(proxy.address, handle.address());
        let implementation = registry.get("GovernanceTokenMockImpl").unwrap();
        assert_eq!(implementation.identity, ContractIdentity::GovernanceTokenMock);
        assert_eq!(implementation.address, handle.implementation.address);
        Ok(())
    }

    #[tokio::test]
    async fn test_each_call_deploys_a_fresh_pair() -> Result<()> {
        let mut deployer = test_deployer(ScriptedExplorer::always_succeeding());
        let first = deployer.deploy_upgradeable(token_deployment()).await?;
        let second = deployer.deploy_upgradeable(token_deployment()).await?;

        assert_ne!(first.address(), second.address());
        assert_eq!(deployer.ledger().deploys().len(), 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_reverted_initialize_keeps_records() {
        let ledger = MockLedger::default();
        ledger.revert_calls_to(IInitializableAdminUpgradeabilityProxy::initializeCall::SELECTOR);
        let mut deployer = test_deployer_with(
            ledger,
            ScriptedExplorer::always_succeeding(),
            DeploymentRegistry::in_memory(),
        );

        let res = deployer.deploy_upgradeable(token_deployment()).await;
        assert!(matches!(res, Err(ScriptError::TransactionReverted(_))));

        let registry = deployer.registry();
        let proxy = registry.get("GovernanceTokenMock").unwrap().address;
        assert!(registry.get("GovernanceTokenMockImpl").is_some());
        assert_eq!(deployer.ledger().proxy(proxy).unwrap().implementation, None);
    }

    #[tokio::test]
    async fn test_bad_initializer_signature_sends_no_call() {
        let mut deployer = test_deployer(ScriptedExplorer::always_succeeding());
        let mut deployment = token_deployment();
        deployment.initializer_signature = "initialize(address".to_string();

        let res = deployer.deploy_upgradeable(deployment).await;
        assert!(matches!(res, Err(ScriptError::CalldataConstruction(_))));
        assert!(deployer.ledger().deploys().is_empty());
        assert!(deployer.ledger().calls().is_empty());
    }
}
