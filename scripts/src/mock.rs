//! In-memory stand-ins for the ledger and the block explorer, used in tests.
//!
//! The mock ledger models just enough contract behaviour to check the scripts:
//! governance ownership and executor authorization, and proxies that accept a
//! single `initialize(address,address,bytes)` call.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
};

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{address, Address, Bytes, TxHash, B256, U256};
use alloy_sol_types::{sol, SolCall};
use tokio::time::Instant;

use crate::{
    artifacts::Artifacts,
    deployer::Deployer,
    errors::ScriptError,
    ledger::{CallOptions, LedgerClient, Receipt},
    registry::DeploymentRegistry,
    solidity::{IGovernanceCore, IInitializableAdminUpgradeabilityProxy},
    types::ContractIdentity,
    verification::ExplorerService,
};

sol! {
    /// The mock token surface observed through its proxy
    interface IGovernanceTokenMock {
        function initialize(address minter, address governance, address token) external;
        function minter() external view returns (address);
        function governance() external view returns (address);
    }
}

/// The deployer account of the mock ledger, the first default Anvil account
pub(crate) const MOCK_SENDER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");

/// Every identity the scripts can deploy
const ALL_IDENTITIES: [ContractIdentity; 9] = [
    ContractIdentity::GovernanceStrategy,
    ContractIdentity::Executor,
    ContractIdentity::GovernanceCore,
    ContractIdentity::GovernanceHelper,
    ContractIdentity::InitializableAdminUpgradeabilityProxy,
    ContractIdentity::MockTransferHook,
    ContractIdentity::GovernanceTokenMock,
    ContractIdentity::StakedTokenMock,
    ContractIdentity::FlashAttacks,
];

/// Artifacts whose "bytecode" is the artifact name, so the mock ledger can tell contracts apart
pub(crate) fn named_artifacts() -> Artifacts {
    Artifacts::preloaded(ALL_IDENTITIES.iter().map(|identity| {
        let name = identity.artifact_name();
        (name, Bytes::from(name.as_bytes().to_vec()))
    }))
}

/// A deployer over a fresh mock ledger and an empty in-memory store
pub(crate) fn test_deployer(explorer: ScriptedExplorer) -> Deployer<MockLedger, ScriptedExplorer> {
    test_deployer_with(MockLedger::default(), explorer, DeploymentRegistry::in_memory())
}

/// A deployer over the given ledger and store
pub(crate) fn test_deployer_with(
    ledger: MockLedger,
    explorer: ScriptedExplorer,
    registry: DeploymentRegistry,
) -> Deployer<MockLedger, ScriptedExplorer> {
    Deployer::new(ledger, explorer, named_artifacts(), registry)
}

// ---------------
// | Mock ledger |
// ---------------

/// A deployment seen by the mock ledger
#[derive(Clone, Debug)]
pub(crate) struct MockDeploy {
    /// The assigned address
    pub address: Address,
    /// The creation bytecode
    pub bytecode: Bytes,
    /// The encoded constructor arguments
    pub constructor_args: Bytes,
}

/// Ownership state of a deployed governance core
#[derive(Clone, Debug, Default)]
pub(crate) struct GovernanceState {
    /// The current owner
    pub owner: Address,
    /// The authorized executors
    pub executors: HashSet<Address>,
}

/// State of a deployed proxy
#[derive(Clone, Debug, Default)]
pub(crate) struct ProxyState {
    /// The implementation, once initialized
    pub implementation: Option<Address>,
    /// The proxy admin, once initialized
    pub admin: Option<Address>,
    /// The initializer payload, once initialized
    pub init_data: Bytes,
}

/// A submitted mock transaction
pub(crate) struct MockPending {
    /// The transaction hash
    tx_hash: TxHash,
    /// The created contract
    contract_address: Option<Address>,
    /// Whether the transaction succeeded
    success: bool,
}

/// The mutable state of the mock ledger
#[derive(Default)]
struct MockState {
    /// The sender's nonce
    nonce: u64,
    /// Every deployment, in order
    deploys: Vec<MockDeploy>,
    /// Every call, in order, as `(to, calldata)`
    calls: Vec<(Address, Bytes)>,
    /// Bytecode whose deployment reverts
    reverting_bytecode: Vec<Bytes>,
    /// Selectors whose calls revert
    reverting_selectors: Vec<[u8; 4]>,
    /// Deployed governance cores
    governance: HashMap<Address, GovernanceState>,
    /// Deployed proxies
    proxies: HashMap<Address, ProxyState>,
}

impl MockState {
    /// Consumes a nonce and derives a transaction hash from it
    fn next_tx(&mut self) -> (u64, TxHash) {
        let nonce = self.nonce;
        self.nonce += 1;
        (nonce, B256::from(U256::from(nonce + 1)))
    }

    /// Applies a call, returning whether it succeeded
    fn apply_call(&mut self, to: Address, calldata: &[u8]) -> bool {
        let Some(selector) = calldata.get(..4) else {
            return false;
        };
        if self.reverting_selectors.iter().any(|s| s == selector) {
            return false;
        }

        match selector.try_into().unwrap_or_default() {
            IGovernanceCore::authorizeExecutorsCall::SELECTOR => {
                let Ok(call) = IGovernanceCore::authorizeExecutorsCall::abi_decode(calldata) else {
                    return false;
                };
                match self.governance.get_mut(&to) {
                    Some(gov) if gov.owner == MOCK_SENDER => {
                        gov.executors.extend(call.executors);
                        true
                    }
                    _ => false,
                }
            }
            IGovernanceCore::transferOwnershipCall::SELECTOR => {
                let Ok(call) = IGovernanceCore::transferOwnershipCall::abi_decode(calldata) else {
                    return false;
                };
                match self.governance.get_mut(&to) {
                    Some(gov) if gov.owner == MOCK_SENDER => {
                        gov.owner = call.newOwner;
                        true
                    }
                    _ => false,
                }
            }
            IInitializableAdminUpgradeabilityProxy::initializeCall::SELECTOR => {
                let Ok(call) =
                    IInitializableAdminUpgradeabilityProxy::initializeCall::abi_decode(calldata)
                else {
                    return false;
                };
                match self.proxies.get_mut(&to) {
                    Some(proxy) if proxy.implementation.is_none() => {
                        proxy.implementation = Some(call.logic);
                        proxy.admin = Some(call.admin);
                        proxy.init_data = call.data;
                        true
                    }
                    _ => false,
                }
            }
            _ => true,
        }
    }

    /// Answers a read-only call
    fn read(&self, to: Address, calldata: &[u8]) -> Result<Bytes, ScriptError> {
        let selector: [u8; 4] = calldata
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| ScriptError::ContractInteraction("calldata too short".to_string()))?;

        let value = match selector {
            IGovernanceCore::isExecutorAuthorizedCall::SELECTOR => {
                let call = IGovernanceCore::isExecutorAuthorizedCall::abi_decode(calldata)
                    .map_err(|e| ScriptError::Serde(e.to_string()))?;
                let gov = self.governance_at(to)?;
                DynSolValue::Bool(gov.executors.contains(&call.executor))
            }
            IGovernanceCore::ownerCall::SELECTOR => {
                DynSolValue::Address(self.governance_at(to)?.owner)
            }
            IGovernanceTokenMock::minterCall::SELECTOR => {
                DynSolValue::Address(self.token_init(to).map_or(Address::ZERO, |c| c.minter))
            }
            IGovernanceTokenMock::governanceCall::SELECTOR => {
                DynSolValue::Address(self.token_init(to).map_or(Address::ZERO, |c| c.governance))
            }
            _ => {
                return Err(ScriptError::ContractInteraction(format!(
                    "unsupported read on {to}"
                )))
            }
        };

        Ok(value.abi_encode().into())
    }

    /// The governance core at `to`
    fn governance_at(&self, to: Address) -> Result<&GovernanceState, ScriptError> {
        self.governance
            .get(&to)
            .ok_or_else(|| ScriptError::ContractInteraction(format!("no governance at {to}")))
    }

    /// The token initializer applied through the proxy at `to`, if any
    fn token_init(&self, to: Address) -> Option<IGovernanceTokenMock::initializeCall> {
        let proxy = self.proxies.get(&to)?;
        IGovernanceTokenMock::initializeCall::abi_decode(&proxy.init_data).ok()
    }
}

/// An in-memory ledger
#[derive(Default)]
pub(crate) struct MockLedger {
    /// The ledger state
    state: Mutex<MockState>,
}

impl MockLedger {
    /// Makes every deployment of `bytecode` revert
    pub fn revert_deploys_of(&self, bytecode: &[u8]) {
        self.lock().reverting_bytecode.push(Bytes::from(bytecode.to_vec()));
    }

    /// Makes every call with `selector` revert
    pub fn revert_calls_to(&self, selector: [u8; 4]) {
        self.lock().reverting_selectors.push(selector);
    }

    /// Every deployment so far
    pub fn deploys(&self) -> Vec<MockDeploy> {
        self.lock().deploys.clone()
    }

    /// The number of deployments of the given artifact
    pub fn deploy_count(&self, identity: ContractIdentity) -> usize {
        let name = identity.artifact_name().as_bytes();
        self.lock()
            .deploys
            .iter()
            .filter(|d| d.bytecode.as_ref() == name)
            .count()
    }

    /// Every call so far, as `(to, calldata)`
    pub fn calls(&self) -> Vec<(Address, Bytes)> {
        self.lock().calls.clone()
    }

    /// The governance core at `address`
    pub fn governance(&self, address: Address) -> Option<GovernanceState> {
        self.lock().governance.get(&address).cloned()
    }

    /// The proxy at `address`
    pub fn proxy(&self, address: Address) -> Option<ProxyState> {
        self.lock().proxies.get(&address).cloned()
    }

    /// Locks the ledger state
    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl LedgerClient for MockLedger {
    type Pending = MockPending;

    fn sender(&self) -> Address {
        MOCK_SENDER
    }

    async fn deploy(
        &self,
        bytecode: Bytes,
        constructor_args: Bytes,
    ) -> Result<Self::Pending, ScriptError> {
        let mut state = self.lock();
        let (nonce, tx_hash) = state.next_tx();
        if state.reverting_bytecode.contains(&bytecode) {
            return Ok(MockPending {
                tx_hash,
                contract_address: None,
                success: false,
            });
        }

        let address = MOCK_SENDER.create(nonce);
        match bytecode.as_ref() {
            b"GovernanceV2" => {
                let executors = decode_governance_executors(&constructor_args)?;
                state.governance.insert(
                    address,
                    GovernanceState {
                        owner: MOCK_SENDER,
                        executors,
                    },
                );
            }
            b"InitializableAdminUpgradeabilityProxy" => {
                state.proxies.insert(address, ProxyState::default());
            }
            _ => {}
        }

        state.deploys.push(MockDeploy {
            address,
            bytecode,
            constructor_args,
        });
        Ok(MockPending {
            tx_hash,
            contract_address: Some(address),
            success: true,
        })
    }

    async fn call(
        &self,
        to: Address,
        calldata: Bytes,
        _options: CallOptions,
    ) -> Result<Self::Pending, ScriptError> {
        let mut state = self.lock();
        let (_, tx_hash) = state.next_tx();
        let success = state.apply_call(to, &calldata);
        state.calls.push((to, calldata));

        Ok(MockPending {
            tx_hash,
            contract_address: None,
            success,
        })
    }

    async fn await_confirmation(&self, pending: Self::Pending) -> Result<Receipt, ScriptError> {
        Ok(Receipt {
            tx_hash: pending.tx_hash,
            contract_address: pending.contract_address,
            success: pending.success,
        })
    }

    async fn read(&self, to: Address, calldata: Bytes) -> Result<Bytes, ScriptError> {
        self.lock().read(to, &calldata)
    }
}

/// Decodes the executor list from governance core constructor arguments
fn decode_governance_executors(args: &[u8]) -> Result<HashSet<Address>, ScriptError> {
    let ty = DynSolType::Tuple(vec![
        DynSolType::Address,
        DynSolType::Uint(256),
        DynSolType::Address,
        DynSolType::Array(Box::new(DynSolType::Address)),
    ]);
    let decoded = ty
        .abi_decode_params(args)
        .map_err(|e| ScriptError::Serde(e.to_string()))?;

    let executors = decoded
        .as_tuple()
        .and_then(|fields| fields.get(3))
        .and_then(DynSolValue::as_array)
        .ok_or_else(|| ScriptError::Serde("missing executor list".to_string()))?;

    Ok(executors.iter().filter_map(DynSolValue::as_address).collect())
}

// ------------------
// | Mock explorer |
// ------------------

/// An explorer answering attempts from a script
#[derive(Default)]
pub(crate) struct ScriptedExplorer {
    /// Per-attempt answers, `None` meaning success
    script: Mutex<VecDeque<Option<String>>>,
    /// The answer once the script runs out
    fallback: Option<String>,
    /// When each attempt was made
    attempt_times: Mutex<Vec<Instant>>,
}

impl ScriptedExplorer {
    /// An explorer accepting every submission
    pub fn always_succeeding() -> Self {
        Self::default()
    }

    /// An explorer rejecting every submission with `message`
    pub fn always_failing(message: &str) -> Self {
        Self {
            fallback: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// An explorer rejecting the first submissions with `messages`, then accepting
    pub fn failing_then_succeeding(messages: &[&str]) -> Self {
        Self {
            script: Mutex::new(messages.iter().map(|m| Some(m.to_string())).collect()),
            ..Default::default()
        }
    }

    /// The number of attempts made
    pub fn attempts(&self) -> usize {
        self.attempt_times.lock().unwrap().len()
    }

    /// When each attempt was made
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempt_times.lock().unwrap().clone()
    }
}

impl ExplorerService for ScriptedExplorer {
    async fn submit_verification(
        &self,
        _request: &crate::verification::VerificationRequest,
    ) -> Result<(), ScriptError> {
        self.attempt_times.lock().unwrap().push(Instant::now());
        let answer = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match answer {
            Some(message) => Err(ScriptError::Verification(message)),
            None => Ok(()),
        }
    }
}
