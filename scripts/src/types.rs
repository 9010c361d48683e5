//! Type definitions used throughout the scripts

use std::fmt::{self, Display};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::Function,
};
use alloy_primitives::{Address, Bytes, U256};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::errors::ScriptError;

/// The contracts the scripts know how to deploy
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractIdentity {
    /// The strategy contract computing proposition and voting power
    GovernanceStrategy,
    /// The executor (timelock) contract
    Executor,
    /// The governance core contract holding proposals
    GovernanceCore,
    /// The stateless governance helper contract
    GovernanceHelper,
    /// The admin-upgradeable proxy shell
    InitializableAdminUpgradeabilityProxy,
    /// The transfer hook standing in for governance in mock tokens
    MockTransferHook,
    /// The mock governance token implementation
    GovernanceTokenMock,
    /// The mock staked governance token implementation
    StakedTokenMock,
    /// The flash attack test contract
    FlashAttacks,
}

impl ContractIdentity {
    /// The name of the Solidity contract (and Foundry artifact) backing this identity
    pub fn artifact_name(&self) -> &'static str {
        match self {
            ContractIdentity::GovernanceStrategy => "GovernanceStrategy",
            ContractIdentity::Executor => "Executor",
            ContractIdentity::GovernanceCore => "GovernanceV2",
            ContractIdentity::GovernanceHelper => "GovernanceV2Helper",
            ContractIdentity::InitializableAdminUpgradeabilityProxy => {
                "InitializableAdminUpgradeabilityProxy"
            }
            ContractIdentity::MockTransferHook => "MockTransferHook",
            // Both mock tokens share one implementation contract
            ContractIdentity::GovernanceTokenMock | ContractIdentity::StakedTokenMock => {
                "GovernanceTokenMock"
            }
            ContractIdentity::FlashAttacks => "FlashAttacks",
        }
    }

    /// Whether at most one instance of this contract belongs in a deployments store.
    ///
    /// Singletons already present in the store are reused instead of redeployed.
    pub fn is_singleton(&self) -> bool {
        matches!(
            self,
            ContractIdentity::GovernanceStrategy
                | ContractIdentity::Executor
                | ContractIdentity::GovernanceCore
                | ContractIdentity::GovernanceHelper
        )
    }
}

impl Display for ContractIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            ContractIdentity::GovernanceStrategy => "GovernanceStrategy",
            ContractIdentity::Executor => "Executor",
            ContractIdentity::GovernanceCore => "GovernanceCore",
            ContractIdentity::GovernanceHelper => "GovernanceHelper",
            ContractIdentity::InitializableAdminUpgradeabilityProxy => {
                "InitializableAdminUpgradeabilityProxy"
            }
            ContractIdentity::MockTransferHook => "MockTransferHook",
            ContractIdentity::GovernanceTokenMock => "GovernanceTokenMock",
            ContractIdentity::StakedTokenMock => "StakedTokenMock",
            ContractIdentity::FlashAttacks => "FlashAttacks",
        };
        write!(f, "{key}")
    }
}

/// A single constructor or initializer argument
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ConstructorArg {
    /// An `address`
    #[serde(rename = "address")]
    Address(Address),
    /// A `uint256`, persisted as a decimal string
    #[serde(rename = "uint256")]
    Uint(#[serde(with = "decimal_u256")] U256),
    /// An `address[]`
    #[serde(rename = "address[]")]
    AddressArray(Vec<Address>),
}

impl ConstructorArg {
    /// Converts the argument into its dynamic ABI value
    pub fn to_sol_value(&self) -> DynSolValue {
        match self {
            ConstructorArg::Address(address) => DynSolValue::Address(*address),
            ConstructorArg::Uint(value) => DynSolValue::Uint(*value, 256),
            ConstructorArg::AddressArray(addresses) => {
                DynSolValue::Array(addresses.iter().copied().map(DynSolValue::Address).collect())
            }
        }
    }
}

impl Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorArg::Address(address) => write!(f, "{}", address.to_checksum(None)),
            ConstructorArg::Uint(value) => write!(f, "{value}"),
            ConstructorArg::AddressArray(addresses) => write!(
                f,
                "[{}]",
                addresses.iter().map(|a| a.to_checksum(None)).join(", ")
            ),
        }
    }
}

impl From<Address> for ConstructorArg {
    fn from(address: Address) -> Self {
        ConstructorArg::Address(address)
    }
}

impl From<U256> for ConstructorArg {
    fn from(value: U256) -> Self {
        ConstructorArg::Uint(value)
    }
}

impl From<Vec<Address>> for ConstructorArg {
    fn from(addresses: Vec<Address>) -> Self {
        ConstructorArg::AddressArray(addresses)
    }
}

/// ABI-encodes constructor arguments, as appended to creation bytecode
pub fn encode_constructor_args(args: &[ConstructorArg]) -> Bytes {
    let values = args.iter().map(ConstructorArg::to_sol_value).collect();
    DynSolValue::Tuple(values).abi_encode_params().into()
}

/// ABI-encodes a call to `signature` (e.g. `initialize(address,address,address)`),
/// selector included
pub fn encode_function_call(signature: &str, args: &[ConstructorArg]) -> Result<Bytes, ScriptError> {
    let function = Function::parse(signature)
        .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
    let values: Vec<DynSolValue> = args.iter().map(ConstructorArg::to_sol_value).collect();

    function
        .abi_encode_input(&values)
        .map(Bytes::from)
        .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))
}

/// A contract deployment recorded in the deployments store
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    /// The role of the deployed contract
    #[serde(rename = "contract")]
    pub identity: ContractIdentity,
    /// The on-chain address of the contract
    pub address: Address,
    /// The exact ordered constructor arguments used
    pub constructor_args: Vec<ConstructorArg>,
    /// A label distinguishing several instances of one identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl DeploymentRecord {
    /// The key under which the record is stored
    pub fn key(&self) -> String {
        storage_key(self.identity, self.label.as_deref())
    }
}

/// The storage key for an identity and optional label, `label ?? identity`
pub fn storage_key(identity: ContractIdentity, label: Option<&str>) -> String {
    label.map_or_else(|| identity.to_string(), str::to_string)
}

/// The records produced by a full governance deployment
#[derive(Clone, Debug)]
pub struct GovernanceDeploymentBundle {
    /// The strategy contract
    pub strategy: DeploymentRecord,
    /// The executor contract
    pub executor: DeploymentRecord,
    /// The governance core contract
    pub governance: DeploymentRecord,
    /// The helper contract
    pub helper: DeploymentRecord,
}

/// The steps of the full governance deployment, in order
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GovernanceStep {
    /// Deploying the strategy
    Strategy,
    /// Deploying the executor
    Executor,
    /// Deploying the governance core
    GovernanceCore,
    /// Deploying the helper
    Helper,
    /// Deploying a mock token with its transfer hook and proxy
    MockToken(MockToken),
}

impl Display for GovernanceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GovernanceStep::Strategy => write!(f, "strategy"),
            GovernanceStep::Executor => write!(f, "executor"),
            GovernanceStep::GovernanceCore => write!(f, "governance core"),
            GovernanceStep::Helper => write!(f, "helper"),
            GovernanceStep::MockToken(kind) => write!(f, "{} mock token", kind.identity()),
        }
    }
}

/// The mock tokens available for development deployments
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MockToken {
    /// The mock governance token
    Governance,
    /// The mock staked governance token
    Staked,
}

impl MockToken {
    /// The identity of the token's implementation
    pub fn identity(&self) -> ContractIdentity {
        match self {
            MockToken::Governance => ContractIdentity::GovernanceTokenMock,
            MockToken::Staked => ContractIdentity::StakedTokenMock,
        }
    }

    /// The storage key of the token's implementation, distinct from its proxy
    pub fn implementation_label(&self) -> &'static str {
        match self {
            MockToken::Governance => "GovernanceTokenMockImpl",
            MockToken::Staked => "StakedTokenMockImpl",
        }
    }

    /// The storage key of the token's transfer hook
    pub fn transfer_hook_label(&self) -> &'static str {
        match self {
            MockToken::Governance => "GovernanceTokenMockTransferHook",
            MockToken::Staked => "StakedTokenMockTransferHook",
        }
    }
}

/// De/serializes a `uint256` as a decimal string
mod decimal_u256 {
    use alloy_primitives::U256;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serializes the value as a decimal string
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    /// Deserializes a decimal string
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10).map_err(D::Error::custom)
    }
}
