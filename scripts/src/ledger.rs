//! The ledger client used to deploy contracts and submit transactions.
//!
//! Scripts talk to the chain only through [`LedgerClient`], so the deployment
//! logic can run against a JSON-RPC node or an in-memory ledger alike.

use std::str::FromStr;

use alloy::{
    network::{Ethereum, ReceiptResponse, TransactionBuilder},
    providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_sol_types::SolCall;
use tracing::debug;

use crate::{constants::NUM_CONFIRMATIONS, errors::ScriptError};

/// The receipt of a confirmed transaction
#[derive(Clone, Debug)]
pub struct Receipt {
    /// The transaction hash
    pub tx_hash: TxHash,
    /// The address of the created contract, for deployments
    pub contract_address: Option<Address>,
    /// Whether the transaction executed without reverting
    pub success: bool,
}

/// Options applied to a contract call
#[derive(Copy, Clone, Debug, Default)]
pub struct CallOptions {
    /// A fixed gas limit, skipping estimation
    pub gas_limit: Option<u64>,
}

/// The capabilities the scripts need from the chain
#[allow(async_fn_in_trait)]
pub trait LedgerClient {
    /// A submitted transaction not yet confirmed
    type Pending;

    /// The account deploying contracts and sending transactions
    fn sender(&self) -> Address;

    /// Submits a deployment of `bytecode` with ABI-encoded `constructor_args` appended
    async fn deploy(
        &self,
        bytecode: Bytes,
        constructor_args: Bytes,
    ) -> Result<Self::Pending, ScriptError>;

    /// Submits a call of `calldata` against the contract at `to`
    async fn call(
        &self,
        to: Address,
        calldata: Bytes,
        options: CallOptions,
    ) -> Result<Self::Pending, ScriptError>;

    /// Waits until the transaction is included
    async fn await_confirmation(&self, pending: Self::Pending) -> Result<Receipt, ScriptError>;

    /// Executes a read-only call against the contract at `to`
    async fn read(&self, to: Address, calldata: Bytes) -> Result<Bytes, ScriptError>;
}

/// A contract whose deployment has been confirmed
#[derive(Copy, Clone, Debug)]
pub struct DeployedContract {
    /// The contract address
    pub address: Address,
    /// The deployment transaction hash
    pub tx_hash: TxHash,
}

/// Deploys a contract and waits for its deployment to be confirmed
pub async fn deploy_and_confirm<L: LedgerClient>(
    ledger: &L,
    name: &str,
    bytecode: Bytes,
    constructor_args: Bytes,
) -> Result<DeployedContract, ScriptError> {
    let pending = ledger.deploy(bytecode, constructor_args).await?;
    let receipt = ledger.await_confirmation(pending).await?;
    if !receipt.success {
        return Err(ScriptError::TransactionReverted(format!(
            "deployment of {name} in {:#x}",
            receipt.tx_hash
        )));
    }

    let address = receipt.contract_address.ok_or_else(|| {
        ScriptError::ContractDeployment(format!(
            "receipt {:#x} for {name} has no contract address",
            receipt.tx_hash
        ))
    })?;

    debug!(contract = name, %address, tx_hash = %receipt.tx_hash, "deployment confirmed");
    Ok(DeployedContract {
        address,
        tx_hash: receipt.tx_hash,
    })
}

/// Sends a call and waits for it to be confirmed, failing if it reverted
pub async fn send_and_confirm<L: LedgerClient, C: SolCall>(
    ledger: &L,
    to: Address,
    call: &C,
    options: CallOptions,
) -> Result<Receipt, ScriptError> {
    let pending = ledger.call(to, call.abi_encode().into(), options).await?;
    let receipt = ledger.await_confirmation(pending).await?;
    if !receipt.success {
        return Err(ScriptError::TransactionReverted(format!(
            "{} on {to} in {:#x}",
            C::SIGNATURE,
            receipt.tx_hash
        )));
    }

    debug!(call = C::SIGNATURE, %to, tx_hash = %receipt.tx_hash, "call confirmed");
    Ok(receipt)
}

/// Executes a read-only call and decodes its return value
pub async fn read_call<L: LedgerClient, C: SolCall>(
    ledger: &L,
    to: Address,
    call: &C,
) -> Result<C::Return, ScriptError> {
    let data = ledger.read(to, call.abi_encode().into()).await?;
    C::abi_decode_returns(&data).map_err(|e| ScriptError::Serde(e.to_string()))
}

// ------------------
// | JSON-RPC ledger |
// ------------------

/// A ledger client backed by an alloy provider with a local signer
#[derive(Clone)]
pub struct AlloyLedger {
    /// The signing provider
    provider: DynProvider<Ethereum>,
    /// The address of the signer
    sender: Address,
}

impl AlloyLedger {
    /// Sets up a signing provider from a private key and an RPC url
    pub fn connect(priv_key: &str, rpc_url: &str) -> Result<Self, ScriptError> {
        let signer = PrivateKeySigner::from_str(priv_key)
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        let sender = signer.address();

        let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
        let provider = ProviderBuilder::new().wallet(signer).connect_http(url);

        Ok(Self {
            provider: DynProvider::new(provider),
            sender,
        })
    }
}

impl LedgerClient for AlloyLedger {
    type Pending = PendingTransactionBuilder<Ethereum>;

    fn sender(&self) -> Address {
        self.sender
    }

    async fn deploy(
        &self,
        bytecode: Bytes,
        constructor_args: Bytes,
    ) -> Result<Self::Pending, ScriptError> {
        let code = [bytecode.as_ref(), constructor_args.as_ref()].concat();
        let tx = TransactionRequest::default().with_deploy_code(code);

        self.provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))
    }

    async fn call(
        &self,
        to: Address,
        calldata: Bytes,
        options: CallOptions,
    ) -> Result<Self::Pending, ScriptError> {
        let mut tx = TransactionRequest::default().with_to(to).with_input(calldata);
        if let Some(gas_limit) = options.gas_limit {
            tx = tx.with_gas_limit(gas_limit);
        }

        self.provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }

    async fn await_confirmation(&self, pending: Self::Pending) -> Result<Receipt, ScriptError> {
        let receipt = pending
            .with_required_confirmations(NUM_CONFIRMATIONS)
            .get_receipt()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        Ok(Receipt {
            tx_hash: receipt.transaction_hash(),
            contract_address: receipt.contract_address(),
            success: receipt.status(),
        })
    }

    async fn read(&self, to: Address, calldata: Bytes) -> Result<Bytes, ScriptError> {
        let tx = TransactionRequest::default().with_to(to).with_input(calldata);

        self.provider
            .call(tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))
    }
}
