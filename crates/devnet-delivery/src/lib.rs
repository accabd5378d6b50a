//! Transaction delivery module for the devnet harness.
//!
//! This module drives a transaction from calldata to finality: it builds an
//! unsigned invoke transaction, prices it from the node's fee estimate, has
//! an account sign it, submits it and polls its status until the node reports
//! a terminal outcome or the polling budget runs out.
//!
//! Contract declaration, deployment through the universal deployer and
//! replaceability upgrades are built on the same pipeline.

use devnet_account::{Account, SignedTransaction, SigningError, UDC_ADDRESS};
use devnet_client::{ClientError, NodeClient};
use devnet_config::DeliveryConfig;
use devnet_types::{
	parse_felt, truncate_id, Call, CallArgs, CompiledClass, DeclareTransaction, Felt,
	InvokeTransaction, ResourceBoundsMapping, SierraClass, TransactionStatus, TypeError,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument};

pub mod artifacts;
pub mod builder;
pub mod deploy;
pub mod multicall;
pub mod poller;
pub mod upgrade;

pub use artifacts::{cairo_int_constant, cairo_int_constant_from_file, ContractArtifacts};
pub use builder::{FeeEstimator, TransactionBuilder, TransactionRequest};
pub use deploy::{udc_deploy_call, DeclareOutcome, DeployRequest, DeployedContract};
pub use multicall::encode_multicall;
pub use poller::TransactionSubmitter;
pub use upgrade::{
	prepare_upgrade_calls, prepare_upgrade_calls_json, EicData, ImplementationData,
	UPGRADE_FUNCTIONS,
};

/// Errors that can occur while delivering a transaction.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// A parameter is outside its accepted range.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	/// The node rejected the transaction.
	#[error("Transaction {tx_hash} rejected{}", fmt_reason(.reason))]
	TransactionRejected {
		tx_hash: String,
		reason: Option<String>,
	},
	/// The transaction was included but its execution reverted.
	#[error("Transaction {tx_hash} reverted{}", fmt_reason(.reason))]
	TransactionReverted {
		tx_hash: String,
		reason: Option<String>,
	},
	/// The polling budget ran out before the transaction was accepted.
	#[error("Transaction {tx_hash} not accepted after {attempts} status checks")]
	NotAccepted { tx_hash: String, attempts: u32 },
	/// Scaling the fee estimate overflowed.
	#[error("Fee estimate overflows when scaled by {multiplier}")]
	FeeOverflow { multiplier: u64 },
	/// A contract class file is not where the build tool puts it.
	#[error("{0}")]
	ArtifactMissing(String),
	/// A contract artifact or source file does not have the expected content.
	#[error("Invalid artifact: {0}")]
	InvalidArtifact(String),
	/// The deployed address does not hold the requested class.
	#[error("Contract at {address} has class {actual}, expected {expected}")]
	DeploymentMismatch {
		address: String,
		expected: String,
		actual: String,
	},
	/// Error returned by the node.
	#[error("Client error: {0}")]
	Client(#[from] ClientError),
	/// The transaction could not be signed.
	#[error("Signing error: {0}")]
	Signing(#[from] SigningError),
}

impl From<TypeError> for DeliveryError {
	fn from(err: TypeError) -> Self {
		DeliveryError::InvalidArgument(err.to_string())
	}
}

fn fmt_reason(reason: &Option<String>) -> String {
	match reason {
		Some(reason) => format!(": {}", reason),
		None => String::new(),
	}
}

/// A transaction that reached a successful terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
	pub transaction_hash: Felt,
	pub status: TransactionStatus,
}

/// Service that manages transaction delivery against one node.
///
/// Wraps the builder, the fee estimator and the submitter around a shared
/// client and applies the fee multiplier and polling budget from the
/// delivery configuration.
pub struct DeliveryService {
	client: Arc<dyn NodeClient>,
	builder: TransactionBuilder,
	estimator: FeeEstimator,
	submitter: TransactionSubmitter,
	check_interval: Duration,
	retries: u32,
}

impl DeliveryService {
	pub fn new(client: Arc<dyn NodeClient>, config: &DeliveryConfig) -> Self {
		Self {
			builder: TransactionBuilder::new(Arc::clone(&client)),
			estimator: FeeEstimator::new(Arc::clone(&client), config.fee_multiplier),
			submitter: TransactionSubmitter::new(Arc::clone(&client)),
			client,
			check_interval: config.check_interval(),
			retries: config.retries,
		}
	}

	/// Builds an unsigned transaction with zero resource bounds.
	pub async fn build(&self, request: TransactionRequest) -> Result<InvokeTransaction, DeliveryError> {
		self.builder.build(request).await
	}

	/// Returns the scaled resource bounds for `tx`.
	pub async fn estimate_fee(
		&self,
		tx: &InvokeTransaction,
	) -> Result<ResourceBoundsMapping, DeliveryError> {
		self.estimator.estimate_fee(tx).await
	}

	/// Builds a transaction and binds the scaled fee estimate to it.
	///
	/// The result is still unsigned.
	pub async fn build_with_fee(
		&self,
		request: TransactionRequest,
	) -> Result<InvokeTransaction, DeliveryError> {
		let tx = self.builder.build(request).await?;
		let bounds = self.estimator.estimate_fee(&tx).await?;
		Ok(tx.with_resource_bounds(bounds))
	}

	pub async fn submit(&self, signed: &SignedTransaction) -> Result<Felt, DeliveryError> {
		self.submitter.submit(signed).await
	}

	/// Polls with the configured interval and budget.
	pub async fn await_finality(&self, tx_hash: Felt) -> Result<TransactionStatus, DeliveryError> {
		self.submitter
			.await_finality(tx_hash, self.check_interval, self.retries)
			.await
	}

	/// Sends `calls` from `account` as one multicall and waits for acceptance.
	#[instrument(skip_all, fields(account = %truncate_id(&format!("{:#x}", account.address())), calls = calls.len()))]
	pub async fn execute(
		&self,
		account: &Account,
		calls: &[Call],
	) -> Result<TransactionOutcome, DeliveryError> {
		info!("Executing multicall");
		let request = TransactionRequest::new(account.address(), encode_multicall(calls));
		let tx = self.build_with_fee(request).await?;
		let signed = account.sign(tx).await?;
		let transaction_hash = self.submit(&signed).await?;
		let status = self.await_finality(transaction_hash).await?;
		info!(tx_hash = %format!("{:#x}", transaction_hash), "Multicall executed");
		Ok(TransactionOutcome {
			transaction_hash,
			status,
		})
	}

	/// Calls a view function by name at the latest block.
	pub async fn call_function(
		&self,
		address: Felt,
		function_name: &str,
		args: CallArgs,
		params: &[&str],
	) -> Result<Vec<Felt>, DeliveryError> {
		let call = Call::prepare(address, function_name, args, params)?;
		Ok(self.client.call(&call).await?)
	}

	pub async fn get_class_hash_at(&self, address: Felt) -> Result<Felt, DeliveryError> {
		Ok(self.client.get_class_hash_at(address).await?)
	}

	/// Declares `contract_name` from the Scarb build output in `artifacts`.
	///
	/// A class the node already knows is reported as
	/// [`DeclareOutcome::AlreadyDeclared`] rather than as an error.
	#[instrument(skip_all, fields(contract = contract_name))]
	pub async fn declare(
		&self,
		account: &Account,
		artifacts: &ContractArtifacts,
		contract_name: &str,
	) -> Result<DeclareOutcome, DeliveryError> {
		info!("Declaring contract");
		let contract_class = artifacts.sierra_class(contract_name).await?;
		let compiled_class = artifacts.compiled_class(contract_name).await?;
		self.declare_class(account, Arc::new(contract_class), &compiled_class)
			.await
	}

	/// Declares an already loaded class and waits for acceptance.
	pub async fn declare_class(
		&self,
		account: &Account,
		contract_class: Arc<SierraClass>,
		compiled_class: &CompiledClass,
	) -> Result<DeclareOutcome, DeliveryError> {
		let class_hash = contract_class.class_hash();
		if self.client.is_declared(class_hash).await? {
			info!(class_hash = %format!("{:#x}", class_hash), "Class is already declared");
			return Ok(DeclareOutcome::AlreadyDeclared { class_hash });
		}

		let transaction_hash = match self
			.send_declare(account, contract_class, compiled_class)
			.await
		{
			Ok(transaction_hash) => transaction_hash,
			Err(DeliveryError::Client(e)) if e.is_class_already_declared() => {
				info!(class_hash = %format!("{:#x}", class_hash), "Class is already declared");
				return Ok(DeclareOutcome::AlreadyDeclared { class_hash });
			},
			Err(e) => return Err(e),
		};
		self.await_finality(transaction_hash).await?;
		info!(class_hash = %format!("{:#x}", class_hash), "Declared class");
		Ok(DeclareOutcome::Declared {
			class_hash,
			transaction_hash,
		})
	}

	async fn send_declare(
		&self,
		account: &Account,
		contract_class: Arc<SierraClass>,
		compiled_class: &CompiledClass,
	) -> Result<Felt, DeliveryError> {
		let nonce = account.get_nonce().await?;
		let tx =
			DeclareTransaction::from_classes(account.address(), contract_class, compiled_class, nonce)?;
		let bounds = self.estimator.estimate_declare_fee(&tx).await?;
		let signed = account.sign(tx.with_resource_bounds(bounds)).await?;
		self.submitter.submit_declare(&signed).await
	}

	/// Deploys a declared class through the universal deployer.
	///
	/// The class found at the computed address is checked against the
	/// requested one once the deployment is accepted.
	#[instrument(skip_all, fields(class_hash = %format!("{:#x}", request.class_hash)))]
	pub async fn deploy(
		&self,
		account: &Account,
		request: DeployRequest,
	) -> Result<DeployedContract, DeliveryError> {
		let salt = match request.salt {
			Some(salt) => salt,
			None => account.get_nonce().await?,
		};
		let (call, address) = udc_deploy_call(
			parse_felt(UDC_ADDRESS)?,
			account.address(),
			request.class_hash,
			salt,
			request.unique,
			&request.constructor_calldata,
		);
		let outcome = self.execute(account, &[call]).await?;

		let actual = self.client.get_class_hash_at(address).await?;
		if actual != request.class_hash {
			return Err(DeliveryError::DeploymentMismatch {
				address: format!("{:#x}", address),
				expected: format!("{:#x}", request.class_hash),
				actual: format!("{:#x}", actual),
			});
		}
		info!(address = %format!("{:#x}", address), "Deployed contract");
		Ok(DeployedContract {
			address,
			class_hash: request.class_hash,
			transaction_hash: outcome.transaction_hash,
		})
	}

	/// Declares `contract_name` when needed, then deploys it.
	pub async fn declare_and_deploy(
		&self,
		account: &Account,
		artifacts: &ContractArtifacts,
		contract_name: &str,
		constructor_calldata: Vec<Felt>,
	) -> Result<DeployedContract, DeliveryError> {
		let declared = self.declare(account, artifacts, contract_name).await?;
		self.deploy(
			account,
			DeployRequest::new(declared.class_hash(), constructor_calldata),
		)
		.await
	}

	/// Upgrades a replaceable `contract` to `implementation` in one multicall.
	#[instrument(skip_all, fields(contract = %format!("{:#x}", contract)))]
	pub async fn upgrade_contract(
		&self,
		account: &Account,
		contract: Felt,
		implementation: &ImplementationData,
	) -> Result<TransactionOutcome, DeliveryError> {
		info!(impl_hash = %format!("{:#x}", implementation.impl_hash), "Upgrading contract");
		let outcome = self
			.execute(account, &prepare_upgrade_calls(contract, implementation))
			.await?;
		info!("Contract upgraded");
		Ok(outcome)
	}
}
