//! Unsigned transaction assembly and fee pricing.

use crate::DeliveryError;
use devnet_client::NodeClient;
use devnet_types::transaction::INVOKE_VERSION;
use devnet_types::{
	DeclareTransaction, FeeEstimate, Felt, InvokeTransaction, ResourceBoundsMapping,
};
use std::sync::Arc;
use tracing::debug;

/// Inputs for one invoke transaction.
///
/// The nonce is fetched from the node when left unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
	pub sender_address: Felt,
	pub calldata: Vec<Felt>,
	pub nonce: Option<Felt>,
	pub version: Felt,
	pub account_deployment_data: Vec<Felt>,
}

impl TransactionRequest {
	pub fn new(sender_address: Felt, calldata: Vec<Felt>) -> Self {
		Self {
			sender_address,
			calldata,
			nonce: None,
			version: Felt::from(INVOKE_VERSION),
			account_deployment_data: Vec::new(),
		}
	}

	pub fn with_nonce(mut self, nonce: Felt) -> Self {
		self.nonce = Some(nonce);
		self
	}

	pub fn with_version(mut self, version: Felt) -> Self {
		self.version = version;
		self
	}

	pub fn with_account_deployment_data(mut self, data: Vec<Felt>) -> Self {
		self.account_deployment_data = data;
		self
	}
}

/// Builds unsigned invoke transactions with zero resource bounds.
pub struct TransactionBuilder {
	client: Arc<dyn NodeClient>,
}

impl TransactionBuilder {
	pub fn new(client: Arc<dyn NodeClient>) -> Self {
		Self { client }
	}

	pub async fn build(&self, request: TransactionRequest) -> Result<InvokeTransaction, DeliveryError> {
		let nonce = match request.nonce {
			Some(nonce) => nonce,
			None => self.client.get_nonce(request.sender_address).await?,
		};
		Ok(
			InvokeTransaction::new(request.sender_address, request.calldata, nonce)
				.with_version(request.version)
				.with_account_deployment_data(request.account_deployment_data),
		)
	}
}

/// Turns the node's fee estimate into resource bounds with a safety margin.
pub struct FeeEstimator {
	client: Arc<dyn NodeClient>,
	multiplier: u64,
}

impl FeeEstimator {
	pub fn new(client: Arc<dyn NodeClient>, multiplier: u64) -> Self {
		Self { client, multiplier }
	}

	pub fn multiplier(&self) -> u64 {
		self.multiplier
	}

	/// Estimates `tx` with validation skipped and multiplies every amount
	/// and price by the multiplier.
	pub async fn estimate_fee(
		&self,
		tx: &InvokeTransaction,
	) -> Result<ResourceBoundsMapping, DeliveryError> {
		let estimate = self.client.estimate_fee(tx).await?;
		self.scale(estimate)
	}

	/// Same as [`estimate_fee`](Self::estimate_fee) for a declare.
	pub async fn estimate_declare_fee(
		&self,
		tx: &DeclareTransaction,
	) -> Result<ResourceBoundsMapping, DeliveryError> {
		let estimate = self.client.estimate_declare_fee(tx).await?;
		self.scale(estimate)
	}

	fn scale(&self, estimate: FeeEstimate) -> Result<ResourceBoundsMapping, DeliveryError> {
		debug!(
			overall_fee = estimate.overall_fee,
			unit = %estimate.unit,
			multiplier = self.multiplier,
			"Estimated fee"
		);
		estimate
			.resource_bounds()
			.scaled(self.multiplier)
			.ok_or(DeliveryError::FeeOverflow {
				multiplier: self.multiplier,
			})
	}
}
