//! Submission and finality polling.

use crate::DeliveryError;
use devnet_account::SignedTransaction;
use devnet_client::NodeClient;
use devnet_types::{DeclareTransaction, Felt, TransactionStatus, TxFinalityStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Submits signed transactions and waits for them to settle.
pub struct TransactionSubmitter {
	client: Arc<dyn NodeClient>,
}

impl TransactionSubmitter {
	pub fn new(client: Arc<dyn NodeClient>) -> Self {
		Self { client }
	}

	/// Broadcasts `signed` once and returns the hash the node assigned.
	pub async fn submit(&self, signed: &SignedTransaction) -> Result<Felt, DeliveryError> {
		let tx_hash = self
			.client
			.add_invoke_transaction(signed.transaction(), signed.signature())
			.await?;
		info!(
			tx_hash = %format!("{:#x}", tx_hash),
			sender = %format!("{:#x}", signed.transaction().sender_address()),
			nonce = %signed.transaction().nonce(),
			"Submitted transaction"
		);
		Ok(tx_hash)
	}

	/// Broadcasts a signed declare once and returns its transaction hash.
	pub async fn submit_declare(
		&self,
		signed: &SignedTransaction<DeclareTransaction>,
	) -> Result<Felt, DeliveryError> {
		let declare = signed.transaction();
		let tx_hash = self
			.client
			.add_declare_transaction(declare, signed.signature())
			.await?;
		info!(
			tx_hash = %format!("{:#x}", tx_hash),
			class_hash = %format!("{:#x}", declare.class_hash()),
			sender = %format!("{:#x}", declare.sender_address()),
			"Submitted declare"
		);
		Ok(tx_hash)
	}

	/// Polls the status of `tx_hash` until it is accepted, rejected or
	/// reverted, sampling at most `retries` times with `check_interval`
	/// between samples.
	///
	/// A hash the node does not know yet counts as a pending sample.
	#[instrument(skip(self), fields(tx_hash = %format!("{:#x}", tx_hash)))]
	pub async fn await_finality(
		&self,
		tx_hash: Felt,
		check_interval: Duration,
		retries: u32,
	) -> Result<TransactionStatus, DeliveryError> {
		if check_interval.is_zero() {
			return Err(DeliveryError::InvalidArgument(
				"check_interval must be positive".into(),
			));
		}
		if retries == 0 {
			return Err(DeliveryError::InvalidArgument(
				"retries must be positive".into(),
			));
		}

		let mut attempts = 0;
		loop {
			attempts += 1;
			let status = match self.client.get_transaction_status(tx_hash).await {
				Ok(status) => status,
				Err(e) if e.is_transaction_not_found() => TransactionStatus::pending(),
				Err(e) => return Err(e.into()),
			};

			if status.finality == TxFinalityStatus::Rejected {
				return Err(DeliveryError::TransactionRejected {
					tx_hash: format!("{:#x}", tx_hash),
					reason: status.failure_reason,
				});
			}
			if status.finality.is_accepted() {
				if status.is_reverted() {
					return Err(DeliveryError::TransactionReverted {
						tx_hash: format!("{:#x}", tx_hash),
						reason: status.failure_reason,
					});
				}
				info!(finality = %status.finality, attempts, "Transaction accepted");
				return Ok(status);
			}

			if attempts >= retries {
				return Err(DeliveryError::NotAccepted {
					tx_hash: format!("{:#x}", tx_hash),
					attempts,
				});
			}
			debug!(
				attempts,
				finality = %status.finality,
				"Transaction not yet accepted, checking again"
			);
			tokio::time::sleep(check_interval).await;
		}
	}
}
