//! Node client module for the devnet harness.
//!
//! Everything the harness knows about a running node goes through the
//! [`NodeClient`] trait. The production implementation speaks Starknet
//! JSON-RPC over HTTP; a scripted in-memory implementation is available for
//! tests behind the `testing` feature.

use async_trait::async_trait;
use devnet_types::{
	Call, DeclareTransaction, EventFilter, EventRecord, EventsPage, FeeEstimate, Felt,
	InvokeTransaction, TransactionStatus,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod rpc;

	#[cfg(any(test, feature = "testing"))]
	pub mod mock;
}

pub use implementations::rpc::JsonRpcClient;

#[cfg(any(test, feature = "testing"))]
pub use implementations::mock::MockNodeClient;

/// JSON-RPC error code the node answers with for an unknown transaction hash.
pub const TXN_HASH_NOT_FOUND: i64 = 29;
/// Error code for a class hash the node has no class for.
pub const CLASS_HASH_NOT_FOUND: i64 = 28;
/// Error code for declaring a class that is already declared.
pub const CLASS_ALREADY_DECLARED: i64 = 51;
/// Error code for a block id the node cannot resolve.
pub const BLOCK_NOT_FOUND: i64 = 24;
/// Standard JSON-RPC code for malformed parameters.
pub const INVALID_PARAMS: i64 = -32602;

/// Errors that can occur while talking to a node.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// Error object returned by the node.
	#[error("RPC error {code}: {message}")]
	Rpc { code: i64, message: String },
	/// Response that does not have the expected shape.
	#[error("Decode error: {0}")]
	Decode(String),
}

impl ClientError {
	/// Whether the node reported that it does not know the transaction.
	pub fn is_transaction_not_found(&self) -> bool {
		self.rpc_code() == Some(TXN_HASH_NOT_FOUND)
	}

	/// Whether the node refused a declare because the class already exists.
	pub fn is_class_already_declared(&self) -> bool {
		self.rpc_code() == Some(CLASS_ALREADY_DECLARED)
	}

	pub fn is_class_hash_not_found(&self) -> bool {
		self.rpc_code() == Some(CLASS_HASH_NOT_FOUND)
	}

	fn rpc_code(&self) -> Option<i64> {
		match self {
			ClientError::Rpc { code, .. } => Some(*code),
			_ => None,
		}
	}
}

impl From<reqwest::Error> for ClientError {
	fn from(err: reqwest::Error) -> Self {
		if err.is_decode() {
			ClientError::Decode(err.to_string())
		} else {
			ClientError::Network(err.to_string())
		}
	}
}

impl From<serde_json::Error> for ClientError {
	fn from(err: serde_json::Error) -> Self {
		ClientError::Decode(err.to_string())
	}
}

/// Trait defining the read and write operations the harness needs from a node.
///
/// Implementations must be shareable across tasks; accounts, the delivery
/// pipeline and the event scanner all hold the same `Arc<dyn NodeClient>`.
#[async_trait]
pub trait NodeClient: Send + Sync {
	/// Returns the number of the latest accepted block.
	async fn block_number(&self) -> Result<u64, ClientError>;

	/// Fetches one page of events matching `filter`.
	///
	/// Pass the continuation token of the previous page to get the next one.
	async fn get_events(
		&self,
		filter: &EventFilter,
		continuation_token: Option<String>,
	) -> Result<EventsPage, ClientError>;

	/// Fetches every event matching `filter`, following continuation tokens
	/// until the node reports no more pages.
	async fn get_all_events(&self, filter: &EventFilter) -> Result<Vec<EventRecord>, ClientError> {
		let mut events = Vec::new();
		let mut continuation_token = None;
		loop {
			let page = self.get_events(filter, continuation_token).await?;
			events.extend(page.events);
			match page.continuation_token {
				Some(token) => continuation_token = Some(token),
				None => break,
			}
		}
		Ok(events)
	}

	/// Samples the current status of a transaction.
	async fn get_transaction_status(
		&self,
		tx_hash: Felt,
	) -> Result<TransactionStatus, ClientError>;

	/// Returns the next nonce of a contract.
	async fn get_nonce(&self, address: Felt) -> Result<Felt, ClientError>;

	/// Estimates the fee of an unsigned transaction with validation skipped.
	async fn estimate_fee(&self, tx: &InvokeTransaction) -> Result<FeeEstimate, ClientError>;

	/// Broadcasts a signed transaction and returns its hash.
	async fn add_invoke_transaction(
		&self,
		tx: &InvokeTransaction,
		signature: &[Felt],
	) -> Result<Felt, ClientError>;

	/// Estimates the fee of an unsigned declare with validation skipped.
	async fn estimate_declare_fee(
		&self,
		tx: &DeclareTransaction,
	) -> Result<FeeEstimate, ClientError>;

	/// Broadcasts a signed declare and returns its transaction hash.
	async fn add_declare_transaction(
		&self,
		tx: &DeclareTransaction,
		signature: &[Felt],
	) -> Result<Felt, ClientError>;

	/// Whether the node knows a class with `class_hash`.
	async fn is_declared(&self, class_hash: Felt) -> Result<bool, ClientError>;

	/// Calls a view function at the latest block.
	async fn call(&self, call: &Call) -> Result<Vec<Felt>, ClientError>;

	/// Returns the class hash of the contract deployed at `address`.
	async fn get_class_hash_at(&self, address: Felt) -> Result<Felt, ClientError>;

	/// Moves the node's clock forward. Only devnet nodes support this.
	async fn increase_time(&self, seconds: u64) -> Result<(), ClientError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transaction_not_found_detection() {
		let not_found = ClientError::Rpc {
			code: TXN_HASH_NOT_FOUND,
			message: "Transaction hash not found".into(),
		};
		assert!(not_found.is_transaction_not_found());

		let other = ClientError::Rpc {
			code: 41,
			message: "Transaction execution error".into(),
		};
		assert!(!other.is_transaction_not_found());
		assert!(!ClientError::Network("refused".into()).is_transaction_not_found());
	}

	#[test]
	fn test_class_error_detection() {
		let declared = ClientError::Rpc {
			code: CLASS_ALREADY_DECLARED,
			message: "Class already declared".into(),
		};
		assert!(declared.is_class_already_declared());
		assert!(!declared.is_class_hash_not_found());

		let missing = ClientError::Rpc {
			code: CLASS_HASH_NOT_FOUND,
			message: "Class hash not found".into(),
		};
		assert!(missing.is_class_hash_not_found());
		assert!(!missing.is_transaction_not_found());
		assert!(!ClientError::Decode("bad".into()).is_class_already_declared());
	}

	#[tokio::test]
	async fn test_get_all_events_follows_continuation() {
		let events: Vec<EventRecord> = (0..7u64)
			.map(|i| EventRecord {
				from_address: Felt::from(0x10u64),
				keys: vec![Felt::from(0x99u64)],
				data: vec![Felt::from(i)],
				block_number: Some(i),
				block_hash: None,
				transaction_hash: Felt::from(i + 100),
			})
			.collect();
		let client = MockNodeClient::new()
			.with_block_number(10)
			.with_events(events.clone());

		let filter = EventFilter::for_selector(Felt::from(0x10u64), Felt::from(0x99u64), 0, 10, 3);
		let fetched = client.get_all_events(&filter).await.unwrap();

		assert_eq!(fetched, events);
		// 3 + 3 + 1
		assert_eq!(client.event_page_requests(), 3);
	}
}
