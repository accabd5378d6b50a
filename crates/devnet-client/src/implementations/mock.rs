//! Scripted in-memory node for tests.
//!
//! The mock holds a fixed chain view (block number, events, nonce, fee
//! estimate, declared classes) and a queue of status samples that successive
//! `get_transaction_status` calls pop from. Every call is counted so tests
//! can assert how many round trips an operation made.

use crate::{ClientError, NodeClient, CLASS_ALREADY_DECLARED, TXN_HASH_NOT_FOUND};
use async_trait::async_trait;
use devnet_types::{
	Call, DeclareTransaction, EventFilter, EventRecord, EventsPage, FeeEstimate, Felt,
	InvokeTransaction, TransactionStatus,
};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct MockState {
	statuses: VecDeque<Result<TransactionStatus, ClientError>>,
	status_calls: usize,
	event_page_requests: usize,
	event_windows: Vec<(u64, u64)>,
	submitted: Vec<(InvokeTransaction, Vec<Felt>)>,
	estimated: Vec<InvokeTransaction>,
	declared_classes: Vec<Felt>,
	declares: Vec<(DeclareTransaction, Vec<Felt>)>,
	estimated_declares: Vec<DeclareTransaction>,
	calls: Vec<Call>,
	increased_time: u64,
}

/// Node client backed by scripted data.
pub struct MockNodeClient {
	block_number: u64,
	events: Vec<EventRecord>,
	nonce: Felt,
	fee_estimate: FeeEstimate,
	call_result: Vec<Felt>,
	class_hash: Felt,
	submit_hash: Felt,
	submit_error: Option<ClientError>,
	state: Mutex<MockState>,
}

impl Default for MockNodeClient {
	fn default() -> Self {
		Self::new()
	}
}

impl MockNodeClient {
	pub fn new() -> Self {
		Self {
			block_number: 0,
			events: Vec::new(),
			nonce: Felt::ZERO,
			fee_estimate: FeeEstimate::default(),
			call_result: Vec::new(),
			class_hash: Felt::ZERO,
			submit_hash: Felt::from(0x5eedu64),
			submit_error: None,
			state: Mutex::new(MockState::default()),
		}
	}

	pub fn with_block_number(mut self, block_number: u64) -> Self {
		self.block_number = block_number;
		self
	}

	/// Events are served in the order given; keep them sorted by block.
	pub fn with_events(mut self, events: Vec<EventRecord>) -> Self {
		self.events = events;
		self
	}

	pub fn with_nonce(mut self, nonce: Felt) -> Self {
		self.nonce = nonce;
		self
	}

	pub fn with_fee_estimate(mut self, fee_estimate: FeeEstimate) -> Self {
		self.fee_estimate = fee_estimate;
		self
	}

	pub fn with_call_result(mut self, result: Vec<Felt>) -> Self {
		self.call_result = result;
		self
	}

	pub fn with_class_hash(mut self, class_hash: Felt) -> Self {
		self.class_hash = class_hash;
		self
	}

	pub fn with_submit_hash(mut self, tx_hash: Felt) -> Self {
		self.submit_hash = tx_hash;
		self
	}

	pub fn with_submit_error(mut self, error: ClientError) -> Self {
		self.submit_error = Some(error);
		self
	}

	/// Classes the node already knows.
	pub fn with_declared(self, class_hashes: Vec<Felt>) -> Self {
		self.state().declared_classes = class_hashes;
		self
	}

	/// Status samples returned by successive status queries.
	///
	/// Once the script runs out every further query answers `PENDING`.
	pub fn with_statuses(self, statuses: Vec<TransactionStatus>) -> Self {
		self.with_status_results(statuses.into_iter().map(Ok).collect())
	}

	pub fn with_status_results(self, results: Vec<Result<TransactionStatus, ClientError>>) -> Self {
		self.state().statuses = results.into();
		self
	}

	/// Error answer a node gives for a hash it has not seen yet.
	pub fn transaction_not_found() -> ClientError {
		ClientError::Rpc {
			code: TXN_HASH_NOT_FOUND,
			message: "Transaction hash not found".into(),
		}
	}

	pub fn status_calls(&self) -> usize {
		self.state().status_calls
	}

	pub fn event_page_requests(&self) -> usize {
		self.state().event_page_requests
	}

	/// Block windows queried, one entry per first-page request.
	pub fn event_windows(&self) -> Vec<(u64, u64)> {
		self.state().event_windows.clone()
	}

	pub fn submitted(&self) -> Vec<(InvokeTransaction, Vec<Felt>)> {
		self.state().submitted.clone()
	}

	pub fn estimated(&self) -> Vec<InvokeTransaction> {
		self.state().estimated.clone()
	}

	/// Declares broadcast so far, with their signatures.
	pub fn declares(&self) -> Vec<(DeclareTransaction, Vec<Felt>)> {
		self.state().declares.clone()
	}

	pub fn estimated_declares(&self) -> Vec<DeclareTransaction> {
		self.state().estimated_declares.clone()
	}

	pub fn calls(&self) -> Vec<Call> {
		self.state().calls.clone()
	}

	pub fn increased_time(&self) -> u64 {
		self.state().increased_time
	}

	fn state(&self) -> MutexGuard<'_, MockState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn matches(filter: &EventFilter, event: &EventRecord) -> bool {
		let in_range = event
			.block_number
			.is_some_and(|block| block >= filter.from_block && block <= filter.to_block);
		let address_matches = filter
			.address
			.is_none_or(|address| address == event.from_address);
		let keys_match = filter.keys.iter().enumerate().all(|(i, alternatives)| {
			alternatives.is_empty()
				|| event
					.keys
					.get(i)
					.is_some_and(|key| alternatives.contains(key))
		});
		in_range && address_matches && keys_match
	}
}

#[async_trait]
impl NodeClient for MockNodeClient {
	async fn block_number(&self) -> Result<u64, ClientError> {
		Ok(self.block_number)
	}

	async fn get_events(
		&self,
		filter: &EventFilter,
		continuation_token: Option<String>,
	) -> Result<EventsPage, ClientError> {
		let offset = match &continuation_token {
			Some(token) => token
				.parse::<usize>()
				.map_err(|_| ClientError::Rpc {
					code: 33,
					message: format!("Invalid continuation token: {}", token),
				})?,
			None => 0,
		};
		{
			let mut state = self.state();
			state.event_page_requests += 1;
			if continuation_token.is_none() {
				state.event_windows.push((filter.from_block, filter.to_block));
			}
		}

		let matching: Vec<&EventRecord> = self
			.events
			.iter()
			.filter(|event| Self::matches(filter, event))
			.collect();
		let page_size = filter.page_size.max(1) as usize;
		let end = (offset + page_size).min(matching.len());
		let events = matching
			.get(offset..end)
			.unwrap_or_default()
			.iter()
			.map(|event| (*event).clone())
			.collect();
		let continuation_token = (end < matching.len()).then(|| end.to_string());

		Ok(EventsPage {
			events,
			continuation_token,
		})
	}

	async fn get_transaction_status(
		&self,
		_tx_hash: Felt,
	) -> Result<TransactionStatus, ClientError> {
		let mut state = self.state();
		state.status_calls += 1;
		state
			.statuses
			.pop_front()
			.unwrap_or_else(|| Ok(TransactionStatus::pending()))
	}

	async fn get_nonce(&self, _address: Felt) -> Result<Felt, ClientError> {
		Ok(self.nonce)
	}

	async fn estimate_fee(&self, tx: &InvokeTransaction) -> Result<FeeEstimate, ClientError> {
		self.state().estimated.push(tx.clone());
		Ok(self.fee_estimate.clone())
	}

	async fn add_invoke_transaction(
		&self,
		tx: &InvokeTransaction,
		signature: &[Felt],
	) -> Result<Felt, ClientError> {
		if let Some(error) = &self.submit_error {
			return Err(error.clone());
		}
		self.state().submitted.push((tx.clone(), signature.to_vec()));
		Ok(self.submit_hash)
	}

	async fn estimate_declare_fee(
		&self,
		tx: &DeclareTransaction,
	) -> Result<FeeEstimate, ClientError> {
		self.state().estimated_declares.push(tx.clone());
		Ok(self.fee_estimate.clone())
	}

	/// Declaring a known class fails the way a node does; a new class is
	/// known from then on.
	async fn add_declare_transaction(
		&self,
		tx: &DeclareTransaction,
		signature: &[Felt],
	) -> Result<Felt, ClientError> {
		if let Some(error) = &self.submit_error {
			return Err(error.clone());
		}
		let mut state = self.state();
		if state.declared_classes.contains(&tx.class_hash()) {
			return Err(ClientError::Rpc {
				code: CLASS_ALREADY_DECLARED,
				message: "Class already declared".into(),
			});
		}
		state.declared_classes.push(tx.class_hash());
		state.declares.push((tx.clone(), signature.to_vec()));
		Ok(self.submit_hash)
	}

	async fn is_declared(&self, class_hash: Felt) -> Result<bool, ClientError> {
		Ok(self.state().declared_classes.contains(&class_hash))
	}

	async fn call(&self, call: &Call) -> Result<Vec<Felt>, ClientError> {
		self.state().calls.push(call.clone());
		Ok(self.call_result.clone())
	}

	async fn get_class_hash_at(&self, _address: Felt) -> Result<Felt, ClientError> {
		Ok(self.class_hash)
	}

	async fn increase_time(&self, seconds: u64) -> Result<(), ClientError> {
		self.state().increased_time += seconds;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use devnet_types::{TxExecutionStatus, TxFinalityStatus};

	fn event(block: u64, key: u64) -> EventRecord {
		EventRecord {
			from_address: Felt::from(0x10u64),
			keys: vec![Felt::from(key)],
			data: vec![],
			block_number: Some(block),
			block_hash: None,
			transaction_hash: Felt::from(block),
		}
	}

	#[tokio::test]
	async fn test_events_filtered_by_range_and_key() {
		let client = MockNodeClient::new().with_events(vec![
			event(1, 0xa),
			event(2, 0xb),
			event(3, 0xa),
			event(9, 0xa),
		]);
		let filter = EventFilter::for_selector(Felt::from(0x10u64), Felt::from(0xau64), 1, 5, 10);
		let page = client.get_events(&filter, None).await.unwrap();

		let blocks: Vec<_> = page.events.iter().map(|e| e.block_number).collect();
		assert_eq!(blocks, vec![Some(1), Some(3)]);
		assert!(page.continuation_token.is_none());
		assert_eq!(client.event_windows(), vec![(1, 5)]);
	}

	#[tokio::test]
	async fn test_declaring_twice_is_refused() {
		let class = std::sync::Arc::new(devnet_types::SierraClass {
			sierra_program: vec![Felt::ONE],
			contract_class_version: "0.1.0".into(),
			entry_points_by_type: Default::default(),
			abi: "[]".into(),
		});
		let tx = DeclareTransaction::new(Felt::ONE, class, Felt::TWO, Felt::ZERO);
		let client = MockNodeClient::new();

		assert!(!client.is_declared(tx.class_hash()).await.unwrap());
		client.add_declare_transaction(&tx, &[]).await.unwrap();
		assert!(client.is_declared(tx.class_hash()).await.unwrap());

		let err = client.add_declare_transaction(&tx, &[]).await.unwrap_err();
		assert!(err.is_class_already_declared());
		assert_eq!(client.declares().len(), 1);
	}

	#[tokio::test]
	async fn test_status_script_then_pending() {
		let client = MockNodeClient::new().with_status_results(vec![
			Err(MockNodeClient::transaction_not_found()),
			Ok(TransactionStatus::accepted_on_l2(TxExecutionStatus::Succeeded)),
		]);

		assert!(client
			.get_transaction_status(Felt::ONE)
			.await
			.unwrap_err()
			.is_transaction_not_found());
		assert_eq!(
			client.get_transaction_status(Felt::ONE).await.unwrap().finality,
			TxFinalityStatus::AcceptedOnL2
		);
		assert_eq!(
			client.get_transaction_status(Felt::ONE).await.unwrap(),
			TransactionStatus::pending()
		);
		assert_eq!(client.status_calls(), 3);
	}
}
