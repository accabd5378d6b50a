//! Event types for on-chain event retrieval.
//!
//! Event records are produced by the chain and never modified by the
//! harness. A filter describes one block range; pages are what a single
//! `starknet_getEvents` round trip returns.

use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;

/// A single emitted event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
	/// Contract that emitted the event.
	pub from_address: Felt,
	/// Ordered keys; the first key is the event selector.
	pub keys: Vec<Felt>,
	/// Ordered data payload.
	pub data: Vec<Felt>,
	/// Block the event was emitted in; absent for pending blocks.
	#[serde(default)]
	pub block_number: Option<u64>,
	#[serde(default)]
	pub block_hash: Option<Felt>,
	#[serde(default)]
	pub transaction_hash: Felt,
}

/// Event query over a closed block range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
	pub address: Option<Felt>,
	/// Key filter, one alternative set per key position.
	pub keys: Vec<Vec<Felt>>,
	pub from_block: u64,
	pub to_block: u64,
	/// Maximum number of events the server returns per page.
	pub page_size: u64,
}

impl EventFilter {
	/// Filter for one event selector emitted by one contract.
	pub fn for_selector(
		address: Felt,
		selector: Felt,
		from_block: u64,
		to_block: u64,
		page_size: u64,
	) -> Self {
		Self {
			address: Some(address),
			keys: vec![vec![selector]],
			from_block,
			to_block,
			page_size,
		}
	}
}

/// One page of events plus the token to request the next one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsPage {
	pub events: Vec<EventRecord>,
	#[serde(default)]
	pub continuation_token: Option<String>,
}
