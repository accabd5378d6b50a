//! Common types module for the devnet harness.
//!
//! This module defines the data types shared by the node supervisor, the
//! transaction pipeline and the event scanner: field elements, resource
//! bounds, invoke and declare transactions and their canonical hashes,
//! contract classes, transaction statuses, event records and prepared calls.

use thiserror::Error;

/// Prepared contract calls and their argument encodings.
pub mod calls;
/// Chain identifiers and block tags.
pub mod chain;
/// Contract classes, class hashes and contract addresses.
pub mod contract;
/// On-chain event records and query filters.
pub mod events;
/// Fee estimates returned by the node.
pub mod fee;
/// Secret string wrapper for key material.
pub mod secret_string;
/// Transaction finality and execution statuses.
pub mod status;
/// Invoke and declare transactions, resource bounds and transaction hashing.
pub mod transaction;
/// Utility functions for felts, selectors and formatting.
pub mod utils;

pub use calls::{Call, CallArgs};
pub use chain::{BlockTag, ChainId};
pub use contract::{
	calculate_contract_address, calculate_udc_address, compute_hash_on_elements, CasmEntryPoint,
	CompiledClass, EntryPointsByType, SegmentLengths, SierraClass, SierraEntryPoint,
};
pub use events::{EventFilter, EventRecord, EventsPage};
pub use fee::FeeEstimate;
pub use secret_string::SecretString;
pub use starknet_types_core::felt::Felt;
pub use status::{TransactionStatus, TxExecutionStatus, TxFinalityStatus};
pub use transaction::{
	DeclareTransaction, InvokeTransaction, ResourceBounds, ResourceBoundsMapping, ResourceKind,
	SignableTransaction,
};
pub use utils::{
	felt_from_short_string, felt_to_fixed_hex, felt_to_u128, felt_to_u64, get_selector_from_name,
	parse_felt, starknet_keccak, truncate_id, without_0x_prefix,
};

/// Errors raised while parsing or converting shared values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
	/// A value was syntactically valid but not acceptable for the operation.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	/// A string could not be parsed as a field element.
	#[error("Invalid field element: {0}")]
	InvalidFelt(String),
}
