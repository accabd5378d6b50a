//! Transaction status types.
//!
//! A transaction's observable outcome is the pair (finality, execution)
//! sampled at poll time. The node reports a few transient finality values
//! (`RECEIVED`, `CANDIDATE`, `PRE_CONFIRMED`) which all collapse into
//! [`TxFinalityStatus::Pending`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// How far a transaction has progressed towards inclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxFinalityStatus {
	#[serde(
		rename = "PENDING",
		alias = "RECEIVED",
		alias = "CANDIDATE",
		alias = "PRE_CONFIRMED"
	)]
	Pending,
	#[serde(rename = "ACCEPTED_ON_L2")]
	AcceptedOnL2,
	#[serde(rename = "ACCEPTED_ON_L1")]
	AcceptedOnL1,
	#[serde(rename = "REJECTED")]
	Rejected,
}

impl TxFinalityStatus {
	pub fn is_accepted(&self) -> bool {
		matches!(
			self,
			TxFinalityStatus::AcceptedOnL2 | TxFinalityStatus::AcceptedOnL1
		)
	}
}

impl fmt::Display for TxFinalityStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			TxFinalityStatus::Pending => "PENDING",
			TxFinalityStatus::AcceptedOnL2 => "ACCEPTED_ON_L2",
			TxFinalityStatus::AcceptedOnL1 => "ACCEPTED_ON_L1",
			TxFinalityStatus::Rejected => "REJECTED",
		};
		write!(f, "{}", s)
	}
}

/// Whether an included transaction's logic completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxExecutionStatus {
	Succeeded,
	Reverted,
}

/// One status sample for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionStatus {
	#[serde(rename = "finality_status")]
	pub finality: TxFinalityStatus,
	#[serde(rename = "execution_status", default)]
	pub execution: Option<TxExecutionStatus>,
	#[serde(default)]
	pub failure_reason: Option<String>,
}

impl TransactionStatus {
	pub fn new(finality: TxFinalityStatus, execution: Option<TxExecutionStatus>) -> Self {
		Self {
			finality,
			execution,
			failure_reason: None,
		}
	}

	pub fn pending() -> Self {
		Self::new(TxFinalityStatus::Pending, None)
	}

	pub fn rejected() -> Self {
		Self::new(TxFinalityStatus::Rejected, None)
	}

	pub fn accepted_on_l2(execution: TxExecutionStatus) -> Self {
		Self::new(TxFinalityStatus::AcceptedOnL2, Some(execution))
	}

	pub fn accepted_on_l1(execution: TxExecutionStatus) -> Self {
		Self::new(TxFinalityStatus::AcceptedOnL1, Some(execution))
	}

	pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
		self.failure_reason = Some(reason.into());
		self
	}

	pub fn is_reverted(&self) -> bool {
		self.execution == Some(TxExecutionStatus::Reverted)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transient_statuses_are_pending() {
		for raw in ["RECEIVED", "CANDIDATE", "PRE_CONFIRMED", "PENDING"] {
			let status: TxFinalityStatus = serde_json::from_str(&format!("\"{}\"", raw)).unwrap();
			assert_eq!(status, TxFinalityStatus::Pending, "{}", raw);
		}
	}

	#[test]
	fn test_status_from_node_response() {
		let status: TransactionStatus = serde_json::from_str(
			r#"{"finality_status":"ACCEPTED_ON_L2","execution_status":"REVERTED","failure_reason":"out of gas"}"#,
		)
		.unwrap();
		assert!(status.finality.is_accepted());
		assert!(status.is_reverted());
		assert_eq!(status.failure_reason.as_deref(), Some("out of gas"));

		let received: TransactionStatus =
			serde_json::from_str(r#"{"finality_status":"RECEIVED"}"#).unwrap();
		assert_eq!(received, TransactionStatus::pending());
	}
}
