//! Fee estimate returned by `starknet_estimateFee`.

use crate::transaction::{ResourceBounds, ResourceBoundsMapping};
use serde::{Deserialize, Serialize};

/// Raw, unscaled fee estimate for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeEstimate {
	pub l1_gas_consumed: u64,
	pub l1_gas_price: u128,
	pub l2_gas_consumed: u64,
	pub l2_gas_price: u128,
	pub l1_data_gas_consumed: u64,
	pub l1_data_gas_price: u128,
	pub overall_fee: u128,
	/// `FRI` or `WEI`.
	pub unit: String,
}

impl FeeEstimate {
	/// The estimate as resource bounds, one-to-one and without any margin.
	pub fn resource_bounds(&self) -> ResourceBoundsMapping {
		ResourceBoundsMapping {
			l1_gas: ResourceBounds::new(self.l1_gas_consumed, self.l1_gas_price),
			l2_gas: ResourceBounds::new(self.l2_gas_consumed, self.l2_gas_price),
			l1_data_gas: ResourceBounds::new(self.l1_data_gas_consumed, self.l1_data_gas_price),
		}
	}
}
