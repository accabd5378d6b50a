//! Replaceability upgrade calls.
//!
//! A replaceable contract is upgraded in two steps, both taking the same
//! implementation data: `add_new_implementation` registers it and
//! `replace_to` switches to it. The two are sent as one multicall.

use devnet_types::{get_selector_from_name, Call, Felt};
use serde_json::{json, Value};

/// Entry points called, in order, to upgrade a replaceable contract.
pub const UPGRADE_FUNCTIONS: [&str; 2] = ["add_new_implementation", "replace_to"];

/// External initializer run as part of an upgrade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EicData {
	pub eic_hash: Felt,
	pub eic_init_data: Vec<Felt>,
}

/// The implementation a contract is upgraded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationData {
	pub impl_hash: Felt,
	pub eic_data: Option<EicData>,
	/// Whether this is the last upgrade the contract accepts.
	pub is_final: bool,
}

impl ImplementationData {
	pub fn new(impl_hash: Felt) -> Self {
		Self {
			impl_hash,
			eic_data: None,
			is_final: false,
		}
	}

	pub fn with_eic(mut self, eic_hash: Felt, eic_init_data: Vec<Felt>) -> Self {
		self.eic_data = Some(EicData {
			eic_hash,
			eic_init_data,
		});
		self
	}

	pub fn finalized(mut self) -> Self {
		self.is_final = true;
		self
	}

	/// Cairo serialization of the struct.
	///
	/// `Option` is an enum whose `Some` variant is index 0 and `None` index
	/// 1; spans are prefixed with their length.
	pub fn to_calldata(&self) -> Vec<Felt> {
		let mut calldata = vec![self.impl_hash];
		match &self.eic_data {
			Some(eic) => {
				calldata.push(Felt::ZERO);
				calldata.push(eic.eic_hash);
				calldata.push(Felt::from(eic.eic_init_data.len() as u64));
				calldata.extend_from_slice(&eic.eic_init_data);
			},
			None => calldata.push(Felt::ONE),
		}
		calldata.push(Felt::from(self.is_final));
		calldata
	}
}

/// Builds the upgrade calls for `contract`, in [`UPGRADE_FUNCTIONS`] order.
pub fn prepare_upgrade_calls(contract: Felt, implementation: &ImplementationData) -> Vec<Call> {
	let calldata = implementation.to_calldata();
	UPGRADE_FUNCTIONS
		.iter()
		.map(|name| Call::new(contract, get_selector_from_name(name), calldata.clone()))
		.collect()
}

/// The upgrade calls in the JSON form multisig transaction builders take:
/// `{ contractAddress, entrypoint, calldata }` with hex values.
pub fn prepare_upgrade_calls_json(contract: Felt, implementation: &ImplementationData) -> Vec<Value> {
	let calldata: Vec<String> = implementation
		.to_calldata()
		.iter()
		.map(|felt| format!("{:#x}", felt))
		.collect();
	UPGRADE_FUNCTIONS
		.iter()
		.map(|name| {
			json!({
				"contractAddress": format!("{:#x}", contract),
				"entrypoint": name,
				"calldata": calldata,
			})
		})
		.collect()
}
