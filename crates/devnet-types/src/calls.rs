//! Prepared contract calls.
//!
//! A [`Call`] is the unit the multicall encoder batches: target contract,
//! entry point selector and flattened calldata. [`CallArgs`] says how the
//! caller supplied the arguments; encoding matches on the tag instead of
//! inspecting the argument shape.

use crate::utils::get_selector_from_name;
use crate::TypeError;
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;

/// Arguments for a contract function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArgs {
	/// Already flattened, in parameter order.
	Positional(Vec<Felt>),
	/// Keyed by parameter name; reordered using the function's parameter list.
	Named(Vec<(String, Felt)>),
	/// The function takes no arguments.
	None,
}

impl CallArgs {
	/// Flattens the arguments into calldata.
	///
	/// `params` is the function's parameter order and is only consulted for
	/// [`CallArgs::Named`]. A missing or unknown name is an error.
	pub fn into_calldata(self, params: &[&str]) -> Result<Vec<Felt>, TypeError> {
		match self {
			CallArgs::None => Ok(Vec::new()),
			CallArgs::Positional(args) => Ok(args),
			CallArgs::Named(mut args) => {
				let mut calldata = Vec::with_capacity(params.len());
				for param in params {
					let index = args
						.iter()
						.position(|(name, _)| name == param)
						.ok_or_else(|| {
							TypeError::InvalidArgument(format!("Missing argument '{}'", param))
						})?;
					calldata.push(args.remove(index).1);
				}
				if let Some((name, _)) = args.first() {
					return Err(TypeError::InvalidArgument(format!(
						"Unknown argument '{}'",
						name
					)));
				}
				Ok(calldata)
			},
		}
	}
}

/// A call ready to be executed directly or batched into a multicall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
	pub to: Felt,
	pub selector: Felt,
	pub calldata: Vec<Felt>,
}

impl Call {
	pub fn new(to: Felt, selector: Felt, calldata: Vec<Felt>) -> Self {
		Self {
			to,
			selector,
			calldata,
		}
	}

	/// Prepares a call to `function_name` on `to`.
	pub fn prepare(
		to: Felt,
		function_name: &str,
		args: CallArgs,
		params: &[&str],
	) -> Result<Self, TypeError> {
		Ok(Self {
			to,
			selector: get_selector_from_name(function_name),
			calldata: args.into_calldata(params)?,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn felt(v: u64) -> Felt {
		Felt::from(v)
	}

	#[test]
	fn test_positional_and_none() {
		let calldata = CallArgs::Positional(vec![felt(1), felt(2)])
			.into_calldata(&["ignored"])
			.unwrap();
		assert_eq!(calldata, vec![felt(1), felt(2)]);
		assert!(CallArgs::None.into_calldata(&[]).unwrap().is_empty());
	}

	#[test]
	fn test_named_arguments_follow_parameter_order() {
		let args = CallArgs::Named(vec![
			("amount".to_string(), felt(5)),
			("recipient".to_string(), felt(9)),
		]);
		let calldata = args.into_calldata(&["recipient", "amount"]).unwrap();
		assert_eq!(calldata, vec![felt(9), felt(5)]);
	}

	#[test]
	fn test_named_arguments_reject_missing_and_unknown() {
		let missing = CallArgs::Named(vec![("recipient".to_string(), felt(9))])
			.into_calldata(&["recipient", "amount"]);
		assert_eq!(
			missing,
			Err(TypeError::InvalidArgument("Missing argument 'amount'".into()))
		);

		let unknown = CallArgs::Named(vec![
			("recipient".to_string(), felt(9)),
			("memo".to_string(), felt(1)),
		])
		.into_calldata(&["recipient"]);
		assert_eq!(
			unknown,
			Err(TypeError::InvalidArgument("Unknown argument 'memo'".into()))
		);
	}

	#[test]
	fn test_prepare_uses_selector() {
		let call = Call::prepare(felt(0x10), "transfer", CallArgs::None, &[]).unwrap();
		assert_eq!(call.selector, get_selector_from_name("transfer"));
		assert_eq!(call.to, felt(0x10));
	}
}
