//! Multicall calldata encoding.

use devnet_types::{Call, Felt};

/// Encodes `calls` as the account `__execute__` calldata:
/// `[n, (to, selector, len, args...)...]`.
pub fn encode_multicall(calls: &[Call]) -> Vec<Felt> {
	let len = 1 + calls.iter().map(|c| 3 + c.calldata.len()).sum::<usize>();
	let mut calldata = Vec::with_capacity(len);
	calldata.push(Felt::from(calls.len() as u64));
	for call in calls {
		calldata.push(call.to);
		calldata.push(call.selector);
		calldata.push(Felt::from(call.calldata.len() as u64));
		calldata.extend_from_slice(&call.calldata);
	}
	calldata
}
