//! Entry point and event selectors.

use sha3::{Digest, Keccak256};
use starknet_types_core::felt::Felt;

const DEFAULT_ENTRY_POINT_NAME: &str = "__default__";
const DEFAULT_L1_ENTRY_POINT_NAME: &str = "__l1_default__";

/// Keccak-256 truncated to 250 bits, as used for Starknet selectors.
pub fn starknet_keccak(data: &[u8]) -> Felt {
	let mut hasher = Keccak256::new();
	hasher.update(data);
	let mut hash: [u8; 32] = hasher.finalize().into();
	// Keep the low 250 bits.
	hash[0] &= 0b0000_0011;
	Felt::from_bytes_be(&hash)
}

/// Computes the selector of a function or event from its name.
pub fn get_selector_from_name(name: &str) -> Felt {
	if name == DEFAULT_ENTRY_POINT_NAME || name == DEFAULT_L1_ENTRY_POINT_NAME {
		Felt::ZERO
	} else {
		starknet_keccak(name.as_bytes())
	}
}
