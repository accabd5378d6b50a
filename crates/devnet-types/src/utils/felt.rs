//! Field element conversions.
//!
//! The node speaks hex quantities for everything; these helpers move between
//! those strings, fixed-width integers and `Felt`.

use super::formatting::without_0x_prefix;
use crate::TypeError;
use starknet_types_core::felt::Felt;

/// Parses a felt from a `0x`-prefixed hex string or a decimal string.
pub fn parse_felt(value: &str) -> Result<Felt, TypeError> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return Err(TypeError::InvalidFelt("empty string".to_string()));
	}

	let parsed = if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
		let digits = without_0x_prefix(trimmed);
		if digits.is_empty() || digits.len() > 64 {
			return Err(TypeError::InvalidFelt(trimmed.to_string()));
		}
		Felt::from_hex(&format!("0x{}", digits))
	} else {
		Felt::from_dec_str(trimmed)
	};

	parsed.map_err(|_| TypeError::InvalidFelt(trimmed.to_string()))
}

/// Returns the felt as a 64-digit, zero-padded hex string with `0x` prefix.
pub fn felt_to_fixed_hex(value: &Felt) -> String {
	format!("0x{}", hex::encode(value.to_bytes_be()))
}

/// Converts a felt to `u64` if it fits.
pub fn felt_to_u64(value: &Felt) -> Option<u64> {
	let bytes = value.to_bytes_be();
	if bytes[..24].iter().any(|b| *b != 0) {
		return None;
	}
	let mut low = [0u8; 8];
	low.copy_from_slice(&bytes[24..]);
	Some(u64::from_be_bytes(low))
}

/// Converts a felt to `u128` if it fits.
pub fn felt_to_u128(value: &Felt) -> Option<u128> {
	let bytes = value.to_bytes_be();
	if bytes[..16].iter().any(|b| *b != 0) {
		return None;
	}
	let mut low = [0u8; 16];
	low.copy_from_slice(&bytes[16..]);
	Some(u128::from_be_bytes(low))
}

/// Encodes an ASCII short string (at most 31 characters) as a felt.
///
/// Used for chain ids (`SN_SEPOLIA`) and hash prefixes (`invoke`).
pub fn felt_from_short_string(value: &str) -> Felt {
	debug_assert!(value.len() <= 31, "short strings hold at most 31 bytes");
	Felt::from_bytes_be_slice(value.as_bytes())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_felt_hex_and_decimal() {
		assert_eq!(parse_felt("0x10").unwrap(), Felt::from(16u64));
		assert_eq!(parse_felt("0X10").unwrap(), Felt::from(16u64));
		assert_eq!(parse_felt("16").unwrap(), Felt::from(16u64));
		assert!(parse_felt("").is_err());
		assert!(parse_felt("0x").is_err());
		assert!(parse_felt("0xzz").is_err());
		assert!(parse_felt("latest").is_err());
	}

	#[test]
	fn test_integer_conversions() {
		let small = Felt::from(42u64);
		assert_eq!(felt_to_u64(&small), Some(42));
		assert_eq!(felt_to_u128(&small), Some(42));

		let wide = Felt::from(u128::MAX);
		assert_eq!(felt_to_u64(&wide), None);
		assert_eq!(felt_to_u128(&wide), Some(u128::MAX));
	}

	#[test]
	fn test_fixed_hex_is_padded() {
		let encoded = felt_to_fixed_hex(&Felt::from(1u64));
		assert_eq!(encoded.len(), 66);
		assert!(encoded.ends_with("01"));
		assert_eq!(parse_felt(&encoded).unwrap(), Felt::ONE);
	}

	#[test]
	fn test_short_string() {
		assert_eq!(
			felt_from_short_string("SN_SEPOLIA"),
			parse_felt("0x534e5f5345504f4c4941").unwrap()
		);
		assert_eq!(
			felt_from_short_string("invoke"),
			parse_felt("0x696e766f6b65").unwrap()
		);
	}
}
