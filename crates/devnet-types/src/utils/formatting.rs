//! String formatting utilities.
//!
//! Hex prefix stripping and shortening of long hashes for log output.

/// Shortens a hash or address for log lines.
///
/// Keeps the first 10 characters (enough for `0x` plus 8 hex digits) and
/// appends "..".
pub fn truncate_id(id: &str) -> String {
	if id.len() <= 10 {
		id.to_string()
	} else {
		format!("{}..", &id[..10])
	}
}

/// Strips a leading "0x" or "0X" from a hex string.
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("0x1234"), "0x1234");
		assert_eq!(truncate_id("0x12345678"), "0x12345678");
		assert_eq!(truncate_id("0x1234567890abcdef"), "0x12345678..");
	}

	#[test]
	fn test_without_0x_prefix() {
		assert_eq!(without_0x_prefix("0Xabc"), "abc");
		assert_eq!(without_0x_prefix("abc"), "abc");
	}
}
