//! Utility functions for field elements, selectors and string formatting.

pub mod felt;
pub mod formatting;
pub mod selector;

pub use felt::{felt_from_short_string, felt_to_fixed_hex, felt_to_u128, felt_to_u64, parse_felt};
pub use formatting::{truncate_id, without_0x_prefix};
pub use selector::{get_selector_from_name, starknet_keccak};
