//! Chain identifiers and block tags.

use crate::utils::{felt_from_short_string, parse_felt};
use crate::TypeError;
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;
use std::fmt;
use std::str::FromStr;

/// Starknet chain the transactions are hashed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ChainId {
	Mainnet,
	Sepolia,
	Custom(Felt),
}

impl ChainId {
	pub fn as_felt(&self) -> Felt {
		match self {
			ChainId::Mainnet => felt_from_short_string("SN_MAIN"),
			ChainId::Sepolia => felt_from_short_string("SN_SEPOLIA"),
			ChainId::Custom(id) => *id,
		}
	}
}

impl FromStr for ChainId {
	type Err = TypeError;

	/// Accepts `mainnet`, `sepolia`, or a raw hex chain id.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"mainnet" => Ok(ChainId::Mainnet),
			"sepolia" => Ok(ChainId::Sepolia),
			other if other.starts_with("0x") => Ok(ChainId::Custom(parse_felt(other)?)),
			other => Err(TypeError::InvalidArgument(format!(
				"Invalid chain: {}. Chain must be 'mainnet' or 'sepolia'.",
				other
			))),
		}
	}
}

impl TryFrom<String> for ChainId {
	type Error = TypeError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<ChainId> for String {
	fn from(value: ChainId) -> Self {
		value.to_string()
	}
}

impl fmt::Display for ChainId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChainId::Mainnet => write!(f, "mainnet"),
			ChainId::Sepolia => write!(f, "sepolia"),
			ChainId::Custom(id) => write!(f, "{:#x}", id),
		}
	}
}

/// Upper end of a block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockTag {
	/// Resolved to the current block number when the operation starts.
	#[default]
	Latest,
	Number(u64),
}

impl FromStr for BlockTag {
	type Err = TypeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s == "latest" {
			return Ok(BlockTag::Latest);
		}
		s.parse::<u64>().map(BlockTag::Number).map_err(|_| {
			TypeError::InvalidArgument(format!(
				"Invalid to_block value '{}'. Must be an integer or 'latest'.",
				s
			))
		})
	}
}

impl From<u64> for BlockTag {
	fn from(value: u64) -> Self {
		BlockTag::Number(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_chain_id_parsing() {
		assert_eq!("mainnet".parse::<ChainId>().unwrap(), ChainId::Mainnet);
		assert_eq!("sepolia".parse::<ChainId>().unwrap(), ChainId::Sepolia);
		assert_eq!(
			"0x534e5f5345504f4c4941".parse::<ChainId>().unwrap().as_felt(),
			ChainId::Sepolia.as_felt()
		);
		let err = "goerli".parse::<ChainId>().unwrap_err();
		assert!(err.to_string().contains("Chain must be 'mainnet' or 'sepolia'"));
	}

	#[test]
	fn test_block_tag_parsing() {
		assert_eq!("latest".parse::<BlockTag>().unwrap(), BlockTag::Latest);
		assert_eq!("42".parse::<BlockTag>().unwrap(), BlockTag::Number(42));
		assert!("pending".parse::<BlockTag>().is_err());
		assert!("-1".parse::<BlockTag>().is_err());
	}
}
