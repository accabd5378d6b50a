//! Accounts and contracts that exist on every devnet started with seed 500.

use crate::{Account, LocalSigner, SigningError};
use devnet_client::NodeClient;
use devnet_types::{parse_felt, ChainId};
use std::sync::Arc;

/// ETH fee token.
pub const ETH_ADDRESS: &str = "0x49d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7";
/// STRK fee token.
pub const STRK_ADDRESS: &str = "0x4718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d";
/// Class of both fee tokens.
pub const ERC20_CLASS_HASH: &str =
	"0x46ded64ae2dead6448e247234bab192a9c483644395b66f2155f2614e5804b0";
/// Universal deployer contract.
pub const UDC_ADDRESS: &str = "0x41a78e741e5af2fec34b695679bc6891742439f7afb8484ecd7766661ad02bf";
pub const UDC_CLASS_HASH: &str =
	"0x7b3e05f48f0c69e4a65ce5e076a66271a527aff2c34ce1083ec6e1526997a69";

/// Address and private key of a predeployed account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredeployedAccount {
	pub address: &'static str,
	pub private_key: &'static str,
}

/// The 15 accounts predeployed with `--seed 500`, in devnet order.
pub const PREDEPLOYED_ACCOUNTS: [PredeployedAccount; 15] = [
	PredeployedAccount {
		address: "0x05b99fc6098fb3bf5a0f95cab6b7a2b6fd376bc04b2fea0ca7eb8f72216ec3b2",
		private_key: "0x00000000000000000000000000000000b4fac4a807d5f17016e1b8ab17a865c4",
	},
	PredeployedAccount {
		address: "0x063ca12081899481a94345c926661121eeab13655be408edb5c7fec854702520",
		private_key: "0x0000000000000000000000000000000024231a9d8f74eae8cbd8c80826c8193a",
	},
	PredeployedAccount {
		address: "0x067f3fa88e047a4cc5f656423b7253bf01a2144487017fdde7f55d7a702d83d9",
		private_key: "0x000000000000000000000000000000001293ea7b811536b80758de00247d8183",
	},
	PredeployedAccount {
		address: "0x02a5a18bdfd211dcc91b0145773961a72afaa39f85b3c97ab5b9d3398f658622",
		private_key: "0x00000000000000000000000000000000fb49b1af8bb4c3e87701d41368f001f3",
	},
	PredeployedAccount {
		address: "0x0574fff23ea8c1779a7978efc0a059b6336fa4e04090118ee9aa88507c341a62",
		private_key: "0x0000000000000000000000000000000027741a991a8b3a637d0c42276f0981e7",
	},
	PredeployedAccount {
		address: "0x030abb3e39b3488ec7e4381d46301cb23c4b409fa80c4fc846949ae77978d279",
		private_key: "0x00000000000000000000000000000000437756c310eefe42413cf7a5ffbbe349",
	},
	PredeployedAccount {
		address: "0x077b18cd56d4ce334687bffe78123ccff4c5ea15dda013c58f17c769af39e135",
		private_key: "0x000000000000000000000000000000006e54993e3de6455e0c808713dec59617",
	},
	PredeployedAccount {
		address: "0x0215b7fd7d85b59c344feab99d06acbfb08d509ee4fbe87e50c304dbe074d8f0",
		private_key: "0x00000000000000000000000000000000f401ceaef4f781d0a00f79a5353b6b8c",
	},
	PredeployedAccount {
		address: "0x06eb4627dff4d0519441dd9bc05f8af2b51e21695b935a56490cbebbb985a562",
		private_key: "0x0000000000000000000000000000000097bcc69c1f8dceeb9e4171f7d6f2c8a3",
	},
	PredeployedAccount {
		address: "0x0061aa21aae0cc11130f60295c2b1157e309b0ba833d00c6b82722c11f35a748",
		private_key: "0x000000000000000000000000000000009fa01c7fc02a46988a06ddaf75736838",
	},
	PredeployedAccount {
		address: "0x007f5dc1da6d2e2bb641850371f7dbcd8c9c9f5f8cd40cd44e02219cc1689da3",
		private_key: "0x00000000000000000000000000000000ea05845eccb044a807a4e8c14b5f16d7",
	},
	PredeployedAccount {
		address: "0x07fa72a7903683ebf3efcc5f15d34027952a5225bda7f9b7672f494ad789a363",
		private_key: "0x00000000000000000000000000000000944d96ff107fc49bc63b33a12586047c",
	},
	PredeployedAccount {
		address: "0x0737cfc12916c61e36bc01bc34fb988bb752a704b21b795b878b5c3c7031a8c2",
		private_key: "0x00000000000000000000000000000000a468091c646cacb04d0921d13e9f2cff",
	},
	PredeployedAccount {
		address: "0x00541b44e24c57583bdc3502a84be8db16c586fd113b44707f9e67de5675d85b",
		private_key: "0x00000000000000000000000000000000dfcb05cc360b82bb4bd8362c5fb74265",
	},
	PredeployedAccount {
		address: "0x06d7642f72bf5ccf66f4c05c21c5214004b6bd9195de2a22a4704352ec14adc2",
		private_key: "0x000000000000000000000000000000003ebeb153a6555be576e80f24ed808a7c",
	},
];

/// Builds the first `count` predeployed accounts bound to `client`.
///
/// `count` is capped at the size of the table.
pub fn predeployed_accounts(
	client: Arc<dyn NodeClient>,
	chain_id: ChainId,
	count: usize,
) -> Result<Vec<Account>, SigningError> {
	PREDEPLOYED_ACCOUNTS
		.iter()
		.take(count)
		.map(|entry| {
			let address = parse_felt(entry.address)
				.map_err(|e| SigningError::Crypto(format!("Invalid account address: {}", e)))?;
			let signer = LocalSigner::from_hex(entry.private_key)?;
			Ok(Account::new(
				address,
				chain_id,
				Arc::new(signer),
				Arc::clone(&client),
			))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use devnet_client::MockNodeClient;

	#[test]
	fn test_builds_all_accounts_with_distinct_keys() {
		let client: Arc<dyn NodeClient> = Arc::new(MockNodeClient::new());
		let accounts = predeployed_accounts(client, ChainId::Sepolia, 15).unwrap();

		assert_eq!(accounts.len(), 15);
		assert_eq!(
			accounts[0].address(),
			parse_felt("0x05b99fc6098fb3bf5a0f95cab6b7a2b6fd376bc04b2fea0ca7eb8f72216ec3b2").unwrap()
		);
		let mut keys: Vec<_> = accounts.iter().map(|a| a.public_key()).collect();
		keys.sort();
		keys.dedup();
		assert_eq!(keys.len(), 15);
	}

	#[test]
	fn test_count_is_capped() {
		let client: Arc<dyn NodeClient> = Arc::new(MockNodeClient::new());
		assert_eq!(predeployed_accounts(Arc::clone(&client), ChainId::Sepolia, 3).unwrap().len(), 3);
		assert_eq!(predeployed_accounts(client, ChainId::Sepolia, 40).unwrap().len(), 15);
	}

	#[test]
	fn test_contract_constants_parse() {
		for address in [ETH_ADDRESS, STRK_ADDRESS, ERC20_CLASS_HASH, UDC_ADDRESS, UDC_CLASS_HASH] {
			assert_ne!(parse_felt(address).unwrap(), devnet_types::Felt::ZERO);
		}
	}
}
