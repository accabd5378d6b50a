//! Invoke and declare transactions and resource bounds.
//!
//! An [`InvokeTransaction`] is the unsigned, version 3 invoke payload and a
//! [`DeclareTransaction`] the version 3 declare payload. Neither is edited in
//! place: the `with_*` methods consume the value and return a new one with a
//! single field replaced. Signing lives in `devnet-account`, which wraps a
//! verified signature around anything implementing
//! [`SignableTransaction`].

use crate::contract::{CompiledClass, SierraClass};
use crate::utils::felt_from_short_string;
use crate::TypeError;
use serde::{Deserialize, Serialize};
use starknet_crypto::poseidon_hash_many;
use starknet_types_core::felt::Felt;
use std::sync::Arc;

/// Transaction version used for invoke transactions.
pub const INVOKE_VERSION: u64 = 3;

/// Transaction version used for declare transactions.
pub const DECLARE_VERSION: u64 = 3;

/// Data availability mode L1 for both nonce and fee, packed as
/// `(nonce_mode << 32) | fee_mode`.
const DATA_AVAILABILITY_MODES: u64 = 0;

/// The three fee-bearing resources of a v3 transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	L1Gas,
	L2Gas,
	L1DataGas,
}

impl ResourceKind {
	/// All kinds, in the order they appear in the fee-fields hash.
	pub const ALL: [ResourceKind; 3] = [
		ResourceKind::L1Gas,
		ResourceKind::L2Gas,
		ResourceKind::L1DataGas,
	];

	/// Field name used on the wire (`l1_gas`, `l2_gas`, `l1_data_gas`).
	pub fn wire_name(&self) -> &'static str {
		match self {
			ResourceKind::L1Gas => "l1_gas",
			ResourceKind::L2Gas => "l2_gas",
			ResourceKind::L1DataGas => "l1_data_gas",
		}
	}

	/// Short-string tag mixed into the transaction hash.
	fn hash_tag(&self) -> u64 {
		match self {
			// "L1_GAS"
			ResourceKind::L1Gas => 0x4c31_5f47_4153,
			// "L2_GAS"
			ResourceKind::L2Gas => 0x4c32_5f47_4153,
			// "L1_DATA"
			ResourceKind::L1DataGas => 0x4c_315f_4441_5441,
		}
	}
}

/// Upper bound on one resource: how much of it and at what unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceBounds {
	pub max_amount: u64,
	pub max_price_per_unit: u128,
}

impl ResourceBounds {
	pub const ZERO: ResourceBounds = ResourceBounds {
		max_amount: 0,
		max_price_per_unit: 0,
	};

	pub fn new(max_amount: u64, max_price_per_unit: u128) -> Self {
		Self {
			max_amount,
			max_price_per_unit,
		}
	}

	/// Multiplies both the amount and the price by `multiplier`.
	///
	/// Returns `None` when either product overflows its integer width.
	pub fn scaled(&self, multiplier: u64) -> Option<Self> {
		Some(Self {
			max_amount: self.max_amount.checked_mul(multiplier)?,
			max_price_per_unit: self.max_price_per_unit.checked_mul(multiplier as u128)?,
		})
	}

	/// Packs the bound as `tag << 192 | max_amount << 128 | max_price_per_unit`.
	fn hash_word(&self, kind: ResourceKind) -> Felt {
		let mut word = [0u8; 32];
		word[..8].copy_from_slice(&kind.hash_tag().to_be_bytes());
		word[8..16].copy_from_slice(&self.max_amount.to_be_bytes());
		word[16..].copy_from_slice(&self.max_price_per_unit.to_be_bytes());
		Felt::from_bytes_be(&word)
	}
}

/// Resource bounds for every resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceBoundsMapping {
	pub l1_gas: ResourceBounds,
	pub l2_gas: ResourceBounds,
	pub l1_data_gas: ResourceBounds,
}

impl ResourceBoundsMapping {
	/// The all-zero placeholder used by freshly built transactions.
	pub fn zero() -> Self {
		Self::default()
	}

	pub fn is_zero(&self) -> bool {
		*self == Self::zero()
	}

	pub fn get(&self, kind: ResourceKind) -> ResourceBounds {
		match kind {
			ResourceKind::L1Gas => self.l1_gas,
			ResourceKind::L2Gas => self.l2_gas,
			ResourceKind::L1DataGas => self.l1_data_gas,
		}
	}

	/// Scales every bound by `multiplier`, failing on the first overflow.
	pub fn scaled(&self, multiplier: u64) -> Option<Self> {
		Some(Self {
			l1_gas: self.l1_gas.scaled(multiplier)?,
			l2_gas: self.l2_gas.scaled(multiplier)?,
			l1_data_gas: self.l1_data_gas.scaled(multiplier)?,
		})
	}

	/// Poseidon over the tip and the three packed bounds.
	fn fee_fields_hash(&self, tip: u64) -> Felt {
		let mut fee_fields = vec![Felt::from(tip)];
		for kind in ResourceKind::ALL {
			fee_fields.push(self.get(kind).hash_word(kind));
		}
		poseidon_hash_many(&fee_fields)
	}
}

/// A transaction an account can sign.
pub trait SignableTransaction {
	fn sender_address(&self) -> Felt;

	fn nonce(&self) -> Felt;

	/// Hash the account signs, bound to `chain_id`.
	fn transaction_hash(&self, chain_id: Felt) -> Felt;
}

/// Unsigned version 3 invoke transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeTransaction {
	sender_address: Felt,
	calldata: Vec<Felt>,
	nonce: Felt,
	version: Felt,
	#[serde(default)]
	account_deployment_data: Vec<Felt>,
	resource_bounds: ResourceBoundsMapping,
	#[serde(default)]
	tip: u64,
	#[serde(default)]
	paymaster_data: Vec<Felt>,
}

impl InvokeTransaction {
	/// Creates a version 3 transaction with zero resource bounds.
	pub fn new(sender_address: Felt, calldata: Vec<Felt>, nonce: Felt) -> Self {
		Self {
			sender_address,
			calldata,
			nonce,
			version: Felt::from(INVOKE_VERSION),
			account_deployment_data: Vec::new(),
			resource_bounds: ResourceBoundsMapping::zero(),
			tip: 0,
			paymaster_data: Vec::new(),
		}
	}

	pub fn with_version(mut self, version: Felt) -> Self {
		self.version = version;
		self
	}

	pub fn with_nonce(mut self, nonce: Felt) -> Self {
		self.nonce = nonce;
		self
	}

	pub fn with_account_deployment_data(mut self, data: Vec<Felt>) -> Self {
		self.account_deployment_data = data;
		self
	}

	pub fn with_resource_bounds(mut self, resource_bounds: ResourceBoundsMapping) -> Self {
		self.resource_bounds = resource_bounds;
		self
	}

	pub fn sender_address(&self) -> Felt {
		self.sender_address
	}

	pub fn calldata(&self) -> &[Felt] {
		&self.calldata
	}

	pub fn nonce(&self) -> Felt {
		self.nonce
	}

	pub fn version(&self) -> Felt {
		self.version
	}

	pub fn account_deployment_data(&self) -> &[Felt] {
		&self.account_deployment_data
	}

	pub fn resource_bounds(&self) -> &ResourceBoundsMapping {
		&self.resource_bounds
	}

	pub fn tip(&self) -> u64 {
		self.tip
	}

	pub fn paymaster_data(&self) -> &[Felt] {
		&self.paymaster_data
	}

	/// Computes the canonical transaction hash on `chain_id`.
	///
	/// Poseidon over the `invoke` prefix, version, sender, the fee fields
	/// (tip and the three packed bounds), paymaster data, chain id, nonce,
	/// data availability modes, account deployment data and calldata.
	pub fn transaction_hash(&self, chain_id: Felt) -> Felt {
		let elements = vec![
			felt_from_short_string("invoke"),
			self.version,
			self.sender_address,
			self.resource_bounds.fee_fields_hash(self.tip),
			poseidon_hash_many(&self.paymaster_data),
			chain_id,
			self.nonce,
			Felt::from(DATA_AVAILABILITY_MODES),
			poseidon_hash_many(&self.account_deployment_data),
			poseidon_hash_many(&self.calldata),
		];
		poseidon_hash_many(&elements)
	}
}

impl SignableTransaction for InvokeTransaction {
	fn sender_address(&self) -> Felt {
		self.sender_address
	}

	fn nonce(&self) -> Felt {
		self.nonce
	}

	fn transaction_hash(&self, chain_id: Felt) -> Felt {
		InvokeTransaction::transaction_hash(self, chain_id)
	}
}

/// Unsigned version 3 declare transaction.
///
/// The Sierra class is shared rather than copied since programs run to
/// megabytes. Its class hash is computed once, on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclareTransaction {
	sender_address: Felt,
	contract_class: Arc<SierraClass>,
	class_hash: Felt,
	compiled_class_hash: Felt,
	nonce: Felt,
	version: Felt,
	account_deployment_data: Vec<Felt>,
	resource_bounds: ResourceBoundsMapping,
	tip: u64,
	paymaster_data: Vec<Felt>,
}

impl DeclareTransaction {
	/// Creates a version 3 declare with zero resource bounds.
	pub fn new(
		sender_address: Felt,
		contract_class: Arc<SierraClass>,
		compiled_class_hash: Felt,
		nonce: Felt,
	) -> Self {
		Self {
			sender_address,
			class_hash: contract_class.class_hash(),
			contract_class,
			compiled_class_hash,
			nonce,
			version: Felt::from(DECLARE_VERSION),
			account_deployment_data: Vec::new(),
			resource_bounds: ResourceBoundsMapping::zero(),
			tip: 0,
			paymaster_data: Vec::new(),
		}
	}

	/// Declare of `contract_class` whose CASM is `compiled_class`.
	pub fn from_classes(
		sender_address: Felt,
		contract_class: Arc<SierraClass>,
		compiled_class: &CompiledClass,
		nonce: Felt,
	) -> Result<Self, TypeError> {
		let compiled_class_hash = compiled_class.compiled_class_hash()?;
		Ok(Self::new(
			sender_address,
			contract_class,
			compiled_class_hash,
			nonce,
		))
	}

	pub fn with_nonce(mut self, nonce: Felt) -> Self {
		self.nonce = nonce;
		self
	}

	pub fn with_resource_bounds(mut self, resource_bounds: ResourceBoundsMapping) -> Self {
		self.resource_bounds = resource_bounds;
		self
	}

	pub fn sender_address(&self) -> Felt {
		self.sender_address
	}

	pub fn contract_class(&self) -> &SierraClass {
		&self.contract_class
	}

	pub fn class_hash(&self) -> Felt {
		self.class_hash
	}

	pub fn compiled_class_hash(&self) -> Felt {
		self.compiled_class_hash
	}

	pub fn nonce(&self) -> Felt {
		self.nonce
	}

	pub fn version(&self) -> Felt {
		self.version
	}

	pub fn account_deployment_data(&self) -> &[Felt] {
		&self.account_deployment_data
	}

	pub fn resource_bounds(&self) -> &ResourceBoundsMapping {
		&self.resource_bounds
	}

	pub fn tip(&self) -> u64 {
		self.tip
	}

	pub fn paymaster_data(&self) -> &[Felt] {
		&self.paymaster_data
	}

	/// Computes the canonical transaction hash on `chain_id`.
	///
	/// Same layout as the invoke hash up to the account deployment data,
	/// followed by the class hash and compiled class hash instead of
	/// calldata.
	pub fn transaction_hash(&self, chain_id: Felt) -> Felt {
		let elements = vec![
			felt_from_short_string("declare"),
			self.version,
			self.sender_address,
			self.resource_bounds.fee_fields_hash(self.tip),
			poseidon_hash_many(&self.paymaster_data),
			chain_id,
			self.nonce,
			Felt::from(DATA_AVAILABILITY_MODES),
			poseidon_hash_many(&self.account_deployment_data),
			self.class_hash,
			self.compiled_class_hash,
		];
		poseidon_hash_many(&elements)
	}
}

impl SignableTransaction for DeclareTransaction {
	fn sender_address(&self) -> Felt {
		self.sender_address
	}

	fn nonce(&self) -> Felt {
		self.nonce
	}

	fn transaction_hash(&self, chain_id: Felt) -> Felt {
		DeclareTransaction::transaction_hash(self, chain_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample_tx() -> InvokeTransaction {
		InvokeTransaction::new(
			Felt::from(0x1234u64),
			vec![Felt::ONE, Felt::from(2u64), Felt::from(3u64)],
			Felt::from(7u64),
		)
	}

	#[test]
	fn test_new_transaction_has_zero_bounds() {
		let tx = sample_tx();
		assert!(tx.resource_bounds().is_zero());
		assert_eq!(tx.version(), Felt::from(3u64));
		assert!(tx.account_deployment_data().is_empty());
	}

	#[test]
	fn test_replacing_bounds_keeps_other_fields() {
		let tx = sample_tx();
		let bounds = ResourceBoundsMapping {
			l1_gas: ResourceBounds::new(1, 2),
			l2_gas: ResourceBounds::new(3, 4),
			l1_data_gas: ResourceBounds::new(5, 6),
		};
		let priced = tx.clone().with_resource_bounds(bounds);

		assert_eq!(priced.resource_bounds(), &bounds);
		assert_eq!(priced.calldata(), tx.calldata());
		assert_eq!(priced.nonce(), tx.nonce());
		assert_eq!(priced.sender_address(), tx.sender_address());
		assert_eq!(priced.version(), tx.version());
		assert!(tx.resource_bounds().is_zero());
	}

	#[test]
	fn test_scaling_is_exact() {
		let bounds = ResourceBoundsMapping {
			l1_gas: ResourceBounds::new(10, 100),
			l2_gas: ResourceBounds::new(0, 7),
			l1_data_gas: ResourceBounds::new(123, 456),
		};
		let scaled = bounds.scaled(10).unwrap();
		assert_eq!(scaled.l1_gas, ResourceBounds::new(100, 1000));
		assert_eq!(scaled.l2_gas, ResourceBounds::new(0, 70));
		assert_eq!(scaled.l1_data_gas, ResourceBounds::new(1230, 4560));
	}

	#[test]
	fn test_scaling_overflow_is_detected() {
		let bounds = ResourceBounds::new(u64::MAX, 1);
		assert!(bounds.scaled(2).is_none());
		assert_eq!(bounds.scaled(1), Some(bounds));
	}

	#[test]
	fn test_hash_depends_on_every_signed_field() {
		let chain_id = felt_from_short_string("SN_SEPOLIA");
		let tx = sample_tx();
		let base = tx.transaction_hash(chain_id);

		assert_eq!(base, tx.clone().transaction_hash(chain_id));
		assert_ne!(base, tx.transaction_hash(felt_from_short_string("SN_MAIN")));
		assert_ne!(
			base,
			tx.clone().with_nonce(Felt::from(8u64)).transaction_hash(chain_id)
		);
		assert_ne!(
			base,
			tx.clone()
				.with_resource_bounds(ResourceBoundsMapping {
					l2_gas: ResourceBounds::new(1, 1),
					..ResourceBoundsMapping::zero()
				})
				.transaction_hash(chain_id)
		);
		assert_ne!(
			base,
			tx.with_account_deployment_data(vec![Felt::ONE])
				.transaction_hash(chain_id)
		);
	}

	/// STRK transfer of 1000 from predeployed account #0 to #1, nonce 5, on
	/// SN_SEPOLIA with bounds priced at ten times a typical devnet estimate.
	fn priced_transfer() -> InvokeTransaction {
		let felt = |hex: &str| crate::parse_felt(hex).unwrap();
		InvokeTransaction::new(
			felt("0x05b99fc6098fb3bf5a0f95cab6b7a2b6fd376bc04b2fea0ca7eb8f72216ec3b2"),
			vec![
				Felt::ONE,
				felt("0x4718f5a0fc34cc1af16a1cdee98ffb20c31f5cd61d6ab07201858f4287c938d"),
				felt("0x83afd3f4caedc6eebf44246fe54e38c95e3179a5ec9ea81740eca5b482d12e"),
				Felt::from(3u64),
				felt("0x063ca12081899481a94345c926661121eeab13655be408edb5c7fec854702520"),
				Felt::from(1000u64),
				Felt::ZERO,
			],
			Felt::from(5u64),
		)
		.with_resource_bounds(ResourceBoundsMapping {
			l1_gas: ResourceBounds::new(0, 1_000_000_000_000),
			l2_gas: ResourceBounds::new(0x6f05b58, 100_000_000_000),
			l1_data_gas: ResourceBounds::new(3200, 10),
		})
	}

	#[test]
	fn test_bound_words_pack_tag_amount_and_price() {
		let bounds = priced_transfer().resource_bounds;
		let word = |kind: ResourceKind| format!("{:#x}", bounds.get(kind).hash_word(kind));

		assert_eq!(
			word(ResourceKind::L1Gas),
			"0x4c315f47415300000000000000000000000000000000000000e8d4a51000"
		);
		assert_eq!(
			word(ResourceKind::L2Gas),
			"0x4c325f4741530000000006f05b580000000000000000000000174876e800"
		);
		assert_eq!(
			word(ResourceKind::L1DataGas),
			"0x4c315f444154410000000000000c800000000000000000000000000000000a"
		);
	}

	#[test]
	fn test_invoke_hash_known_answer() {
		let chain_id = felt_from_short_string("SN_SEPOLIA");
		assert_eq!(
			format!("{:#x}", priced_transfer().transaction_hash(chain_id)),
			"0xcffa3fe8c58aa3e6cd09a28a159d58e15b8e0b58f12f4f3543a2935cc5e535"
		);
	}

	fn minimal_class() -> Arc<SierraClass> {
		Arc::new(SierraClass {
			sierra_program: vec![Felt::ONE, Felt::TWO, Felt::THREE],
			contract_class_version: "0.1.0".into(),
			entry_points_by_type: Default::default(),
			abi: "[]".into(),
		})
	}

	fn priced_declare() -> DeclareTransaction {
		let transfer = priced_transfer();
		DeclareTransaction::new(
			transfer.sender_address(),
			minimal_class(),
			crate::parse_felt("0x63ecfd583781657434beb737f6d6c64a1ab1ae2036791d52323839d3d75c7e2")
				.unwrap(),
			Felt::from(6u64),
		)
		.with_resource_bounds(*transfer.resource_bounds())
	}

	#[test]
	fn test_declare_computes_class_hash() {
		let tx = priced_declare();
		assert_eq!(
			format!("{:#x}", tx.class_hash()),
			"0x6e39499571fc21f4e734efc9c68e741dd7cc773e9bc0917f9070e6c4d078f9f"
		);
		assert_eq!(tx.version(), Felt::from(3u64));
	}

	#[test]
	fn test_declare_hash_known_answer() {
		let chain_id = felt_from_short_string("SN_SEPOLIA");
		let tx = priced_declare();
		assert_eq!(
			format!("{:#x}", tx.transaction_hash(chain_id)),
			"0x2d9bd9e9a7f9a943eaec912d56d487b0b7cb9ca93650207cc67906a0193f8f7"
		);
		assert_eq!(
			SignableTransaction::transaction_hash(&tx, chain_id),
			tx.transaction_hash(chain_id)
		);
		assert_ne!(
			tx.clone().with_nonce(Felt::from(7u64)).transaction_hash(chain_id),
			tx.transaction_hash(chain_id)
		);
	}

	#[test]
	fn test_json_form_round_trips() {
		let tx = sample_tx().with_resource_bounds(ResourceBoundsMapping {
			l1_gas: ResourceBounds::new(1, 2),
			..ResourceBoundsMapping::zero()
		});
		let json = serde_json::to_string(&tx).unwrap();
		assert!(json.contains("l1_data_gas"));
		let decoded: InvokeTransaction = serde_json::from_str(&json).unwrap();
		assert_eq!(decoded, tx);
	}
}
