//! Contract classes, their hashes and deployment addresses.
//!
//! [`SierraClass`] and [`CompiledClass`] are the parts of Scarb's
//! `contract_class.json` and `compiled_contract_class.json` that a declare
//! transaction needs. Other fields in those files (debug info, hints,
//! compiler version) are ignored when decoding.

use crate::utils::{felt_from_short_string, starknet_keccak};
use crate::TypeError;
use serde::{Deserialize, Serialize};
use starknet_crypto::{pedersen_hash, poseidon_hash_many};
use starknet_types_core::felt::{Felt, NonZeroFelt};

/// Contract addresses live below `2**251 - 256`.
const ADDRESS_BOUND: NonZeroFelt = NonZeroFelt::from_felt_unchecked(Felt::from_hex_unchecked(
	"0x7ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff00",
));

const COMPILED_CLASS_VERSION: &str = "COMPILED_CLASS_V1";
const CONTRACT_ADDRESS_PREFIX: &str = "STARKNET_CONTRACT_ADDRESS";

/// Entry points grouped the way class files list them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "E: Deserialize<'de>"))]
pub struct EntryPointsByType<E> {
	#[serde(rename = "EXTERNAL", default)]
	pub external: Vec<E>,
	#[serde(rename = "L1_HANDLER", default)]
	pub l1_handler: Vec<E>,
	#[serde(rename = "CONSTRUCTOR", default)]
	pub constructor: Vec<E>,
}

impl<E> Default for EntryPointsByType<E> {
	fn default() -> Self {
		Self {
			external: Vec::new(),
			l1_handler: Vec::new(),
			constructor: Vec::new(),
		}
	}
}

impl<E> EntryPointsByType<E> {
	/// Hashes each group with `flatten`, in external, L1 handler, constructor
	/// order.
	fn hashes(&self, flatten: impl Fn(&E) -> Vec<Felt>) -> [Felt; 3] {
		let hash = |entry_points: &[E]| {
			let elements: Vec<Felt> = entry_points.iter().flat_map(&flatten).collect();
			poseidon_hash_many(&elements)
		};
		[
			hash(&self.external),
			hash(&self.l1_handler),
			hash(&self.constructor),
		]
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SierraEntryPoint {
	pub selector: Felt,
	pub function_idx: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasmEntryPoint {
	pub selector: Felt,
	pub offset: u64,
	#[serde(default)]
	pub builtins: Vec<String>,
}

/// A Sierra contract class in the form the node accepts for declaration.
///
/// The ABI is kept as the exact string that is hashed and sent; class files
/// that carry it as a JSON array must be serialized to a string first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SierraClass {
	pub sierra_program: Vec<Felt>,
	pub contract_class_version: String,
	pub entry_points_by_type: EntryPointsByType<SierraEntryPoint>,
	pub abi: String,
}

impl SierraClass {
	/// Poseidon over the class version, the three entry point groups, the
	/// Starknet Keccak of the ABI and the Sierra program.
	pub fn class_hash(&self) -> Felt {
		let [external, l1_handler, constructor] = self
			.entry_points_by_type
			.hashes(|ep| vec![ep.selector, Felt::from(ep.function_idx)]);
		poseidon_hash_many(&[
			felt_from_short_string(&format!(
				"CONTRACT_CLASS_V{}",
				self.contract_class_version
			)),
			external,
			l1_handler,
			constructor,
			starknet_keccak(self.abi.as_bytes()),
			poseidon_hash_many(&self.sierra_program),
		])
	}
}

/// Nested segment lengths of CASM bytecode.
///
/// A leaf covers that many bytecode words; a node covers its children in
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentLengths {
	Leaf(u64),
	Node(Vec<SegmentLengths>),
}

/// The CASM fields that make up the compiled class hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledClass {
	pub bytecode: Vec<Felt>,
	#[serde(default)]
	pub bytecode_segment_lengths: Option<SegmentLengths>,
	pub entry_points_by_type: EntryPointsByType<CasmEntryPoint>,
}

impl CompiledClass {
	/// Computes the compiled class hash a declare transaction commits to.
	///
	/// Fails when the segment lengths do not cover the bytecode exactly.
	pub fn compiled_class_hash(&self) -> Result<Felt, TypeError> {
		let [external, l1_handler, constructor] =
			self.entry_points_by_type.hashes(|ep| {
				let builtins: Vec<Felt> = ep
					.builtins
					.iter()
					.map(|name| felt_from_short_string(name))
					.collect();
				vec![
					ep.selector,
					Felt::from(ep.offset),
					poseidon_hash_many(&builtins),
				]
			});
		Ok(poseidon_hash_many(&[
			felt_from_short_string(COMPILED_CLASS_VERSION),
			external,
			l1_handler,
			constructor,
			self.bytecode_hash()?,
		]))
	}

	fn bytecode_hash(&self) -> Result<Felt, TypeError> {
		let Some(lengths) = &self.bytecode_segment_lengths else {
			return Ok(poseidon_hash_many(&self.bytecode));
		};
		let (hash, covered) = segment_hash(&self.bytecode, lengths)?;
		if covered != self.bytecode.len() {
			return Err(TypeError::InvalidArgument(format!(
				"bytecode segments cover {} of {} words",
				covered,
				self.bytecode.len()
			)));
		}
		Ok(hash)
	}
}

/// Hash of the segment starting at the head of `bytecode`, and its length.
fn segment_hash(bytecode: &[Felt], lengths: &SegmentLengths) -> Result<(Felt, usize), TypeError> {
	match lengths {
		SegmentLengths::Leaf(length) => {
			let length = *length as usize;
			let words = bytecode.get(..length).ok_or_else(|| {
				TypeError::InvalidArgument(format!(
					"bytecode segment of {} words exceeds the remaining {}",
					length,
					bytecode.len()
				))
			})?;
			Ok((poseidon_hash_many(words), length))
		},
		SegmentLengths::Node(children) => {
			let mut offset = 0;
			let mut elements = Vec::with_capacity(children.len() * 2);
			for child in children {
				let (hash, length) = segment_hash(&bytecode[offset..], child)?;
				elements.push(Felt::from(length as u64));
				elements.push(hash);
				offset += length;
			}
			Ok((poseidon_hash_many(&elements) + Felt::ONE, offset))
		},
	}
}

/// Pedersen chain over `elements`, finished with their count.
pub fn compute_hash_on_elements(elements: &[Felt]) -> Felt {
	let hash = elements
		.iter()
		.fold(Felt::ZERO, |acc, element| pedersen_hash(&acc, element));
	pedersen_hash(&hash, &Felt::from(elements.len() as u64))
}

/// Address a contract of `class_hash` gets when `deployer_address` deploys
/// it with `salt` and `constructor_calldata`.
///
/// A zero deployer gives the address independent of who deploys.
pub fn calculate_contract_address(
	salt: Felt,
	class_hash: Felt,
	constructor_calldata: &[Felt],
	deployer_address: Felt,
) -> Felt {
	compute_hash_on_elements(&[
		felt_from_short_string(CONTRACT_ADDRESS_PREFIX),
		deployer_address,
		salt,
		class_hash,
		compute_hash_on_elements(constructor_calldata),
	])
	.mod_floor(&ADDRESS_BOUND)
}

/// Address the universal deployer at `udc_address` gives a contract that
/// `account` deploys through it.
///
/// Unique deployments mix the account into the salt and count the deployer
/// as origin, so two accounts using the same salt get different addresses.
/// Other deployments land where a zero deployer would put them.
pub fn calculate_udc_address(
	udc_address: Felt,
	account: Felt,
	class_hash: Felt,
	salt: Felt,
	unique: bool,
	constructor_calldata: &[Felt],
) -> Felt {
	if unique {
		calculate_contract_address(
			pedersen_hash(&account, &salt),
			class_hash,
			constructor_calldata,
			udc_address,
		)
	} else {
		calculate_contract_address(salt, class_hash, constructor_calldata, Felt::ZERO)
	}
}
