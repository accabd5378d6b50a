//! Declaration outcomes and deployments through the universal deployer.

use devnet_types::{calculate_udc_address, get_selector_from_name, Call, Felt};

/// Entry point of the universal deployer contract.
const DEPLOY_CONTRACT_FUNCTION: &str = "deployContract";

/// Result of declaring a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclareOutcome {
	/// A declare transaction was sent and accepted.
	Declared {
		class_hash: Felt,
		transaction_hash: Felt,
	},
	/// The node already knew the class; nothing was sent.
	AlreadyDeclared { class_hash: Felt },
}

impl DeclareOutcome {
	pub fn class_hash(&self) -> Felt {
		match self {
			DeclareOutcome::Declared { class_hash, .. } => *class_hash,
			DeclareOutcome::AlreadyDeclared { class_hash } => *class_hash,
		}
	}

	pub fn transaction_hash(&self) -> Option<Felt> {
		match self {
			DeclareOutcome::Declared {
				transaction_hash, ..
			} => Some(*transaction_hash),
			DeclareOutcome::AlreadyDeclared { .. } => None,
		}
	}
}

/// Inputs for deploying one contract.
///
/// Without an explicit salt the deploying account's current nonce is used,
/// which keeps repeated deployments from one account apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
	pub class_hash: Felt,
	pub constructor_calldata: Vec<Felt>,
	pub salt: Option<Felt>,
	pub unique: bool,
}

impl DeployRequest {
	pub fn new(class_hash: Felt, constructor_calldata: Vec<Felt>) -> Self {
		Self {
			class_hash,
			constructor_calldata,
			salt: None,
			unique: true,
		}
	}

	pub fn with_salt(mut self, salt: Felt) -> Self {
		self.salt = Some(salt);
		self
	}

	/// Deploys to the address any deployer would get for the same inputs.
	pub fn not_unique(mut self) -> Self {
		self.unique = false;
		self
	}
}

/// A contract deployed and accepted on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
	pub address: Felt,
	pub class_hash: Felt,
	pub transaction_hash: Felt,
}

/// The `deployContract` call and the address it will deploy to.
///
/// Calldata is `[class_hash, salt, unique, len, constructor_calldata...]`.
pub fn udc_deploy_call(
	udc_address: Felt,
	account: Felt,
	class_hash: Felt,
	salt: Felt,
	unique: bool,
	constructor_calldata: &[Felt],
) -> (Call, Felt) {
	let mut calldata = Vec::with_capacity(4 + constructor_calldata.len());
	calldata.push(class_hash);
	calldata.push(salt);
	calldata.push(Felt::from(unique));
	calldata.push(Felt::from(constructor_calldata.len() as u64));
	calldata.extend_from_slice(constructor_calldata);

	let address = calculate_udc_address(
		udc_address,
		account,
		class_hash,
		salt,
		unique,
		constructor_calldata,
	);
	let call = Call::new(
		udc_address,
		get_selector_from_name(DEPLOY_CONTRACT_FUNCTION),
		calldata,
	);
	(call, address)
}
