//! Signature parsing and the verification gate.

use crate::SigningError;
use devnet_types::{
	felt_to_fixed_hex, parse_felt, ChainId, Felt, InvokeTransaction, SignableTransaction,
};
use starknet_crypto::verify;

/// Length of `0x` plus 64 hex digits of r.
const R_PREFIX_LEN: usize = 66;
const MAX_S_HEX_LEN: usize = 64;

/// A transaction together with a signature that verifies against it.
///
/// Only [`attach_signature`] constructs this type. Invoke transactions are
/// the default; declares use `SignedTransaction<DeclareTransaction>`.
///
/// [`DeclareTransaction`]: devnet_types::DeclareTransaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction<T = InvokeTransaction> {
	transaction: T,
	signature: [Felt; 2],
	transaction_hash: Felt,
}

impl<T> SignedTransaction<T> {
	pub fn transaction(&self) -> &T {
		&self.transaction
	}

	pub fn signature(&self) -> &[Felt] {
		&self.signature
	}

	/// Hash the signature was verified against.
	pub fn transaction_hash(&self) -> Felt {
		self.transaction_hash
	}

	pub fn into_parts(self) -> (T, [Felt; 2]) {
		(self.transaction, self.signature)
	}
}

/// Splits a signature string into `[r, s]`.
///
/// The string is `0x`, then r as exactly 64 hex digits, then s as up to 64
/// hex digits.
pub fn parse_signature(raw: &str) -> Result<[Felt; 2], SigningError> {
	let invalid = |reason: &str| {
		SigningError::InvalidSignatureFormat(format!("{} in '{}'", reason, raw))
	};

	if !raw.starts_with("0x") {
		return Err(invalid("missing 0x prefix"));
	}
	if !raw.is_ascii() {
		return Err(invalid("non-hex characters"));
	}
	if raw.len() <= R_PREFIX_LEN {
		return Err(invalid("too short"));
	}
	let (r_part, s_part) = raw.split_at(R_PREFIX_LEN);
	if s_part.len() > MAX_S_HEX_LEN {
		return Err(invalid("too long"));
	}
	if !r_part[2..].chars().chain(s_part.chars()).all(|c| c.is_ascii_hexdigit()) {
		return Err(invalid("non-hex characters"));
	}

	let r = parse_felt(r_part).map_err(|e| invalid(&e.to_string()))?;
	let s = parse_felt(&format!("0x{}", s_part)).map_err(|e| invalid(&e.to_string()))?;
	Ok([r, s])
}

/// Formats `[r, s]` as a signature string accepted by [`parse_signature`].
pub fn format_signature(signature: &[Felt; 2]) -> String {
	let s = felt_to_fixed_hex(&signature[1]);
	format!("{}{}", felt_to_fixed_hex(&signature[0]), &s[2..])
}

/// Attaches a signature to a transaction after verifying it.
///
/// The transaction hash is recomputed for `chain_id` and the signature is
/// checked against `public_key`. Nothing is produced when it does not
/// verify.
pub fn attach_signature<T: SignableTransaction>(
	transaction: T,
	raw_signature: &str,
	chain_id: &ChainId,
	public_key: Felt,
) -> Result<SignedTransaction<T>, SigningError> {
	let signature = parse_signature(raw_signature)?;
	let transaction_hash = transaction.transaction_hash(chain_id.as_felt());

	let failed = || SigningError::SignatureVerificationFailed {
		tx_hash: felt_to_fixed_hex(&transaction_hash),
		public_key: felt_to_fixed_hex(&public_key),
	};
	let valid = verify(&public_key, &transaction_hash, &signature[0], &signature[1])
		.map_err(|_| failed())?;
	if !valid {
		return Err(failed());
	}

	Ok(SignedTransaction {
		transaction,
		signature,
		transaction_hash,
	})
}
