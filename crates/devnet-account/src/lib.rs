//! Account management module for the devnet harness.
//!
//! This module provides the signer abstraction, the [`Account`] that binds a
//! signer to an address and a node, and the signature gate that turns an
//! unsigned transaction plus a signature string into a [`SignedTransaction`].
//! A signed transaction can only come out of that gate, so everything that
//! reaches the node has been verified against the signer's public key.

use async_trait::async_trait;
use devnet_types::Felt;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod local;
}

mod account;
mod predeployed;
mod signature;

pub use account::Account;
pub use implementations::local::LocalSigner;
pub use predeployed::{
	predeployed_accounts, PredeployedAccount, ERC20_CLASS_HASH, ETH_ADDRESS,
	PREDEPLOYED_ACCOUNTS, STRK_ADDRESS, UDC_ADDRESS, UDC_CLASS_HASH,
};
pub use signature::{attach_signature, format_signature, parse_signature, SignedTransaction};

/// Errors that can occur during signing operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SigningError {
	/// The signature string is not `0x` followed by r and s in hex.
	#[error("Invalid signature format: {0}")]
	InvalidSignatureFormat(String),
	/// The signature does not verify against the transaction hash and public key.
	#[error("Invalid signature. Tx hash: {tx_hash}, public key: {public_key}")]
	SignatureVerificationFailed { tx_hash: String, public_key: String },
	/// Error raised by the curve implementation.
	#[error("Crypto error: {0}")]
	Crypto(String),
}

/// Trait defining the interface for signers.
///
/// A signer owns key material and produces raw `(r, s)` signatures over
/// message hashes. It never sees the transaction itself.
#[async_trait]
pub trait SignerInterface: Send + Sync {
	/// Returns the Stark public key matching the signing key.
	fn public_key(&self) -> Felt;

	/// Signs a message hash and returns `[r, s]`.
	async fn sign_hash(&self, hash: Felt) -> Result<[Felt; 2], SigningError>;
}
