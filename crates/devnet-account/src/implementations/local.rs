//! Local signer backed by an in-memory Stark private key.

use crate::{SignerInterface, SigningError};
use async_trait::async_trait;
use devnet_types::{parse_felt, Felt, SecretString};
use starknet_crypto::{get_public_key, rfc6979_generate_k, sign};

/// Signs with a private key held in process memory.
///
/// The key is kept as a [`SecretString`] and only parsed for the duration of
/// a signing operation.
pub struct LocalSigner {
	private_key: SecretString,
	public_key: Felt,
}

impl LocalSigner {
	/// Creates a signer from a hex encoded private key.
	pub fn from_hex(private_key: &str) -> Result<Self, SigningError> {
		Self::new(SecretString::from(private_key))
	}

	pub fn new(private_key: SecretString) -> Result<Self, SigningError> {
		let key = Self::parse_key(&private_key)?;
		Ok(Self {
			public_key: get_public_key(&key),
			private_key,
		})
	}

	fn parse_key(private_key: &SecretString) -> Result<Felt, SigningError> {
		let key = private_key
			.with_exposed(parse_felt)
			.map_err(|_| SigningError::Crypto("Invalid private key".into()))?;
		if key == Felt::ZERO {
			return Err(SigningError::Crypto("Private key cannot be zero".into()));
		}
		Ok(key)
	}
}

impl std::fmt::Debug for LocalSigner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("LocalSigner")
			.field("public_key", &self.public_key)
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl SignerInterface for LocalSigner {
	fn public_key(&self) -> Felt {
		self.public_key
	}

	async fn sign_hash(&self, hash: Felt) -> Result<[Felt; 2], SigningError> {
		let key = Self::parse_key(&self.private_key)?;
		let k = rfc6979_generate_k(&hash, &key, None);
		let signature =
			sign(&key, &hash, &k).map_err(|e| SigningError::Crypto(format!("{:?}", e)))?;
		Ok([signature.r, signature.s])
	}
}
