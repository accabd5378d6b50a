//! Accounts bound to a node.

use crate::{attach_signature, format_signature, SignedTransaction, SignerInterface, SigningError};
use devnet_client::{ClientError, NodeClient};
use devnet_types::{truncate_id, ChainId, Felt, SignableTransaction};
use std::sync::Arc;
use tracing::debug;

/// An on-chain account: an address, the signer controlling it and the node
/// it talks to.
///
/// The client is shared; an account must not be used after the node behind
/// it has been stopped.
#[derive(Clone)]
pub struct Account {
	address: Felt,
	chain_id: ChainId,
	signer: Arc<dyn SignerInterface>,
	client: Arc<dyn NodeClient>,
}

impl Account {
	pub fn new(
		address: Felt,
		chain_id: ChainId,
		signer: Arc<dyn SignerInterface>,
		client: Arc<dyn NodeClient>,
	) -> Self {
		Self {
			address,
			chain_id,
			signer,
			client,
		}
	}

	pub fn address(&self) -> Felt {
		self.address
	}

	pub fn chain_id(&self) -> &ChainId {
		&self.chain_id
	}

	pub fn public_key(&self) -> Felt {
		self.signer.public_key()
	}

	pub fn client(&self) -> &Arc<dyn NodeClient> {
		&self.client
	}

	/// Returns the account's next nonce as seen by the node.
	pub async fn get_nonce(&self) -> Result<Felt, ClientError> {
		self.client.get_nonce(self.address).await
	}

	/// Signs a transaction and passes the result through the verification gate.
	pub async fn sign<T>(&self, tx: T) -> Result<SignedTransaction<T>, SigningError>
	where
		T: SignableTransaction + Send,
	{
		let hash = tx.transaction_hash(self.chain_id.as_felt());
		let signature = self.signer.sign_hash(hash).await?;
		debug!(
			account = %truncate_id(&format!("{:#x}", self.address)),
			tx_hash = %format!("{:#x}", hash),
			"Signed transaction"
		);
		attach_signature(
			tx,
			&format_signature(&signature),
			&self.chain_id,
			self.signer.public_key(),
		)
	}
}

impl std::fmt::Debug for Account {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Account")
			.field("address", &self.address)
			.field("chain_id", &self.chain_id)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::LocalSigner;
	use devnet_client::MockNodeClient;
	use devnet_types::InvokeTransaction;

	#[tokio::test]
	async fn test_sign_produces_verified_transaction() {
		let client: Arc<dyn NodeClient> = Arc::new(MockNodeClient::new().with_nonce(Felt::from(4u64)));
		let signer = LocalSigner::from_hex("0x1234").unwrap();
		let account = Account::new(Felt::from(0xabcu64), ChainId::Sepolia, Arc::new(signer), client);

		let nonce = account.get_nonce().await.unwrap();
		assert_eq!(nonce, Felt::from(4u64));

		let tx = InvokeTransaction::new(account.address(), vec![Felt::ONE], nonce);
		let signed = account.sign(tx.clone()).await.unwrap();
		assert_eq!(signed.transaction(), &tx);
		assert_eq!(signed.signature().len(), 2);
	}

	struct ForgingSigner;

	#[async_trait::async_trait]
	impl SignerInterface for ForgingSigner {
		fn public_key(&self) -> Felt {
			Felt::from(0x1234u64)
		}

		async fn sign_hash(&self, _hash: Felt) -> Result<[Felt; 2], SigningError> {
			Ok([Felt::ONE, Felt::ONE])
		}
	}

	#[tokio::test]
	async fn test_bad_signer_output_never_yields_signed_transaction() {
		let client: Arc<dyn NodeClient> = Arc::new(MockNodeClient::new());
		let account = Account::new(Felt::ONE, ChainId::Sepolia, Arc::new(ForgingSigner), client);

		let tx = InvokeTransaction::new(Felt::ONE, vec![], Felt::ZERO);
		let result = account.sign(tx).await;
		assert!(matches!(
			result,
			Err(SigningError::SignatureVerificationFailed { .. })
		));
	}
}
