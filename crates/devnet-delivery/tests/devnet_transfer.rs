//! Transfer between two predeployed accounts on a real devnet.
//!
//! Run with `cargo test -p devnet-delivery -- --ignored` when
//! `starknet-devnet` is on `PATH`.

use devnet_config::Config;
use devnet_delivery::DeliveryService;
use devnet_discovery::EventScanner;
use devnet_node::NodeSupervisor;
use devnet_types::{get_selector_from_name, parse_felt, BlockTag, Call, Felt};

#[tokio::test]
#[ignore = "requires starknet-devnet on PATH"]
async fn test_strk_transfer_is_accepted_and_emits_event() {
	let config = Config::default();
	let node = NodeSupervisor::from_config(&config.node)
		.acquire(None)
		.await
		.unwrap();
	let client = node.client();
	let sender = &node.accounts()[0];
	let recipient = node.accounts()[1].address();
	let strk = parse_felt(devnet_account::STRK_ADDRESS).unwrap();

	let delivery = DeliveryService::new(client.clone(), &config.delivery);
	let transfer = Call::new(
		strk,
		get_selector_from_name("transfer"),
		vec![recipient, Felt::from(1_000u64), Felt::ZERO],
	);
	let outcome = delivery.execute(sender, &[transfer]).await.unwrap();
	assert!(outcome.status.finality.is_accepted());
	assert_eq!(sender.get_nonce().await.unwrap(), Felt::ONE);

	let scanner = EventScanner::from_config(client, &config.events).unwrap();
	let last = scanner
		.fetch_last(strk, "Transfer", 0, BlockTag::Latest)
		.await
		.unwrap()
		.unwrap();
	assert_eq!(last.transaction_hash, outcome.transaction_hash);
}
