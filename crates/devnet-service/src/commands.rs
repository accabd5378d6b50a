//! Subcommand implementations.

use crate::EventsArgs;
use devnet_account::PREDEPLOYED_ACCOUNTS;
use devnet_client::{JsonRpcClient, NodeClient};
use devnet_config::{Config, DeliveryConfig};
use devnet_delivery::DeliveryService;
use devnet_discovery::EventScanner;
use devnet_node::NodeSupervisor;
use devnet_types::{felt_to_fixed_hex, Felt, TransactionStatus};
use std::error::Error;
use std::sync::Arc;
use tracing::info;

type CommandResult<T = ()> = Result<T, Box<dyn Error>>;

pub fn connect(rpc_url: &str) -> CommandResult<Arc<dyn NodeClient>> {
	Ok(Arc::new(JsonRpcClient::new(rpc_url)?))
}

/// Runs a node until Ctrl-C, then stops it.
pub async fn start(config: &Config, port: Option<u16>) -> CommandResult {
	let supervisor = NodeSupervisor::from_config(&config.node);
	let mut node = supervisor.acquire(port).await?;
	info!(port = node.port(), rpc_url = %node.rpc_url(), "Devnet ready");

	println!("RPC: {}", node.rpc_url());
	for (index, account) in node.accounts().iter().enumerate() {
		println!("#{:<2} {}", index, felt_to_fixed_hex(&account.address()));
	}

	tokio::signal::ctrl_c().await?;
	info!("Stopping devnet");
	node.stop();
	Ok(())
}

pub async fn events(
	client: Arc<dyn NodeClient>,
	config: &Config,
	args: &EventsArgs,
) -> CommandResult {
	let chunk_size = args.chunk_size.unwrap_or(config.events.chunk_size);
	let scanner = EventScanner::new(client, chunk_size, config.events.page_size)?;

	if args.last {
		let event = scanner
			.fetch_last(args.address, &args.event, args.from_block, args.to_block)
			.await?;
		match event {
			Some(event) => println!("{}", serde_json::to_string_pretty(&event)?),
			None => info!(event = %args.event, "No matching event"),
		}
	} else {
		let events = scanner
			.fetch_all(args.address, &args.event, args.from_block, args.to_block)
			.await?;
		println!("{}", serde_json::to_string_pretty(&events)?);
	}
	Ok(())
}

pub async fn wait_tx(
	client: Arc<dyn NodeClient>,
	config: &DeliveryConfig,
	tx_hash: Felt,
) -> CommandResult<TransactionStatus> {
	let status = DeliveryService::new(client, config)
		.await_finality(tx_hash)
		.await?;
	println!("{}", serde_json::to_string(&status)?);
	Ok(status)
}

pub async fn advance_time(client: Arc<dyn NodeClient>, seconds: u64) -> CommandResult {
	client.increase_time(seconds).await?;
	info!(seconds, "Advanced devnet time");
	Ok(())
}

/// Prints the accounts a node started with `config` will have.
pub fn accounts(config: &Config) {
	for (index, account) in PREDEPLOYED_ACCOUNTS
		.iter()
		.take(config.node.accounts)
		.enumerate()
	{
		println!("#{:<2} {} {}", index, account.address, account.private_key);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use devnet_client::MockNodeClient;
	use devnet_types::{BlockTag, TxExecutionStatus};

	#[tokio::test]
	async fn test_events_uses_chunk_override() {
		let client = Arc::new(MockNodeClient::new().with_block_number(30));
		let args = EventsArgs {
			rpc: crate::RpcArgs {
				rpc_url: String::new(),
			},
			address: Felt::ONE,
			event: "Transfer".into(),
			from_block: 0,
			to_block: BlockTag::Latest,
			chunk_size: Some(10),
			last: false,
		};

		events(client.clone(), &Config::default(), &args).await.unwrap();

		assert_eq!(client.event_windows(), vec![(0, 9), (10, 19), (20, 29), (30, 30)]);
	}

	#[tokio::test]
	async fn test_events_rejects_zero_chunk() {
		let client = Arc::new(MockNodeClient::new());
		let args = EventsArgs {
			rpc: crate::RpcArgs {
				rpc_url: String::new(),
			},
			address: Felt::ONE,
			event: "Transfer".into(),
			from_block: 0,
			to_block: BlockTag::Number(5),
			chunk_size: Some(0),
			last: true,
		};

		assert!(events(client, &Config::default(), &args).await.is_err());
	}

	#[tokio::test]
	async fn test_wait_tx_and_advance_time() {
		let client = Arc::new(MockNodeClient::new().with_statuses(vec![
			TransactionStatus::accepted_on_l1(TxExecutionStatus::Succeeded),
		]));
		let config = DeliveryConfig {
			check_interval_ms: 1,
			retries: 1,
			..DeliveryConfig::default()
		};

		let status = wait_tx(client.clone(), &config, Felt::from(0x42u64))
			.await
			.unwrap();
		assert!(status.finality.is_accepted());

		advance_time(client.clone(), 3600).await.unwrap();
		assert_eq!(client.increased_time(), 3600);
	}
}
