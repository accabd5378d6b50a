//! Chunked event scanning.

use crate::DiscoveryError;
use devnet_client::NodeClient;
use devnet_config::EventsConfig;
use devnet_types::{get_selector_from_name, BlockTag, EventFilter, EventRecord, Felt};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Fetches the events of one contract over a block range, one window of
/// `chunk_size` blocks per query.
pub struct EventScanner {
	client: Arc<dyn NodeClient>,
	chunk_size: u64,
	page_size: u64,
}

impl EventScanner {
	pub fn new(
		client: Arc<dyn NodeClient>,
		chunk_size: u64,
		page_size: u64,
	) -> Result<Self, DiscoveryError> {
		if chunk_size == 0 {
			return Err(DiscoveryError::InvalidArgument(
				"chunk_size must be positive".into(),
			));
		}
		if page_size == 0 {
			return Err(DiscoveryError::InvalidArgument(
				"page_size must be positive".into(),
			));
		}
		Ok(Self {
			client,
			chunk_size,
			page_size,
		})
	}

	pub fn from_config(
		client: Arc<dyn NodeClient>,
		config: &EventsConfig,
	) -> Result<Self, DiscoveryError> {
		Self::new(client, config.chunk_size, config.page_size)
	}

	/// Returns every `event_name` event emitted by `address` in
	/// `[from_block, to_block]`, in block order.
	///
	/// `Latest` is resolved once, before the first query.
	#[instrument(skip(self, address), fields(address = %format!("{:#x}", address)))]
	pub async fn fetch_all(
		&self,
		address: Felt,
		event_name: &str,
		from_block: u64,
		to_block: BlockTag,
	) -> Result<Vec<EventRecord>, DiscoveryError> {
		let to_block = self.resolve(to_block).await?;
		let selector = get_selector_from_name(event_name);
		let mut events = Vec::new();
		if from_block > to_block {
			return Ok(events);
		}

		let mut start = from_block;
		loop {
			let end = start.saturating_add(self.chunk_size - 1).min(to_block);
			let window = self.fetch_window(address, selector, start, end).await?;
			events.extend(window);
			if end == to_block {
				break;
			}
			start = end + 1;
		}
		debug!(count = events.len(), from_block, to_block, "Fetched all events");
		Ok(events)
	}

	/// Returns the last `event_name` event emitted by `address` in
	/// `[from_block, to_block]`.
	///
	/// Windows are walked from the top of the range down and the scan stops
	/// at the first window holding a match, so the result is the last
	/// element of [`fetch_all`](Self::fetch_all) over the same range.
	#[instrument(skip(self, address), fields(address = %format!("{:#x}", address)))]
	pub async fn fetch_last(
		&self,
		address: Felt,
		event_name: &str,
		from_block: u64,
		to_block: BlockTag,
	) -> Result<Option<EventRecord>, DiscoveryError> {
		let to_block = self.resolve(to_block).await?;
		let selector = get_selector_from_name(event_name);
		if from_block > to_block {
			return Ok(None);
		}

		let mut end = to_block;
		loop {
			let start = end.saturating_sub(self.chunk_size - 1).max(from_block);
			let mut window = self.fetch_window(address, selector, start, end).await?;
			if let Some(event) = window.pop() {
				return Ok(Some(event));
			}
			if start == from_block {
				return Ok(None);
			}
			end = start - 1;
		}
	}

	async fn resolve(&self, block: BlockTag) -> Result<u64, DiscoveryError> {
		match block {
			BlockTag::Number(number) => Ok(number),
			BlockTag::Latest => {
				let latest = self.client.block_number().await?;
				debug!(latest, "Resolved latest block");
				Ok(latest)
			},
		}
	}

	async fn fetch_window(
		&self,
		address: Felt,
		selector: Felt,
		start: u64,
		end: u64,
	) -> Result<Vec<EventRecord>, DiscoveryError> {
		let filter = EventFilter::for_selector(address, selector, start, end, self.page_size);
		let events = self.client.get_all_events(&filter).await?;
		debug!(count = events.len(), start, end, "Fetched events");
		Ok(events)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use devnet_client::MockNodeClient;

	const EVENT: &str = "Transfer";

	fn address() -> Felt {
		Felt::from(0xc0ffeeu64)
	}

	fn event(block: u64, seq: u64) -> EventRecord {
		EventRecord {
			from_address: address(),
			keys: vec![get_selector_from_name(EVENT)],
			data: vec![Felt::from(seq)],
			block_number: Some(block),
			block_hash: None,
			transaction_hash: Felt::from(block * 1000 + seq),
		}
	}

	/// Matching events at `blocks`, with unrelated events interleaved.
	fn stream(blocks: &[u64]) -> Vec<EventRecord> {
		let mut events = Vec::new();
		for (seq, block) in blocks.iter().enumerate() {
			events.push(event(*block, seq as u64));
			events.push(EventRecord {
				keys: vec![get_selector_from_name("Approval")],
				..event(*block, 900)
			});
			events.push(EventRecord {
				from_address: Felt::from(0xbeefu64),
				..event(*block, 901)
			});
		}
		events
	}

	fn scanner(client: &Arc<MockNodeClient>, chunk_size: u64) -> EventScanner {
		EventScanner::new(client.clone(), chunk_size, 2).unwrap()
	}

	#[test]
	fn test_zero_chunk_size_rejected() {
		let client: Arc<dyn NodeClient> = Arc::new(MockNodeClient::new());
		assert!(matches!(
			EventScanner::new(client.clone(), 0, 10),
			Err(DiscoveryError::InvalidArgument(_))
		));
		assert!(matches!(
			EventScanner::new(client, 10, 0),
			Err(DiscoveryError::InvalidArgument(_))
		));
	}

	#[tokio::test]
	async fn test_fetch_all_walks_forward_in_chunks() {
		let client = Arc::new(
			MockNodeClient::new()
				.with_block_number(25)
				.with_events(stream(&[0, 3, 3, 10, 19, 20, 25])),
		);

		let events = scanner(&client, 10)
			.fetch_all(address(), EVENT, 0, BlockTag::Latest)
			.await
			.unwrap();

		let blocks: Vec<u64> = events.iter().filter_map(|e| e.block_number).collect();
		assert_eq!(blocks, vec![0, 3, 3, 10, 19, 20, 25]);
		assert_eq!(client.event_windows(), vec![(0, 9), (10, 19), (20, 25)]);
	}

	#[tokio::test]
	async fn test_fetch_last_walks_backward() {
		let client = Arc::new(
			MockNodeClient::new()
				.with_block_number(25)
				.with_events(stream(&[2, 7, 7])),
		);

		let last = scanner(&client, 10)
			.fetch_last(address(), EVENT, 0, BlockTag::Latest)
			.await
			.unwrap()
			.unwrap();

		assert_eq!(last.block_number, Some(7));
		assert_eq!(last.data, vec![Felt::from(2u64)]);
		assert_eq!(client.event_windows(), vec![(16, 25), (6, 15)]);
	}

	#[tokio::test]
	async fn test_fetch_last_reaches_lowest_blocks() {
		// The bottom window is shorter than a chunk and holds the only event.
		let client = Arc::new(MockNodeClient::new().with_events(stream(&[5])));

		let last = scanner(&client, 10)
			.fetch_last(address(), EVENT, 5, BlockTag::Number(25))
			.await
			.unwrap();

		assert_eq!(last.and_then(|e| e.block_number), Some(5));
		assert_eq!(client.event_windows(), vec![(16, 25), (6, 15), (5, 5)]);
	}

	#[tokio::test]
	async fn test_fetch_last_from_block_on_chunk_edge() {
		let client = Arc::new(MockNodeClient::new().with_events(stream(&[10])));

		let last = scanner(&client, 10)
			.fetch_last(address(), EVENT, 10, BlockTag::Number(29))
			.await
			.unwrap();

		assert_eq!(last.and_then(|e| e.block_number), Some(10));
		assert_eq!(client.event_windows(), vec![(20, 29), (10, 19)]);
	}

	#[tokio::test]
	async fn test_empty_range_makes_no_queries() {
		let client = Arc::new(MockNodeClient::new().with_events(stream(&[5])));
		let scanner = scanner(&client, 10);

		let all = scanner
			.fetch_all(address(), EVENT, 10, BlockTag::Number(9))
			.await
			.unwrap();
		let last = scanner
			.fetch_last(address(), EVENT, 10, BlockTag::Number(9))
			.await
			.unwrap();

		assert!(all.is_empty());
		assert!(last.is_none());
		assert_eq!(client.event_page_requests(), 0);
	}

	#[tokio::test]
	async fn test_fetch_last_matches_fetch_all() {
		let latest = 49;
		let layouts: Vec<(&str, Vec<u64>)> = vec![
			("start", vec![0, 0, 1, 2]),
			("middle", vec![23, 24, 24, 26]),
			("end", vec![47, 49, 49]),
			("absent", vec![]),
			("spread", vec![0, 9, 10, 11, 30, 48]),
		];
		let ranges = [(0, BlockTag::Latest), (5, BlockTag::Number(40)), (10, BlockTag::Number(10))];

		for (name, blocks) in &layouts {
			for chunk_size in [1, 3, 7, 10, 50, 1000] {
				for (from_block, to_block) in ranges {
					let client = Arc::new(
						MockNodeClient::new()
							.with_block_number(latest)
							.with_events(stream(blocks)),
					);
					let scanner = scanner(&client, chunk_size);

					let all = scanner
						.fetch_all(address(), EVENT, from_block, to_block)
						.await
						.unwrap();
					let requests_all = client.event_windows().len() as u64;
					let last = scanner
						.fetch_last(address(), EVENT, from_block, to_block)
						.await
						.unwrap();
					let requests_last = client.event_windows().len() as u64 - requests_all;

					assert_eq!(
						last.as_ref(),
						all.last(),
						"layout {} chunk {} from {} to {:?}",
						name,
						chunk_size,
						from_block,
						to_block
					);
					assert!(
						all.windows(2)
							.all(|w| w[0].block_number <= w[1].block_number)
					);
					assert!(requests_last <= requests_all);
				}
			}
		}
	}
}
