//! Starknet JSON-RPC client over HTTP.
//!
//! Requests are plain JSON-RPC 2.0 envelopes posted to the node's `/rpc`
//! endpoint. Numeric quantities on the wire are `0x`-prefixed hex strings.

use crate::{ClientError, NodeClient, BLOCK_NOT_FOUND, INVALID_PARAMS};
use async_trait::async_trait;
use devnet_types::{
	felt_to_u128, felt_to_u64, Call, DeclareTransaction, EventFilter, EventsPage, FeeEstimate,
	Felt, InvokeTransaction, ResourceBounds, ResourceBoundsMapping, SierraClass,
	TransactionStatus,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

const JSONRPC_VERSION: &str = "2.0";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Block estimates are simulated on top of, while the node accepts it.
///
/// Nodes that dropped the pending block reject this tag; estimates then
/// move to [`READ_BLOCK_ID`] for the rest of the client's life.
const ESTIMATE_BLOCK_ID: &str = "pending";
/// Block reads are made against.
const READ_BLOCK_ID: &str = "latest";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
	jsonrpc: &'static str,
	id: u64,
	method: &'a str,
	params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
	#[serde(default)]
	result: Option<Value>,
	#[serde(default)]
	error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
	code: i64,
	message: String,
	#[serde(default)]
	data: Option<Value>,
}

/// Resource bounds in their wire form.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct WireResourceBounds {
	max_amount: String,
	max_price_per_unit: String,
}

impl From<&ResourceBounds> for WireResourceBounds {
	fn from(bounds: &ResourceBounds) -> Self {
		Self {
			max_amount: format!("{:#x}", bounds.max_amount),
			max_price_per_unit: format!("{:#x}", bounds.max_price_per_unit),
		}
	}
}

#[derive(Debug, Serialize)]
struct WireResourceBoundsMapping {
	l1_gas: WireResourceBounds,
	l2_gas: WireResourceBounds,
	l1_data_gas: WireResourceBounds,
}

impl From<&ResourceBoundsMapping> for WireResourceBoundsMapping {
	fn from(bounds: &ResourceBoundsMapping) -> Self {
		Self {
			l1_gas: (&bounds.l1_gas).into(),
			l2_gas: (&bounds.l2_gas).into(),
			l1_data_gas: (&bounds.l1_data_gas).into(),
		}
	}
}

/// Broadcasted v3 invoke transaction.
#[derive(Debug, Serialize)]
struct BroadcastedInvoke<'a> {
	#[serde(rename = "type")]
	kind: &'static str,
	version: Felt,
	sender_address: Felt,
	calldata: &'a [Felt],
	signature: &'a [Felt],
	nonce: Felt,
	resource_bounds: WireResourceBoundsMapping,
	tip: String,
	paymaster_data: &'a [Felt],
	account_deployment_data: &'a [Felt],
	nonce_data_availability_mode: &'static str,
	fee_data_availability_mode: &'static str,
}

impl<'a> BroadcastedInvoke<'a> {
	fn new(tx: &'a InvokeTransaction, signature: &'a [Felt]) -> Self {
		Self {
			kind: "INVOKE",
			version: tx.version(),
			sender_address: tx.sender_address(),
			calldata: tx.calldata(),
			signature,
			nonce: tx.nonce(),
			resource_bounds: tx.resource_bounds().into(),
			tip: format!("{:#x}", tx.tip()),
			paymaster_data: tx.paymaster_data(),
			account_deployment_data: tx.account_deployment_data(),
			nonce_data_availability_mode: "L1",
			fee_data_availability_mode: "L1",
		}
	}
}

/// Fee estimate as the node reports it, every quantity a hex felt.
#[derive(Debug, Deserialize)]
struct WireFeeEstimate {
	l1_gas_consumed: Felt,
	l1_gas_price: Felt,
	l2_gas_consumed: Felt,
	l2_gas_price: Felt,
	l1_data_gas_consumed: Felt,
	l1_data_gas_price: Felt,
	overall_fee: Felt,
	#[serde(default)]
	unit: String,
}

impl TryFrom<WireFeeEstimate> for FeeEstimate {
	type Error = ClientError;

	fn try_from(wire: WireFeeEstimate) -> Result<Self, Self::Error> {
		let amount = |name: &str, value: &Felt| {
			felt_to_u64(value)
				.ok_or_else(|| ClientError::Decode(format!("{} does not fit in u64: {:#x}", name, value)))
		};
		let price = |name: &str, value: &Felt| {
			felt_to_u128(value).ok_or_else(|| {
				ClientError::Decode(format!("{} does not fit in u128: {:#x}", name, value))
			})
		};
		Ok(FeeEstimate {
			l1_gas_consumed: amount("l1_gas_consumed", &wire.l1_gas_consumed)?,
			l1_gas_price: price("l1_gas_price", &wire.l1_gas_price)?,
			l2_gas_consumed: amount("l2_gas_consumed", &wire.l2_gas_consumed)?,
			l2_gas_price: price("l2_gas_price", &wire.l2_gas_price)?,
			l1_data_gas_consumed: amount("l1_data_gas_consumed", &wire.l1_data_gas_consumed)?,
			l1_data_gas_price: price("l1_data_gas_price", &wire.l1_data_gas_price)?,
			overall_fee: price("overall_fee", &wire.overall_fee)?,
			unit: wire.unit,
		})
	}
}

/// Broadcasted v3 declare transaction.
#[derive(Debug, Serialize)]
struct BroadcastedDeclare<'a> {
	#[serde(rename = "type")]
	kind: &'static str,
	version: Felt,
	sender_address: Felt,
	compiled_class_hash: Felt,
	signature: &'a [Felt],
	nonce: Felt,
	contract_class: &'a SierraClass,
	resource_bounds: WireResourceBoundsMapping,
	tip: String,
	paymaster_data: &'a [Felt],
	account_deployment_data: &'a [Felt],
	nonce_data_availability_mode: &'static str,
	fee_data_availability_mode: &'static str,
}

impl<'a> BroadcastedDeclare<'a> {
	fn new(tx: &'a DeclareTransaction, signature: &'a [Felt]) -> Self {
		Self {
			kind: "DECLARE",
			version: tx.version(),
			sender_address: tx.sender_address(),
			compiled_class_hash: tx.compiled_class_hash(),
			signature,
			nonce: tx.nonce(),
			contract_class: tx.contract_class(),
			resource_bounds: tx.resource_bounds().into(),
			tip: format!("{:#x}", tx.tip()),
			paymaster_data: tx.paymaster_data(),
			account_deployment_data: tx.account_deployment_data(),
			nonce_data_availability_mode: "L1",
			fee_data_availability_mode: "L1",
		}
	}
}

#[derive(Debug, Deserialize)]
struct AddInvokeResult {
	transaction_hash: Felt,
}

#[derive(Debug, Deserialize)]
struct AddDeclareResult {
	transaction_hash: Felt,
}

/// Whether the node refused a request because of its block id.
fn rejects_block_id(error: &ClientError) -> bool {
	matches!(error, ClientError::Rpc { code, .. } if *code == BLOCK_NOT_FOUND || *code == INVALID_PARAMS)
}

fn filter_params(filter: &EventFilter, continuation_token: Option<String>) -> Value {
	let mut params = json!({
		"from_block": { "block_number": filter.from_block },
		"to_block": { "block_number": filter.to_block },
		"keys": filter.keys,
		"chunk_size": filter.page_size,
	});
	if let Some(address) = filter.address {
		params["address"] = json!(address);
	}
	if let Some(token) = continuation_token {
		params["continuation_token"] = json!(token);
	}
	json!({ "filter": params })
}

/// Unwraps a JSON-RPC response envelope into its typed result.
fn decode_response<R: DeserializeOwned>(response: JsonRpcResponse) -> Result<R, ClientError> {
	if let Some(error) = response.error {
		let message = match error.data {
			Some(data) => format!("{} ({})", error.message, data),
			None => error.message,
		};
		return Err(ClientError::Rpc {
			code: error.code,
			message,
		});
	}
	let result = response
		.result
		.ok_or_else(|| ClientError::Decode("Response has neither result nor error".into()))?;
	Ok(serde_json::from_value(result)?)
}

/// JSON-RPC client bound to one node endpoint.
pub struct JsonRpcClient {
	http: reqwest::Client,
	url: String,
	next_id: AtomicU64,
	estimate_on_latest: AtomicBool,
}

impl JsonRpcClient {
	/// Creates a client for the given RPC endpoint.
	pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
		let http = reqwest::Client::builder()
			.timeout(DEFAULT_TIMEOUT)
			.build()?;
		Ok(Self {
			http,
			url: url.into(),
			next_id: AtomicU64::new(1),
			estimate_on_latest: AtomicBool::new(false),
		})
	}

	/// Estimates on `latest` from the start instead of trying `pending`
	/// first.
	pub fn with_latest_estimates(self) -> Self {
		self.estimate_on_latest.store(true, Ordering::Relaxed);
		self
	}

	/// Block id the next estimate is simulated on.
	pub fn estimate_block_id(&self) -> &'static str {
		if self.estimate_on_latest.load(Ordering::Relaxed) {
			READ_BLOCK_ID
		} else {
			ESTIMATE_BLOCK_ID
		}
	}

	/// Creates a client for a devnet listening on localhost.
	pub fn for_local_port(port: u16) -> Result<Self, ClientError> {
		Self::new(local_rpc_url(port))
	}

	pub fn url(&self) -> &str {
		&self.url
	}

	/// Issues a JSON-RPC call and deserialises the result into `R`.
	pub async fn request<R: DeserializeOwned>(
		&self,
		method: &str,
		params: Value,
	) -> Result<R, ClientError> {
		let payload = JsonRpcRequest {
			jsonrpc: JSONRPC_VERSION,
			id: self.next_id.fetch_add(1, Ordering::Relaxed),
			method,
			params,
		};
		debug!(method, id = payload.id, "Sending RPC request");

		let response = self.http.post(&self.url).json(&payload).send().await?;
		if !response.status().is_success() {
			return Err(ClientError::Network(format!(
				"{} returned HTTP {}",
				method,
				response.status()
			)));
		}
		let response: JsonRpcResponse = response.json().await?;
		decode_response(response)
	}
}

impl JsonRpcClient {
	/// Runs `starknet_estimateFee` for one broadcasted transaction.
	///
	/// When the node rejects the pending block the estimate is retried once
	/// on the latest block, and later estimates go there directly.
	async fn estimate(&self, transaction: Value) -> Result<FeeEstimate, ClientError> {
		let block_id = self.estimate_block_id();
		match self.estimate_on(&transaction, block_id).await {
			Err(e) if block_id == ESTIMATE_BLOCK_ID && rejects_block_id(&e) => {
				warn!(
					error = %e,
					"Node rejected the pending block, estimating on latest from now on"
				);
				self.estimate_on_latest.store(true, Ordering::Relaxed);
				self.estimate_on(&transaction, READ_BLOCK_ID).await
			},
			result => result,
		}
	}

	async fn estimate_on(
		&self,
		transaction: &Value,
		block_id: &str,
	) -> Result<FeeEstimate, ClientError> {
		let estimates: Vec<WireFeeEstimate> = self
			.request(
				"starknet_estimateFee",
				json!({
					"request": [transaction],
					"simulation_flags": ["SKIP_VALIDATE"],
					"block_id": block_id,
				}),
			)
			.await?;
		let estimate = estimates
			.into_iter()
			.next()
			.ok_or_else(|| ClientError::Decode("Empty fee estimate list".into()))?;
		estimate.try_into()
	}
}

/// RPC endpoint of a devnet listening on `port` on localhost.
pub fn local_rpc_url(port: u16) -> String {
	format!("http://127.0.0.1:{}/rpc", port)
}

#[async_trait]
impl NodeClient for JsonRpcClient {
	async fn block_number(&self) -> Result<u64, ClientError> {
		self.request("starknet_blockNumber", json!([])).await
	}

	async fn get_events(
		&self,
		filter: &EventFilter,
		continuation_token: Option<String>,
	) -> Result<EventsPage, ClientError> {
		self.request("starknet_getEvents", filter_params(filter, continuation_token))
			.await
	}

	async fn get_transaction_status(
		&self,
		tx_hash: Felt,
	) -> Result<TransactionStatus, ClientError> {
		self.request(
			"starknet_getTransactionStatus",
			json!({ "transaction_hash": tx_hash }),
		)
		.await
	}

	async fn get_nonce(&self, address: Felt) -> Result<Felt, ClientError> {
		self.request(
			"starknet_getNonce",
			json!({ "block_id": READ_BLOCK_ID, "contract_address": address }),
		)
		.await
	}

	async fn estimate_fee(&self, tx: &InvokeTransaction) -> Result<FeeEstimate, ClientError> {
		self.estimate(serde_json::to_value(BroadcastedInvoke::new(tx, &[]))?)
			.await
	}

	async fn add_invoke_transaction(
		&self,
		tx: &InvokeTransaction,
		signature: &[Felt],
	) -> Result<Felt, ClientError> {
		let result: AddInvokeResult = self
			.request(
				"starknet_addInvokeTransaction",
				json!({ "invoke_transaction": BroadcastedInvoke::new(tx, signature) }),
			)
			.await?;
		Ok(result.transaction_hash)
	}

	async fn estimate_declare_fee(
		&self,
		tx: &DeclareTransaction,
	) -> Result<FeeEstimate, ClientError> {
		self.estimate(serde_json::to_value(BroadcastedDeclare::new(tx, &[]))?)
			.await
	}

	async fn add_declare_transaction(
		&self,
		tx: &DeclareTransaction,
		signature: &[Felt],
	) -> Result<Felt, ClientError> {
		let result: AddDeclareResult = self
			.request(
				"starknet_addDeclareTransaction",
				json!({ "declare_transaction": BroadcastedDeclare::new(tx, signature) }),
			)
			.await?;
		Ok(result.transaction_hash)
	}

	async fn is_declared(&self, class_hash: Felt) -> Result<bool, ClientError> {
		let result: Result<Value, _> = self
			.request(
				"starknet_getClass",
				json!({ "block_id": READ_BLOCK_ID, "class_hash": class_hash }),
			)
			.await;
		match result {
			Ok(_) => Ok(true),
			Err(e) if e.is_class_hash_not_found() => Ok(false),
			Err(e) => Err(e),
		}
	}

	async fn call(&self, call: &Call) -> Result<Vec<Felt>, ClientError> {
		self.request(
			"starknet_call",
			json!({
				"request": {
					"contract_address": call.to,
					"entry_point_selector": call.selector,
					"calldata": call.calldata,
				},
				"block_id": READ_BLOCK_ID,
			}),
		)
		.await
	}

	async fn get_class_hash_at(&self, address: Felt) -> Result<Felt, ClientError> {
		self.request(
			"starknet_getClassHashAt",
			json!({ "block_id": READ_BLOCK_ID, "contract_address": address }),
		)
		.await
	}

	async fn increase_time(&self, seconds: u64) -> Result<(), ClientError> {
		let _: Value = self
			.request("devnet_increaseTime", json!({ "time": seconds }))
			.await?;
		Ok(())
	}
}
