//! A single devnet process.
//!
//! The node runs in its own process group so that stopping it also stops
//! anything it spawned. Stdout is discarded; stderr goes to an anonymous
//! temporary file that is read back when the node stops.

use crate::port::{stderr_reports_bind_conflict, PortAllocator};
use crate::{NodeError, ProcessDiagnostic};
use devnet_account::{predeployed_accounts, Account};
use devnet_client::{implementations::rpc::local_rpc_url, JsonRpcClient, NodeClient};
use devnet_config::NodeConfig;
use devnet_types::ChainId;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::net::Ipv4Addr;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(50);
const READINESS_RPC_TIMEOUT: Duration = Duration::from_millis(500);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Owns one running devnet process.
///
/// Dropping the value stops the process.
pub struct NodeProcess {
	port: u16,
	child: Child,
	stderr: File,
	alive: bool,
	shutdown_timeout: Duration,
	client: Arc<dyn NodeClient>,
	accounts: Vec<Account>,
}

impl NodeProcess {
	/// Starts a node on `port` and waits until it answers RPC requests.
	#[instrument(skip(config), fields(binary = %config.binary))]
	pub async fn start(port: u16, config: &NodeConfig) -> Result<Self, NodeError> {
		let mut node = Self::spawn(port, config)?;
		node.wait_until_ready(config.startup_timeout()).await?;
		info!(port, accounts = node.accounts.len(), "Devnet started");
		Ok(node)
	}

	/// Spawns the process without waiting for it to become ready.
	pub(crate) fn spawn(port: u16, config: &NodeConfig) -> Result<Self, NodeError> {
		PortAllocator::check_bindable(port)?;

		let stderr = tempfile::tempfile()
			.map_err(|e| NodeError::Spawn(format!("Failed to create stderr capture: {}", e)))?;
		let child_stderr = stderr
			.try_clone()
			.map_err(|e| NodeError::Spawn(format!("Failed to create stderr capture: {}", e)))?;

		let child = Command::new(&config.binary)
			.args(command_args(port, config))
			.process_group(0)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::from(child_stderr))
			.spawn()
			.map_err(|e| NodeError::Spawn(format!("{}: {}", config.binary, e)))?;
		debug!(port, pid = child.id(), "Spawned devnet process");

		let client: Arc<dyn NodeClient> = Arc::new(JsonRpcClient::new(local_rpc_url(port))?);
		let mut node = Self {
			port,
			child,
			stderr,
			alive: true,
			shutdown_timeout: config.shutdown_timeout(),
			client: Arc::clone(&client),
			accounts: Vec::new(),
		};
		node.accounts = predeployed_accounts(client, config.chain, config.accounts)?;
		Ok(node)
	}

	async fn wait_until_ready(&mut self, timeout: Duration) -> Result<(), NodeError> {
		let deadline = tokio::time::Instant::now() + timeout;
		loop {
			match self.child.try_wait() {
				Ok(Some(status)) => {
					let stderr = self.read_stderr();
					if stderr_reports_bind_conflict(&stderr) {
						return Err(NodeError::PortConflict {
							port: self.port,
							reason: stderr.trim().to_string(),
						});
					}
					return Err(NodeError::Exited {
						status: status.to_string(),
						stderr: stderr.trim().to_string(),
					});
				},
				Ok(None) => {},
				Err(e) => warn!(port = self.port, error = %e, "Failed to poll devnet process"),
			}

			if tokio::net::TcpStream::connect((Ipv4Addr::LOCALHOST, self.port))
				.await
				.is_ok() && self.answers_rpc().await
			{
				return Ok(());
			}
			if tokio::time::Instant::now() >= deadline {
				return Err(NodeError::StartupTimeout {
					port: self.port,
					timeout,
				});
			}
			tokio::time::sleep(READINESS_POLL_INTERVAL).await;
		}
	}

	/// Whether the node itself serves the port.
	///
	/// An open port alone is not enough: another process may have bound it
	/// first, in which case the node exits with a bind error and the next
	/// poll classifies that exit.
	async fn answers_rpc(&mut self) -> bool {
		let answer = tokio::time::timeout(READINESS_RPC_TIMEOUT, self.client.block_number()).await;
		match answer {
			Ok(Ok(block)) if !matches!(self.child.try_wait(), Ok(Some(_))) => {
				debug!(port = self.port, block, "Devnet answered RPC");
				true
			},
			Ok(Ok(_)) => false,
			Ok(Err(e)) => {
				debug!(port = self.port, error = %e, "Port open but RPC not answering");
				false
			},
			Err(_) => {
				debug!(port = self.port, "RPC readiness check timed out");
				false
			},
		}
	}

	pub fn port(&self) -> u16 {
		self.port
	}

	pub fn rpc_url(&self) -> String {
		local_rpc_url(self.port)
	}

	/// Client for the node's RPC endpoint.
	///
	/// The client must not be used after the node has been stopped.
	pub fn client(&self) -> Arc<dyn NodeClient> {
		Arc::clone(&self.client)
	}

	/// The predeployed accounts, funded and ready to sign.
	pub fn accounts(&self) -> &[Account] {
		&self.accounts
	}

	pub fn is_alive(&self) -> bool {
		self.alive
	}

	/// Moves the node's block timestamp forward by `seconds`.
	pub async fn advance_time(&self, seconds: u64) -> Result<(), NodeError> {
		self.client.increase_time(seconds).await?;
		debug!(port = self.port, seconds, "Advanced devnet time");
		Ok(())
	}

	/// Interrupts the process group and collects what the node wrote to stderr.
	///
	/// Stopping an already stopped node does nothing and returns `None`.
	/// Signal failures are logged, not returned, so stopping never masks the
	/// error that led to it.
	///
	/// Blocks the calling thread until the process exits, polling every
	/// 20 ms, for at most `shutdown_timeout` before escalating to `SIGKILL`.
	/// On a tokio runtime this holds up a worker for that long.
	pub fn stop(&mut self) -> Option<ProcessDiagnostic> {
		if !self.alive {
			return None;
		}
		self.alive = false;

		match i32::try_from(self.child.id()) {
			Ok(pid) => {
				let group = Pid::from_raw(pid);
				if let Err(e) = killpg(group, Signal::SIGINT) {
					debug!(port = self.port, error = %e, "Failed to interrupt devnet process group");
				}
				if !self.wait_for_exit(self.shutdown_timeout) {
					warn!(port = self.port, "Devnet ignored SIGINT, killing process group");
					if let Err(e) = killpg(group, Signal::SIGKILL) {
						debug!(port = self.port, error = %e, "Failed to kill devnet process group");
					}
					if let Err(e) = self.child.wait() {
						warn!(port = self.port, error = %e, "Failed to reap devnet process");
					}
				}
			},
			Err(_) => {
				if let Err(e) = self.child.kill() {
					debug!(port = self.port, error = %e, "Failed to kill devnet process");
				}
				let _ = self.child.wait();
			},
		}
		info!(port = self.port, "Devnet stopped");

		let stderr = self.read_stderr();
		if stderr.is_empty() {
			return None;
		}
		let diagnostic = ProcessDiagnostic {
			port: self.port,
			stderr,
		};
		error!("Starknet {}", diagnostic);
		Some(diagnostic)
	}

	fn wait_for_exit(&mut self, timeout: Duration) -> bool {
		let deadline = Instant::now() + timeout;
		loop {
			match self.child.try_wait() {
				Ok(Some(_)) => return true,
				Ok(None) if Instant::now() < deadline => std::thread::sleep(EXIT_POLL_INTERVAL),
				Ok(None) => return false,
				Err(e) => {
					warn!(port = self.port, error = %e, "Failed to poll devnet process");
					return false;
				},
			}
		}
	}

	fn read_stderr(&mut self) -> String {
		let mut buf = Vec::new();
		let read = self
			.stderr
			.seek(SeekFrom::Start(0))
			.and_then(|_| self.stderr.read_to_end(&mut buf));
		if let Err(e) = read {
			warn!(port = self.port, error = %e, "Failed to read devnet stderr");
		}
		String::from_utf8_lossy(&buf).into_owned()
	}
}

impl Drop for NodeProcess {
	fn drop(&mut self) {
		self.stop();
	}
}

impl std::fmt::Debug for NodeProcess {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NodeProcess")
			.field("port", &self.port)
			.field("pid", &self.child.id())
			.field("alive", &self.alive)
			.finish_non_exhaustive()
	}
}

fn command_args(port: u16, config: &NodeConfig) -> Vec<String> {
	let mut args = vec![
		"--port".to_string(),
		port.to_string(),
		"--seed".to_string(),
		config.seed.to_string(),
		"--initial-balance".to_string(),
		config.initial_balance.clone(),
		"--accounts".to_string(),
		config.accounts.to_string(),
	];
	if let Some(chain_id) = chain_arg(&config.chain) {
		args.push("--chain-id".to_string());
		args.push(chain_id);
	}
	if config.lite_mode {
		args.push("--lite-mode".to_string());
	}
	args
}

/// Value of `--chain-id`, omitted for the node's default Sepolia chain.
fn chain_arg(chain: &ChainId) -> Option<String> {
	match chain {
		ChainId::Sepolia => None,
		ChainId::Mainnet => Some("MAINNET".to_string()),
		ChainId::Custom(id) => {
			let bytes = id.to_bytes_be();
			let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
			Some(String::from_utf8_lossy(&bytes[start..]).into_owned())
		},
	}
}
