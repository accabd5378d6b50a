//! Bounded-retry node acquisition.

use crate::{NodeError, NodeProcess, PortAllocator, ProcessDiagnostic};
use async_trait::async_trait;
use devnet_config::NodeConfig;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use tracing::{instrument, warn};

/// A running node that can be stopped.
pub trait ManagedNode: Send {
	/// Stops the node. Must be idempotent.
	fn stop(&mut self) -> Option<ProcessDiagnostic>;
}

impl ManagedNode for NodeProcess {
	fn stop(&mut self) -> Option<ProcessDiagnostic> {
		NodeProcess::stop(self)
	}
}

/// Starts one node on a given port.
///
/// A launch that fails must not leave a process behind; [`NodeProcess`]
/// stops itself when dropped, which covers every early return.
#[async_trait]
pub trait NodeLauncher: Send + Sync {
	type Node: ManagedNode;

	async fn launch(&self, port: u16) -> Result<Self::Node, NodeError>;
}

/// Launches real `starknet-devnet` processes.
#[derive(Debug, Clone)]
pub struct DevnetLauncher {
	config: NodeConfig,
}

impl DevnetLauncher {
	pub fn new(config: NodeConfig) -> Self {
		Self { config }
	}
}

#[async_trait]
impl NodeLauncher for DevnetLauncher {
	type Node = NodeProcess;

	async fn launch(&self, port: u16) -> Result<NodeProcess, NodeError> {
		NodeProcess::start(port, &self.config).await
	}
}

/// Owns a node for a scope and stops it when dropped.
///
/// Dereferences to the node, so `guard.client()` and friends work directly.
///
/// Stopping is synchronous: dropping the guard blocks the current thread
/// until the node has exited, up to the configured shutdown timeout. In
/// async code prefer an explicit [`stop`](Self::stop) at a point where
/// blocking is acceptable, or drop the guard inside
/// `tokio::task::spawn_blocking`.
#[derive(Debug)]
pub struct NodeGuard<N: ManagedNode> {
	node: N,
}

impl<N: ManagedNode> NodeGuard<N> {
	fn new(node: N) -> Self {
		Self { node }
	}

	/// Stops the node now instead of at the end of the scope.
	pub fn stop(&mut self) -> Option<ProcessDiagnostic> {
		self.node.stop()
	}
}

impl<N: ManagedNode> Deref for NodeGuard<N> {
	type Target = N;

	fn deref(&self) -> &N {
		&self.node
	}
}

impl<N: ManagedNode> DerefMut for NodeGuard<N> {
	fn deref_mut(&mut self) -> &mut N {
		&mut self.node
	}
}

impl<N: ManagedNode> Drop for NodeGuard<N> {
	fn drop(&mut self) {
		self.node.stop();
	}
}

/// Acquires nodes, retrying when the port turns out to be taken.
pub struct NodeSupervisor<L: NodeLauncher = DevnetLauncher> {
	launcher: L,
	max_retries: u32,
	backoff: Duration,
}

impl NodeSupervisor<DevnetLauncher> {
	/// Supervisor for real devnet processes using the retry settings of `config`.
	pub fn from_config(config: &NodeConfig) -> Self {
		Self::new(
			DevnetLauncher::new(config.clone()),
			config.max_retries,
			config.backoff(),
		)
	}
}

impl<L: NodeLauncher> NodeSupervisor<L> {
	/// `max_retries` is the total number of attempts and is at least one.
	pub fn new(launcher: L, max_retries: u32, backoff: Duration) -> Self {
		Self {
			launcher,
			max_retries: max_retries.max(1),
			backoff,
		}
	}

	/// Starts a node and returns a guard that stops it at the end of scope.
	///
	/// With `port` unset every attempt uses a fresh free port; with an
	/// explicit port every attempt reuses it. Only bind conflicts are
	/// retried, and the last attempt's conflict is returned as is. Any other
	/// error is returned immediately.
	#[instrument(skip(self), fields(max_retries = self.max_retries))]
	pub async fn acquire(&self, port: Option<u16>) -> Result<NodeGuard<L::Node>, NodeError> {
		let mut attempt = 0;
		loop {
			attempt += 1;
			let actual_port = match port {
				Some(port) => port,
				None => PortAllocator::free_port()?,
			};
			match self.launcher.launch(actual_port).await {
				Ok(node) => return Ok(NodeGuard::new(node)),
				Err(e) if e.is_port_conflict() && attempt < self.max_retries => {
					warn!(
						attempt,
						port = actual_port,
						error = %e,
						"Port conflict starting devnet, retrying"
					);
					tokio::time::sleep(self.backoff).await;
				},
				Err(e) => return Err(e),
			}
		}
	}
}
