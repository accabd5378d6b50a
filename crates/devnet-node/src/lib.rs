//! Devnet node lifecycle for the harness.
//!
//! A [`NodeSupervisor`] starts a local `starknet-devnet` process on a free
//! port, retrying with a short backoff when the port is lost to another
//! process between allocation and bind. The node it returns is wrapped in a
//! [`NodeGuard`] which stops the whole process group when dropped, so a
//! failing or cancelled test never leaks a node.

use devnet_account::SigningError;
use devnet_client::ClientError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod port;
pub mod process;
pub mod supervisor;

pub use port::PortAllocator;
pub use process::NodeProcess;
pub use supervisor::{DevnetLauncher, ManagedNode, NodeGuard, NodeLauncher, NodeSupervisor};

/// Errors that can occur while starting or driving a node.
#[derive(Debug, Error)]
pub enum NodeError {
	/// The port is taken or may not be bound. Retried by the supervisor.
	#[error("Port {port} unavailable: {reason}")]
	PortConflict { port: u16, reason: String },
	/// The operating system did not hand out a free port.
	#[error("Port allocation failed: {0}")]
	PortAllocation(String),
	/// The node process could not be spawned.
	#[error("Failed to spawn node: {0}")]
	Spawn(String),
	/// The node process exited before it answered RPC requests.
	#[error("Node exited during startup ({status}): {stderr}")]
	Exited { status: String, stderr: String },
	/// The node never answered RPC requests.
	#[error("Node on port {port} not ready after {timeout:?}")]
	StartupTimeout { port: u16, timeout: Duration },
	/// Error returned by the node's RPC endpoint.
	#[error("Client error: {0}")]
	Client(#[from] ClientError),
	/// The predeployed accounts could not be set up.
	#[error("Account setup failed: {0}")]
	Accounts(#[from] SigningError),
}

impl NodeError {
	/// Whether the error is a bind conflict worth retrying on another port.
	pub fn is_port_conflict(&self) -> bool {
		matches!(self, NodeError::PortConflict { .. })
	}
}

/// Output a node wrote to stderr during its lifetime.
///
/// Surfaced when the node is stopped. It is informational only and never
/// turns a successful run into a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDiagnostic {
	pub port: u16,
	pub stderr: String,
}

impl fmt::Display for ProcessDiagnostic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "devnet on port {} stderr:\n{}", self.port, self.stderr)
	}
}
