//! Free port lookup and bind probing.

use crate::NodeError;
use std::io;
use std::net::{Ipv4Addr, TcpListener};

/// Hands out local TCP ports for nodes.
///
/// The port is released before it is returned, so another process can take
/// it before the node binds. The supervisor's retry covers that race.
#[derive(Debug, Clone, Copy, Default)]
pub struct PortAllocator;

impl PortAllocator {
	/// Asks the operating system for a currently free port.
	pub fn free_port() -> Result<u16, NodeError> {
		let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
			.map_err(|e| NodeError::PortAllocation(e.to_string()))?;
		let port = listener
			.local_addr()
			.map_err(|e| NodeError::PortAllocation(e.to_string()))?
			.port();
		drop(listener);
		Ok(port)
	}

	/// Binds and releases `port` once to find out whether a node could bind it.
	pub fn check_bindable(port: u16) -> Result<(), NodeError> {
		match TcpListener::bind((Ipv4Addr::LOCALHOST, port)) {
			Ok(listener) => {
				drop(listener);
				Ok(())
			},
			Err(e) if is_bind_conflict(&e) => Err(NodeError::PortConflict {
				port,
				reason: e.to_string(),
			}),
			Err(e) => Err(NodeError::Spawn(format!("Cannot bind port {}: {}", port, e))),
		}
	}
}

/// Address in use or permission denied.
pub(crate) fn is_bind_conflict(error: &io::Error) -> bool {
	matches!(
		error.kind(),
		io::ErrorKind::AddrInUse | io::ErrorKind::PermissionDenied
	)
}

/// Whether a node's stderr reports a failure to bind its port.
pub(crate) fn stderr_reports_bind_conflict(stderr: &str) -> bool {
	let stderr = stderr.to_lowercase();
	["address already in use", "address in use", "os error 98", "permission denied", "os error 13"]
		.iter()
		.any(|pattern| stderr.contains(pattern))
}
