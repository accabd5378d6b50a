//! Event discovery module for the devnet harness.
//!
//! Events are fetched over a block range in fixed-size windows so a single
//! query never spans more blocks than the node is willing to scan. Within a
//! window every page is followed through its continuation token.

use devnet_client::ClientError;
use thiserror::Error;

pub mod scanner;

pub use scanner::EventScanner;

/// Errors that can occur while scanning for events.
#[derive(Debug, Error)]
pub enum DiscoveryError {
	/// A scan parameter is outside its accepted range.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	/// Error returned by the node.
	#[error("Client error: {0}")]
	Client(#[from] ClientError),
}
