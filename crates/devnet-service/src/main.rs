//! Main entry point for the devnet harness.
//!
//! The `devnet` binary starts a local Starknet devnet with the harness's
//! deterministic settings and offers a few commands against a running node:
//! event queries, waiting for a transaction and moving the node's clock.

use clap::{Args as ClapArgs, Parser, Subcommand};
use devnet_config::Config;
use devnet_types::{parse_felt, BlockTag, Felt};
use std::path::PathBuf;

mod commands;

/// Command-line arguments for the devnet harness.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file; built-in defaults are used when omitted
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Log level (trace, debug, info, warn, error); `debug = true` in the
	/// configuration implies debug
	#[arg(short, long)]
	log_level: Option<String>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Start a devnet and keep it running until interrupted
	Start {
		/// Port to bind; a free port is picked when omitted
		#[arg(short, long)]
		port: Option<u16>,
	},
	/// Print events of a contract
	Events(EventsArgs),
	/// Wait until a transaction is accepted
	WaitTx {
		#[command(flatten)]
		rpc: RpcArgs,
		/// Transaction hash
		#[arg(long, value_parser = parse_felt)]
		hash: Felt,
		/// Delay between status checks, overriding the configuration
		#[arg(long)]
		check_interval_ms: Option<u64>,
		/// Number of status checks, overriding the configuration
		#[arg(long)]
		retries: Option<u32>,
	},
	/// Move the node's clock forward
	AdvanceTime {
		#[command(flatten)]
		rpc: RpcArgs,
		/// Seconds to add
		#[arg(long)]
		seconds: u64,
	},
	/// List the predeployed accounts
	Accounts,
}

#[derive(ClapArgs, Debug)]
struct RpcArgs {
	/// JSON-RPC endpoint of the node
	#[arg(long, env = "DEVNET_RPC_URL", default_value = "http://127.0.0.1:5050/rpc")]
	rpc_url: String,
}

#[derive(ClapArgs, Debug)]
struct EventsArgs {
	#[command(flatten)]
	rpc: RpcArgs,
	/// Emitting contract
	#[arg(long, value_parser = parse_felt)]
	address: Felt,
	/// Event name, hashed into the selector key
	#[arg(long)]
	event: String,
	#[arg(long, default_value_t = 0)]
	from_block: u64,
	/// Block number or `latest`
	#[arg(long, default_value = "latest")]
	to_block: BlockTag,
	/// Blocks per query, overriding the configuration
	#[arg(long)]
	chunk_size: Option<u64>,
	/// Only print the last matching event
	#[arg(long)]
	last: bool,
}

/// Main entry point for the devnet harness.
///
/// Loads the configuration, initializes logging and runs the requested
/// command.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	let config = match &args.config {
		Some(path) => Config::from_file(path).await?,
		None => Config::default(),
	};

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = log_directive(args.log_level.as_deref(), config.debug);
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_target(true)
		.init();

	match args.command {
		Command::Start { port } => commands::start(&config, port).await?,
		Command::Events(events) => {
			let client = commands::connect(&events.rpc.rpc_url)?;
			commands::events(client, &config, &events).await?
		},
		Command::WaitTx {
			rpc,
			hash,
			check_interval_ms,
			retries,
		} => {
			let client = commands::connect(&rpc.rpc_url)?;
			let mut delivery = config.delivery.clone();
			if let Some(interval) = check_interval_ms {
				delivery.check_interval_ms = interval;
			}
			if let Some(retries) = retries {
				delivery.retries = retries;
			}
			commands::wait_tx(client, &delivery, hash).await?;
		},
		Command::AdvanceTime { rpc, seconds } => {
			let client = commands::connect(&rpc.rpc_url)?;
			commands::advance_time(client, seconds).await?
		},
		Command::Accounts => commands::accounts(&config),
	}

	Ok(())
}

/// An explicit level wins; otherwise the config's debug flag picks `debug`
/// over `info`.
fn log_directive(log_level: Option<&str>, debug: bool) -> String {
	match log_level {
		Some(level) => level.to_string(),
		None if debug => "debug".to_string(),
		None => "info".to_string(),
	}
}
