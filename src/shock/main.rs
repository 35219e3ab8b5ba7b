//! Shock CLI: launches the HTTP API server, or runs one-shot admin
//! operations directly against the model layer.
#[macro_use]
extern crate tracing;

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use structopt::StructOpt;

use shock_model::NodeStore;
use shock_util::config::read_config;
use shock_util::error::Error;

use cli::cmd::{cmd_node, cmd_user, NodeOperation, UserOperation};

#[derive(StructOpt, Debug)]
#[structopt(
	name = "shock",
	about = "Content-addressed object store for scientific datasets"
)]
struct Opt {
	/// Path to the configuration file
	#[structopt(
		short = "c",
		long = "config",
		env = "SHOCK_CONFIG_FILE",
		default_value = "shock.toml"
	)]
	config: PathBuf,

	#[structopt(subcommand)]
	cmd: Command,
}

#[derive(StructOpt, Debug)]
enum Command {
	/// Launch the HTTP API server
	Server,
	/// Manage user records
	User {
		#[structopt(subcommand)]
		op: UserOperation,
	},
	/// Inspect or delete node records
	Node {
		#[structopt(subcommand)]
		op: NodeOperation,
	},
}

fn init_logging(is_server: bool) {
	let default_filter = if is_server { "shock=info" } else { "shock=warn" };
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
	let opt = Opt::from_args();
	init_logging(matches!(opt.cmd, Command::Server));

	if let Err(e) = run(opt) {
		error!("{}", e);
		eprintln!("Error: {}", e);
		std::process::exit(1);
	}
}

fn run(opt: Opt) -> Result<(), Error> {
	let config = read_config(&opt.config)?;
	let store = NodeStore::open(config.metadata_dir.join("db"), config.data_dir.clone())
		.map_err(|e| Error::Message(e.to_string()))?;

	match opt.cmd {
		Command::Server => {
			let rt = tokio::runtime::Runtime::new().map_err(Error::from)?;
			rt.block_on(async move {
				let store = Arc::new(store);
				let config = Arc::new(config);
				if let Err(e) = shock_api::server::run(config, store).await {
					error!("server exited with error: {}", e);
				}
			});
			Ok(())
		}
		Command::User { op } => cmd_user(&store, op).map_err(|e| Error::Message(e.to_string())),
		Command::Node { op } => cmd_node(&store, op).map_err(|e| Error::Message(e.to_string())),
	}
}
