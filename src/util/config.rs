//! Process-wide configuration, read once at startup: a TOML file parsed
//! into a typed `Config`, with a handful of fields overridable via
//! environment variables at the CLI layer.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, ErrContext};

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
	/// Directory holding the document-store database and node directories.
	pub metadata_dir: PathBuf,

	/// Root directory under which every node gets its own subdirectory,
	/// named by node id, holding `<id>.data`, `<id>.bson`, `parts/`, `idx/`.
	pub data_dir: PathBuf,

	/// Address the HTTP API listens on.
	#[serde(default = "default_bind_addr")]
	pub bind_addr: String,

	/// Document-store backend. Only `sled` is built in at present.
	#[serde(default = "default_db_engine")]
	pub db_engine: String,

	/// Token-exchange endpoint for the `oauth`/`mgrast` auth provider.
	#[serde(default)]
	pub mgrast_oauth_url: Option<String>,

	/// Comma-separated absolute path prefixes the `path=` ingestion mode may
	/// import from.
	#[serde(default)]
	pub local_paths: Option<String>,

	/// `samtools` binary, looked up on `PATH` by default.
	#[serde(default = "default_samtools_path")]
	pub samtools_path: String,
}

fn default_bind_addr() -> String {
	"127.0.0.1:7445".into()
}

fn default_db_engine() -> String {
	"sled".into()
}

fn default_samtools_path() -> String {
	"samtools".into()
}

impl Config {
	/// The allowlist of path prefixes `path=` uploads may reference, parsed
	/// from `local_paths`. Empty if none configured.
	pub fn local_path_prefixes(&self) -> Vec<&str> {
		match &self.local_paths {
			Some(s) if !s.is_empty() => s.split(',').map(|p| p.trim()).collect(),
			_ => Vec::new(),
		}
	}
}

/// Read and parse the configuration file at `path`.
pub fn read_config(path: impl AsRef<Path>) -> Result<Config, Error> {
	let path = path.as_ref();
	let data = std::fs::read_to_string(path)
		.err_context(format!("unable to read config file {}", path.display()))?;
	let config: Config = toml::from_str(&data)
		.err_context(format!("unable to parse config file {}", path.display()))?;
	std::fs::create_dir_all(&config.metadata_dir)
		.err_context("unable to create metadata directory")?;
	std::fs::create_dir_all(&config.data_dir).err_context("unable to create data directory")?;
	Ok(config)
}
