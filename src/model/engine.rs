//! Mutation entry point: classifies a mutation request,
//! enforces exclusivity and immutability, dispatches into `FileRef` /
//! `PartsManager`, then invokes the Versioner and persists.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use shock_util::config::Config;
use shock_util::data::Uuid;

use crate::error::Error;
use crate::file_ref::UploadHandle;
use crate::node::{Linkage, Node};
use crate::parts::{PartSlot, PartsState};
use crate::store::NodeStore;
use crate::version;

/// Serializes `addPart`/`initParts`/`closeVarLenPartial` across every node.
/// Deliberately coarse; a future revision may refine this to per-node
/// locks without changing observable semantics.
fn parts_mutex() -> &'static Mutex<()> {
	static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
	LOCK.get_or_init(|| Mutex::new(()))
}

enum Mode {
	None,
	Regular(UploadHandle),
	Partial(PartsDirective),
	Virtual(Vec<Uuid>),
	Path(PathBuf),
}

impl Mode {
	fn name(&self) -> &'static str {
		match self {
			Mode::None => "none",
			Mode::Regular(_) => "regular-upload",
			Mode::Partial(_) => "partial-upload",
			Mode::Virtual(_) => "virtual-node",
			Mode::Path(_) => "path-upload",
		}
	}
}

enum PartsDirective {
	InitKnown(u32),
	InitUnknown,
	Close,
}

/// Classifies the mutation before any state is touched, so the exclusivity
/// check is a total function over the resulting variant.
fn classify(
	params: &BTreeMap<String, String>,
	files: &mut BTreeMap<String, UploadHandle>,
	config: &Config,
) -> Result<Mode, Error> {
	let mut present: Vec<&'static str> = Vec::new();
	if files.contains_key("upload") {
		present.push("upload");
	}
	if params.contains_key("parts") {
		present.push("parts");
	}
	let is_virtual = params.get("type").map(|t| t == "virtual").unwrap_or(false);
	if is_virtual {
		present.push("type=virtual");
	}
	if params.contains_key("path") {
		present.push("path");
	}

	if present.len() > 1 {
		return Err(Error::InvalidMode(format!(
			"{} cannot be combined in a single update",
			present.join(" and ")
		)));
	}

	match present.first() {
		None => Ok(Mode::None),
		Some(&"upload") => {
			let handle = files.remove("upload").expect("checked above");
			Ok(Mode::Regular(handle))
		}
		Some(&"parts") => {
			let v = params.get("parts").expect("checked above");
			let directive = match v.as_str() {
				"close" => PartsDirective::Close,
				"unknown" => PartsDirective::InitUnknown,
				n => {
					let n: i64 = n
						.parse()
						.map_err(|_| Error::InvalidPart("parts must be an integer or 'unknown'".into()))?;
					if n < 1 {
						return Err(Error::InvalidPart("parts cannot be less than 1".into()));
					}
					PartsDirective::InitKnown(n as u32)
				}
			};
			Ok(Mode::Partial(directive))
		}
		Some(&"type=virtual") => {
			let source = params
				.get("source")
				.ok_or_else(|| Error::MissingRequiredParam("type virtual requires source parameter".into()))?;
			let mut ids = Vec::new();
			for part in source.split(',') {
				let part = part.trim();
				let id = Uuid::from_hex(part)
					.ok_or_else(|| Error::InvalidMode(format!("invalid source id: {}", part)))?;
				ids.push(id);
			}
			Ok(Mode::Virtual(ids))
		}
		Some(&"path") => {
			let p = params.get("path").expect("checked above");
			if config.local_path_prefixes().is_empty() {
				return Err(Error::PathNotAllowed(
					"local files path uploads must be configured".into(),
				));
			}
			if !config
				.local_path_prefixes()
				.iter()
				.any(|prefix| p.starts_with(prefix))
			{
				return Err(Error::PathNotAllowed("file not in local files path".into()));
			}
			Ok(Mode::Path(PathBuf::from(p)))
		}
		Some(_) => unreachable!(),
	}
}

pub struct NodeEngine;

impl NodeEngine {
	/// Applies one compound mutation request to `node` and persists the
	/// resulting state, following a fixed nine-step ordering.
	pub fn update(
		node: &mut Node,
		params: &BTreeMap<String, String>,
		mut files: BTreeMap<String, UploadHandle>,
		config: &Config,
		store: &NodeStore,
	) -> Result<(), Error> {
		// Step 1: `upload` must be a file field, never a string param.
		if params.contains_key("upload") {
			return Err(Error::InvalidMode(
				"upload must be provided as a file field, not a string parameter".into(),
			));
		}

		// Step 2: classify, rejecting any pairwise mode conflict.
		let mode = classify(params, &mut files, config)?;
		debug!("node {}: classified mutation as {}", node.id, mode.name());

		// Step 3: any active mode is rejected once the node has a sealed file.
		if !matches!(mode, Mode::None) && node.file.has_file() {
			warn!("node {}: rejected {}, file is already sealed", node.id, mode.name());
			return Err(Error::FileImmutable);
		}

		// Step 4: execute the selected mode.
		match mode {
			Mode::None => {}
			Mode::Regular(handle) => {
				let dest = store.node_dir(&node.id).join(format!("{}.data", node.id));
				node.file.set_file(&handle, &dest)?;
			}
			Mode::Partial(PartsDirective::InitKnown(n)) => {
				if node.parts.is_some() {
					return Err(Error::InvalidPart("parts already set".into()));
				}
				node.parts = Some(PartsState::init_known(n));
			}
			Mode::Partial(PartsDirective::InitUnknown) => {
				if node.parts.is_some() {
					return Err(Error::InvalidPart("parts already set".into()));
				}
				node.parts = Some(PartsState::init_unknown());
			}
			Mode::Partial(PartsDirective::Close) => {
				let ready = node
					.parts
					.as_mut()
					.ok_or_else(|| Error::InvalidPart("no parts upload in progress to close".into()))?
					.close()?;
				if ready {
					finalize_parts(node, store)?;
				} else {
					warn!(
						"node {}: parts upload closed with gaps, awaiting missing indices",
						node.id
					);
				}
			}
			Mode::Virtual(ids) => {
				node.file.add_virtual_parts(ids);
			}
			Mode::Path(path) => {
				node.file.set_file_from_path(&path)?;
			}
		}

		// Step 5: an `attributes` file field replaces the attribute document.
		if let Some(handle) = files.remove("attributes") {
			let data = std::fs::read_to_string(&handle.temp_path)?;
			let value: serde_json::Value = serde_json::from_str(&data)?;
			node.attributes = value;
			let _ = std::fs::remove_file(&handle.temp_path);
		}

		// Step 6: under the parts mutex, fill any remaining numbered file
		// fields into the in-progress PartsState.
		{
			let _guard = parts_mutex().lock().unwrap();
			if node.parts.is_some() {
				for (key, handle) in files {
					let index: u32 = key
						.parse()
						.map_err(|_| Error::InvalidPart("invalid file parameter".into()))?;
					let parts_dir = store.node_dir(&node.id).join("parts");
					let dest = parts_dir.join(index.to_string());
					if let Some(parent) = dest.parent() {
						std::fs::create_dir_all(parent)?;
					}
					if std::fs::rename(&handle.temp_path, &dest).is_err() {
						std::fs::copy(&handle.temp_path, &dest)?;
						std::fs::remove_file(&handle.temp_path)?;
					}
					let slot = PartSlot {
						size: handle.size,
						checksum: handle.md5.clone(),
						path: dest,
					};
					let ready = node.parts.as_mut().expect("checked above").add_part(index, slot)?;
					if ready {
						finalize_parts(node, store)?;
						break;
					}
				}
			} else if !files.is_empty() {
				return Err(Error::InvalidPart("invalid file parameter".into()));
			}
		}

		version::save(node, store)?;

		// Step 7: `linkage` + `ids` append a linkage entry.
		if params.contains_key("linkage") {
			let ids_param = params
				.get("ids")
				.ok_or_else(|| Error::MissingRequiredParam("missing ids for updating relatives".into()))?;
			let mut ids = Vec::new();
			for part in ids_param.split(',') {
				let part = part.trim();
				let id = Uuid::from_hex(part)
					.ok_or_else(|| Error::InvalidMode(format!("invalid linkage id: {}", part)))?;
				ids.push(id);
			}
			let linkage = Linkage {
				kind: params.get("linkage").cloned().unwrap_or_default(),
				ids,
				operation: params.get("operation").cloned().unwrap_or_default(),
			};
			node.add_linkage(linkage)?;
			version::save(node, store)?;
		}

		// Step 8: `tags` unions a CSV of tags into the current tag set.
		if let Some(tags) = params.get("tags") {
			node.union_tags(tags);
			version::save(node, store)?;
		}

		// Step 9: `format` sets the file format, once.
		if let Some(format) = params.get("format") {
			node.file.set_file_format(format)?;
			version::save(node, store)?;
		}

		Ok(())
	}
}

fn finalize_parts(node: &mut Node, store: &NodeStore) -> Result<(), Error> {
	let parts_state = node.parts.take().expect("caller checked parts is Some");
	let dest = store.node_dir(&node.id).join(format!("{}.data", node.id));
	node.file = parts_state.finalize(&dest)?;
	info!("node {}: parts upload finalized into primary file", node.id);
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use shock_util::config::Config;

	fn config() -> Config {
		Config {
			metadata_dir: PathBuf::from("/tmp"),
			data_dir: PathBuf::from("/tmp"),
			bind_addr: "127.0.0.1:0".into(),
			db_engine: "sled".into(),
			mgrast_oauth_url: None,
			local_paths: Some("/data/allow".into()),
			samtools_path: "samtools".into(),
		}
	}

	fn temp_store() -> (mktemp::Temp, NodeStore) {
		let dir = mktemp::Temp::new_dir().unwrap();
		let store = NodeStore::open(dir.as_path().join("db"), dir.as_path().join("data")).unwrap();
		(dir, store)
	}

	fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
		pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
	}

	fn upload(dir: &std::path::Path, name: &str, content: &[u8]) -> UploadHandle {
		let temp_path = dir.join(format!("upload-{}", name));
		std::fs::write(&temp_path, content).unwrap();
		UploadHandle {
			temp_path,
			name: name.to_string(),
			size: content.len() as u64,
			md5: shock_util::data::md5_hex(content),
			blake2b: shock_util::data::blake2b_hex(content),
		}
	}

	#[test]
	fn exclusive_mode_rejection_leaves_node_unchanged() {
		let (dir, store) = temp_store();
		let cfg = config();
		let mut node = Node::new(Uuid([1; 16]), Uuid([2; 16]));
		let mut files = BTreeMap::new();
		files.insert("upload".to_string(), upload(dir.as_path(), "f1", b"hello"));
		let p = params(&[("parts", "2")]);

		let err = NodeEngine::update(&mut node, &p, files, &cfg, &store).unwrap_err();
		match err {
			Error::InvalidMode(msg) => assert!(msg.contains("upload") && msg.contains("parts")),
			other => panic!("unexpected error: {:?}", other),
		}
		assert!(!node.file.has_file());
		assert!(node.parts.is_none());
	}

	#[test]
	fn parts_happy_path_known_count() {
		let (dir, store) = temp_store();
		let cfg = config();
		let mut node = Node::new(Uuid([1; 16]), Uuid([2; 16]));

		NodeEngine::update(&mut node, &params(&[("parts", "2")]), BTreeMap::new(), &cfg, &store).unwrap();

		let mut f1 = BTreeMap::new();
		f1.insert("1".to_string(), upload(dir.as_path(), "p1", b"hello "));
		NodeEngine::update(&mut node, &BTreeMap::new(), f1, &cfg, &store).unwrap();
		assert!(!node.file.has_file());

		let mut f2 = BTreeMap::new();
		f2.insert("2".to_string(), upload(dir.as_path(), "p2", b"world"));
		NodeEngine::update(&mut node, &BTreeMap::new(), f2, &cfg, &store).unwrap();

		assert!(node.file.has_file());
		assert!(node.parts.is_none());
		assert_eq!(
			node.file.checksum.get("md5").unwrap(),
			&shock_util::data::md5_hex(b"hello world")
		);
		// Only two of the three `Update` calls change `file`/`attributes`/`acl`
		// (the first part-fill leaves the file empty, so its version matches
		// the preceding save and no revision is appended for it).
		assert_eq!(node.revisions.len(), 2);
	}

	#[test]
	fn immutability_after_file_set() {
		let (dir, store) = temp_store();
		let cfg = config();
		let mut node = Node::new(Uuid([1; 16]), Uuid([2; 16]));
		let mut files = BTreeMap::new();
		files.insert("upload".to_string(), upload(dir.as_path(), "f1", b"hello"));
		NodeEngine::update(&mut node, &BTreeMap::new(), files, &cfg, &store).unwrap();

		let version_before = node.version.clone();
		let mut files2 = BTreeMap::new();
		files2.insert("upload".to_string(), upload(dir.as_path(), "f3", b"other"));
		let err = NodeEngine::update(&mut node, &BTreeMap::new(), files2, &cfg, &store).unwrap_err();
		assert!(matches!(err, Error::FileImmutable));
		assert_eq!(node.version, version_before);
	}

	#[test]
	fn virtual_node_has_no_on_disk_payload() {
		let (_dir, store) = temp_store();
		let cfg = config();
		let mut node = Node::new(Uuid([1; 16]), Uuid([2; 16]));
		let a = Uuid([0xAA; 16]);
		let b = Uuid([0xBB; 16]);
		let p = params(&[
			("type", "virtual"),
			("source", &format!("{},{}", a, b)),
		]);
		NodeEngine::update(&mut node, &p, BTreeMap::new(), &cfg, &store).unwrap();
		assert!(node.file.is_virtual);
		assert_eq!(node.file.virtual_parts, vec![a, b]);
	}

	#[test]
	fn path_upload_respects_allowlist() {
		let (dir, store) = temp_store();
		let mut cfg = config();
		let allow_dir = dir.as_path().join("allow");
		std::fs::create_dir_all(&allow_dir).unwrap();
		cfg.local_paths = Some(allow_dir.to_string_lossy().into_owned());

		let allowed_file = allow_dir.join("x.bam");
		std::fs::write(&allowed_file, b"data").unwrap();

		let mut node = Node::new(Uuid([1; 16]), Uuid([2; 16]));
		let p = params(&[("path", allowed_file.to_str().unwrap())]);
		NodeEngine::update(&mut node, &p, BTreeMap::new(), &cfg, &store).unwrap();
		assert!(node.file.has_file());

		let mut node2 = Node::new(Uuid([3; 16]), Uuid([2; 16]));
		let p2 = params(&[("path", "/tmp/outside.bam")]);
		let err = NodeEngine::update(&mut node2, &p2, BTreeMap::new(), &cfg, &store).unwrap_err();
		assert!(matches!(err, Error::PathNotAllowed(_)));
	}

	#[test]
	fn format_can_only_be_set_once() {
		let (_dir, store) = temp_store();
		let cfg = config();
		let mut node = Node::new(Uuid([1; 16]), Uuid([2; 16]));
		NodeEngine::update(&mut node, &params(&[("format", "bam")]), BTreeMap::new(), &cfg, &store).unwrap();
		let err = NodeEngine::update(&mut node, &params(&[("format", "fastq")]), BTreeMap::new(), &cfg, &store)
			.unwrap_err();
		assert!(matches!(err, Error::FormatAlreadySet(_)));
	}
}
