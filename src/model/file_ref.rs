//! On-disk payload descriptor.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use shock_util::data::{Blake2Accumulator, Md5Accumulator, Uuid};

use crate::error::Error;

/// A file handed to the engine by the HTTP layer: already written to a
/// temporary path, with its declared name and precomputed digests.
#[derive(Debug, Clone)]
pub struct UploadHandle {
	pub temp_path: PathBuf,
	pub name: String,
	pub size: u64,
	pub md5: String,
	pub blake2b: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRef {
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub size: u64,
	#[serde(default)]
	pub checksum: BTreeMap<String, String>,
	#[serde(default)]
	pub format: String,
	#[serde(default)]
	pub path: String,
	#[serde(rename = "virtual", default)]
	pub is_virtual: bool,
	#[serde(default)]
	pub virtual_parts: Vec<Uuid>,
}

impl FileRef {
	/// Moves the uploaded temp file into the node's directory at `dest`.
	pub fn set_file(&mut self, handle: &UploadHandle, dest: &Path) -> Result<(), Error> {
		move_or_copy(&handle.temp_path, dest)?;
		self.name = handle.name.clone();
		self.size = handle.size;
		self.checksum = BTreeMap::new();
		self.checksum.insert("md5".to_string(), handle.md5.clone());
		self.checksum
			.insert("blake2b".to_string(), handle.blake2b.clone());
		self.format = String::new();
		self.path = dest.to_string_lossy().into_owned();
		self.is_virtual = false;
		self.virtual_parts = Vec::new();
		Ok(())
	}

	/// Records an external path by reference; no bytes are copied.
	pub fn set_file_from_path(&mut self, p: &Path) -> Result<(), Error> {
		let meta = std::fs::metadata(p)?;
		let name = p
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_default();
		let (md5, blake2b) = digest_file(p)?;

		self.name = name;
		self.size = meta.len();
		self.checksum = BTreeMap::new();
		self.checksum.insert("md5".to_string(), md5);
		self.checksum.insert("blake2b".to_string(), blake2b);
		self.format = String::new();
		self.path = p.to_string_lossy().into_owned();
		self.is_virtual = false;
		self.virtual_parts = Vec::new();
		Ok(())
	}

	pub fn set_file_format(&mut self, format: &str) -> Result<(), Error> {
		if !self.format.is_empty() {
			return Err(Error::FormatAlreadySet(self.format.clone()));
		}
		self.format = format.to_string();
		Ok(())
	}

	pub fn add_virtual_parts(&mut self, ids: Vec<Uuid>) {
		self.is_virtual = true;
		self.virtual_parts = ids;
	}

	pub fn has_file(&self) -> bool {
		!self.path.is_empty() || self.size != 0 || self.is_virtual
	}
}

fn move_or_copy(src: &Path, dest: &Path) -> Result<(), Error> {
	if let Some(parent) = dest.parent() {
		std::fs::create_dir_all(parent)?;
	}
	if std::fs::rename(src, dest).is_err() {
		std::fs::copy(src, dest)?;
		std::fs::remove_file(src)?;
	}
	Ok(())
}

fn digest_file(p: &Path) -> Result<(String, String), Error> {
	let mut f = File::open(p)?;
	let mut buf = [0u8; 65536];
	let mut md5 = Md5Accumulator::new();
	let mut blake2b = Blake2Accumulator::new();
	loop {
		let n = f.read(&mut buf)?;
		if n == 0 {
			break;
		}
		md5.update(&buf[..n]);
		blake2b.update(&buf[..n]);
	}
	Ok((md5.finish_hex(), blake2b.finish_hex()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn set_file_format_is_write_once() {
		let mut f = FileRef::default();
		f.set_file_format("bam").unwrap();
		assert_eq!(f.format, "bam");
		assert!(f.set_file_format("fastq").is_err());
	}

	#[test]
	fn has_file_detects_virtual() {
		let mut f = FileRef::default();
		assert!(!f.has_file());
		f.add_virtual_parts(vec![Uuid::from_hex("00112233445566778899aabbccddeeff").unwrap()]);
		assert!(f.has_file());
	}
}
