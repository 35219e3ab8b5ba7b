//! Multi-part upload state machine.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use shock_util::data::{Blake2Accumulator, Md5Accumulator};

use crate::error::Error;
use crate::file_ref::FileRef;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PartCount {
	Known(u32),
	Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartSlot {
	pub size: u64,
	pub checksum: String,
	pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartsState {
	pub count: PartCount,
	#[serde(default)]
	pub parts: BTreeMap<u32, PartSlot>,
	#[serde(default)]
	pub varlen_closed: bool,
}

impl PartsState {
	pub fn init_known(n: u32) -> Self {
		PartsState {
			count: PartCount::Known(n),
			parts: BTreeMap::new(),
			varlen_closed: false,
		}
	}

	pub fn init_unknown() -> Self {
		PartsState {
			count: PartCount::Unknown,
			parts: BTreeMap::new(),
			varlen_closed: false,
		}
	}

	/// Number of slots filled so far.
	pub fn length(&self) -> u32 {
		self.parts.len() as u32
	}

	/// Writes `slot` into position `index` (1-based). Duplicate submissions
	/// silently overwrite the slot.
	pub fn add_part(&mut self, index: u32, slot: PartSlot) -> Result<bool, Error> {
		if index < 1 {
			return Err(Error::InvalidPart(
				"part index must be a positive integer".into(),
			));
		}
		if let PartCount::Known(n) = self.count {
			if index > n {
				return Err(Error::InvalidPart(format!(
					"part index {} exceeds declared part count {}",
					index, n
				)));
			}
		}
		self.parts.insert(index, slot);
		Ok(self.is_ready())
	}

	/// Marks a varlen upload as closed. Only valid in `Unknown` mode.
	pub fn close(&mut self) -> Result<bool, Error> {
		if self.count != PartCount::Unknown {
			return Err(Error::InvalidPart(
				"'close' only applies to a parts upload of unknown length".into(),
			));
		}
		self.varlen_closed = true;
		Ok(self.is_ready())
	}

	pub fn is_ready(&self) -> bool {
		match self.count {
			PartCount::Known(n) => self.parts.len() as u32 >= n && n > 0,
			PartCount::Unknown => self.varlen_closed && self.is_contiguous_from_one(),
		}
	}

	fn is_contiguous_from_one(&self) -> bool {
		let n = self.parts.len() as u32;
		(1..=n).all(|k| self.parts.contains_key(&k))
	}

	/// Concatenates slots in order into `dest`, computing the aggregate MD5
	/// and Blake2b-512, and returns the resulting `FileRef`. Consumes `self`:
	/// the caller discards the `PartsState` afterwards, since a node keeps
	/// at most one primary file and `parts` is mutually exclusive with it.
	pub fn finalize(self, dest: &Path) -> Result<FileRef, Error> {
		if let Some(parent) = dest.parent() {
			std::fs::create_dir_all(parent)?;
		}
		let mut out = File::create(dest)?;
		let mut md5 = Md5Accumulator::new();
		let mut blake2b = Blake2Accumulator::new();
		let mut total = 0u64;

		let mut buf = [0u8; 65536];
		for (_, slot) in self.parts.iter() {
			let mut f = File::open(&slot.path)?;
			loop {
				let n = f.read(&mut buf)?;
				if n == 0 {
					break;
				}
				out.write_all(&buf[..n])?;
				md5.update(&buf[..n]);
				blake2b.update(&buf[..n]);
				total += n as u64;
			}
		}
		out.flush()?;

		for (_, slot) in self.parts.iter() {
			let _ = std::fs::remove_file(&slot.path);
		}

		let mut file_ref = FileRef::default();
		file_ref.name = dest
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_default();
		file_ref.size = total;
		file_ref
			.checksum
			.insert("md5".to_string(), md5.finish_hex());
		file_ref
			.checksum
			.insert("blake2b".to_string(), blake2b.finish_hex());
		file_ref.path = dest.to_string_lossy().into_owned();
		Ok(file_ref)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn known_count_ready_only_once_all_slots_filled() {
		let mut p = PartsState::init_known(2);
		assert!(!p
			.add_part(
				1,
				PartSlot {
					size: 1,
					checksum: "a".into(),
					path: PathBuf::from("/tmp/x")
				}
			)
			.unwrap());
		assert!(p
			.add_part(
				2,
				PartSlot {
					size: 1,
					checksum: "b".into(),
					path: PathBuf::from("/tmp/y")
				}
			)
			.unwrap());
	}

	#[test]
	fn rejects_index_beyond_declared_count() {
		let mut p = PartsState::init_known(1);
		let res = p.add_part(
			2,
			PartSlot {
				size: 1,
				checksum: "a".into(),
				path: PathBuf::from("/tmp/x"),
			},
		);
		assert!(res.is_err());
	}

	#[test]
	fn varlen_ready_requires_close_and_contiguity() {
		let mut p = PartsState::init_unknown();
		for i in 1..=3u32 {
			let ready = p
				.add_part(
					i,
					PartSlot {
						size: 1,
						checksum: "a".into(),
						path: PathBuf::from("/tmp/x"),
					},
				)
				.unwrap();
			assert!(!ready);
		}
		assert!(p.close().unwrap());
	}

	#[test]
	fn duplicate_submission_overwrites_silently() {
		let mut p = PartsState::init_known(2);
		p.add_part(
			1,
			PartSlot {
				size: 1,
				checksum: "first".into(),
				path: PathBuf::from("/tmp/x"),
			},
		)
		.unwrap();
		p.add_part(
			1,
			PartSlot {
				size: 2,
				checksum: "second".into(),
				path: PathBuf::from("/tmp/y"),
			},
		)
		.unwrap();
		assert_eq!(p.parts.get(&1).unwrap().checksum, "second");
		assert_eq!(p.length(), 1);
	}
}
