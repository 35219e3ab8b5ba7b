//! Opaque identifiers and content hashing helpers.
//!
//! `Uuid` is a fixed-size, hex-printable identifier assigned once and
//! never reused. Shock mints one for every `Node::id` and `User::uuid`.

use std::fmt;

use blake2::{Blake2b512, Digest as Blake2Digest};
use md5::{Digest as Md5Digest, Md5};
use serde::{Deserialize, Serialize};

/// A 16-byte opaque identifier, hex-encoded in its `Display`/serde impls.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
pub struct Uuid(#[serde(with = "hex_bytes_16")] pub [u8; 16]);

impl Uuid {
	pub fn from_hex(s: &str) -> Option<Self> {
		let bytes = hex::decode(s).ok()?;
		if bytes.len() != 16 {
			return None;
		}
		let mut a = [0u8; 16];
		a.copy_from_slice(&bytes);
		Some(Uuid(a))
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}
}

impl fmt::Display for Uuid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", hex::encode(self.0))
	}
}

impl fmt::Debug for Uuid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Uuid({})", hex::encode(self.0))
	}
}

mod hex_bytes_16 {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(bytes: &[u8; 16], ser: S) -> Result<S::Ok, S::Error> {
		ser.serialize_str(&hex::encode(bytes))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 16], D::Error> {
		let s = String::deserialize(de)?;
		let v = hex::decode(&s).map_err(serde::de::Error::custom)?;
		v.try_into()
			.map_err(|_| serde::de::Error::custom("expected 16 bytes"))
	}
}

/// Generate a fresh random identifier.
pub fn gen_uuid() -> Uuid {
	Uuid(rand::random())
}

/// MD5 over raw bytes, lower-case hex. Used by `Versioner` and by
/// `FileRef` checksums, which carry at least an MD5 entry.
pub fn md5_hex(data: &[u8]) -> String {
	hex::encode(Md5::digest(data))
}

/// Incremental MD5, used when concatenating multi-part uploads without
/// buffering the whole assembled file in memory.
pub struct Md5Accumulator(Md5);

impl Md5Accumulator {
	pub fn new() -> Self {
		Md5Accumulator(Md5::new())
	}

	pub fn update(&mut self, data: &[u8]) {
		self.0.update(data);
	}

	pub fn finish_hex(self) -> String {
		hex::encode(self.0.finalize())
	}
}

impl Default for Md5Accumulator {
	fn default() -> Self {
		Self::new()
	}
}

/// Blake2b-512 over raw bytes, lower-case hex. Stored alongside MD5 in
/// `FileRef::checksum` as a stronger digest.
pub fn blake2b_hex(data: &[u8]) -> String {
	hex::encode(Blake2b512::digest(data))
}

/// Incremental Blake2b-512, used alongside `Md5Accumulator` when hashing a
/// file without buffering it whole in memory.
pub struct Blake2Accumulator(Blake2b512);

impl Blake2Accumulator {
	pub fn new() -> Self {
		Blake2Accumulator(Blake2b512::new())
	}

	pub fn update(&mut self, data: &[u8]) {
		self.0.update(data);
	}

	pub fn finish_hex(self) -> String {
		hex::encode(self.0.finalize())
	}
}

impl Default for Blake2Accumulator {
	fn default() -> Self {
		Self::new()
	}
}
