//! Embedded key/value storage, committed to a single backend (`sled`)
//! since Shock is single-node: there is no cluster-wide choice of storage
//! engine to abstract over.
//!
//! `Db::open_tree` hands out independent named keyspaces (`Tree`) as
//! separate sled trees inside one `sled::Db`. Shock uses this to keep the
//! `Nodes` and `Users` collections in the same on-disk database without
//! key collisions.

use std::path::Path;

use err_derive::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error(display = "Database error: {}", _0)]
	Sled(#[error(source)] sled::Error),

	#[error(display = "{}", _0)]
	Message(String),
}

impl From<&str> for Error {
	fn from(v: &str) -> Error {
		Error::Message(v.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;

/// A handle on the embedded database.
#[derive(Clone)]
pub struct Db(sled::Db);

impl Db {
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let db = sled::open(path)?;
		Ok(Db(db))
	}

	/// Open (creating if absent) a named, independent keyspace.
	pub fn open_tree(&self, name: &str) -> Result<Tree> {
		let tree = self.0.open_tree(name)?;
		Ok(Tree(tree))
	}

	pub fn flush(&self) -> Result<()> {
		self.0.flush()?;
		Ok(())
	}
}

/// One keyspace within the database. Unique-index enforcement is the caller's
/// responsibility: `insert_unique` below is the primitive they build it on.
#[derive(Clone)]
pub struct Tree(sled::Tree);

impl Tree {
	pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
		Ok(self.0.get(key)?.map(|v| v.to_vec()))
	}

	pub fn contains_key(&self, key: &[u8]) -> Result<bool> {
		Ok(self.0.contains_key(key)?)
	}

	pub fn insert(&self, key: &[u8], value: &[u8]) -> Result<Option<Vec<u8>>> {
		Ok(self.0.insert(key, value)?.map(|v| v.to_vec()))
	}

	/// Insert only if `key` is absent; returns `Err` (wrapped as `Message`)
	/// if the key already exists. Used to enforce uniqueness constraints
	/// (node id, user uuid, user username).
	pub fn insert_unique(&self, key: &[u8], value: &[u8]) -> Result<()> {
		let res = self
			.0
			.compare_and_swap(key, None as Option<&[u8]>, Some(value))?;
		res.map_err(|_| Error::Message("key already exists".into()))
	}

	pub fn remove(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
		Ok(self.0.remove(key)?.map(|v| v.to_vec()))
	}

	pub fn iter(&self) -> impl Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> {
		self.0.iter().map(|res| {
			res.map(|(k, v)| (k.to_vec(), v.to_vec()))
				.map_err(Error::from)
		})
	}

	pub fn scan_prefix(&self, prefix: &[u8]) -> impl Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> {
		self.0.scan_prefix(prefix).map(|res| {
			res.map(|(k, v)| (k.to_vec(), v.to_vec()))
				.map_err(Error::from)
		})
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_unique_rejects_duplicate() {
		let dir = mktemp::Temp::new_dir().unwrap();
		let db = Db::open(dir.as_path()).unwrap();
		let tree = db.open_tree("t").unwrap();

		tree.insert_unique(b"k", b"v1").unwrap();
		assert!(tree.insert_unique(b"k", b"v2").is_err());
		assert_eq!(tree.get(b"k").unwrap(), Some(b"v1".to_vec()));
	}

	#[test]
	fn get_set_remove_roundtrip() {
		let dir = mktemp::Temp::new_dir().unwrap();
		let db = Db::open(dir.as_path()).unwrap();
		let tree = db.open_tree("t").unwrap();

		assert_eq!(tree.get(b"a").unwrap(), None);
		tree.insert(b"a", b"1").unwrap();
		assert_eq!(tree.get(b"a").unwrap(), Some(b"1".to_vec()));
		tree.remove(b"a").unwrap();
		assert_eq!(tree.get(b"a").unwrap(), None);
	}
}
