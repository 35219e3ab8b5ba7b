//! The central entity: immutable primary payload plus mutable
//! metadata, versioned and revisioned on every save.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use shock_util::data::Uuid;

use crate::acl::Acl;
use crate::error::Error;
use crate::file_ref::FileRef;
use crate::parts::PartsState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionParts {
	#[serde(default)]
	pub file_ver: String,
	#[serde(default)]
	pub attributes_ver: String,
	#[serde(default)]
	pub acl_ver: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Linkage {
	#[serde(rename = "type")]
	pub kind: String,
	pub ids: Vec<Uuid>,
	#[serde(default)]
	pub operation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexDescriptor {
	pub size: u64,
	pub kind: String,
	pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
	pub id: Uuid,
	#[serde(default)]
	pub version: String,
	#[serde(default)]
	pub version_parts: VersionParts,
	#[serde(default)]
	pub file: FileRef,
	#[serde(default = "empty_object")]
	pub attributes: Value,
	#[serde(default)]
	pub public: bool,
	#[serde(default)]
	pub acl: Acl,
	#[serde(default)]
	pub indexes: std::collections::BTreeMap<String, IndexDescriptor>,
	#[serde(default)]
	pub parts: Option<PartsState>,
	#[serde(default)]
	pub tags: Vec<String>,
	#[serde(default)]
	pub linkages: Vec<Linkage>,
	#[serde(default)]
	pub revisions: Vec<Node>,
	#[serde(default)]
	pub created_on: String,
	#[serde(default)]
	pub last_modified: String,
}

fn empty_object() -> Value {
	Value::Object(serde_json::Map::new())
}

impl Node {
	pub fn new(id: Uuid, owner: Uuid) -> Self {
		Node {
			id,
			version: String::new(),
			version_parts: VersionParts::default(),
			file: FileRef::default(),
			attributes: empty_object(),
			public: false,
			acl: Acl::for_owner(owner),
			indexes: std::collections::BTreeMap::new(),
			parts: None,
			tags: Vec::new(),
			linkages: Vec::new(),
			revisions: Vec::new(),
			created_on: String::new(),
			last_modified: String::new(),
		}
	}

	/// Adds `csv` (comma-separated tags) to the tag set, deduplicating and
	/// preserving first-seen order. Applying the same CSV twice is a no-op
	/// on the second call.
	pub fn union_tags(&mut self, csv: &str) {
		for tag in csv.split(',').map(|t| t.trim()).filter(|t| !t.is_empty()) {
			if !self.tags.iter().any(|t| t == tag) {
				self.tags.push(tag.to_string());
			}
		}
	}

	/// Appends a linkage entry, enforcing the `parent` singleton rule
	/// (invariant 3).
	pub fn add_linkage(&mut self, linkage: Linkage) -> Result<(), Error> {
		if linkage.kind == "parent" && self.linkages.iter().any(|l| l.kind == "parent") {
			return Err(Error::ProvenanceImmutable);
		}
		self.linkages.push(linkage);
		Ok(())
	}

	/// A snapshot suitable for appending to `revisions`: a value copy of
	/// `self` with its own `revisions` list emptied, preventing unbounded
	/// nesting.
	pub fn snapshot(&self) -> Node {
		let mut copy = self.clone();
		copy.revisions = Vec::new();
		copy
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn uuid(b: u8) -> Uuid {
		Uuid([b; 16])
	}

	#[test]
	fn union_tags_is_idempotent() {
		let mut n = Node::new(uuid(1), uuid(2));
		n.union_tags("bam,fastq");
		n.union_tags("bam,fastq");
		assert_eq!(n.tags, vec!["bam".to_string(), "fastq".to_string()]);
	}

	#[test]
	fn union_tags_preserves_first_seen_order() {
		let mut n = Node::new(uuid(1), uuid(2));
		n.union_tags("b,a");
		n.union_tags("a,c");
		assert_eq!(
			n.tags,
			vec!["b".to_string(), "a".to_string(), "c".to_string()]
		);
	}

	#[test]
	fn parent_linkage_is_singleton() {
		let mut n = Node::new(uuid(1), uuid(2));
		n.add_linkage(Linkage {
			kind: "parent".into(),
			ids: vec![uuid(3)],
			operation: String::new(),
		})
		.unwrap();
		let err = n
			.add_linkage(Linkage {
				kind: "parent".into(),
				ids: vec![uuid(4)],
				operation: String::new(),
			})
			.unwrap_err();
		assert!(matches!(err, Error::ProvenanceImmutable));
	}

	#[test]
	fn snapshot_elides_revisions() {
		let mut n = Node::new(uuid(1), uuid(2));
		n.revisions.push(n.snapshot());
		let snap = n.snapshot();
		assert!(snap.revisions.is_empty());
	}
}
