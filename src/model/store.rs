//! Persistence façade: document upsert/find by id, ACL-filtered
//! load, unique indexes on node id and on user uuid/username.

use std::path::PathBuf;

use shock_util::data::Uuid;

use crate::error::Error;
use crate::node::Node;
use crate::user::User;

pub struct NodeStore {
	db: shock_db::Db,
	nodes: shock_db::Tree,
	users_by_uuid: shock_db::Tree,
	users_by_username: shock_db::Tree,
	data_dir: PathBuf,
}

impl NodeStore {
	pub fn open(db_path: impl AsRef<std::path::Path>, data_dir: impl Into<PathBuf>) -> Result<Self, Error> {
		let db = shock_db::Db::open(db_path)?;
		let nodes = db.open_tree("nodes")?;
		let users_by_uuid = db.open_tree("users_by_uuid")?;
		let users_by_username = db.open_tree("users_by_username")?;
		Ok(NodeStore {
			db,
			nodes,
			users_by_uuid,
			users_by_username,
			data_dir: data_dir.into(),
		})
	}

	/// Opens (creating if absent) a named index keyspace.
	pub fn ensure_index(&self, name: &str) -> Result<shock_db::Tree, Error> {
		Ok(self.db.open_tree(&format!("idx_{}", name))?)
	}

	/// The directory a node's on-disk files live under: `<data_dir>/<id>/`.
	pub fn node_dir(&self, id: &Uuid) -> PathBuf {
		self.data_dir.join(id.to_string())
	}

	pub fn find_by_id(&self, id: &Uuid) -> Result<Option<Node>, Error> {
		match self.nodes.get(id.as_slice())? {
			Some(bytes) => Ok(Some(bson::from_slice(&bytes)?)),
			None => Ok(None),
		}
	}

	/// Fetches a node and enforces the ACL: `Unauthorized` unless the
	/// requester is in `owner ∪ read` or the node is public; `NotFound` if
	/// the id is unknown.
	pub fn load(&self, id: &Uuid, requesting_user: &Uuid) -> Result<Node, Error> {
		let node = self.find_by_id(id)?.ok_or(Error::NotFound)?;
		if !node.acl.can_read(requesting_user, node.public) {
			return Err(Error::Unauthorized);
		}
		Ok(node)
	}

	/// Writes the document-store mirror (`<id>.bson`) and upserts the node
	/// document. Both writes must succeed for `persist` to succeed; neither
	/// is rolled back on partial failure.
	pub fn persist(&self, node: &Node) -> Result<(), Error> {
		let dir = self.node_dir(&node.id);
		std::fs::create_dir_all(&dir)?;
		let bytes = bson::to_vec(node)?;

		let bson_path = dir.join(format!("{}.bson", node.id));
		std::fs::write(&bson_path, &bytes)?;

		self.nodes.insert(node.id.as_slice(), &bytes)?;
		Ok(())
	}

	/// Removes the document and the node's on-disk directory. ACL
	/// enforcement is the caller's responsibility.
	pub fn delete(&self, node: &Node) -> Result<(), Error> {
		self.nodes.remove(node.id.as_slice())?;
		let dir = self.node_dir(&node.id);
		if dir.exists() {
			std::fs::remove_dir_all(&dir)?;
		}
		Ok(())
	}

	pub fn find_user_by_uuid(&self, uuid: &Uuid) -> Result<Option<User>, Error> {
		match self.users_by_uuid.get(uuid.as_slice())? {
			Some(bytes) => Ok(Some(bson::from_slice(&bytes)?)),
			None => Ok(None),
		}
	}

	/// Every known user, for the admin CLI's `user list`.
	pub fn all_users(&self) -> Result<Vec<User>, Error> {
		self.users_by_uuid
			.iter()
			.map(|entry| {
				let (_, bytes) = entry?;
				Ok(bson::from_slice(&bytes)?)
			})
			.collect()
	}

	pub fn find_user_by_username(&self, username: &str) -> Result<Option<User>, Error> {
		match self.users_by_username.get(username.as_bytes())? {
			Some(uuid_bytes) => {
				let mut a = [0u8; 16];
				if uuid_bytes.len() != 16 {
					return Err(Error::Backend(shock_util::error::Error::Message(
						"corrupt username index entry".into(),
					)));
				}
				a.copy_from_slice(&uuid_bytes);
				self.find_user_by_uuid(&Uuid(a))
			}
			None => Ok(None),
		}
	}

	/// Inserts or updates a user. The username index is unique: a username
	/// already bound to a different uuid is rejected.
	pub fn upsert_user(&self, user: &User) -> Result<(), Error> {
		match self.users_by_username.get(user.username.as_bytes())? {
			Some(existing) if existing != user.uuid.as_slice() => {
				return Err(Error::Backend(shock_util::error::Error::Message(format!(
					"username {} is already in use",
					user.username
				))));
			}
			Some(_) => {}
			None => {
				self.users_by_username
					.insert(user.username.as_bytes(), user.uuid.as_slice())?;
			}
		}
		let bytes = bson::to_vec(user)?;
		self.users_by_uuid.insert(user.uuid.as_slice(), &bytes)?;
		Ok(())
	}

	/// Looks up a user by username, minting and persisting a fresh one if
	/// absent.
	pub fn user_for_username(&self, username: &str) -> Result<User, Error> {
		if let Some(u) = self.find_user_by_username(username)? {
			return Ok(u);
		}
		let user = User::new(username);
		self.upsert_user(&user)?;
		Ok(user)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::node::Node;

	fn temp_store() -> (mktemp::Temp, NodeStore) {
		let dir = mktemp::Temp::new_dir().unwrap();
		let store = NodeStore::open(dir.as_path().join("db"), dir.as_path().join("data")).unwrap();
		(dir, store)
	}

	#[test]
	fn persist_then_find_roundtrips() {
		let (_dir, store) = temp_store();
		let node = Node::new(Uuid([7; 16]), Uuid([1; 16]));
		store.persist(&node).unwrap();
		let found = store.find_by_id(&node.id).unwrap().unwrap();
		assert_eq!(found.id, node.id);
	}

	#[test]
	fn load_rejects_non_owner_non_public() {
		let (_dir, store) = temp_store();
		let node = Node::new(Uuid([7; 16]), Uuid([1; 16]));
		store.persist(&node).unwrap();
		let err = store.load(&node.id, &Uuid([2; 16])).unwrap_err();
		assert!(matches!(err, Error::Unauthorized));
	}

	#[test]
	fn load_allows_public_node() {
		let (_dir, store) = temp_store();
		let mut node = Node::new(Uuid([7; 16]), Uuid([1; 16]));
		node.public = true;
		store.persist(&node).unwrap();
		let found = store.load(&node.id, &Uuid([2; 16])).unwrap();
		assert_eq!(found.id, node.id);
	}

	#[test]
	fn load_missing_is_not_found() {
		let (_dir, store) = temp_store();
		let err = store.load(&Uuid([9; 16]), &Uuid([1; 16])).unwrap_err();
		assert!(matches!(err, Error::NotFound));
	}

	#[test]
	fn user_for_username_mints_once() {
		let (_dir, store) = temp_store();
		let u1 = store.user_for_username("alice").unwrap();
		let u2 = store.user_for_username("alice").unwrap();
		assert_eq!(u1.uuid, u2.uuid);
	}

	#[test]
	fn upsert_user_rejects_username_collision() {
		let (_dir, store) = temp_store();
		let a = User::new("bob");
		store.upsert_user(&a).unwrap();
		let mut b = User::new("bob");
		b.uuid = Uuid([99; 16]);
		assert!(store.upsert_user(&b).is_err());
	}
}
