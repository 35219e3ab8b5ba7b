//! Access control: four sets of user-uuids — owner, read, write, delete.

use serde::{Deserialize, Serialize};

use shock_util::data::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Acl {
	#[serde(default)]
	pub owner: Vec<Uuid>,
	#[serde(default)]
	pub read: Vec<Uuid>,
	#[serde(default)]
	pub write: Vec<Uuid>,
	#[serde(default)]
	pub delete: Vec<Uuid>,
}

impl Acl {
	pub fn for_owner(owner: Uuid) -> Self {
		Acl {
			owner: vec![owner],
			read: Vec::new(),
			write: Vec::new(),
			delete: Vec::new(),
		}
	}

	pub fn is_owner(&self, user: &Uuid) -> bool {
		self.owner.contains(user)
	}

	pub fn can_read(&self, user: &Uuid, public: bool) -> bool {
		public || self.is_owner(user) || self.read.contains(user)
	}

	pub fn can_write(&self, user: &Uuid) -> bool {
		self.is_owner(user) || self.write.contains(user)
	}

	pub fn can_delete(&self, user: &Uuid) -> bool {
		self.is_owner(user) || self.delete.contains(user)
	}
}
