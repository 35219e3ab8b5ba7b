//! User identity.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use shock_util::data::{gen_uuid, Uuid};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	pub uuid: Uuid,
	pub username: String,
	#[serde(default)]
	pub fullname: String,
	#[serde(default)]
	pub email: String,
	#[serde(default)]
	pub password_hash: String,
	#[serde(default)]
	pub admin: bool,
	#[serde(default)]
	pub custom_fields: BTreeMap<String, Value>,
}

impl User {
	/// A fresh user record for an identity claim observed for the first
	/// time.
	pub fn new(username: impl Into<String>) -> Self {
		User {
			uuid: gen_uuid(),
			username: username.into(),
			fullname: String::new(),
			email: String::new(),
			password_hash: String::new(),
			admin: false,
			custom_fields: BTreeMap::new(),
		}
	}

	/// JSON projection with `password_hash` elided: the hash must never be
	/// returned in any JSON projection of a user record.
	pub fn to_public_json(&self) -> Value {
		serde_json::json!({
			"uuid": self.uuid.to_string(),
			"username": self.username,
			"fullname": self.fullname,
			"email": self.email,
			"admin": self.admin,
			"custom_fields": self.custom_fields,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn public_json_omits_password_hash() {
		let mut u = User::new("alice");
		u.password_hash = "supersecret".into();
		let json = u.to_public_json();
		assert!(!json.to_string().contains("supersecret"));
	}
}
