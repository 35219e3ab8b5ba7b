//! Authentication header contract: the first whitespace-delimited
//! token identifies the scheme, case-insensitively.

pub mod mgrast;

use shock_model::{NodeStore, User};

use crate::error::Error;

/// Resolves an `Authorization`-style header value into a `User`, minting a
/// user record on first observation of an identity.
pub async fn authenticate(
	header_value: &str,
	store: &NodeStore,
	mgrast_oauth_url: Option<&str>,
) -> Result<User, Error> {
	let mut tokens = header_value.splitn(2, char::is_whitespace);
	let scheme = tokens.next().unwrap_or("").to_lowercase();
	let rest = tokens.next().unwrap_or("").trim();

	match scheme.as_str() {
		"oauth" | "mgrast" => {
			let url = mgrast_oauth_url
				.ok_or_else(|| Error::AuthFailed("mgrast oauth is not configured".into()))?;
			let claim = mgrast::exchange_token(url, rest).await?;

			let mut user = store.user_for_username(&claim.username)?;
			if user.fullname.is_empty() {
				user.fullname = claim.fullname;
			}
			if user.email.is_empty() {
				user.email = claim.email;
			}
			user.custom_fields.insert(
				"groups".to_string(),
				serde_json::Value::Array(claim.groups.iter().cloned().map(serde_json::Value::String).collect()),
			);
			store.upsert_user(&user)?;
			Ok(user)
		}
		"basic" => Err(Error::AuthFailed(
			"basic authentication is not supported".into(),
		)),
		_ => Err(Error::InvalidAuthHeader),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn unrecognized_scheme_is_invalid_auth_header() {
		let dir = mktemp::Temp::new_dir().unwrap();
		let store = NodeStore::open(dir.as_path().join("db"), dir.as_path().join("data")).unwrap();
		let err = authenticate("Bearer sometoken", &store, None).await.unwrap_err();
		assert!(matches!(err, Error::InvalidAuthHeader));
	}

	#[tokio::test]
	async fn basic_scheme_is_explicitly_rejected() {
		let dir = mktemp::Temp::new_dir().unwrap();
		let store = NodeStore::open(dir.as_path().join("db"), dir.as_path().join("data")).unwrap();
		let err = authenticate("Basic dXNlcjpwYXNz", &store, None).await.unwrap_err();
		assert!(matches!(err, Error::AuthFailed(_)));
	}

	#[tokio::test]
	async fn oauth_without_configured_url_fails() {
		let dir = mktemp::Temp::new_dir().unwrap();
		let store = NodeStore::open(dir.as_path().join("db"), dir.as_path().join("data")).unwrap();
		let err = authenticate("OAuth sometoken", &store, None).await.unwrap_err();
		assert!(matches!(err, Error::AuthFailed(_)));
	}
}
