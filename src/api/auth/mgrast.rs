//! Token-exchange against the mgrast OAuth provider. The provider is an external collaborator: this module
//! only implements the contract the core depends on — exchange a bearer
//! token for an identity claim.

use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Deserialize)]
struct Credentials {
	user: String,
	#[serde(default)]
	firstname: String,
	#[serde(default)]
	lastname: String,
	#[serde(default)]
	email: String,
	#[serde(default)]
	groups: Vec<String>,
}

/// An identity claim yielded by the token exchange: enough to mint or
/// refresh a `User` record.
#[derive(Debug)]
pub struct OauthClaim {
	pub username: String,
	pub fullname: String,
	pub email: String,
	pub groups: Vec<String>,
}

/// Exchanges `token` for an identity claim against the mgrast OAuth
/// token-validation endpoint: a `POST` with `token`/`action=credentials`/
/// `groups=true` form fields, parsing the `{user, firstname, lastname,
/// email, groups}` JSON response.
pub async fn exchange_token(oauth_url: &str, token: &str) -> Result<OauthClaim, Error> {
	if token.is_empty() {
		return Err(Error::AuthFailed(
			"oauth token missing from authentication header".into(),
		));
	}

	let client = reqwest::Client::new();
	let resp = client
		.post(oauth_url)
		.form(&[("token", token), ("action", "credentials"), ("groups", "true")])
		.send()
		.await
		.map_err(|e| Error::AuthFailed(format!("mgrast token exchange failed: {}", e)))?;

	if !resp.status().is_success() {
		return Err(Error::AuthFailed(format!(
			"mgrast token exchange returned {}",
			resp.status()
		)));
	}

	let creds: Credentials = resp
		.json()
		.await
		.map_err(|e| Error::AuthFailed(format!("invalid mgrast oauth response: {}", e)))?;

	Ok(OauthClaim {
		username: creds.user,
		fullname: format!("{} {}", creds.firstname, creds.lastname)
			.trim()
			.to_string(),
		email: creds.email,
		groups: creds.groups,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn empty_token_is_rejected_before_any_request() {
		let err = exchange_token("http://localhost:0", "").await.unwrap_err();
		assert!(matches!(err, Error::AuthFailed(_)));
	}
}
