//! Node HTTP handlers: creation/update, delete, and download.

use std::collections::BTreeMap;

use hyper::{Body, Response, StatusCode};
use serde_json::json;

use shock_model::{NodeEngine, Node, NodeStore, UploadHandle, User};
use shock_util::config::Config;
use shock_util::data::{gen_uuid, Uuid};

use crate::error::Error;
use crate::helpers::json_response;

/// `POST /node`: mints a fresh id owned by `user` and applies the
/// mutation in one call.
pub async fn handle_create_node(
	store: &NodeStore,
	config: &Config,
	user: &User,
	params: BTreeMap<String, String>,
	files: BTreeMap<String, UploadHandle>,
) -> Result<Response<Body>, Error> {
	let mut node = Node::new(gen_uuid(), user.uuid);
	NodeEngine::update(&mut node, &params, files, config, store)?;
	Ok(json_response(StatusCode::OK, &node)?)
}

/// `PUT /node/{id}`: loads the existing node, checks write access, and
/// applies the mutation.
pub async fn handle_update_node(
	store: &NodeStore,
	config: &Config,
	user: &User,
	id: &Uuid,
	params: BTreeMap<String, String>,
	files: BTreeMap<String, UploadHandle>,
) -> Result<Response<Body>, Error> {
	let mut node = store
		.find_by_id(id)?
		.ok_or(shock_model::Error::NotFound)?;
	if !node.acl.can_write(&user.uuid) {
		return Err(shock_model::Error::Unauthorized.into());
	}
	NodeEngine::update(&mut node, &params, files, config, store)?;
	Ok(json_response(StatusCode::OK, &node)?)
}

/// `DELETE /node/{id}`: 401 unauthenticated is handled upstream by the
/// caller before reaching here; this handler covers not-owner (401),
/// missing (404), and backend failure (500).
pub async fn handle_delete_node(
	store: &NodeStore,
	user: &User,
	id: &Uuid,
) -> Result<Response<Body>, Error> {
	let node = store.find_by_id(id)?.ok_or(shock_model::Error::NotFound)?;
	if !node.acl.can_delete(&user.uuid) {
		return Err(shock_model::Error::Unauthorized.into());
	}
	store.delete(&node)?;
	Ok(json_response(StatusCode::OK, &json!({ "deleted": id.to_string() }))?)
}

/// `GET /node/{id}?download`: ACL-gated load followed by a plain
/// whole-file stream (range/filter handling lives in the download route
/// module alongside the samtools dispatch).
pub async fn handle_get_node_metadata(
	store: &NodeStore,
	user: &User,
	id: &Uuid,
) -> Result<Response<Body>, Error> {
	let node = store.load(id, &user.uuid)?;
	Ok(json_response(StatusCode::OK, &node)?)
}
