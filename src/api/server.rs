//! HTTP server bootstrap and request router.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};

use shock_model::NodeStore;
use shock_util::config::Config;
use shock_util::data::Uuid;

use crate::error::Error;
use crate::helpers::{error_response, json_response};
use crate::{auth, multipart, routes};

/// Binds and serves the HTTP API until the process is signalled to stop:
/// one `hyper::Server` bound to `config.bind_addr`, a request handler that
/// never panics the worker on a per-request error.
pub async fn run(config: Arc<Config>, store: Arc<NodeStore>) -> Result<(), Error> {
	let addr: SocketAddr = config
		.bind_addr
		.parse()
		.map_err(|e| Error::BadRequest(format!("invalid bind_addr {}: {}", config.bind_addr, e)))?;

	let make_svc = make_service_fn(move |_conn| {
		let config = config.clone();
		let store = store.clone();
		async move {
			Ok::<_, Infallible>(service_fn(move |req| {
				let config = config.clone();
				let store = store.clone();
				async move {
					let response = dispatch(req, &config, &store).await.unwrap_or_else(|e| {
						warn!("request failed: {}", e);
						error_response(&e)
					});
					Ok::<_, Infallible>(response)
				}
			}))
		}
	});

	info!("Shock API listening on {}", addr);
	Server::bind(&addr)
		.serve(make_svc)
		.await
		.map_err(Error::from)
}

async fn dispatch(
	req: Request<Body>,
	config: &Config,
	store: &NodeStore,
) -> Result<Response<Body>, Error> {
	let method = req.method().clone();
	let path = req.uri().path().to_string();
	let query = parse_query(req.uri().query().unwrap_or(""));
	let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

	let auth_header = req
		.headers()
		.get(hyper::header::AUTHORIZATION)
		.and_then(|v| v.to_str().ok())
		.map(|s| s.to_string())
		.ok_or(Error::InvalidAuthHeader)?;
	let user = auth::authenticate(&auth_header, store, config.mgrast_oauth_url.as_deref()).await?;

	match (method, segments.as_slice()) {
		(Method::POST, ["node"]) => {
			let tmp_dir = config.data_dir.join("tmp");
			let form = multipart::parse(req.headers(), req.into_body(), &tmp_dir).await?;
			routes::node::handle_create_node(store, config, &user, form.params, form.files).await
		}
		(Method::PUT, ["node", id]) => {
			let id = parse_node_id(id)?;
			let tmp_dir = config.data_dir.join("tmp");
			let form = multipart::parse(req.headers(), req.into_body(), &tmp_dir).await?;
			routes::node::handle_update_node(store, config, &user, &id, form.params, form.files).await
		}
		(Method::DELETE, ["node", id]) => {
			let id = parse_node_id(id)?;
			routes::node::handle_delete_node(store, &user, &id).await
		}
		(Method::GET, ["node", id]) if query.contains_key("download") => {
			let id = parse_node_id(id)?;
			routes::download::handle_download_node(store, config, &user, &id, &query).await
		}
		(Method::GET, ["node", id]) => {
			let id = parse_node_id(id)?;
			routes::node::handle_get_node_metadata(store, &user, &id).await
		}
		_ => Ok(json_response(
			StatusCode::NOT_FOUND,
			&serde_json::json!({ "error": "no such route" }),
		)?),
	}
}

fn parse_node_id(raw: &str) -> Result<Uuid, Error> {
	Uuid::from_hex(raw).ok_or_else(|| Error::BadRequest(format!("invalid node id: {}", raw)))
}

/// Parses an HTTP query string into the flat `key=value` map the route
/// handlers and samtools flag translation expect. A bare key
/// with no `=` (e.g. `?download`) maps to an empty value, which is enough
/// to test presence with `contains_key`.
fn parse_query(raw: &str) -> BTreeMap<String, String> {
	url::form_urlencoded::parse(raw.as_bytes())
		.into_owned()
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parse_query_handles_bare_flags() {
		let q = parse_query("download&region=chr1:1-100");
		assert_eq!(q.get("download").map(|s| s.as_str()), Some(""));
		assert_eq!(q.get("region").map(|s| s.as_str()), Some("chr1:1-100"));
	}
}
