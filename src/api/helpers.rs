//! Small response-building helpers shared by the route handlers.

use hyper::{Body, Response, StatusCode};
use serde::Serialize;

use crate::error::Error;

pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>, Error> {
	let body = serde_json::to_vec(value).map_err(|e| Error::BadRequest(e.to_string()))?;
	Ok(Response::builder()
		.status(status)
		.header(hyper::header::CONTENT_TYPE, "application/json")
		.body(Body::from(body))?)
}

pub fn error_response(err: &Error) -> Response<Body> {
	let status = err.http_status_code();
	let body = serde_json::json!({ "error": err.public_message() });
	Response::builder()
		.status(status)
		.header(hyper::header::CONTENT_TYPE, "application/json")
		.body(Body::from(body.to_string()))
		.unwrap_or_else(|_| Response::new(Body::from("internal server error")))
}
