//! HTTP-facing error type: wraps model errors and maps them onto status
//! codes per a fixed propagation policy.

use err_derive::Error;
use hyper::StatusCode;

use shock_model::Error as ModelError;

#[derive(Debug, Error)]
pub enum Error {
	#[error(display = "{}", _0)]
	Model(#[error(source)] ModelError),

	#[error(display = "Internal error (Hyper error): {}", _0)]
	Hyper(#[error(source)] hyper::Error),

	#[error(display = "Internal error (HTTP error): {}", _0)]
	Http(#[error(source)] http::Error),

	#[error(display = "Bad request: {}", _0)]
	BadRequest(String),

	#[error(display = "Invalid authentication header.")]
	InvalidAuthHeader,

	#[error(display = "{}", _0)]
	AuthFailed(String),
}

impl Error {
	/// Maps the error onto the status code the HTTP glue should return.
	/// Validation kinds surface their message verbatim; backend and
	/// external-service failures are logged but not leaked to the response
	/// body.
	pub fn http_status_code(&self) -> StatusCode {
		match self {
			Error::Model(ModelError::Unauthorized) => StatusCode::UNAUTHORIZED,
			Error::Model(ModelError::NotFound) => StatusCode::NOT_FOUND,
			Error::Model(ModelError::Backend(_)) | Error::Model(ModelError::ExternalServiceFailure(_)) => {
				StatusCode::INTERNAL_SERVER_ERROR
			}
			Error::Model(_) => StatusCode::BAD_REQUEST,
			Error::Hyper(_) | Error::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
			Error::BadRequest(_) => StatusCode::BAD_REQUEST,
			Error::InvalidAuthHeader | Error::AuthFailed(_) => StatusCode::UNAUTHORIZED,
		}
	}

	/// The message safe to put in the response body: verbatim for
	/// validation errors, generic for anything backend/external.
	pub fn public_message(&self) -> String {
		match self {
			Error::Model(ModelError::Backend(_)) => "internal server error".to_string(),
			Error::Model(ModelError::ExternalServiceFailure(_)) => "upstream service error".to_string(),
			Error::Hyper(_) | Error::Http(_) => "internal server error".to_string(),
			other => other.to_string(),
		}
	}
}
