//! Error kinds surfaced by the node mutation engine: string messages for
//! validation failures, wrapped causes for backend failures. The
//! HTTP-facing crate maps these onto status codes; this crate never talks
//! HTTP.

use err_derive::Error;

#[derive(Debug, Error)]
pub enum Error {
	#[error(display = "Unauthorized")]
	Unauthorized,

	#[error(display = "Not found")]
	NotFound,

	#[error(display = "FileImmutable")]
	FileImmutable,

	#[error(display = "ProvenanceImmutable")]
	ProvenanceImmutable,

	#[error(display = "file format already set:{}", _0)]
	FormatAlreadySet(String),

	#[error(display = "{}", _0)]
	InvalidMode(String),

	#[error(display = "{}", _0)]
	InvalidPart(String),

	#[error(display = "{}", _0)]
	MissingRequiredParam(String),

	#[error(display = "{}", _0)]
	PathNotAllowed(String),

	#[error(display = "external service failure: {}", _0)]
	ExternalServiceFailure(String),

	#[error(display = "{}", _0)]
	Backend(#[error(source)] shock_util::error::Error),
}

impl From<std::io::Error> for Error {
	fn from(e: std::io::Error) -> Error {
		Error::Backend(shock_util::error::Error::from(e))
	}
}

impl From<serde_json::Error> for Error {
	fn from(e: serde_json::Error) -> Error {
		Error::Backend(shock_util::error::Error::from(e))
	}
}

impl From<shock_db::Error> for Error {
	fn from(e: shock_db::Error) -> Error {
		Error::Backend(shock_util::error::Error::Db(e))
	}
}

impl From<bson::ser::Error> for Error {
	fn from(e: bson::ser::Error) -> Error {
		Error::Backend(shock_util::error::Error::from(e))
	}
}

impl From<bson::de::Error> for Error {
	fn from(e: bson::de::Error) -> Error {
		Error::Backend(shock_util::error::Error::from(e))
	}
}

impl Error {
	/// Coarse classification used by the HTTP layer to pick a status code
	/// without needing to match on every variant.
	pub fn is_validation_error(&self) -> bool {
		!matches!(
			self,
			Error::Unauthorized | Error::NotFound | Error::Backend(_) | Error::ExternalServiceFailure(_)
		)
	}
}
