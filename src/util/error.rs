//! Crate-wide backend error type: one tagged enum, `#[error(source)]` for
//! anything that already implements `std::error::Error`, and a catch-all
//! `Message` variant for ad-hoc context.

use err_derive::Error;

use shock_db as db;

/// Errors that can occur in the storage/model layer
#[derive(Debug, Error)]
pub enum Error {
	#[error(display = "IO error: {}", _0)]
	Io(#[error(source)] std::io::Error),

	#[error(display = "JSON error: {}", _0)]
	Json(#[error(source)] serde_json::Error),

	#[error(display = "BSON encode error: {}", _0)]
	BsonEncode(#[error(source)] bson::ser::Error),

	#[error(display = "BSON decode error: {}", _0)]
	BsonDecode(#[error(source)] bson::de::Error),

	#[error(display = "Storage backend error: {}", _0)]
	Db(#[error(source)] db::Error),

	#[error(display = "{}", _0)]
	Message(String),
}

impl From<&str> for Error {
	fn from(v: &str) -> Error {
		Error::Message(v.to_string())
	}
}

impl From<String> for Error {
	fn from(v: String) -> Error {
		Error::Message(v)
	}
}

/// Turns a missing value (`None`, or an unrelated `Err`) into a `Message` error,
/// discarding the original error value.
pub trait OkOrMessage {
	type S2;
	fn ok_or_message<M: Into<String>>(self, msg: M) -> Self::S2;
}

impl<T, E> OkOrMessage for Result<T, E> {
	type S2 = Result<T, Error>;
	fn ok_or_message<M: Into<String>>(self, msg: M) -> Result<T, Error> {
		self.map_err(|_| Error::Message(msg.into()))
	}
}

impl<T> OkOrMessage for Option<T> {
	type S2 = Result<T, Error>;
	fn ok_or_message<M: Into<String>>(self, msg: M) -> Result<T, Error> {
		self.ok_or_else(|| Error::Message(msg.into()))
	}
}

/// Prefixes an existing error with additional context, keeping the original
/// message.
pub trait ErrContext {
	type S2;
	fn err_context<M: Into<String>>(self, msg: M) -> Self::S2;
}

impl<T, E> ErrContext for Result<T, E>
where
	E: std::fmt::Display,
{
	type S2 = Result<T, Error>;
	fn err_context<M: Into<String>>(self, msg: M) -> Result<T, Error> {
		self.map_err(|e| Error::Message(format!("{}: {}", msg.into(), e)))
	}
}
