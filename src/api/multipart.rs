//! Parses an HTTP multipart form body into the `params`/`files` taxonomy
//! the mutation engine expects: string fields become `params`, file fields
//! are streamed to temporary files and yield `UploadHandle`s with a
//! precomputed MD5.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use hyper::{Body, HeaderMap};
use multer::Multipart;

use shock_model::UploadHandle;
use shock_util::data::{Blake2Accumulator, Md5Accumulator};

use crate::error::Error;

pub struct ParsedForm {
	pub params: BTreeMap<String, String>,
	pub files: BTreeMap<String, UploadHandle>,
}

/// Streams every part of `body` into `params`/`files`. File parts are
/// written to freshly created temporary files under `tmp_dir`; the caller
/// (`NodeEngine::update`) owns moving or deleting them afterwards.
pub async fn parse(headers: &HeaderMap, body: Body, tmp_dir: &std::path::Path) -> Result<ParsedForm, Error> {
	let content_type = headers
		.get(hyper::header::CONTENT_TYPE)
		.and_then(|v| v.to_str().ok())
		.ok_or_else(|| Error::BadRequest("missing Content-Type header".into()))?;
	let boundary = multer::parse_boundary(content_type)
		.map_err(|e| Error::BadRequest(format!("invalid multipart Content-Type: {}", e)))?;

	let mut multipart = Multipart::new(body, boundary);
	let mut params = BTreeMap::new();
	let mut files = BTreeMap::new();

	std::fs::create_dir_all(tmp_dir)?;

	while let Some(mut field) = multipart
		.next_field()
		.await
		.map_err(|e| Error::BadRequest(format!("malformed multipart body: {}", e)))?
	{
		let name = match field.name() {
			Some(n) => n.to_string(),
			None => continue,
		};

		if let Some(file_name) = field.file_name().map(|s| s.to_string()) {
			let temp_path: PathBuf = tmp_dir.join(format!("{}-{}", name, shock_util::data::gen_uuid()));
			let mut out = std::fs::File::create(&temp_path)?;
			let mut md5 = Md5Accumulator::new();
			let mut blake2b = Blake2Accumulator::new();
			let mut size = 0u64;

			while let Some(chunk) = field
				.chunk()
				.await
				.map_err(|e| Error::BadRequest(format!("error reading multipart field {}: {}", name, e)))?
			{
				out.write_all(&chunk)?;
				md5.update(&chunk);
				blake2b.update(&chunk);
				size += chunk.len() as u64;
			}
			out.flush()?;

			files.insert(
				name,
				UploadHandle {
					temp_path,
					name: file_name,
					size,
					md5: md5.finish_hex(),
					blake2b: blake2b.finish_hex(),
				},
			);
		} else {
			let text = field
				.text()
				.await
				.map_err(|e| Error::BadRequest(format!("error reading multipart field {}: {}", name, e)))?;
			params.insert(name, text);
		}
	}

	Ok(ParsedForm { params, files })
}
