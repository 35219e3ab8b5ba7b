//! `GET /node/{id}?download[&<filter>][&region=<r>]`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use hyper::{Body, Response, StatusCode};

use shock_model::streamer::{stream_samtools, FileBamIndex, SectionReader, StreamSpec, Streamer};
use shock_model::{NodeStore, User};
use shock_util::config::Config;
use shock_util::data::Uuid;

use crate::error::Error;

const SAMTOOLS_QUERY_KEYS: [&str; 7] = ["head", "headonly", "count", "flag", "lib", "mapq", "readgroup"];

pub async fn handle_download_node(
	store: &NodeStore,
	config: &Config,
	user: &User,
	id: &Uuid,
	query: &BTreeMap<String, String>,
) -> Result<Response<Body>, Error> {
	let node = store.load(id, &user.uuid)?;
	if !node.file.has_file() || node.file.is_virtual {
		return Err(Error::BadRequest(
			"node has no downloadable primary file".into(),
		));
	}
	let path = PathBuf::from(&node.file.path);

	let wants_samtools = node.tags.iter().any(|t| t == "bam")
		&& SAMTOOLS_QUERY_KEYS.iter().any(|k| query.contains_key(*k));

	if wants_samtools {
		let region = query.get("region").map(|s| s.as_str());
		let mut buf = Vec::new();
		stream_samtools(&config.samtools_path, &path, query, region, &FileBamIndex, &mut buf)?;
		return Ok(Response::builder()
			.status(StatusCode::OK)
			.header(hyper::header::CONTENT_TYPE, "application/octet-stream")
			.header(
				hyper::header::CONTENT_DISPOSITION,
				format!("attachment; filename={}", node.file.name),
			)
			.body(Body::from(buf))?);
	}

	let spec = StreamSpec {
		sections: vec![SectionReader {
			path: path.clone(),
			offset: 0,
			length: node.file.size,
		}],
		content_type: "application/octet-stream".to_string(),
		filename: node.file.name.clone(),
		total_size: Some(node.file.size),
		filter: None,
	};
	let headers = Streamer::headers(&spec);
	let mut buf = Vec::new();
	Streamer::write_body(&spec, &mut buf)?;

	let mut builder = Response::builder()
		.status(StatusCode::OK)
		.header(hyper::header::CONTENT_TYPE, headers.content_type)
		.header(hyper::header::CONTENT_DISPOSITION, headers.content_disposition);
	if let Some(len) = headers.content_length {
		builder = builder.header(hyper::header::CONTENT_LENGTH, len);
	}
	Ok(builder.body(Body::from(buf))?)
}
