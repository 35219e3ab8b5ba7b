//! HTTP response streaming with an optional filter transform and the
//! samtools external-tool pipe.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::Error;

/// A contiguous byte range within an on-disk file.
pub struct SectionReader {
	pub path: PathBuf,
	pub offset: u64,
	pub length: u64,
}

/// Wraps a reader to transform its bytes (e.g. a decompressing or
/// record-filtering pass). Filters may change the total size, which is why
/// content-length is only sent when none is active.
pub trait Filter {
	fn wrap<'a>(&self, reader: Box<dyn Read + 'a>) -> Box<dyn Read + 'a>;
}

pub struct StreamSpec<'a> {
	pub sections: Vec<SectionReader>,
	pub content_type: String,
	pub filename: String,
	pub total_size: Option<u64>,
	pub filter: Option<&'a dyn Filter>,
}

pub struct StreamHeaders {
	pub content_type: String,
	pub content_disposition: String,
	pub content_length: Option<u64>,
}

pub struct Streamer;

impl Streamer {
	pub fn headers(spec: &StreamSpec) -> StreamHeaders {
		StreamHeaders {
			content_type: spec.content_type.clone(),
			content_disposition: format!("attachment; filename={}", spec.filename),
			content_length: if spec.filter.is_none() {
				spec.total_size
			} else {
				None
			},
		}
	}

	/// Concatenates each section, through the optional filter, into
	/// `writer`. Any I/O error aborts the stream.
	pub fn write_body<W: Write>(spec: &StreamSpec, mut writer: W) -> Result<(), Error> {
		for section in &spec.sections {
			let mut file = File::open(&section.path)?;
			file.seek(SeekFrom::Start(section.offset))?;
			let bounded: Box<dyn Read> = Box::new((&mut file).take(section.length));
			let mut reader = match spec.filter {
				Some(f) => f.wrap(bounded),
				None => bounded,
			};
			std::io::copy(&mut reader, &mut writer)?;
		}
		Ok(())
	}
}

/// The fixed samtools query-key to flag mapping.
pub const SAMTOOLS_FLAGS: &[(&str, &str, bool)] = &[
	("head", "-h", false),
	("headonly", "-H", false),
	("count", "-c", false),
	("flag", "-f", true),
	("lib", "-l", true),
	("mapq", "-q", true),
	("readgroup", "-r", true),
];

pub fn build_samtools_args(
	query: &BTreeMap<String, String>,
	bam_path: &Path,
	region: Option<&str>,
) -> Result<Vec<String>, Error> {
	let mut args = Vec::new();
	for (key, flag, has_value) in SAMTOOLS_FLAGS {
		if let Some(v) = query.get(*key) {
			if *has_value {
				if v.is_empty() {
					return Err(Error::MissingRequiredParam(format!(
						"{} requires a non-empty value",
						key
					)));
				}
				args.push((*flag).to_string());
				args.push(v.clone());
			} else {
				args.push((*flag).to_string());
			}
		}
	}
	args.push(bam_path.to_string_lossy().into_owned());
	if let Some(r) = region {
		args.push(r.to_string());
	}
	Ok(args)
}

/// The BAM index lifecycle around a samtools invocation: loaded before the
/// process starts, unloaded after `wait` returns regardless of exit status.
pub trait BamIndex {
	fn load(&self, bam_path: &Path) -> Result<(), Error>;
	fn unload(&self, bam_path: &Path);
}

/// Verifies the co-located `.bai` file is present; samtools itself reads
/// the index bytes.
pub struct FileBamIndex;

impl BamIndex for FileBamIndex {
	fn load(&self, bam_path: &Path) -> Result<(), Error> {
		let bai = bam_path.with_extension("bam.bai");
		let bai = if bai.exists() {
			bai
		} else {
			PathBuf::from(format!("{}.bai", bam_path.display()))
		};
		if !bai.exists() {
			return Err(Error::ExternalServiceFailure(format!(
				"no BAM index found alongside {}",
				bam_path.display()
			)));
		}
		Ok(())
	}

	fn unload(&self, _bam_path: &Path) {}
}

/// Invokes `samtools view` with the translated flag set, piping stdout into
/// `writer`.
pub fn stream_samtools<W: Write>(
	samtools_path: &str,
	bam_path: &Path,
	query: &BTreeMap<String, String>,
	region: Option<&str>,
	index: &dyn BamIndex,
	mut writer: W,
) -> Result<(), Error> {
	index.load(bam_path)?;

	let result = (|| -> Result<(), Error> {
		let args = build_samtools_args(query, bam_path, region)?;
		let mut child = Command::new(samtools_path)
			.arg("view")
			.args(&args)
			.stdout(Stdio::piped())
			.spawn()?;
		let mut stdout = child
			.stdout
			.take()
			.ok_or_else(|| Error::ExternalServiceFailure("samtools produced no stdout".into()))?;
		std::io::copy(&mut stdout, &mut writer)?;
		let status = child.wait()?;
		if !status.success() {
			return Err(Error::ExternalServiceFailure(format!(
				"samtools exited with status {}",
				status
			)));
		}
		Ok(())
	})();

	index.unload(bam_path);
	result
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flag_mapping_translates_valued_and_bare_keys() {
		let mut q = BTreeMap::new();
		q.insert("head".to_string(), String::new());
		q.insert("flag".to_string(), "4".to_string());
		let args = build_samtools_args(&q, Path::new("/data/x.bam"), None).unwrap();
		assert!(args.contains(&"-h".to_string()));
		assert!(args.contains(&"-f".to_string()));
		assert!(args.contains(&"4".to_string()));
		assert_eq!(args.last().unwrap(), "/data/x.bam");
	}

	#[test]
	fn valued_flag_rejects_empty_value() {
		let mut q = BTreeMap::new();
		q.insert("flag".to_string(), String::new());
		let err = build_samtools_args(&q, Path::new("/data/x.bam"), None).unwrap_err();
		assert!(matches!(err, Error::MissingRequiredParam(_)));
	}

	#[test]
	fn region_appended_after_path() {
		let q = BTreeMap::new();
		let args = build_samtools_args(&q, Path::new("/data/x.bam"), Some("chr1:1-100")).unwrap();
		assert_eq!(args, vec!["/data/x.bam".to_string(), "chr1:1-100".to_string()]);
	}

	#[test]
	fn headers_omit_content_length_when_filter_present() {
		struct Noop;
		impl Filter for Noop {
			fn wrap<'a>(&self, reader: Box<dyn Read + 'a>) -> Box<dyn Read + 'a> {
				reader
			}
		}
		let f = Noop;
		let spec = StreamSpec {
			sections: Vec::new(),
			content_type: "application/octet-stream".into(),
			filename: "x.bam".into(),
			total_size: Some(100),
			filter: Some(&f),
		};
		let headers = Streamer::headers(&spec);
		assert_eq!(headers.content_length, None);
		assert_eq!(headers.content_disposition, "attachment; filename=x.bam");
	}

	#[test]
	fn headers_include_content_length_without_filter() {
		let spec = StreamSpec {
			sections: Vec::new(),
			content_type: "application/octet-stream".into(),
			filename: "x.bam".into(),
			total_size: Some(100),
			filter: None,
		};
		let headers = Streamer::headers(&spec);
		assert_eq!(headers.content_length, Some(100));
	}
}
