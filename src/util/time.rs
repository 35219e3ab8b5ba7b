//! Fixed, locale-independent timestamp formatting, in the `UnixDate`-style
//! layout (`Mon Jan _2 15:04:05 MST 2006`) used for `created_on` and
//! `last_modified`, so downstream consumers parsing the field have a stable
//! shape to rely on.

use chrono::Utc;

const UNIX_DATE_FMT: &str = "%a %b %e %H:%M:%S UTC %Y";

/// The current instant, in the fixed textual form used for
/// `Node::created_on` / `Node::last_modified`.
pub fn now_string() -> String {
	Utc::now().format(UNIX_DATE_FMT).to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn now_string_is_stable_shape() {
		let s = now_string();
		// "Mon Jan  2 15:04:05 UTC 2026"
		let parts: Vec<&str> = s.split_whitespace().collect();
		assert_eq!(parts.len(), 6);
		assert_eq!(parts[4], "UTC");
	}
}
