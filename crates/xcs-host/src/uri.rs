//! URI ↔ local path conversion.
//!
//! IDE clients are inconsistent about `file:` URIs, particularly on Windows, where
//! paths arrive as `/C:/…`, occasionally with an accidentally doubled drive
//! prefix. The conversions here normalize all of those shapes.

use std::path::{Path, PathBuf};
use xcs_abstractions::lsp_types::Url;

/// Converts a document URI to a local path.
pub fn to_local_path(uri: &Url) -> PathBuf { parse_local_path(uri.as_str()) }

/// Converts a URI string to a local path: strips the scheme, percent-decodes,
/// fixes `/C:` drive forms, and dedupes a doubled drive prefix by keeping the
/// substring starting at the last `:\`.
pub fn parse_local_path(uri: &str) -> PathBuf {
	let stripped = uri
		.strip_prefix("file://")
		.or_else(|| uri.strip_prefix("file:"))
		.unwrap_or(uri);

	let mut path = percent_decode(stripped);

	// `/C:/…` means `C:/…`.
	if starts_with_slashed_drive(&path) {
		path.remove(0);
	}

	// A doubled drive prefix such as `C:\a\C:\b` keeps the last drive.
	if let Some(index) = path.rfind(":\\") {
		if index >= 1 {
			path = path[index - 1..].to_string();
		}
	}

	PathBuf::from(path)
}

/// Converts a local path back to a `file://` URI: `\` becomes `/`, a drive letter
/// gains a leading `/`.
pub fn to_uri(path: &Path) -> Option<Url> {
	let mut text = path.to_string_lossy().replace('\\', "/");

	if starts_with_drive(&text) {
		text.insert(0, '/');
	}

	Url::parse(&format!("file://{text}")).ok()
}

fn starts_with_drive(path: &str) -> bool {
	let bytes = path.as_bytes();
	bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

fn starts_with_slashed_drive(path: &str) -> bool {
	let bytes = path.as_bytes();
	bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':'
}

fn percent_decode(text: &str) -> String {
	fn hex_value(b: u8) -> Option<u8> {
		match b {
			b'0'..=b'9' => Some(b - b'0'),
			b'a'..=b'f' => Some(b - b'a' + 10),
			b'A'..=b'F' => Some(b - b'A' + 10),
			_ => None,
		}
	}

	let bytes = text.as_bytes();
	let mut decoded = Vec::with_capacity(bytes.len());
	let mut i = 0;

	while i < bytes.len() {
		if bytes[i] == b'%' && i + 2 < bytes.len() {
			if let (Some(high), Some(low)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
				decoded.push(high * 16 + low);
				i += 3;
				continue;
			}
		}
		decoded.push(bytes[i]);
		i += 1;
	}

	String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn plain_unix_uri() {
		assert_eq!(parse_local_path("file:///home/user/app.xcs"), PathBuf::from("/home/user/app.xcs"));
	}

	#[test]
	fn percent_encoded_spaces_are_decoded() {
		assert_eq!(parse_local_path("file:///tmp/my%20dir/a.xcs"), PathBuf::from("/tmp/my dir/a.xcs"));
	}

	#[test]
	fn windows_drive_prefix_is_fixed() {
		assert_eq!(parse_local_path("file:///C:/src/App.xcs"), PathBuf::from("C:/src/App.xcs"));
	}

	#[test]
	fn doubled_drive_prefix_keeps_the_last() {
		assert_eq!(parse_local_path(r"C:\repo\C:\repo\App.xcs"), PathBuf::from(r"C:\repo\App.xcs"));
	}

	#[test]
	fn scheme_without_slashes_is_accepted() {
		assert_eq!(parse_local_path("file:/tmp/a.xcs"), PathBuf::from("/tmp/a.xcs"));
	}

	#[test]
	fn round_trip_through_a_url() {
		let uri = to_uri(Path::new("/tmp/sample dir/a.xcs")).unwrap();
		assert_eq!(to_local_path(&uri), PathBuf::from("/tmp/sample dir/a.xcs"));
	}

	#[test]
	fn windows_path_gains_a_slash_and_forward_slashes() {
		let uri = to_uri(Path::new(r"C:\src\App.xcs")).unwrap();
		assert!(uri.as_str().starts_with("file:///C:/"));
	}
}
