//! Reads error-code suppressions from the project configuration.
//!
//! The nearest ancestor `.csproj` is consulted once per directory; its `<NoWarn>`
//! node is split on `;` and `,`, and numeric entries are normalized to the
//! `CS<digits>` form the downstream compiler uses.

use lazy_static::lazy_static;
use regex::Regex;
use std::{
	collections::{HashMap, HashSet},
	fs,
	path::{Path, PathBuf},
	sync::{Arc, RwLock},
};
use xcs_abstractions::tracing::debug;

lazy_static! {
	static ref NO_WARN: Regex = Regex::new(r"<NoWarn>([^<]*)</NoWarn>").unwrap();
}

/// A cache of suppressed diagnostic codes, keyed by the directory whose project
/// file supplied them.
#[derive(Default)]
pub struct SuppressionIndex {
	cache: RwLock<HashMap<PathBuf, Arc<HashSet<String>>>>,
}

impl SuppressionIndex {
	pub fn new() -> Self { Self::default() }

	/// Returns the suppressed codes that apply to `source_path`, walking parent
	/// folders until a project file is found. The result is cached per folder.
	pub fn suppressed_codes(&self, source_path: &Path) -> Arc<HashSet<String>> {
		for dir in source_path.ancestors().skip(1) {
			if let Some(cached) = self.cache.read().unwrap().get(dir) {
				return cached.clone();
			}

			if let Some(project_file) = find_project_file(dir) {
				let codes: Arc<HashSet<String>> = Arc::new(
					fs::read_to_string(&project_file).map(|xml| parse_no_warn(&xml)).unwrap_or_default(),
				);

				debug!(
					project = %project_file.display(),
					count = codes.len(),
					"Loaded diagnostic suppressions."
				);

				self.cache.write().unwrap().insert(dir.to_path_buf(), codes.clone());
				return codes;
			}
		}

		Arc::new(HashSet::new())
	}
}

fn find_project_file(dir: &Path) -> Option<PathBuf> {
	let entries = fs::read_dir(dir).ok()?;
	for entry in entries.flatten() {
		let path = entry.path();
		if path.extension().map(|e| e == "csproj").unwrap_or(false) {
			return Some(path);
		}
	}
	None
}

/// Extracts the suppressed codes from project XML.
pub fn parse_no_warn(xml: &str) -> HashSet<String> {
	let mut codes = HashSet::new();

	for captures in NO_WARN.captures_iter(xml) {
		for entry in captures[1].split(|c| c == ';' || c == ',') {
			let entry = entry.trim();
			if entry.is_empty() {
				continue;
			}
			if entry.as_bytes()[0].is_ascii_digit() {
				codes.insert(format!("CS{entry}"));
			} else {
				codes.insert(entry.to_string());
			}
		}
	}

	codes
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn no_warn_entries_are_split_and_normalized() {
		let xml = "<Project><PropertyGroup><NoWarn>0168;CS0219, 1591</NoWarn></PropertyGroup></Project>";
		let codes = parse_no_warn(xml);

		let mut sorted: Vec<_> = codes.into_iter().collect();
		sorted.sort();
		assert_eq!(sorted, vec!["CS0168", "CS0219", "CS1591"]);
	}

	#[test]
	fn non_numeric_entries_are_kept_as_is() {
		let codes = parse_no_warn("<NoWarn>NU1701</NoWarn>");
		assert!(codes.contains("NU1701"));
	}

	#[test]
	fn missing_node_means_no_suppressions() {
		assert!(parse_no_warn("<Project></Project>").is_empty());
	}

	#[test]
	fn project_file_is_found_by_walking_parents() {
		let dir = tempfile::tempdir().unwrap();
		let nested = dir.path().join("src").join("Views");
		fs::create_dir_all(&nested).unwrap();
		fs::write(dir.path().join("App.csproj"), "<Project><NoWarn>0168</NoWarn></Project>").unwrap();

		let index = SuppressionIndex::new();
		let codes = index.suppressed_codes(&nested.join("Home.xcs"));
		assert!(codes.contains("CS0168"));

		// Cached on the second call.
		let again = index.suppressed_codes(&nested.join("Other.xcs"));
		assert!(again.contains("CS0168"));
	}
}
