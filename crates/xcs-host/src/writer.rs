//! Derived-file placement and persistence.

use std::path::{Path, PathBuf};

use xcs_abstractions::{
	fs::AnyEnumerableFileSystem,
	tracing::{error, info},
};
use xcs_core::{DERIVED_EXTENSION, GENERATED_DIR};

use crate::uri;

/// Computes the derived path for a source file:
/// `<root>/Generated/<relative source path>` with the derived extension.
///
/// A source outside `root` falls back to a `Generated` folder next to the file.
pub fn derived_path(root: Option<&Path>, source: &Path) -> PathBuf {
	let file_name = source.file_name().map(Path::new).unwrap_or_else(|| Path::new(""));
	let parent = source.parent().unwrap_or_else(|| Path::new(""));

	let (base, relative): (&Path, &Path) = match root {
		Some(root) => match source.strip_prefix(root) {
			Ok(relative) => (root, relative),
			Err(_) => (parent, file_name),
		},
		None => (parent, file_name),
	};

	let mut path = base.join(GENERATED_DIR).join(relative);
	path.set_extension(DERIVED_EXTENSION);
	path
}

/// Persists derived text through the file-system seam. Failures are logged and
/// reported back so the caller can release the processing gate and retry later.
pub async fn write_derived(
	file_system: &AnyEnumerableFileSystem,
	target: &Path,
	content: &str,
) -> std::io::Result<()> {
	let Some(target_uri) = uri::to_uri(target) else {
		return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "derived path is not representable as a URI"));
	};

	match file_system.write_file(target_uri, content.to_string()).await {
		Ok(()) => {
			info!(target = %target.display(), bytes = content.len(), "Derived file written.");
			Ok(())
		}
		Err(err) => {
			error!(target = %target.display(), error = %err, "Failed to write derived file.");
			Err(err)
		}
	}
}

/// Removes the derived counterpart of a deleted source file.
pub async fn remove_derived(file_system: &AnyEnumerableFileSystem, target: &Path) -> std::io::Result<()> {
	let Some(target_uri) = uri::to_uri(target) else { return Ok(()) };
	file_system.remove_file(target_uri).await
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn derived_path_mirrors_the_relative_layout() {
		let path = derived_path(Some(Path::new("/proj")), Path::new("/proj/src/Views/Home.xcs"));
		assert_eq!(path, PathBuf::from("/proj/Generated/src/Views/Home.cs"));
	}

	#[test]
	fn derived_path_without_a_root_lands_next_to_the_source() {
		let path = derived_path(None, Path::new("/tmp/App.xcs"));
		assert_eq!(path, PathBuf::from("/tmp/Generated/App.cs"));
	}

	#[test]
	fn source_outside_the_root_falls_back_to_its_folder() {
		let path = derived_path(Some(Path::new("/proj")), Path::new("/elsewhere/App.xcs"));
		assert_eq!(path, PathBuf::from("/elsewhere/Generated/App.cs"));
	}
}
