//! The native file system used by the command line and the LSP server.

use async_trait::async_trait;
use glob::Pattern;
use std::path::Path;
use walkdir::WalkDir;
use xcs_abstractions::{
	fs::EnumerableFileSystem,
	lsp_types::{TextDocumentIdentifier, Url},
};
use xcs_core::GENERATED_DIR;
use xcs_host::uri;

/// An [`EnumerableFileSystem`] over the local disk. Derived files are written
/// atomically (write to a temporary sibling, then rename).
pub struct NativeFileSystem;

#[async_trait]
impl EnumerableFileSystem for NativeFileSystem {
	async fn enumerate_folder(&self, folder_uri: Url, file_pattern: String) -> Vec<TextDocumentIdentifier> {
		let folder = uri::to_local_path(&folder_uri);
		let pattern = Pattern::new(&file_pattern).ok();

		tokio::task::spawn_blocking(move || {
			WalkDir::new(&folder)
				.into_iter()
				.filter_entry(|entry| entry.file_name() != GENERATED_DIR)
				.filter_map(Result::ok)
				.filter(|entry| entry.file_type().is_file())
				.filter(|entry| {
					let relative = entry.path().strip_prefix(&folder).unwrap_or(entry.path());
					pattern.as_ref().map(|p| p.matches_path(relative)).unwrap_or(true)
				})
				.filter_map(|entry| uri::to_uri(entry.path()))
				.map(|uri| TextDocumentIdentifier { uri })
				.collect()
		})
		.await
		.unwrap_or_default()
	}

	async fn file_contents(&self, file_uri: Url) -> Option<String> {
		tokio::fs::read_to_string(uri::to_local_path(&file_uri)).await.ok()
	}

	async fn write_file(&self, file_uri: Url, contents: String) -> std::io::Result<()> {
		let target = uri::to_local_path(&file_uri);

		if let Some(parent) = target.parent() {
			tokio::fs::create_dir_all(parent).await?;
		}

		let temporary = temporary_sibling(&target);
		tokio::fs::write(&temporary, contents).await?;
		tokio::fs::rename(&temporary, &target).await
	}

	async fn remove_file(&self, file_uri: Url) -> std::io::Result<()> {
		match tokio::fs::remove_file(uri::to_local_path(&file_uri)).await {
			Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err),
			_ => Ok(()),
		}
	}
}

fn temporary_sibling(target: &Path) -> std::path::PathBuf {
	let mut name = target.file_name().map(|n| n.to_os_string()).unwrap_or_default();
	name.push(".tmp");
	target.with_file_name(name)
}
