use async_trait::async_trait;
use lsp_types::{TextDocumentIdentifier, Url};

/// Provides services that enumerate and manipulate the contents of folders and files.
///
/// The transformation services are written against this trait so that the native file
/// system used by the command line, and the in-memory doubles used by the tests, are
/// interchangeable.
#[async_trait]
pub trait EnumerableFileSystem {
	/// Enumerates the documents beneath `folder_uri` whose relative path matches
	/// `file_pattern`.
	async fn enumerate_folder(&self, folder_uri: Url, file_pattern: String) -> Vec<TextDocumentIdentifier>;

	/// Retrieves the contents of a given file, or [`None`] if it could not be read.
	async fn file_contents(&self, file_uri: Url) -> Option<String>;

	/// Writes `contents` to a given file, creating any missing parent folders.
	async fn write_file(&self, file_uri: Url, contents: String) -> std::io::Result<()>;

	/// Removes a given file. Removing a file that does not exist is not an error.
	async fn remove_file(&self, file_uri: Url) -> std::io::Result<()>;
}

pub type AnyEnumerableFileSystem = Box<dyn EnumerableFileSystem + Send + Sync>;
