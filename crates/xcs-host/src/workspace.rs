//! The workspace shadow state and transformation coordinator.
//!
//! Tracks the open buffers and the per-file transformation results, reacts to
//! change and removal events, and owns the debounced per-path transformation
//! tasks. Per-file state is replaced wholesale on every successful transform;
//! readers always see a consistent snapshot behind an `Arc`.

use std::{
	collections::HashMap,
	path::{Path, PathBuf},
	sync::{Arc, RwLock},
};

use async_channel::{Receiver, Sender};
use xcs_abstractions::{
	fs::AnyEnumerableFileSystem,
	lsp_types::{
		CompletionItem, CompletionItemKind, Hover, HoverContents, MarkedString, Position,
		PublishDiagnosticsParams,
	},
	tracing::{info, warn},
};
use xcs_core::{
	ast::{AstNode, ElementNode},
	codegen::pascal_case,
	is_source_path,
	position::LineIndex,
	SourceMapEntry, Transpiler,
};

use crate::debounce::{ChangeScheduler, DEBOUNCE_DELAY};
use crate::json_rpc::message::{Message, Notification};
use crate::project::SuppressionIndex;
use crate::translate::{translate, RawDiagnostic};
use crate::{uri, writer};

/// The glob used when indexing a workspace folder for source files.
pub const RELATIVE_SOURCEFILES_GLOBPATTERN: &str = "**/*.xcs";

/// Tag names always offered by completion, next to the identifiers of the buffer.
pub const WELL_KNOWN_TAGS: &[&str] = &[
	"a", "body", "button", "div", "footer", "form", "h1", "h2", "h3", "head", "header", "html", "img",
	"input", "label", "li", "nav", "ol", "p", "section", "span", "table", "td", "tr", "ul",
];

/// The shadow state of one transformed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
	pub target_path: PathBuf,
	pub transformed_content: String,
	pub source_maps: Vec<SourceMapEntry>,
}

/// Observations emitted by the coordinator, in causal order per path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
	FileTransformed { path: PathBuf },
	FileRemoved { path: PathBuf },
}

/// Manages the workspace opened by an LSP compliant host (or by the one-shot
/// command line).
#[derive(Clone)]
pub struct WorkspaceManager {
	inner: Arc<WorkspaceInner>,
}

struct WorkspaceInner {
	root: RwLock<Option<PathBuf>>,
	transpiler: Transpiler,
	file_system: AnyEnumerableFileSystem,
	buffers: RwLock<HashMap<PathBuf, Arc<String>>>,
	metadata: RwLock<HashMap<PathBuf, Arc<FileMetadata>>>,
	scheduler: ChangeScheduler,
	suppressions: SuppressionIndex,
	outbound: Sender<Message>,
	events: Sender<WorkspaceEvent>,
	events_rx: Receiver<WorkspaceEvent>,
}

impl WorkspaceManager {
	/// Initializes a new [`WorkspaceManager`] over a file system and an outbound
	/// message channel.
	pub fn new(file_system: AnyEnumerableFileSystem, outbound: Sender<Message>, root: Option<PathBuf>) -> Self {
		let (events, events_rx) = async_channel::bounded(256);

		Self {
			inner: Arc::new(WorkspaceInner {
				root: RwLock::new(root),
				transpiler: Transpiler::default(),
				file_system,
				buffers: RwLock::new(HashMap::new()),
				metadata: RwLock::new(HashMap::new()),
				scheduler: ChangeScheduler::new(DEBOUNCE_DELAY),
				suppressions: SuppressionIndex::new(),
				outbound,
				events,
				events_rx,
			}),
		}
	}

	/// A receiver of [`WorkspaceEvent`] observations.
	pub fn events(&self) -> Receiver<WorkspaceEvent> { self.inner.events_rx.clone() }

	pub fn root(&self) -> Option<PathBuf> { self.inner.root.read().unwrap().clone() }

	/// Adopts `root` unless one was already supplied at startup.
	pub fn set_root_if_unset(&self, root: PathBuf) {
		let mut current = self.inner.root.write().unwrap();
		if current.is_none() {
			info!(root = %root.display(), "Workspace root adopted from the client.");
			*current = Some(root);
		}
	}

	/// Retrieves the shadow state of a source file, if it has been transformed.
	pub fn metadata(&self, path: &Path) -> Option<Arc<FileMetadata>> {
		self.inner.metadata.read().unwrap().get(path).cloned()
	}

	/// Handles an opened or changed document: the buffer is updated and a
	/// debounced transformation is scheduled. Paths that are not sources (wrong
	/// extension, or under `Generated/`) are ignored.
	pub fn document_changed(&self, path: PathBuf, content: String) {
		if !is_source_path(&path) {
			return;
		}

		self.inner.buffers.write().unwrap().insert(path.clone(), Arc::new(content));

		let inner = self.inner.clone();
		let work_path = path.clone();
		self.inner.scheduler.schedule(path, move || async move {
			WorkspaceInner::transform_path(inner, work_path).await;
		});
	}

	/// Schedules a transformation for a file that changed on disk without an open
	/// buffer; the content is read through the file system when the debounce
	/// window expires.
	pub fn file_touched(&self, path: PathBuf) {
		if !is_source_path(&path) {
			return;
		}

		let inner = self.inner.clone();
		let work_path = path.clone();
		self.inner.scheduler.schedule(path, move || async move {
			WorkspaceInner::transform_path(inner, work_path).await;
		});
	}

	/// Releases the buffer of a closed document. The derived file remains.
	pub fn document_closed(&self, path: &Path) { self.inner.buffers.write().unwrap().remove(path); }

	/// Handles a source file removed from the workspace: pending work is
	/// cancelled, the shadow state is dropped, and the derived counterpart is
	/// deleted.
	pub async fn document_removed(&self, path: PathBuf) {
		self.inner.scheduler.cancel(&path);
		self.inner.buffers.write().unwrap().remove(&path);

		let removed = self.inner.metadata.write().unwrap().remove(&path);
		let target = removed
			.map(|m| m.target_path.clone())
			.unwrap_or_else(|| writer::derived_path(self.root().as_deref(), &path));

		if let Err(err) = writer::remove_derived(&self.inner.file_system, &target).await {
			warn!(target = %target.display(), error = %err, "Failed to remove derived file.");
		}

		let _ = self.inner.events.try_send(WorkspaceEvent::FileRemoved { path });
	}

	/// Transforms every source file beneath the workspace root, without
	/// debouncing. Returns the number of files transformed.
	pub async fn compile_all(&self) -> usize {
		let Some(root) = self.root() else { return 0 };
		let Some(root_uri) = uri::to_uri(&root) else { return 0 };

		let documents = self
			.inner
			.file_system
			.enumerate_folder(root_uri, String::from(RELATIVE_SOURCEFILES_GLOBPATTERN))
			.await;

		let mut transformed = 0;
		for document in documents {
			let path = uri::to_local_path(&document.uri);
			if !is_source_path(&path) {
				continue;
			}
			WorkspaceInner::transform_path(self.inner.clone(), path).await;
			transformed += 1;
		}

		transformed
	}

	/// Indexes the workspace in the background: existing source files are
	/// scheduled through the ordinary debounced pipeline.
	pub async fn index(&self) {
		let Some(root) = self.root() else { return };
		let Some(root_uri) = uri::to_uri(&root) else { return };

		let documents = self
			.inner
			.file_system
			.enumerate_folder(root_uri, String::from(RELATIVE_SOURCEFILES_GLOBPATTERN))
			.await;

		info!(count = documents.len(), "Workspace indexing complete.");

		for document in documents {
			let path = uri::to_local_path(&document.uri);
			if !is_source_path(&path) {
				continue;
			}

			let inner = self.inner.clone();
			let work_path = path.clone();
			self.inner.scheduler.schedule(path, move || async move {
				WorkspaceInner::transform_path(inner, work_path).await;
			});
		}
	}

	/// Translates downstream-compiler diagnostics into original coordinates and
	/// publishes them per source file.
	pub async fn publish_diagnostics(&self, diagnostics: Vec<RawDiagnostic>) {
		let mut per_source: HashMap<PathBuf, Vec<RawDiagnostic>> = HashMap::new();

		{
			let metadata = self.inner.metadata.read().unwrap();
			for diagnostic in diagnostics {
				let source = metadata
					.iter()
					.find(|(_, meta)| meta.target_path == diagnostic.file)
					.map(|(path, _)| path.clone());

				match source {
					Some(path) => per_source.entry(path).or_default().push(diagnostic),
					None => warn!(file = %diagnostic.file.display(), "Diagnostic for an unknown derived file."),
				}
			}
		}

		for (path, raw) in per_source {
			let Some(metadata) = self.metadata(&path) else { continue };
			let Some(source) = self.source_text(&path).await else { continue };
			let suppressed = self.inner.suppressions.suppressed_codes(&path);

			let translated =
				raw.iter().filter_map(|d| translate(d, &metadata, &source, &suppressed)).collect();
			self.send_diagnostics(&path, translated).await;
		}
	}

	/// Completion items at a cursor: the identifiers of the buffer unioned with
	/// the well-known tag names.
	pub async fn completions(&self, path: &Path, _position: Position) -> Vec<CompletionItem> {
		let Some(text) = self.source_text(path).await else { return Vec::new() };

		let mut items: Vec<CompletionItem> = xcs_core::host::identifiers(&text)
			.into_iter()
			.map(|name| CompletionItem {
				label: name,
				kind: Some(CompletionItemKind::VARIABLE),
				..CompletionItem::default()
			})
			.collect();

		for tag in WELL_KNOWN_TAGS {
			if items.iter().all(|item| item.label != *tag) {
				items.push(CompletionItem {
					label: String::from(*tag),
					kind: Some(CompletionItemKind::CLASS),
					..CompletionItem::default()
				});
			}
		}

		items
	}

	/// A hover preview of the factory call generated for the element under the
	/// cursor.
	pub async fn hover(&self, path: &Path, position: Position) -> Option<Hover> {
		let text = self.source_text(path).await?;
		let offset = LineIndex::new(&text).offset(position);

		let (region_start, region_end) =
			xcs_core::locator::locate(&text).into_iter().find(|&(s, e)| s <= offset && offset < e)?;

		let markup = &text[region_start..region_end];
		let tokens = xcs_core::lexer::lex(markup, 0, true);
		let nodes = xcs_core::builder::build(&tokens, markup, 0);
		let element = element_at(&nodes, offset - region_start)?;

		let preview = format!(
			"{}.{}(\"{}\", new {}Props {{ … }})",
			self.inner.transpiler.factory(),
			self.inner.transpiler.method(),
			element.tag_name,
			pascal_case(&element.tag_name)
		);

		Some(Hover { contents: HoverContents::Scalar(MarkedString::String(preview)), range: None })
	}

	async fn source_text(&self, path: &Path) -> Option<String> {
		if let Some(buffer) = self.inner.buffers.read().unwrap().get(path).cloned() {
			return Some(buffer.as_ref().clone());
		}

		let file_uri = uri::to_uri(path)?;
		self.inner.file_system.file_contents(file_uri).await
	}

	async fn send_diagnostics(&self, path: &Path, diagnostics: Vec<xcs_abstractions::lsp_types::Diagnostic>) {
		self.inner.send_diagnostics(path, diagnostics).await;
	}
}

impl WorkspaceInner {
	/// Transforms one source file end to end: read, weave, write the derived
	/// file, replace the shadow state, publish, and emit the observation.
	async fn transform_path(inner: Arc<WorkspaceInner>, path: PathBuf) {
		let content = {
			let buffered = inner.buffers.read().unwrap().get(&path).cloned();
			match buffered {
				Some(buffer) => buffer.as_ref().clone(),
				None => {
					let Some(file_uri) = uri::to_uri(&path) else { return };
					match inner.file_system.file_contents(file_uri).await {
						Some(contents) => contents,
						None => {
							warn!(path = %path.display(), "Source file could not be read; skipping.");
							return;
						}
					}
				}
			}
		};

		let payload = inner.transpiler.transform_file(&path, &content);
		let root = inner.root.read().unwrap().clone();
		let target = writer::derived_path(root.as_deref(), &path);

		if writer::write_derived(&inner.file_system, &target, &payload.content).await.is_err() {
			// Logged by the writer; the result is discarded so the next change
			// can retry.
			return;
		}

		inner.metadata.write().unwrap().insert(
			path.clone(),
			Arc::new(FileMetadata {
				target_path: target,
				transformed_content: payload.content,
				source_maps: payload.source_maps,
			}),
		);

		// Until the downstream compiler reports in, the file has no diagnostics.
		inner.send_diagnostics(&path, Vec::new()).await;
		let _ = inner.events.try_send(WorkspaceEvent::FileTransformed { path });
	}

	async fn send_diagnostics(&self, path: &Path, diagnostics: Vec<xcs_abstractions::lsp_types::Diagnostic>) {
		let Some(file_uri) = uri::to_uri(path) else { return };
		let params = PublishDiagnosticsParams { uri: file_uri, diagnostics, version: None };
		let notification = Notification::new("textDocument/publishDiagnostics", params);
		let _ = self.outbound.send(Message::Notification(notification)).await;
	}
}

fn element_at<'a>(nodes: &'a [AstNode], offset: usize) -> Option<&'a ElementNode> {
	for node in nodes {
		if !(node.source_start() <= offset && offset < node.source_end()) {
			continue;
		}

		match node {
			AstNode::Element(element) => {
				let inner = element_at(&element.children, offset);
				return inner.or(Some(element));
			}
			AstNode::Expression(expression) => {
				if let Some(element) = element_at(&expression.children, offset) {
					return Some(element);
				}
			}
			AstNode::StringLiteral(_) => {}
		}
	}

	None
}
