//! A state machine that models the Language Server Protocol lifecycle.
//!
//! The server's lifecycle is managed fully by the client: the machine transitions
//! through its states based on the requests received, and answers requests that
//! are invalid for the current state with an appropriate error response.

use crate::json_rpc::{from_json, message::*, DeserializeError, ErrorCode};
use crate::tracing::TraceValueAccessor;
use crate::uri;
use crate::workspace::WorkspaceManager;
use thiserror::Error;
use xcs_abstractions::lsp_types::{
	CompletionOptions, CompletionParams, CompletionResponse, DidChangeTextDocumentParams,
	DidChangeWatchedFilesParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams, FileChangeType,
	HoverParams, InitializeParams, InitializeResult, ServerCapabilities, ServerInfo, SetTraceParams,
	TextDocumentSyncCapability, TextDocumentSyncKind,
};
use xcs_abstractions::tracing::{error, info};

/// Represents the valid states of a [`ProtocolMachine`].
#[derive(Debug, PartialEq, PartialOrd, Copy, Clone)]
pub enum ProtocolState {
	/// The machine is active, but has not yet received an initialization request.
	ActiveUninitialized,

	/// The machine is currently processing an initialization request.
	Initializing,

	/// The machine is active and ready to process requests.
	ActiveInitialized,

	/// The machine is currently processing a shutdown request.
	ShuttingDown,

	/// The machine has shutdown and will no longer process requests.
	Stopped,
}

/// Represents an error in protocol while processing a received client message.
#[derive(Error, Debug)]
pub enum ProtocolError {
	/// The received request was not expected.
	#[error("The received request was not expected.")]
	UnexpectedRequest,

	/// The received request was malformed or invalid.
	#[error("The received request was malformed or invalid.")]
	BadRequest(#[from] DeserializeError),
}

pub struct ProtocolMachine {
	pub(crate) current_state: ProtocolState,
	workspace: WorkspaceManager,
	trace_value: Option<TraceValueAccessor>,
}

impl ProtocolMachine {
	/// Initializes a new [`ProtocolMachine`] in the
	/// [`ProtocolState::ActiveUninitialized`] state.
	pub fn new(workspace: WorkspaceManager, trace_value: Option<TraceValueAccessor>) -> Self {
		ProtocolMachine { current_state: ProtocolState::ActiveUninitialized, workspace, trace_value }
	}

	/// Returns `true` while the machine has not stopped.
	pub fn is_active(&self) -> bool { self.current_state != ProtocolState::Stopped }

	/// Processes a [`Message`] for the current state, returning an optional
	/// response message.
	pub async fn process_message(&mut self, message: &Message) -> Result<Option<Message>, ProtocolError> {
		let previous_state = self.current_state;
		let result = match self.current_state {
			ProtocolState::ActiveUninitialized => self.on_active_uninitialized(message).await,
			ProtocolState::Initializing => self.on_initializing(message).await,
			ProtocolState::ActiveInitialized => self.on_active_initialized(message).await,
			ProtocolState::ShuttingDown => self.on_shutting_down(message).await,
			// No messages are expected once stopped.
			ProtocolState::Stopped => Err(ProtocolError::UnexpectedRequest),
		};

		// On a protocol error before full initialization, fall back to the prior state.
		if result.is_err() && previous_state < ProtocolState::ActiveInitialized {
			self.current_state = previous_state;
		}

		result
	}

	async fn on_active_uninitialized(&mut self, message: &Message) -> Result<Option<Message>, ProtocolError> {
		match message {
			Message::Notification(notification) if notification.is("exit") => self.stop(),

			Message::Request(request) if request.is("initialize") => {
				info!("Received 'initialize' request. Server is now initializing.");
				self.current_state = ProtocolState::Initializing;

				let params = from_json::<InitializeParams>("InitializeParams", &request.params)?;
				self.adopt_workspace_root(&params);

				let result = InitializeResult {
					capabilities: ServerCapabilities {
						text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::FULL)),
						hover_provider: Some(true.into()),
						completion_provider: Some(CompletionOptions {
							resolve_provider: Some(true),
							..CompletionOptions::default()
						}),
						..ServerCapabilities::default()
					},
					server_info: Some(ServerInfo {
						name: String::from("xcs-analyzer"),
						version: Some(String::from(env!("CARGO_PKG_VERSION"))),
					}),
				};

				Ok(Some(Message::Response(Response::new(request.id.clone(), result))))
			}

			Message::Request(request) => {
				error!("Received '{}' request before initialization.", request.method);
				Ok(Some(Message::Response(Response::new_error(
					request.id.clone(),
					ErrorCode::ServerNotInitialized as i32,
					"An 'initialize' request is required.",
				))))
			}

			Message::Notification(notification) => {
				info!("Received '{}' notification. Ignoring.", notification.method);
				Ok(None)
			}

			_ => Err(ProtocolError::UnexpectedRequest),
		}
	}

	async fn on_initializing(&mut self, message: &Message) -> Result<Option<Message>, ProtocolError> {
		match message {
			Message::Notification(notification) if notification.is("exit") => self.stop(),

			Message::Notification(notification) if notification.is("initialized") => {
				info!("Received 'initialized' notification. Server is ready for document synchronization.");
				self.current_state = ProtocolState::ActiveInitialized;

				// Pick up the source files that already exist in the workspace.
				self.workspace.index().await;
				Ok(None)
			}

			Message::Request(request) => {
				error!("Received '{}' request while initializing.", request.method);
				Ok(Some(Message::Response(Response::new_error(
					request.id.clone(),
					ErrorCode::ServerNotInitialized as i32,
					"The server is currently initializing.",
				))))
			}

			Message::Notification(notification) => {
				info!("Received '{}' notification. Ignoring.", notification.method);
				Ok(None)
			}

			_ => Err(ProtocolError::UnexpectedRequest),
		}
	}

	async fn on_active_initialized(&mut self, message: &Message) -> Result<Option<Message>, ProtocolError> {
		match message {
			Message::Notification(notification) if notification.is("exit") => self.stop(),

			Message::Request(request) if request.is("shutdown") => {
				info!("Received 'shutdown' request. Server is now shutting down.");
				self.current_state = ProtocolState::ShuttingDown;
				Ok(Some(Message::Response(Response::new(request.id.clone(), serde_json::Value::Null))))
			}

			Message::Notification(notification) if notification.is("textDocument/didOpen") => {
				let params = from_json::<DidOpenTextDocumentParams>("DidOpenTextDocumentParams", &notification.params)?;
				let path = uri::to_local_path(&params.text_document.uri);

				info!(path = %path.display(), version = params.text_document.version, "Document opened.");
				self.workspace.document_changed(path, params.text_document.text);
				Ok(None)
			}

			Message::Notification(notification) if notification.is("textDocument/didChange") => {
				let params =
					from_json::<DidChangeTextDocumentParams>("DidChangeTextDocumentParams", &notification.params)?;
				let path = uri::to_local_path(&params.text_document.uri);

				// Full document synchronization: the last change carries the text.
				if let Some(change) = params.content_changes.into_iter().last() {
					self.workspace.document_changed(path, change.text);
				}
				Ok(None)
			}

			Message::Notification(notification) if notification.is("textDocument/didClose") => {
				let params =
					from_json::<DidCloseTextDocumentParams>("DidCloseTextDocumentParams", &notification.params)?;
				self.workspace.document_closed(&uri::to_local_path(&params.text_document.uri));
				Ok(None)
			}

			Message::Notification(notification) if notification.is("workspace/didChangeWatchedFiles") => {
				let params =
					from_json::<DidChangeWatchedFilesParams>("DidChangeWatchedFilesParams", &notification.params)?;

				for change in params.changes {
					let path = uri::to_local_path(&change.uri);
					if change.typ == FileChangeType::DELETED {
						self.workspace.document_removed(path).await;
					} else {
						self.workspace.file_touched(path);
					}
				}
				Ok(None)
			}

			Message::Notification(notification) if notification.is("$/setTrace") => {
				let params = from_json::<SetTraceParams>("SetTraceParams", &notification.params)?;
				if let Some(trace_value) = &self.trace_value {
					trace_value.set(params.value);
				}
				Ok(None)
			}

			Message::Request(request) if request.is("textDocument/completion") => {
				let params = from_json::<CompletionParams>("CompletionParams", &request.params)?;
				let position = params.text_document_position.position;
				let path = uri::to_local_path(&params.text_document_position.text_document.uri);

				let items = self.workspace.completions(&path, position).await;
				Ok(Some(Message::Response(Response::new(request.id.clone(), CompletionResponse::Array(items)))))
			}

			Message::Request(request) if request.is("completionItem/resolve") => {
				// Nothing to add; resolution echoes the item.
				Ok(Some(Message::Response(Response::new(request.id.clone(), request.params.clone()))))
			}

			Message::Request(request) if request.is("textDocument/hover") => {
				let params = from_json::<HoverParams>("HoverParams", &request.params)?;
				let position = params.text_document_position_params.position;
				let path = uri::to_local_path(&params.text_document_position_params.text_document.uri);

				let hover = self.workspace.hover(&path, position).await;
				Ok(Some(Message::Response(Response::new(request.id.clone(), hover))))
			}

			Message::Notification(notification) => {
				info!("Received '{}' notification. Ignoring.", notification.method);
				Ok(None)
			}

			_ => Err(ProtocolError::UnexpectedRequest),
		}
	}

	async fn on_shutting_down(&mut self, message: &Message) -> Result<Option<Message>, ProtocolError> {
		match message {
			Message::Notification(notification) if notification.is("exit") => self.stop(),

			Message::Request(request) => {
				error!("Received '{}' request while shutting down.", request.method);
				Ok(Some(Message::Response(Response::new_error(
					request.id.clone(),
					ErrorCode::InvalidRequest as i32,
					"The server is currently shutting down.",
				))))
			}

			Message::Notification(notification) => {
				info!("Received '{}' notification. Ignoring.", notification.method);
				Ok(None)
			}

			_ => Err(ProtocolError::UnexpectedRequest),
		}
	}

	fn stop(&mut self) -> Result<Option<Message>, ProtocolError> {
		info!("Received 'exit' notification. Server is now stopping.");
		self.current_state = ProtocolState::Stopped;
		Ok(None)
	}

	fn adopt_workspace_root(&self, params: &InitializeParams) {
		let root = params
			.workspace_folders
			.as_ref()
			.and_then(|folders| folders.first())
			.map(|folder| uri::to_local_path(&folder.uri))
			.or_else(|| params.root_uri.as_ref().map(uri::to_local_path));

		if let Some(root) = root {
			self.workspace.set_root_if_unset(root);
		}
	}
}
