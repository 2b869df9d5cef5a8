//! The hosting layer of the XCS Analyzer: JSON-RPC message processing, the LSP
//! protocol state machine, the workspace coordinator, and the ambient services
//! (debouncing, derived-file persistence, diagnostic translation, tracing).

pub mod debounce;
pub mod fsm;
pub mod json_rpc;
pub mod project;
pub mod tracing;
pub mod translate;
pub mod uri;
pub mod workspace;
pub mod writer;

use async_channel::{Receiver, Sender};
use cancellation::{CancellationToken, OperationCanceled};
use fsm::ProtocolMachine;
use json_rpc::message::Message;
use json_rpc::{ErrorCode, RequestId};
use std::sync::Arc;
use tracing::TraceValueAccessor;
use workspace::WorkspaceManager;
use xcs_abstractions::tracing::{error, info};

/// A tuple type that represents both a sender and a receiver of [`Message`] instances.
pub type MessageChannel = (Sender<Message>, Receiver<Message>);

/// Provides a runtime environment for the XCS Analyzer, utilizing services that
/// are provided by the host process.
pub struct AnalyzerHost {
	sender: Sender<Message>,
	receiver: Receiver<Message>,
	workspace: WorkspaceManager,
	trace_value: Option<TraceValueAccessor>,
}

impl AnalyzerHost {
	/// Initializes a new [`AnalyzerHost`] over a [`MessageChannel`] and a
	/// [`WorkspaceManager`].
	///
	/// If available, `trace_value` will be adjusted on receipt of a `'$/setTrace'`
	/// notification from the LSP client.
	pub fn new(
		request_channel: MessageChannel,
		workspace: WorkspaceManager,
		trace_value: Option<TraceValueAccessor>,
	) -> Self {
		let (sender, receiver) = request_channel;
		AnalyzerHost { sender, receiver, workspace, trace_value }
	}

	pub fn workspace(&self) -> &WorkspaceManager { &self.workspace }

	/// Starts executing the [`AnalyzerHost`] instance.
	///
	/// Request messages are received through the message channel, processed by the
	/// protocol state machine, and response messages are sent back through the
	/// channel for the client.
	pub async fn start(&self, cancel_token: Arc<CancellationToken>) -> Result<(), OperationCanceled> {
		info!("AnalyzerHost is starting.");

		let mut protocol_machine = ProtocolMachine::new(self.workspace.clone(), self.trace_value.clone());

		while protocol_machine.is_active() && !cancel_token.is_canceled() {
			let request_message = self.receiver.recv().await;

			if cancel_token.is_canceled() {
				break;
			}

			let message = match request_message {
				Ok(message) => message,
				Err(err) => {
					error!("Unexpected error receiving request: {:?}", err);
					continue;
				}
			};

			let request_id = request_id_of(&message);
			match protocol_machine.process_message(&message).await {
				Ok(Some(response)) => {
					if self.sender.send(response).await.is_err() {
						break;
					}
				}
				Ok(None) => {}
				Err(err) => {
					error!("Protocol error: {}", err);

					// A malformed request still deserves an answer.
					if let Some(id) = request_id {
						let response = json_rpc::message::Response::new_error(
							id,
							ErrorCode::InternalError as i32,
							&err.to_string(),
						);
						if self.sender.send(Message::Response(response)).await.is_err() {
							break;
						}
					}
				}
			}
		}

		info!("AnalyzerHost is stopping.");

		if protocol_machine.is_active() {
			return Err(OperationCanceled);
		}

		Ok(())
	}
}

fn request_id_of(message: &Message) -> Option<RequestId> {
	match message {
		Message::Request(request) => Some(request.id.clone()),
		_ => None,
	}
}
