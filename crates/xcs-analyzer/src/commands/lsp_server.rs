use crate::commands::{Command, CommandInvocationError};
use crate::native_fs::NativeFileSystem;
use crate::stdio::ConsoleDriver;
use async_trait::async_trait;
use cancellation::CancellationToken;
use std::{path::PathBuf, sync::Arc};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use xcs_abstractions::tracing::subscriber;
use xcs_host::tracing::{
	tracing_subscriber::{fmt::layer, prelude::*, Registry},
	LspTracingLayer,
};
use xcs_host::{workspace::WorkspaceManager, AnalyzerHost};

/// The command that starts the Language Server Protocol server over stdio.
pub struct LspServerCommand {
	workspace_root: Option<PathBuf>,
	logpath: Option<PathBuf>,
}

impl LspServerCommand {
	/// Initializes a new [`LspServerCommand`] instance.
	pub fn new(workspace_root: Option<PathBuf>, logpath: Option<PathBuf>) -> Self {
		LspServerCommand { workspace_root, logpath }
	}
}

#[async_trait]
impl Command for LspServerCommand {
	/// Runs the command by delegating to an analyzer host over the console.
	async fn run(&self, cancel_token: Arc<CancellationToken>) -> Result<(), CommandInvocationError> {
		let console = ConsoleDriver::new();

		let logpath = self.logpath.clone().unwrap_or_else(|| PathBuf::from("."));
		let trace_appender = RollingFileAppender::new(Rotation::NEVER, logpath, "xcs-analyzer.log");
		let (non_blocking, _guard) = tracing_appender::non_blocking(trace_appender);

		let lsp_layer = LspTracingLayer::new(console.get_message_channel());
		let trace_value = lsp_layer.trace_value();

		let subscriber = Registry::default().with(layer().with_writer(non_blocking)).with(lsp_layer);
		subscriber::set_global_default(subscriber).unwrap_or_default();

		let (sender, receiver) = console.get_message_channel();
		let workspace =
			WorkspaceManager::new(Box::new(NativeFileSystem), sender.clone(), self.workspace_root.clone());
		let host = AnalyzerHost::new((sender, receiver), workspace, Some(trace_value));

		let (close_sender, close_receiver) = console.get_message_channel();
		let host_task = async {
			let result = host.start(cancel_token.clone()).await;

			// Once the protocol machine stops, close the console channels so the
			// console driver winds down as well.
			close_sender.close();
			close_receiver.close();
			result
		};

		match tokio::join!(host_task, console.start(cancel_token.clone())) {
			(Ok(_), Ok(_)) => Ok(()),
			_ => Err(CommandInvocationError::Cancelled),
		}
	}
}
