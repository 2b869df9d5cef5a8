use crate::commands::{Command, CommandInvocationError};
use crate::native_fs::NativeFileSystem;
use async_trait::async_trait;
use cancellation::CancellationToken;
use std::{path::PathBuf, sync::Arc};
use xcs_abstractions::tracing::info;
use xcs_host::workspace::WorkspaceManager;

/// The one-shot command: transform every source file beneath the workspace root
/// and write the derived files.
pub struct CompileCommand {
	workspace_root: PathBuf,
}

impl CompileCommand {
	/// Initializes a new [`CompileCommand`] for a workspace root.
	pub fn new(workspace_root: PathBuf) -> Self { CompileCommand { workspace_root } }
}

#[async_trait]
impl Command for CompileCommand {
	async fn run(&self, cancel_token: Arc<CancellationToken>) -> Result<(), CommandInvocationError> {
		// Nothing consumes notifications in one-shot mode; the channel is closed
		// immediately and sends are simply ignored.
		let (outbound, _) = async_channel::unbounded();

		let workspace =
			WorkspaceManager::new(Box::new(NativeFileSystem), outbound, Some(self.workspace_root.clone()));

		let transformed = workspace.compile_all().await;

		if cancel_token.is_canceled() {
			return Err(CommandInvocationError::Cancelled);
		}

		info!(count = transformed, "Workspace compiled.");
		println!("Transformed {transformed} source file(s) under {}.", self.workspace_root.display());
		Ok(())
	}
}
