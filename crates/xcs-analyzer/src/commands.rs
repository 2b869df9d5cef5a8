use async_trait::async_trait;
use cancellation::CancellationToken;
use std::sync::Arc;
use thiserror::Error;

pub(crate) mod compile;
pub(crate) mod dev;
pub(crate) mod lsp_server;

/// Defines a command invocation error.
#[derive(Error, Debug)]
pub enum CommandInvocationError {
	/// The command was cancelled.
	#[error("The command was cancelled.")]
	Cancelled,

	/// The self-test detected a failing scenario.
	#[error("The self-test failed.")]
	SelfTestFailed,

	/// An unexpected error.
	#[error("An unexpected error occurred executing the command.")]
	Unknown,
}

/// An XCS Analyzer command.
#[async_trait]
pub(crate) trait Command {
	/// Runs the command.
	async fn run(&self, cancel_token: Arc<CancellationToken>) -> Result<(), CommandInvocationError>;
}
