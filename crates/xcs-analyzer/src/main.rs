mod cli;
mod commands;
mod native_fs;
mod stdio;

use cancellation::CancellationTokenSource;
use cli::flags::XcsAnalyzer;
use commands::{compile::CompileCommand, dev::DevCommand, lsp_server::LspServerCommand, Command, CommandInvocationError};
use std::{
	process,
	sync::{
		atomic::{AtomicU8, Ordering},
		Arc,
	},
};
use xcs_host::tracing::tracing_subscriber::{self, fmt::writer::MakeWriterExt, prelude::*};

/// Entry point for the XCS Analyzer.
#[tokio::main]
pub async fn main() {
	let flags = match XcsAnalyzer::from_env() {
		Ok(flags) => flags,
		Err(err) => {
			eprintln!();
			eprintln!("{err}");
			eprintln!();
			process::exit(2);
		}
	};

	if flags.version {
		println!("xcs-analyzer {}", env!("CARGO_PKG_VERSION"));
		return;
	}

	// An invalid workspace is a startup error.
	if let Some(workspace) = &flags.workspace {
		if !workspace.exists() {
			eprintln!("The workspace '{}' does not exist.", workspace.display());
			process::exit(1);
		}
	}

	let command: Box<dyn Command> = if flags.dev {
		install_console_logging(&flags);
		Box::new(DevCommand)
	} else if flags.lsp {
		// The LSP command composes its own subscriber so that trace events can be
		// forwarded to the client.
		Box::new(LspServerCommand::new(flags.workspace.clone(), flags.logpath.clone()))
	} else {
		install_console_logging(&flags);
		let Some(workspace) = flags.workspace.clone() else {
			eprintln!("A '--workspace' path is required to compile.");
			process::exit(1);
		};
		Box::new(CompileCommand::new(workspace))
	};

	match RunnableCommand(command).run().await {
		Ok(()) => {}
		Err(CommandInvocationError::Cancelled) => println!("{}", CommandInvocationError::Cancelled),
		Err(err) => {
			eprintln!("{err}");
			process::exit(1);
		}
	}
}

/// Installs a stderr logging subscriber for the non-LSP commands, plus an
/// optional file appender when `--logpath` names a folder.
fn install_console_logging(flags: &XcsAnalyzer) {
	let level = flags
		.loglevel
		.as_deref()
		.and_then(|l| l.parse::<xcs_abstractions::tracing::Level>().ok())
		.unwrap_or(xcs_abstractions::tracing::Level::INFO);

	let stderr_layer = tracing_subscriber::fmt::layer()
		.with_writer(std::io::stderr.with_max_level(level));

	let registry = tracing_subscriber::registry().with(stderr_layer);

	if let Some(logpath) = &flags.logpath {
		if logpath.is_dir() {
			let appender = tracing_appender::rolling::RollingFileAppender::new(
				tracing_appender::rolling::Rotation::NEVER,
				logpath,
				"xcs-analyzer.log",
			);
			// The guard is intentionally leaked; logging lives for the process.
			let (non_blocking, guard) = tracing_appender::non_blocking(appender);
			std::mem::forget(guard);

			registry.with(tracing_subscriber::fmt::layer().with_writer(non_blocking)).init();
			return;
		}
	}

	registry.init();
}

/// Adapts a [`Command`] and makes it runnable.
///
/// The command is invoked with a cancellation token that is canceled upon a
/// 'Ctrl-C' signal; a second 'Ctrl-C' exits forcibly.
struct RunnableCommand(Box<dyn Command>);

impl RunnableCommand {
	async fn run(&self) -> Result<(), CommandInvocationError> {
		let Self(command) = self;

		let count = Arc::new(AtomicU8::new(0));
		let cancellation_source = CancellationTokenSource::new();
		let cancellation_token = cancellation_source.token().clone();

		let handler_installed = ctrlc::set_handler(move || {
			let previous = count.fetch_add(1, Ordering::Relaxed);

			if previous == 0 {
				eprintln!();
				eprintln!("(To forcibly exit, press 'Ctrl+C' again)");
				cancellation_source.cancel();
			} else {
				process::exit(-1);
			}
		})
		.is_ok();

		if !handler_installed {
			eprintln!("'Ctrl-C' handling is not available for this platform.");
		}

		command.run(cancellation_token).await
	}
}
