//! Connects the `stdin` and `stdout` of the process to [`MessageChannel`]
//! instances, marshalling framed [`Message`] values between them on dedicated
//! threads.

use async_channel::{Receiver, SendError, Sender};
use cancellation::{CancellationToken, OperationCanceled};
use std::{
	io::{stdin, stdout},
	sync::Arc,
};
use tokio::task;
use xcs_host::{
	json_rpc::{
		message::{Message, Response},
		ErrorCode,
	},
	MessageChannel,
};

pub struct ConsoleDriver {
	stdin_channel: MessageChannel,
	stdout_channel: MessageChannel,
}

impl ConsoleDriver {
	/// Initializes a new [`ConsoleDriver`] instance.
	pub fn new() -> Self {
		ConsoleDriver {
			stdin_channel: async_channel::unbounded::<Message>(),
			stdout_channel: async_channel::unbounded::<Message>(),
		}
	}

	/// Retrieves a [`MessageChannel`] from which [`Message`] instances can be
	/// received from (`stdin`) and sent to (`stdout`).
	pub fn get_message_channel(&self) -> MessageChannel {
		let (sender, _) = self.stdout_channel.clone();
		let (_, receiver) = self.stdin_channel.clone();

		(sender, receiver)
	}

	/// Feeds a message in as if it had arrived on `stdin`. Used by tests.
	#[allow(dead_code)]
	pub async fn send_message_in(&self, message: Message) -> Result<(), SendError<Message>> {
		let (sender, _) = self.stdin_channel.clone();
		sender.send(message).await
	}

	fn reader_task(sender: Sender<Message>, error_sender: Sender<Message>) {
		loop {
			match Message::read(&mut stdin().lock()) {
				Ok(Some(message)) => {
					if sender.send_blocking(message).is_err() {
						break;
					}
				}
				Ok(None) => break,
				Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
					// The framing layer could not parse the payload; answer with a
					// JSON-RPC parse error. The stream is unrecoverable after this.
					let response = Response::new_error(0.into(), ErrorCode::ParseError as i32, &err.to_string());
					let _ = error_sender.send_blocking(Message::Response(response));
					break;
				}
				Err(_) => break,
			}
		}
	}

	fn writer_task(receiver: Receiver<Message>) {
		while let Ok(message) = receiver.recv_blocking() {
			if message.write(&mut stdout().lock()).is_err() {
				break;
			}
		}
	}

	/// Starts executing the [`ConsoleDriver`] instance.
	pub async fn start(&self, cancel_token: Arc<CancellationToken>) -> Result<(), OperationCanceled> {
		let (sender, _) = self.stdin_channel.clone();
		let (error_sender, _) = self.stdout_channel.clone();
		let (_, receiver) = self.stdout_channel.clone();

		std::thread::spawn(move || Self::reader_task(sender, error_sender));
		let writer_task = std::thread::spawn(move || Self::writer_task(receiver));

		let (sender, _) = self.stdin_channel.clone();
		let (_, receiver) = self.stdout_channel.clone();

		// Joining the writer thread would block the async executor; move the join
		// into a blocking task.
		task::spawn_blocking(move || {
			cancel_token.run(
				|| {
					sender.close();
					receiver.close();
				},
				|| {
					writer_task.join().unwrap_or_default();

					match cancel_token.is_canceled() {
						true => Err(OperationCanceled),
						_ => Ok(()),
					}
				},
			)
		})
		.await
		.unwrap_or(Err(OperationCanceled))
	}
}
