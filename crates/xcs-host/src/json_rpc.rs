//! The JSON-RPC dialect spoken with the IDE: `Content-Length` framed messages
//! carrying requests, responses, and notifications.

pub mod message;

use message::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
	fmt,
	io::{self, BufRead, Write},
};

/// A request identifier: the protocol allows both integers and strings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RequestId(IdRepr);

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(untagged)]
enum IdRepr {
	I32(i32),
	String(String),
}

impl From<i32> for RequestId {
	fn from(id: i32) -> RequestId { RequestId(IdRepr::I32(id)) }
}

impl From<String> for RequestId {
	fn from(id: String) -> RequestId { RequestId(IdRepr::String(id)) }
}

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.0 {
			IdRepr::I32(id) => fmt::Display::fmt(id, f),
			// Debug output makes clear that `92` and `"92"` are different ids.
			IdRepr::String(id) => fmt::Debug::fmt(id, f),
		}
	}
}

/// The protocol error codes the server answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
	/// The JSON framing layer could not parse the payload.
	ParseError = -32700,

	InvalidRequest = -32600,
	MethodNotFound = -32601,

	/// The message payload was malformed or invalid.
	InternalError = -32603,

	ServerNotInitialized = -32002,
}

impl Message {
	/// Reads one framed message. Returns `Ok(None)` at end of stream.
	pub fn read(reader: &mut impl BufRead) -> io::Result<Option<Message>> {
		let text = match read_msg_text(reader)? {
			None => return Ok(None),
			Some(text) => text,
		};
		let message = serde_json::from_str(&text)?;
		Ok(Some(message))
	}

	/// Writes the message with its `Content-Length` header and flushes.
	pub fn write(self, writer: &mut impl Write) -> io::Result<()> {
		#[derive(Serialize)]
		struct JsonRpc {
			jsonrpc: &'static str,
			#[serde(flatten)]
			msg: Message,
		}

		let text = serde_json::to_string(&JsonRpc { jsonrpc: "2.0", msg: self })?;
		write!(writer, "Content-Length: {}\r\n\r\n", text.len())?;
		writer.write_all(text.as_bytes())?;
		writer.flush()?;
		Ok(())
	}
}

fn read_msg_text(input: &mut dyn BufRead) -> io::Result<Option<String>> {
	let headers = match read_header_block(input)? {
		None => return Ok(None),
		Some(headers) => headers,
	};

	let length: usize = headers
		.iter()
		.find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
		.ok_or_else(|| framing_error("missing Content-Length header".into()))?
		.1
		.parse()
		.map_err(|e| framing_error(format!("bad Content-Length: {e}")))?;

	let mut payload = vec![0u8; length];
	input.read_exact(&mut payload)?;

	match String::from_utf8(payload) {
		Ok(text) => Ok(Some(text)),
		Err(e) => Err(framing_error(e.to_string())),
	}
}

/// Collects the `Name: value` lines up to the blank separator. Returns `None`
/// on a clean end of stream before any header was read.
fn read_header_block(input: &mut dyn BufRead) -> io::Result<Option<Vec<(String, String)>>> {
	let mut headers = Vec::new();

	loop {
		let mut line = String::new();
		if input.read_line(&mut line)? == 0 {
			if headers.is_empty() {
				return Ok(None);
			}
			return Err(framing_error("truncated header block".into()));
		}

		let Some(line) = line.strip_suffix("\r\n") else {
			return Err(framing_error(format!("malformed header line: {line:?}")));
		};

		if line.is_empty() {
			return Ok(Some(headers));
		}

		match line.split_once(':') {
			Some((name, value)) => headers.push((name.trim().to_string(), value.trim().to_string())),
			None => return Err(framing_error(format!("malformed header line: {line:?}"))),
		}
	}
}

fn framing_error(message: String) -> io::Error { io::Error::new(io::ErrorKind::InvalidData, message) }

impl Request {
	pub(crate) fn is(&self, method: &str) -> bool { self.method == method }
}

impl Response {
	/// Creates a success [`Response`] carrying `data`.
	pub fn new<TResult: Serialize>(id: RequestId, data: TResult) -> Self {
		Response {
			id,
			result: Some(serde_json::to_value(data).unwrap_or(serde_json::Value::Null)),
			error: None,
		}
	}

	/// Creates an error [`Response`] from an error code and message.
	pub fn new_error(id: RequestId, code: i32, message: &str) -> Self {
		Response {
			id,
			result: None,
			error: Some(ResponseError { code, message: String::from(message), data: None }),
		}
	}
}

impl Notification {
	/// Creates a [`Notification`] for `method` carrying `params`.
	pub fn new<TParams: Serialize>(method: &str, params: TParams) -> Self {
		Notification {
			method: String::from(method),
			params: serde_json::to_value(params).unwrap_or(serde_json::Value::Null),
		}
	}

	pub(crate) fn is(&self, method: &str) -> bool { self.method == method }
}

/// An error that is the result of a failed attempt to deserialize a JSON value.
pub type DeserializeError = Box<dyn std::error::Error + Send + Sync>;

/// Deserializes a JSON value into `T`, reporting what was being read on failure.
pub fn from_json<T: DeserializeOwned>(what: &'static str, json: &serde_json::Value) -> Result<T, DeserializeError> {
	let value = serde_json::from_value(json.clone())
		.map_err(|e| format!("Error deserializing '{what}': {e}; {json}"))?;

	Ok(value)
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn framed_round_trip() {
		let message = Message::Request(Request {
			id: 7.into(),
			method: "initialize".into(),
			params: serde_json::json!({ "processId": 1 }),
		});

		let mut buffer = Vec::new();
		message.write(&mut buffer).unwrap();

		let text = String::from_utf8(buffer.clone()).unwrap();
		assert!(text.starts_with("Content-Length: "));

		let read = Message::read(&mut &buffer[..]).unwrap().unwrap();
		match read {
			Message::Request(request) => {
				assert_eq!(request.method, "initialize");
				assert_eq!(request.id, 7.into());
			}
			other => panic!("expected a request, got {other:?}"),
		}
	}

	#[test]
	fn end_of_stream_reads_none() {
		assert!(Message::read(&mut &b""[..]).unwrap().is_none());
	}

	#[test]
	fn missing_content_length_is_an_error() {
		let framed = b"Content-Type: text\r\n\r\n{}";
		assert!(Message::read(&mut &framed[..]).is_err());
	}

	#[test]
	fn header_case_and_spacing_are_tolerated() {
		let framed = b"content-length:14\r\n\r\n{\"method\":\"x\"}";
		let read = Message::read(&mut &framed[..]).unwrap().unwrap();

		match read {
			Message::Notification(notification) => assert_eq!(notification.method, "x"),
			other => panic!("expected a notification, got {other:?}"),
		}
	}

	#[test]
	fn request_ids_render_distinctly() {
		assert_eq!(RequestId::from(92).to_string(), "92");
		assert_eq!(RequestId::from(String::from("92")).to_string(), "\"92\"");
	}
}
