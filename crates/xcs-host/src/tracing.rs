//! A `tracing` layer that forwards events to the LSP client as `$/logTrace`
//! notifications, gated by the trace level the client selects via `$/setTrace`.

pub use tracing_subscriber;

use crate::{
	json_rpc::message::{Message, Notification},
	MessageChannel,
};
use core::fmt::Debug;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{field::Visit, layer::Context, Layer};
use xcs_abstractions::{
	lsp_types::{LogTraceParams, TraceValue},
	tracing::{field::Field, Event, Subscriber},
};

/// Allows the [`TraceValue`] of an [`LspTracingLayer`] to be changed after the
/// subscriber has been installed, typically on receipt of `$/setTrace`.
#[derive(Clone)]
pub struct TraceValueAccessor {
	value: Arc<Mutex<TraceValue>>,
}

impl TraceValueAccessor {
	/// Sets the [`TraceValue`] on the associated [`LspTracingLayer`].
	pub fn set(&self, trace_value: TraceValue) { *self.value.lock().unwrap() = trace_value; }
}

/// The `tracing` layer that writes messages to the channel attached to the LSP
/// client.
pub struct LspTracingLayer {
	sender: async_channel::Sender<Message>,
	trace_value: Arc<Mutex<TraceValue>>,
}

impl LspTracingLayer {
	/// Initializes a new [`LspTracingLayer`] writing to a given [`MessageChannel`].
	pub fn new(request_channel: MessageChannel) -> Self {
		let (sender, _) = request_channel;
		Self { sender, trace_value: Arc::new(Mutex::new(TraceValue::Off)) }
	}

	pub fn trace_value(&self) -> TraceValueAccessor {
		TraceValueAccessor { value: self.trace_value.clone() }
	}
}

impl<S> Layer<S> for LspTracingLayer
where
	S: Subscriber,
{
	fn on_event(&self, event: &Event, _ctx: Context<S>) {
		let trace_value = self.trace_value.lock().unwrap().clone();
		if trace_value == TraceValue::Off {
			return;
		}

		let mut fields = EventFields::default();
		event.record(&mut fields);

		let verbose = match trace_value {
			TraceValue::Verbose => fields.verbose_detail(),
			_ => None,
		};

		let params = LogTraceParams { message: fields.message, verbose };

		// Errors are ignored; tracing must never take the server down.
		let _ = self.sender.try_send(Message::Notification(Notification::new("$/logTrace", params)));
	}
}

/// Collects an event's message and its remaining fields as name/value pairs.
#[derive(Default)]
struct EventFields {
	message: String,
	pairs: Vec<(String, String)>,
}

impl EventFields {
	/// The detail string sent when the client asked for verbose tracing, or
	/// [`None`] when the event carried nothing beyond its message.
	fn verbose_detail(&self) -> Option<String> {
		if self.pairs.is_empty() {
			return None;
		}

		let rendered: Vec<String> = self.pairs.iter().map(|(name, value)| format!("{name}={value}")).collect();
		Some(rendered.join(", "))
	}
}

impl Visit for EventFields {
	fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
		match field.name() {
			"message" => self.message = format!("{value:?}"),
			name => self.pairs.push((name.to_string(), format!("{value:?}"))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	#[test]
	fn verbose_detail_joins_field_pairs() {
		let mut fields = EventFields::default();
		fields.pairs.push((String::from("path"), String::from("\"/a.xcs\"")));
		fields.pairs.push((String::from("count"), String::from("3")));

		assert_eq!(fields.verbose_detail().as_deref(), Some("path=\"/a.xcs\", count=3"));
	}

	#[test]
	fn events_without_extra_fields_have_no_detail() {
		let fields = EventFields { message: String::from("hello"), pairs: Vec::new() };
		assert_eq!(fields.verbose_detail(), None);
	}
}
