//! Message shapes for the answer channel.
//!
//! A channel is a long-lived bidirectional pipe between a UI surface and
//! the background relay. Inbound frames carry a question; outbound frames
//! carry forwarded provider payloads, a single terminal `DONE` marker, or
//! an error message.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// An event emitted by a provider during answer generation.
///
/// Either a data increment (opaque payload, forwarded verbatim by the
/// relay) or the single terminal signal. Events arrive in emission order;
/// the relay imposes no ordering of its own.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerEvent {
    /// A data increment. The payload shape is provider-defined and is
    /// never inspected or transformed by the relay.
    Data(Value),
    /// No further data events will be emitted for this request.
    Done,
}

/// Inbound channel message: a free-form question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionMessage {
    pub question: String,
}

/// Outbound channel message.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelReply {
    /// A provider payload, forwarded verbatim as the message body.
    Payload(Value),
    /// Stream completed successfully. Sent exactly once per request.
    Done,
    /// Provider resolution or invocation failed. Terminates the exchange.
    Error(String),
}

impl ChannelReply {
    /// Render the reply as the JSON value that goes on the wire.
    pub fn into_value(self) -> Value {
        match self {
            ChannelReply::Payload(value) => value,
            ChannelReply::Done => json!({ "event": "DONE" }),
            ChannelReply::Error(message) => json!({ "error": message }),
        }
    }
}
