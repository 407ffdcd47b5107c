use std::fmt::Debug;

use anyhow::Result;

use crate::{
    core::{
        error::InteractionError,
        types::{
            List,
            Value,
        },
    },
    message::message::Message,
    serializer::json::JsonSerializer,
};

/// The name of the WebSocket subprotocol for WAMP v1, which only supports JSON.
pub const SUBPROTOCOL: &str = "wamp";

/// A serializer, which converts frames to and from the text sent over the wire.
pub trait Serializer: Send + Sync + Debug {
    /// Serializes a frame to text.
    fn serialize(&self, frame: &[Value]) -> Result<String>;

    /// Deserializes text to a frame.
    ///
    /// Fails if the text is not an array.
    fn deserialize(&self, text: &str) -> Result<List>;

    /// Serializes a message.
    fn serialize_message(&self, message: &Message) -> Result<String> {
        self.serialize(&message.encode())
    }
}

/// Creates the [`Serializer`] for WAMP v1.
pub fn new_serializer() -> Box<dyn Serializer> {
    Box::new(JsonSerializer::default())
}

pub(crate) fn not_a_frame() -> anyhow::Error {
    InteractionError::ProtocolViolation("message is not an array".to_owned()).into()
}
