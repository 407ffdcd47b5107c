use std::fmt::Display;

use crate::core::{
    error::FrameParseError,
    id::SessionId,
    types::{
        List,
        Value,
    },
};

/// The protocol version implemented by this library, communicated in WELCOME messages.
pub const PROTOCOL_VERSION: u64 = 1;

/// The type of a message, encoded as the leading integer of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Welcome,
    Prefix,
    Call,
    CallResult,
    CallError,
    Subscribe,
    Unsubscribe,
    Publish,
    Event,
}

impl MessageType {
    /// The integer tag of the message type.
    pub fn tag(&self) -> u64 {
        match self {
            Self::Welcome => 0,
            Self::Prefix => 1,
            Self::Call => 2,
            Self::CallResult => 3,
            Self::CallError => 4,
            Self::Subscribe => 5,
            Self::Unsubscribe => 6,
            Self::Publish => 7,
            Self::Event => 8,
        }
    }

    /// The minimum number of elements in a frame of this type, including the tag.
    pub fn min_length(&self) -> usize {
        match self {
            Self::Welcome => 4,
            Self::Prefix => 3,
            Self::Call => 3,
            Self::CallResult => 3,
            Self::CallError => 4,
            Self::Subscribe => 2,
            Self::Unsubscribe => 2,
            Self::Publish => 3,
            Self::Event => 3,
        }
    }

    /// The name of the message type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Welcome => "WELCOME",
            Self::Prefix => "PREFIX",
            Self::Call => "CALL",
            Self::CallResult => "CALLRESULT",
            Self::CallError => "CALLERROR",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Publish => "PUBLISH",
            Self::Event => "EVENT",
        }
    }
}

impl Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<u64> for MessageType {
    type Error = u64;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Welcome),
            1 => Ok(Self::Prefix),
            2 => Ok(Self::Call),
            3 => Ok(Self::CallResult),
            4 => Ok(Self::CallError),
            5 => Ok(Self::Subscribe),
            6 => Ok(Self::Unsubscribe),
            7 => Ok(Self::Publish),
            8 => Ok(Self::Event),
            _ => Err(value),
        }
    }
}

/// Positional, type-checked access to the fields of a frame.
pub struct FrameReader<'a> {
    frame: &'a [Value],
    message_type: MessageType,
}

impl<'a> FrameReader<'a> {
    fn new(frame: &'a [Value], message_type: MessageType) -> Result<Self, FrameParseError> {
        let reader = Self {
            frame,
            message_type,
        };
        match frame.first().and_then(Value::as_u64) {
            Some(tag) if tag == message_type.tag() => (),
            _ => return Err(reader.error("invalid message type tag")),
        }
        if frame.len() < message_type.min_length() {
            return Err(reader.error(format!(
                "expected at least {} elements, found {}",
                message_type.min_length(),
                frame.len()
            )));
        }
        Ok(reader)
    }

    fn error<S>(&self, message: S) -> FrameParseError
    where
        S: Into<String>,
    {
        FrameParseError::new(message, self.frame).expecting(self.message_type)
    }

    fn len(&self) -> usize {
        self.frame.len()
    }

    fn get(&self, index: usize) -> Option<&'a Value> {
        self.frame.get(index)
    }

    fn value(&self, index: usize) -> Value {
        self.frame.get(index).cloned().unwrap_or_default()
    }

    fn string(&self, index: usize, field: &str) -> Result<String, FrameParseError> {
        match self.frame.get(index) {
            Some(Value::String(value)) => Ok(value.clone()),
            _ => Err(self.error(format!("{field} must be a string"))),
        }
    }

    fn unsigned(&self, index: usize, field: &str) -> Result<u64, FrameParseError> {
        self.frame
            .get(index)
            .and_then(Value::as_u64)
            .ok_or_else(|| self.error(format!("{field} must be an unsigned integer")))
    }

    fn session_ids(&self, index: usize, field: &str) -> Result<Vec<SessionId>, FrameParseError> {
        let values = match self.frame.get(index) {
            Some(Value::Array(values)) => values,
            _ => return Err(self.error(format!("{field} must be a list"))),
        };
        values
            .iter()
            .map(|value| match value {
                Value::String(value) => Ok(SessionId::from(value.as_str())),
                _ => Err(self.error(format!("{field} must only contain strings"))),
            })
            .collect()
    }
}

/// Common behavior for the individual message kinds.
pub trait Frame: Sized {
    /// The message type of the frame.
    const MESSAGE_TYPE: MessageType;

    /// Appends the fields following the type tag.
    fn encode_fields(&self, frame: &mut List);

    /// Reads the fields following the type tag.
    fn decode_fields(reader: &FrameReader<'_>) -> Result<Self, FrameParseError>;

    /// Encodes the message to a frame.
    fn encode(&self) -> List {
        let mut frame = List::from_iter([Value::from(Self::MESSAGE_TYPE.tag())]);
        self.encode_fields(&mut frame);
        frame
    }

    /// Decodes the message from a frame.
    ///
    /// The tag and minimum length of the frame are validated before any field is read.
    fn decode(frame: &[Value]) -> Result<Self, FrameParseError> {
        Self::decode_fields(&FrameReader::new(frame, Self::MESSAGE_TYPE)?)
    }
}

/// A WELCOME message, sent by the listener as soon as a connection is established.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WelcomeMessage {
    pub session_id: SessionId,
    pub protocol_version: u64,
    pub server_ident: String,
}

impl Frame for WelcomeMessage {
    const MESSAGE_TYPE: MessageType = MessageType::Welcome;

    fn encode_fields(&self, frame: &mut List) {
        frame.push(Value::from(self.session_id.as_str()));
        frame.push(Value::from(self.protocol_version));
        frame.push(Value::from(self.server_ident.as_str()));
    }

    fn decode_fields(reader: &FrameReader<'_>) -> Result<Self, FrameParseError> {
        Ok(Self {
            session_id: reader.string(1, "session id")?.into(),
            protocol_version: reader.unsigned(2, "protocol version")?,
            server_ident: reader.string(3, "server ident")?,
        })
    }
}

/// A PREFIX message, mapping a CURIE prefix to a URI for the rest of the session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrefixMessage {
    pub prefix: String,
    pub uri: String,
}

impl Frame for PrefixMessage {
    const MESSAGE_TYPE: MessageType = MessageType::Prefix;

    fn encode_fields(&self, frame: &mut List) {
        frame.push(Value::from(self.prefix.as_str()));
        frame.push(Value::from(self.uri.as_str()));
    }

    fn decode_fields(reader: &FrameReader<'_>) -> Result<Self, FrameParseError> {
        Ok(Self {
            prefix: reader.string(1, "prefix")?,
            uri: reader.string(2, "uri")?,
        })
    }
}

/// A CALL message for invoking a procedure.
///
/// All elements after the procedure are positional arguments.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CallMessage {
    pub call_id: String,
    pub procedure: String,
    pub arguments: List,
}

impl Frame for CallMessage {
    const MESSAGE_TYPE: MessageType = MessageType::Call;

    fn encode_fields(&self, frame: &mut List) {
        frame.push(Value::from(self.call_id.as_str()));
        frame.push(Value::from(self.procedure.as_str()));
        frame.extend(self.arguments.iter().cloned());
    }

    fn decode_fields(reader: &FrameReader<'_>) -> Result<Self, FrameParseError> {
        Ok(Self {
            call_id: reader.string(1, "call id")?,
            procedure: reader.string(2, "procedure")?,
            arguments: reader.frame[3..].to_vec(),
        })
    }
}

/// A CALLRESULT message for the successful result of a procedure call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CallResultMessage {
    pub call_id: String,
    pub result: Value,
}

impl Frame for CallResultMessage {
    const MESSAGE_TYPE: MessageType = MessageType::CallResult;

    fn encode_fields(&self, frame: &mut List) {
        frame.push(Value::from(self.call_id.as_str()));
        frame.push(self.result.clone());
    }

    fn decode_fields(reader: &FrameReader<'_>) -> Result<Self, FrameParseError> {
        Ok(Self {
            call_id: reader.string(1, "call id")?,
            result: reader.value(2),
        })
    }
}

/// A CALLERROR message for the failure of a procedure call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CallErrorMessage {
    pub call_id: String,
    pub error_uri: String,
    pub error_description: String,
    /// Omitted from the frame when empty.
    pub error_details: List,
}

impl Frame for CallErrorMessage {
    const MESSAGE_TYPE: MessageType = MessageType::CallError;

    fn encode_fields(&self, frame: &mut List) {
        frame.push(Value::from(self.call_id.as_str()));
        frame.push(Value::from(self.error_uri.as_str()));
        frame.push(Value::from(self.error_description.as_str()));
        if !self.error_details.is_empty() {
            frame.push(Value::Array(self.error_details.clone()));
        }
    }

    fn decode_fields(reader: &FrameReader<'_>) -> Result<Self, FrameParseError> {
        let error_details = match reader.get(4) {
            None | Some(Value::Null) => List::default(),
            Some(Value::Array(details)) => details.clone(),
            Some(details) => List::from_iter([details.clone()]),
        };
        Ok(Self {
            call_id: reader.string(1, "call id")?,
            error_uri: reader.string(2, "error uri")?,
            error_description: reader.string(3, "error description")?,
            error_details,
        })
    }
}

/// A SUBSCRIBE message for subscribing to a topic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SubscribeMessage {
    pub topic: String,
}

impl Frame for SubscribeMessage {
    const MESSAGE_TYPE: MessageType = MessageType::Subscribe;

    fn encode_fields(&self, frame: &mut List) {
        frame.push(Value::from(self.topic.as_str()));
    }

    fn decode_fields(reader: &FrameReader<'_>) -> Result<Self, FrameParseError> {
        Ok(Self {
            topic: reader.string(1, "topic")?,
        })
    }
}

/// An UNSUBSCRIBE message for unsubscribing from a topic.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnsubscribeMessage {
    pub topic: String,
}

impl Frame for UnsubscribeMessage {
    const MESSAGE_TYPE: MessageType = MessageType::Unsubscribe;

    fn encode_fields(&self, frame: &mut List) {
        frame.push(Value::from(self.topic.as_str()));
    }

    fn decode_fields(reader: &FrameReader<'_>) -> Result<Self, FrameParseError> {
        Ok(Self {
            topic: reader.string(1, "topic")?,
        })
    }
}

/// The sessions a published event should be delivered to, out of the topic's subscribers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum PublishRecipients {
    /// Every subscriber.
    #[default]
    All,
    /// Every subscriber except the publisher.
    ExcludeMe,
    /// Only `eligibles`, if non-empty; otherwise every subscriber not in `excludes`.
    Targeted {
        excludes: Vec<SessionId>,
        eligibles: Vec<SessionId>,
    },
}

/// A PUBLISH message for publishing an event to a topic.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PublishMessage {
    pub topic: String,
    pub event: Value,
    pub recipients: PublishRecipients,
}

impl Frame for PublishMessage {
    const MESSAGE_TYPE: MessageType = MessageType::Publish;

    fn encode_fields(&self, frame: &mut List) {
        frame.push(Value::from(self.topic.as_str()));
        frame.push(self.event.clone());
        match &self.recipients {
            PublishRecipients::All => (),
            PublishRecipients::ExcludeMe => frame.push(Value::Bool(true)),
            PublishRecipients::Targeted {
                excludes,
                eligibles,
            } => {
                frame.push(Value::from_iter(excludes.iter().map(SessionId::as_str)));
                frame.push(Value::from_iter(eligibles.iter().map(SessionId::as_str)));
            }
        }
    }

    fn decode_fields(reader: &FrameReader<'_>) -> Result<Self, FrameParseError> {
        let recipients = match reader.get(3) {
            None => PublishRecipients::All,
            Some(Value::Bool(true)) => PublishRecipients::ExcludeMe,
            Some(Value::Bool(false)) => PublishRecipients::All,
            Some(Value::Array(_)) => PublishRecipients::Targeted {
                excludes: reader.session_ids(3, "excludes")?,
                eligibles: if reader.len() > 4 {
                    reader.session_ids(4, "eligibles")?
                } else {
                    Vec::new()
                },
            },
            Some(_) => return Err(reader.error("exclude me must be a boolean or a list")),
        };
        Ok(Self {
            topic: reader.string(1, "topic")?,
            event: reader.value(2),
            recipients,
        })
    }
}

/// An EVENT message for relaying a published event to subscribers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EventMessage {
    pub topic: String,
    pub event: Value,
}

impl Frame for EventMessage {
    const MESSAGE_TYPE: MessageType = MessageType::Event;

    fn encode_fields(&self, frame: &mut List) {
        frame.push(Value::from(self.topic.as_str()));
        frame.push(self.event.clone());
    }

    fn decode_fields(reader: &FrameReader<'_>) -> Result<Self, FrameParseError> {
        Ok(Self {
            topic: reader.string(1, "topic")?,
            event: reader.value(2),
        })
    }
}

/// A WAMP v1 message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Welcome(WelcomeMessage),
    Prefix(PrefixMessage),
    Call(CallMessage),
    CallResult(CallResultMessage),
    CallError(CallErrorMessage),
    Subscribe(SubscribeMessage),
    Unsubscribe(UnsubscribeMessage),
    Publish(PublishMessage),
    Event(EventMessage),
}

impl Message {
    /// The type of the message.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Welcome(_) => MessageType::Welcome,
            Self::Prefix(_) => MessageType::Prefix,
            Self::Call(_) => MessageType::Call,
            Self::CallResult(_) => MessageType::CallResult,
            Self::CallError(_) => MessageType::CallError,
            Self::Subscribe(_) => MessageType::Subscribe,
            Self::Unsubscribe(_) => MessageType::Unsubscribe,
            Self::Publish(_) => MessageType::Publish,
            Self::Event(_) => MessageType::Event,
        }
    }

    /// The name of the message, for logging.
    pub fn message_name(&self) -> &'static str {
        self.message_type().name()
    }

    /// Encodes the message to a frame.
    pub fn encode(&self) -> List {
        match self {
            Self::Welcome(message) => message.encode(),
            Self::Prefix(message) => message.encode(),
            Self::Call(message) => message.encode(),
            Self::CallResult(message) => message.encode(),
            Self::CallError(message) => message.encode(),
            Self::Subscribe(message) => message.encode(),
            Self::Unsubscribe(message) => message.encode(),
            Self::Publish(message) => message.encode(),
            Self::Event(message) => message.encode(),
        }
    }

    /// Decodes any message from a frame, selecting the kind by the leading tag.
    pub fn decode(frame: &[Value]) -> Result<Self, FrameParseError> {
        let message_type = match frame.first().and_then(Value::as_u64) {
            Some(tag) => MessageType::try_from(tag)
                .map_err(|tag| FrameParseError::new(format!("unknown message type {tag}"), frame))?,
            None => return Err(FrameParseError::new("missing message type tag", frame)),
        };
        match message_type {
            MessageType::Welcome => WelcomeMessage::decode(frame).map(Self::Welcome),
            MessageType::Prefix => PrefixMessage::decode(frame).map(Self::Prefix),
            MessageType::Call => CallMessage::decode(frame).map(Self::Call),
            MessageType::CallResult => CallResultMessage::decode(frame).map(Self::CallResult),
            MessageType::CallError => CallErrorMessage::decode(frame).map(Self::CallError),
            MessageType::Subscribe => SubscribeMessage::decode(frame).map(Self::Subscribe),
            MessageType::Unsubscribe => UnsubscribeMessage::decode(frame).map(Self::Unsubscribe),
            MessageType::Publish => PublishMessage::decode(frame).map(Self::Publish),
            MessageType::Event => EventMessage::decode(frame).map(Self::Event),
        }
    }
}

#[cfg(test)]
mod message_test {
    use serde_json::json;

    use crate::{
        core::{
            id::SessionId,
            types::List,
        },
        message::message::{
            CallErrorMessage,
            CallMessage,
            CallResultMessage,
            EventMessage,
            Frame,
            Message,
            MessageType,
            PrefixMessage,
            PublishMessage,
            PublishRecipients,
            SubscribeMessage,
            UnsubscribeMessage,
            WelcomeMessage,
        },
    };

    fn frame(value: serde_json::Value) -> List {
        match value {
            serde_json::Value::Array(frame) => frame,
            _ => panic!("frame must be an array"),
        }
    }

    #[test]
    fn round_trips_every_message_kind() {
        let messages = [
            Message::Welcome(WelcomeMessage {
                session_id: SessionId::from("v59mbCGDXZ7WTyxB"),
                protocol_version: 1,
                server_ident: "wamp-v1/0.1.0".to_owned(),
            }),
            Message::Prefix(PrefixMessage {
                prefix: "calc".to_owned(),
                uri: "http://example.com/simple/calc#".to_owned(),
            }),
            Message::Call(CallMessage {
                call_id: "7DK6TdN4wLiUJgNM".to_owned(),
                procedure: "calc:add".to_owned(),
                arguments: vec![json!(2), json!(3.5), json!({"a": [1, null]})],
            }),
            Message::CallResult(CallResultMessage {
                call_id: "7DK6TdN4wLiUJgNM".to_owned(),
                result: json!(5.5),
            }),
            Message::CallError(CallErrorMessage {
                call_id: "7DK6TdN4wLiUJgNM".to_owned(),
                error_uri: "http://example.com/error#overflow".to_owned(),
                error_description: "overflow".to_owned(),
                error_details: vec![json!("detail"), json!(1)],
            }),
            Message::CallError(CallErrorMessage {
                call_id: "7DK6TdN4wLiUJgNM".to_owned(),
                error_uri: "wamp.error.internal".to_owned(),
                error_description: "oops".to_owned(),
                error_details: Vec::new(),
            }),
            Message::Subscribe(SubscribeMessage {
                topic: "event:myevent1".to_owned(),
            }),
            Message::Unsubscribe(UnsubscribeMessage {
                topic: "event:myevent1".to_owned(),
            }),
            Message::Publish(PublishMessage {
                topic: "event:myevent1".to_owned(),
                event: json!("hello"),
                recipients: PublishRecipients::All,
            }),
            Message::Publish(PublishMessage {
                topic: "event:myevent1".to_owned(),
                event: json!({"rand": 0.1}),
                recipients: PublishRecipients::ExcludeMe,
            }),
            Message::Publish(PublishMessage {
                topic: "event:myevent1".to_owned(),
                event: json!(null),
                recipients: PublishRecipients::Targeted {
                    excludes: vec![SessionId::from("a")],
                    eligibles: vec![SessionId::from("b"), SessionId::from("c")],
                },
            }),
            Message::Event(EventMessage {
                topic: "http://example.com/event#myevent1".to_owned(),
                event: json!([1, 2, 3]),
            }),
        ];
        for message in messages {
            pretty_assertions::assert_eq!(Message::decode(&message.encode()).unwrap(), message);
        }
    }

    #[test]
    fn encodes_wire_shapes() {
        pretty_assertions::assert_eq!(
            Message::Welcome(WelcomeMessage {
                session_id: SessionId::from("abc"),
                protocol_version: 1,
                server_ident: "server".to_owned(),
            })
            .encode(),
            frame(json!([0, "abc", 1, "server"]))
        );
        pretty_assertions::assert_eq!(
            Message::Call(CallMessage {
                call_id: "id".to_owned(),
                procedure: "calc:add".to_owned(),
                arguments: vec![json!(2), json!(3)],
            })
            .encode(),
            frame(json!([2, "id", "calc:add", 2, 3]))
        );
        pretty_assertions::assert_eq!(
            Message::CallError(CallErrorMessage {
                call_id: "id".to_owned(),
                error_uri: "error:x".to_owned(),
                error_description: "failed".to_owned(),
                error_details: Vec::new(),
            })
            .encode(),
            frame(json!([4, "id", "error:x", "failed"]))
        );
        pretty_assertions::assert_eq!(
            Message::Publish(PublishMessage {
                topic: "t".to_owned(),
                event: json!(1),
                recipients: PublishRecipients::ExcludeMe,
            })
            .encode(),
            frame(json!([7, "t", 1, true]))
        );
    }

    #[test]
    fn fails_decoding_mismatched_tag() {
        assert_matches::assert_matches!(
            SubscribeMessage::decode(&frame(json!([6, "topic"]))),
            Err(err) => {
                pretty_assertions::assert_eq!(err.expected, Some(MessageType::Subscribe));
                pretty_assertions::assert_eq!(err.frame, frame(json!([6, "topic"])));
            }
        );
        assert_matches::assert_matches!(
            CallMessage::decode(&frame(json!(["2", "id", "proc"]))),
            Err(_)
        );
    }

    #[test]
    fn fails_decoding_short_frames() {
        let short_frames = [
            json!([0, "session", 1]),
            json!([1, "prefix"]),
            json!([2, "id"]),
            json!([3, "id"]),
            json!([4, "id", "error"]),
            json!([5]),
            json!([6]),
            json!([7, "topic"]),
            json!([8, "topic"]),
        ];
        for short_frame in short_frames {
            let short_frame = frame(short_frame);
            assert_matches::assert_matches!(Message::decode(&short_frame), Err(err) => {
                assert!(err.expected.is_some());
                pretty_assertions::assert_eq!(err.frame, short_frame);
            });
        }
    }

    #[test]
    fn fails_decoding_unknown_or_missing_tag() {
        assert_matches::assert_matches!(Message::decode(&frame(json!([9, "x"]))), Err(err) => {
            pretty_assertions::assert_eq!(err.expected, None);
        });
        assert_matches::assert_matches!(Message::decode(&[]), Err(_));
        assert_matches::assert_matches!(Message::decode(&frame(json!([null]))), Err(_));
    }

    #[test]
    fn fails_decoding_wrong_field_types() {
        assert_matches::assert_matches!(Message::decode(&frame(json!([5, 1]))), Err(_));
        assert_matches::assert_matches!(Message::decode(&frame(json!([0, "s", "1", "x"]))), Err(_));
        assert_matches::assert_matches!(
            Message::decode(&frame(json!([7, "t", 1, "yes"]))),
            Err(_)
        );
        assert_matches::assert_matches!(
            Message::decode(&frame(json!([7, "t", 1, [1], []]))),
            Err(_)
        );
    }

    #[test]
    fn decodes_optional_publish_fields() {
        assert_matches::assert_matches!(
            PublishMessage::decode(&frame(json!([7, "t", "e"]))),
            Ok(message) => {
                pretty_assertions::assert_eq!(message.recipients, PublishRecipients::All);
            }
        );
        assert_matches::assert_matches!(
            PublishMessage::decode(&frame(json!([7, "t", "e", false]))),
            Ok(message) => {
                pretty_assertions::assert_eq!(message.recipients, PublishRecipients::All);
            }
        );
        assert_matches::assert_matches!(
            PublishMessage::decode(&frame(json!([7, "t", "e", ["a"]]))),
            Ok(message) => {
                pretty_assertions::assert_eq!(
                    message.recipients,
                    PublishRecipients::Targeted {
                        excludes: vec![SessionId::from("a")],
                        eligibles: Vec::new(),
                    }
                );
            }
        );
    }

    #[test]
    fn decodes_optional_call_error_details() {
        assert_matches::assert_matches!(
            CallErrorMessage::decode(&frame(json!([4, "id", "e", "d"]))),
            Ok(message) => {
                assert!(message.error_details.is_empty());
            }
        );
        assert_matches::assert_matches!(
            CallErrorMessage::decode(&frame(json!([4, "id", "e", "d", "scalar"]))),
            Ok(message) => {
                pretty_assertions::assert_eq!(message.error_details, vec![json!("scalar")]);
            }
        );
    }

    #[test]
    fn decodes_call_arguments_as_trailing_elements() {
        assert_matches::assert_matches!(
            CallMessage::decode(&frame(json!([2, "id", "proc"]))),
            Ok(message) => {
                assert!(message.arguments.is_empty());
            }
        );
    }
}
