/// Any JSON value carried by a frame, such as an event payload or an RPC argument.
pub type Value = serde_json::Value;

/// A JSON object.
pub type Dictionary = serde_json::Map<String, Value>;

/// An ordered sequence of values, which is also the shape of every frame on the wire.
pub type List = Vec<Value>;
