use anyhow::{
    Error,
    Result,
};

use crate::{
    core::types::{
        List,
        Value,
    },
    serializer::serializer::{
        Serializer,
        not_a_frame,
    },
};

/// A serializer implemented for JavaScript Object Notation.
#[derive(Debug, Default)]
pub struct JsonSerializer {}

impl Serializer for JsonSerializer {
    fn serialize(&self, frame: &[Value]) -> Result<String> {
        serde_json::to_string(frame).map_err(Error::new)
    }

    fn deserialize(&self, text: &str) -> Result<List> {
        match serde_json::from_str(text).map_err(Error::new)? {
            Value::Array(frame) => Ok(frame),
            _ => Err(not_a_frame()),
        }
    }
}
