use std::fmt::Display;

use async_trait::async_trait;
use rand::Rng;
use serde::{
    Deserialize,
    Serialize,
};

/// Characters used in randomly-generated keys.
const KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Length of randomly-generated keys.
pub const KEY_LENGTH: usize = 16;

/// The identifier of a session, assigned by the listener when a connection is established.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// The string representation of the ID.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

/// Generates a random key of [`KEY_LENGTH`] characters from a URL-safe alphabet.
///
/// Keys are unique only statistically: 64 symbols over 16 positions gives 96 bits of entropy.
pub fn random_key() -> String {
    let mut rng = rand::rng();
    (0..KEY_LENGTH)
        .map(|_| KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

/// An ID allocator.
#[async_trait]
pub trait IdAllocator: Send + Sync {
    /// Generates a new ID.
    async fn generate_id(&self) -> String;
}

/// An ID allocator that generates random keys.
///
/// Used for session IDs on the listener and call IDs on the client.
#[derive(Debug, Default)]
pub struct RandomIdAllocator {}

#[async_trait]
impl IdAllocator for RandomIdAllocator {
    async fn generate_id(&self) -> String {
        random_key()
    }
}
