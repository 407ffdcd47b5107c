pub mod error;
pub mod hash;
pub mod id;
pub mod prefix;
pub mod types;
pub mod uri;
