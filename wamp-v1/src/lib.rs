//! An asynchronous engine for the WAMP v1 messaging protocol.
//!
//! The [`listener`] hosts sessions, topics, and procedures for many connected clients. The
//! [`client`] connects to a listener to call procedures and publish or subscribe to events.
//! Both sides speak the JSON-array frames defined in [`message`].

pub mod client;
pub mod core;
pub mod listener;
pub mod message;
pub mod serializer;
pub mod transport;
