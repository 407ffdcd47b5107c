mod client;
mod web_socket_connector;

pub use client::{
    Client,
    ClientConfig,
    ClientNotConnectedError,
    ReceivedEvent,
    Subscription,
};
