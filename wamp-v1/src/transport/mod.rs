pub mod connection;
pub mod direct_transport;
pub mod service;
pub mod transport;
pub mod web_socket_transport;
