mod call;
mod listener;
mod observer;
mod procedure;
mod pub_sub;
mod rpc;
mod session;
mod topic;
mod web_socket_acceptor;

pub use call::CallKey;
pub use listener::{
    DEFAULT_SERVER_IDENT,
    DirectConnection,
    Listener,
    ListenerConfig,
    ListenerHandle,
};
pub use observer::{
    CallInfo,
    EmptyListenerObserver,
    ListenerObserver,
};
pub use procedure::{
    FnProcedure,
    Invocation,
    Procedure,
    TypedFnProcedure,
    TypedProcedure,
    TypedProcedureAdapter,
    decode_arguments,
};
pub use session::Session;
pub use topic::{
    PublishOptions,
    event_receivers,
};
