use anyhow::Error;

use crate::{
    core::{
        error::RpcError,
        id::SessionId,
        types::List,
    },
    message::message::{
        CallErrorMessage,
        Message,
        PROTOCOL_VERSION,
        WelcomeMessage,
    },
};

pub fn welcome_message(session_id: SessionId, server_ident: &str) -> Message {
    Message::Welcome(WelcomeMessage {
        session_id,
        protocol_version: PROTOCOL_VERSION,
        server_ident: server_ident.to_owned(),
    })
}

/// Builds the CALLERROR message reporting `error` for a call.
///
/// `error_uri` is expected to already be resolved for the caller.
pub fn call_error_for_error(call_id: &str, error_uri: String, error: &Error) -> Message {
    let (error_description, error_details) = match error.downcast_ref::<RpcError>() {
        Some(error) => (error.description.clone(), error.details.clone()),
        None => (error.to_string(), List::default()),
    };
    Message::CallError(CallErrorMessage {
        call_id: call_id.to_owned(),
        error_uri,
        error_description,
        error_details,
    })
}

#[cfg(test)]
mod common_test {
    use anyhow::Error;
    use serde_json::json;

    use crate::{
        core::error::{
            InteractionError,
            RpcError,
        },
        message::{
            common::call_error_for_error,
            message::{
                CallErrorMessage,
                Message,
            },
        },
    };

    #[test]
    fn builds_call_error_from_rpc_error() {
        let error: Error = RpcError::new("error:overflow", "too big")
            .with_details(vec![json!(1)])
            .into();
        pretty_assertions::assert_eq!(
            call_error_for_error("id", "http://example.com/error#overflow".to_owned(), &error),
            Message::CallError(CallErrorMessage {
                call_id: "id".to_owned(),
                error_uri: "http://example.com/error#overflow".to_owned(),
                error_description: "too big".to_owned(),
                error_details: vec![json!(1)],
            })
        );
    }

    #[test]
    fn builds_call_error_from_other_error() {
        let error: Error = InteractionError::NoSuchProcedure.into();
        pretty_assertions::assert_eq!(
            call_error_for_error("id", "wamp.error.no_such_procedure".to_owned(), &error),
            Message::CallError(CallErrorMessage {
                call_id: "id".to_owned(),
                error_uri: "wamp.error.no_such_procedure".to_owned(),
                error_description: "no such procedure".to_owned(),
                error_details: Vec::new(),
            })
        );
    }
}
