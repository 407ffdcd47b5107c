use anyhow::Error;
use thiserror::Error;

use crate::{
    core::{
        types::{
            List,
            Value,
        },
        uri::{
            InvalidUriError,
            Uri,
        },
    },
    message::message::MessageType,
};

/// A wire frame could not be decoded into a message.
///
/// Always a per-message failure: the frame is dropped and the connection continues.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct FrameParseError {
    /// What went wrong.
    pub message: String,
    /// The offending frame.
    pub frame: List,
    /// The message type the frame was decoded as, if known.
    pub expected: Option<MessageType>,
}

impl FrameParseError {
    pub(crate) fn new<S>(message: S, frame: &[Value]) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            frame: frame.to_vec(),
            expected: None,
        }
    }

    pub(crate) fn expecting(mut self, expected: MessageType) -> Self {
        self.expected = Some(expected);
        self
    }
}

/// A token could not be resolved to a URI by a prefix table.
#[derive(Debug, Error)]
#[error("{token:?} is neither a known prefix nor a well-formed URI")]
pub struct UnresolvedPrefixError {
    pub token: String,
}

/// Arguments passed to a typed procedure do not match its signature.
#[derive(Debug, Error)]
#[error("argument mismatch for {procedure}: {message}")]
pub struct ArgumentMismatchError {
    pub procedure: Uri,
    pub message: String,
}

/// An application-level RPC error, reported to the caller in a CALLERROR message.
///
/// The error URI may be a CURIE; the listener resolves it through the caller's prefix table before
/// sending.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error_uri}: {description}")]
pub struct RpcError {
    pub error_uri: String,
    pub description: String,
    pub details: List,
}

impl RpcError {
    /// Creates a new RPC error without details.
    pub fn new<U, D>(error_uri: U, description: D) -> Self
    where
        U: Into<String>,
        D: Into<String>,
    {
        Self {
            error_uri: error_uri.into(),
            description: description.into(),
            details: List::default(),
        }
    }

    /// Attaches details to the error.
    pub fn with_details(mut self, details: List) -> Self {
        self.details = details;
        self
    }
}

/// A basic error that occurs while processing a WAMP message.
#[derive(Debug, Error)]
pub enum BasicError {
    /// A generic resource was not found.
    #[error("{0}")]
    NotFound(String),
    /// An invalid argument was passed.
    #[error("{0}")]
    InvalidArgument(String),
    /// The operation is not allowed based on listener configuration.
    #[error("{0}")]
    NotAllowed(String),
    /// Some internal error occurred.
    ///
    /// Should only be used when there is no other error variant that describes the error.
    #[error("{0}")]
    Internal(String),
}

impl BasicError {
    /// The trailing URI component for the error.
    pub fn uri_component(&self) -> &str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotAllowed(_) => "not_allowed",
            Self::Internal(_) => "internal",
        }
    }
}

/// An interaction error that occurs while processing a WAMP message.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// The incoming message violates the WAMP protocol.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
    /// The procedure being called does not exist.
    #[error("no such procedure")]
    NoSuchProcedure,
    /// The operation was canceled before it started.
    #[error("canceled")]
    Canceled,
    /// The operation did not finish before its deadline.
    #[error("timed out")]
    Timeout,
}

impl InteractionError {
    /// The trailing URI component for the error.
    pub fn uri_component(&self) -> &str {
        match self {
            Self::ProtocolViolation(_) => "protocol_violation",
            Self::NoSuchProcedure => "no_such_procedure",
            Self::Canceled => "canceled",
            Self::Timeout => "timeout",
        }
    }
}

/// The error URI reported for an arbitrary error.
///
/// [`RpcError`]s carry their own URI, which is returned unresolved.
pub fn error_uri(error: &Error) -> String {
    if let Some(error) = error.downcast_ref::<RpcError>() {
        return error.error_uri.clone();
    }
    let component = if let Some(error) = error.downcast_ref::<InteractionError>() {
        error.uri_component()
    } else if let Some(error) = error.downcast_ref::<BasicError>() {
        error.uri_component()
    } else if error.downcast_ref::<ArgumentMismatchError>().is_some() {
        "invalid_argument"
    } else if error.downcast_ref::<UnresolvedPrefixError>().is_some()
        || error.downcast_ref::<InvalidUriError>().is_some()
    {
        "invalid_uri"
    } else {
        "internal"
    };
    Uri::wamp_error(component).into()
}

/// Creates an [`struct@Error`] from a standard error URI and description.
///
/// Unknown URIs become an [`RpcError`], so nothing the remote side reported is lost.
pub fn error_from_uri_and_description(
    error_uri: &str,
    description: String,
    details: List,
) -> Error {
    match error_uri {
        "wamp.error.not_found" => BasicError::NotFound(description).into(),
        "wamp.error.invalid_argument" => BasicError::InvalidArgument(description).into(),
        "wamp.error.not_allowed" => BasicError::NotAllowed(description).into(),
        "wamp.error.protocol_violation" => InteractionError::ProtocolViolation(description).into(),
        "wamp.error.no_such_procedure" => InteractionError::NoSuchProcedure.into(),
        "wamp.error.canceled" => InteractionError::Canceled.into(),
        "wamp.error.timeout" => InteractionError::Timeout.into(),
        _ => RpcError {
            error_uri: error_uri.to_owned(),
            description,
            details,
        }
        .into(),
    }
}

#[cfg(test)]
mod error_test {
    use anyhow::Error;

    use crate::core::{
        error::{
            ArgumentMismatchError,
            BasicError,
            InteractionError,
            RpcError,
            UnresolvedPrefixError,
            error_from_uri_and_description,
            error_uri,
        },
        uri::Uri,
    };

    #[test]
    fn maps_errors_to_uris() {
        pretty_assertions::assert_eq!(
            error_uri(&InteractionError::NoSuchProcedure.into()),
            "wamp.error.no_such_procedure"
        );
        pretty_assertions::assert_eq!(
            error_uri(&BasicError::InvalidArgument("bad".to_owned()).into()),
            "wamp.error.invalid_argument"
        );
        pretty_assertions::assert_eq!(
            error_uri(
                &ArgumentMismatchError {
                    procedure: Uri::try_from("calc:add").unwrap(),
                    message: "expected 2 arguments".to_owned(),
                }
                .into()
            ),
            "wamp.error.invalid_argument"
        );
        pretty_assertions::assert_eq!(
            error_uri(&RpcError::new("error:overflow", "too big").into()),
            "error:overflow"
        );
        pretty_assertions::assert_eq!(
            error_uri(
                &UnresolvedPrefixError {
                    token: "x y".to_owned(),
                }
                .into()
            ),
            "wamp.error.invalid_uri"
        );
        pretty_assertions::assert_eq!(error_uri(&Error::msg("oops")), "wamp.error.internal");
    }

    #[test]
    fn constructs_errors_from_uris() {
        assert_matches::assert_matches!(
            error_from_uri_and_description(
                "wamp.error.no_such_procedure",
                "x".to_owned(),
                Vec::new(),
            )
            .downcast::<InteractionError>(),
            Ok(InteractionError::NoSuchProcedure)
        );
        assert_matches::assert_matches!(
            error_from_uri_and_description(
                "http://example.com/error#overflow",
                "too big".to_owned(),
                vec![serde_json::json!(1)],
            )
            .downcast::<RpcError>(),
            Ok(err) => {
                pretty_assertions::assert_eq!(
                    err,
                    RpcError::new("http://example.com/error#overflow", "too big")
                        .with_details(vec![serde_json::json!(1)])
                );
            }
        );
    }
}
