use anyhow::Result;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream,
    WebSocketStream,
    tungstenite::{
        handshake::server::{
            Callback,
            ErrorResponse,
            Request,
            Response,
        },
        http::{
            HeaderValue,
            StatusCode,
            header::SEC_WEBSOCKET_PROTOCOL,
        },
    },
};

use crate::serializer::serializer::SUBPROTOCOL;

fn reject_response<S>(message: S) -> ErrorResponse
where
    S: Into<String>,
{
    let mut response = ErrorResponse::new(Some(message.into()));
    *response.status_mut() = StatusCode::BAD_REQUEST;
    response
}

/// Selects the WAMP subprotocol during the WebSocket handshake.
///
/// Clients that offer subprotocols must offer `wamp`. Clients that offer none are accepted, since
/// many WAMP v1 clients never sent the header.
fn negotiation_callback() -> impl Callback {
    |request: &Request, mut response: Response| -> Result<Response, ErrorResponse> {
        let protocols = match request.headers().get(SEC_WEBSOCKET_PROTOCOL) {
            Some(protocols) => protocols,
            None => return Ok(response),
        };
        let supported = match protocols.to_str() {
            Ok(protocols) => protocols
                .split(',')
                .any(|protocol| protocol.trim() == SUBPROTOCOL),
            Err(_) => false,
        };
        if !supported {
            return Err(reject_response("no supported protocol"));
        }
        response
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));
        Ok(response)
    }
}

/// Accepts a WebSocket connection for WAMP messaging over a TCP stream.
pub async fn accept(stream: TcpStream) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    let stream =
        tokio_tungstenite::accept_hdr_async(MaybeTlsStream::Plain(stream), negotiation_callback())
            .await?;
    Ok(stream)
}
