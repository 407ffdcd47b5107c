use anyhow::{
    Error,
    Result,
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream,
    WebSocketStream,
    connect_async,
    tungstenite::{
        ClientRequestBuilder,
        http::header::SEC_WEBSOCKET_PROTOCOL,
    },
};

use crate::{
    client::client::ClientConfig,
    serializer::serializer::SUBPROTOCOL,
};

/// Opens a WebSocket connection to a listener, offering the WAMP subprotocol.
pub async fn connect(
    config: &ClientConfig,
    uri: &str,
) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    let mut request = ClientRequestBuilder::new(uri.try_into()?).with_sub_protocol(SUBPROTOCOL);
    if !config.agent.is_empty() {
        request = request.with_header("User-Agent", &config.agent);
    }

    let (stream, response) = connect_async(request).await?;
    if let Some(protocol) = response.headers().get(SEC_WEBSOCKET_PROTOCOL) {
        let protocol = protocol.to_str()?;
        if protocol != SUBPROTOCOL {
            return Err(Error::msg(format!(
                "listener selected unsupported subprotocol {protocol}"
            )));
        }
    }
    Ok(stream)
}
