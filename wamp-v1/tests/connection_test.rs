use std::{
    sync::Arc,
    time::Duration,
};

use anyhow::Error;
use futures_util::{
    SinkExt,
    StreamExt,
};
use serde_json::json;
use tokio_tungstenite::{
    connect_async,
    tungstenite::Message as WebSocketMessage,
};
use wamp_v1::{
    client::{
        Client,
        ClientConfig,
    },
    core::uri::Uri,
    listener::{
        DEFAULT_SERVER_IDENT,
        EmptyListenerObserver,
        Listener,
        ListenerConfig,
        ListenerHandle,
    },
};

async fn start_listener() -> ListenerHandle {
    let listener = Arc::new(Listener::new(
        ListenerConfig::default(),
        Box::new(EmptyListenerObserver::default()),
    ));
    listener
        .register_typed_fn(
            Uri::try_from("http://example.com/calc#add").unwrap(),
            |(a, b): (i64, i64)| async move { Ok::<_, Error>(a + b) },
        )
        .await;
    listener.start().await.unwrap()
}

async fn wait_for_sessions(handle: &ListenerHandle, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while handle.listener().sessions().len() != count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn client_establishes_session_over_web_socket() {
    test_utils::setup::setup_test_environment();

    let handle = start_listener().await;
    let client = Client::connect(
        ClientConfig::default(),
        &format!("ws://{}", handle.local_addr()),
    )
    .await
    .unwrap();

    pretty_assertions::assert_eq!(client.session_id().as_str().len(), 16);
    pretty_assertions::assert_eq!(client.server_ident(), DEFAULT_SERVER_IDENT);
    pretty_assertions::assert_eq!(
        handle.listener().sessions(),
        vec![client.session_id().clone()]
    );

    assert_matches::assert_matches!(
        client.call_typed::<_, i64>("http://example.com/calc#add", (1, 2)).await,
        Ok(3)
    );

    let mut subscription = client.subscribe("http://example.com/simple").await.unwrap();
    client
        .publish_all("http://example.com/simple", json!({"hello": "world"}))
        .await
        .unwrap();
    assert_matches::assert_matches!(subscription.event_rx.recv().await, Ok(event) => {
        pretty_assertions::assert_eq!(event.event, json!({"hello": "world"}));
    });

    assert_matches::assert_matches!(client.disconnect().await, Ok(()));
    wait_for_sessions(&handle, 0).await;

    handle.cancel().unwrap();
    assert_matches::assert_matches!(handle.join().await, Ok(()));
}

#[tokio::test]
async fn accepts_handshake_without_subprotocol() {
    test_utils::setup::setup_test_environment();

    let handle = start_listener().await;
    let (mut stream, _) = connect_async(format!("ws://{}", handle.local_addr()))
        .await
        .unwrap();

    let welcome = match stream.next().await {
        Some(Ok(WebSocketMessage::Text(text))) => {
            serde_json::from_str::<serde_json::Value>(&text).unwrap()
        }
        message => panic!("expected WELCOME message, received {message:?}"),
    };
    pretty_assertions::assert_eq!(welcome[0], json!(0));
    pretty_assertions::assert_eq!(welcome[2], json!(1));
    pretty_assertions::assert_eq!(welcome[3], json!(DEFAULT_SERVER_IDENT));

    stream
        .send(WebSocketMessage::text(r#"[2, "1", "http://example.com/calc#add", 4, 5]"#))
        .await
        .unwrap();
    let result = match stream.next().await {
        Some(Ok(WebSocketMessage::Text(text))) => {
            serde_json::from_str::<serde_json::Value>(&text).unwrap()
        }
        message => panic!("expected CALLRESULT message, received {message:?}"),
    };
    pretty_assertions::assert_eq!(result, json!([3, "1", 9]));

    stream
        .send(WebSocketMessage::text(r#"[2, "2", "http://example.com/missing"]"#))
        .await
        .unwrap();
    let error = match stream.next().await {
        Some(Ok(WebSocketMessage::Text(text))) => {
            serde_json::from_str::<serde_json::Value>(&text).unwrap()
        }
        message => panic!("expected CALLERROR message, received {message:?}"),
    };
    pretty_assertions::assert_eq!(
        error,
        json!([4, "2", "wamp.error.no_such_procedure", "no such procedure"])
    );

    // Binary frames are not WAMP v1.
    stream
        .send(WebSocketMessage::binary(vec![1, 2, 3]))
        .await
        .unwrap();
    wait_for_sessions(&handle, 0).await;

    handle.cancel().unwrap();
    assert_matches::assert_matches!(handle.join().await, Ok(()));
}

#[tokio::test]
async fn stopping_listener_closes_sessions() {
    test_utils::setup::setup_test_environment();

    let handle = start_listener().await;
    let client = Client::connect(
        ClientConfig::default(),
        &format!("ws://{}", handle.local_addr()),
    )
    .await
    .unwrap();
    wait_for_sessions(&handle, 1).await;

    let listener = handle.listener().clone();
    assert_matches::assert_matches!(handle.stop().await, Ok(()));
    tokio::time::timeout(Duration::from_secs(5), async {
        while !listener.sessions().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while client
            .call("http://example.com/calc#add", vec![json!(1), json!(1)])
            .await
            .is_ok()
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}
