//! Runtime tests against a local WebSocket server.

#![cfg(feature = "transport")]

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use meadow_client::{
    ClientConfig, ConnectionStatus, StatusReport,
    runtime::{ClientHandle, Runtime, RuntimeError},
};
use meadow_core::{ReconnectPolicy, SessionConfig};
use meadow_proto::Snapshot;
use tokio::{net::TcpListener, sync::watch};
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};

const FARM: &str = r#"{"resources":{"eggs":5,"money":120,"feed":10},
    "animals":[{"name":"Clucky","type":"chicken","health":100,"hunger":0}],
    "weather":"sunny","total_days":1}"#;

type ServerSocket = WebSocketStream<tokio::net::TcpStream>;

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}", listener.local_addr().unwrap());
    (listener, endpoint)
}

async fn accept(listener: &TcpListener) -> ServerSocket {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

async fn next_text(socket: &mut ServerSocket) -> String {
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => return text.as_str().to_owned(),
            Some(Ok(_)) => {},
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

async fn reply(socket: &mut ServerSocket, text: String) {
    socket.send(Message::Text(text.into())).await.unwrap();
}

fn config(endpoint: String) -> ClientConfig {
    ClientConfig {
        session: SessionConfig {
            endpoint,
            reconnect: ReconnectPolicy::Fixed { delay: Duration::from_millis(50) },
        },
        ..ClientConfig::default()
    }
}

async fn wait_snapshot(handle: &ClientHandle, pred: impl Fn(&Snapshot) -> bool) -> Snapshot {
    let mut rx = handle.watch_snapshot();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| pred(s)))
        .await
        .expect("timed out waiting for snapshot")
        .unwrap()
        .clone();
    snapshot
}

async fn wait_status(
    rx: &mut watch::Receiver<StatusReport>,
    pred: impl Fn(&StatusReport) -> bool,
) -> StatusReport {
    let report = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|r| pred(r)))
        .await
        .expect("timed out waiting for status")
        .unwrap()
        .clone();
    report
}

#[tokio::test]
async fn state_request_then_command_round_trip() {
    let (listener, endpoint) = listen().await;

    let server = tokio::spawn(async move {
        let mut socket = accept(&listener).await;
        assert_eq!(next_text(&mut socket).await, "STATE");
        reply(&mut socket, format!(r#"{{"type":"initial_state","state":{FARM}}}"#)).await;

        let command = next_text(&mut socket).await;
        assert_eq!(command, r#"{"action":"buy_animal","type":"chicken","name":"Henrietta"}"#);
        let farm = FARM.replace("\"money\":120", "\"money\":70").replace(
            r#""animals":["#,
            r#""animals":[{"name":"Henrietta","type":"chicken","health":100,"hunger":0},"#,
        );
        reply(
            &mut socket,
            format!(r#"{{"type":"action_result","success":"Bought chicken","state":{farm}}}"#),
        )
        .await;

        // Hold the socket until the client closes it.
        while let Some(Ok(_)) = socket.next().await {}
    });

    let (runtime, handle) = Runtime::new(config(endpoint));
    let runtime = tokio::spawn(runtime.run());

    let snapshot = wait_snapshot(&handle, |s| !s.animals.is_empty()).await;
    assert_eq!(snapshot.weather, "sunny");

    handle.buy_animal("chicken", "Henrietta").await.unwrap();
    let snapshot = wait_snapshot(&handle, |s| s.animals.len() == 2).await;
    assert_eq!(snapshot.funds(), Some(70.0));

    let mut status = handle.watch_status();
    let report = wait_status(&mut status, |r| r.last_notice.is_some()).await;
    assert_eq!(report.last_notice.as_deref(), Some("Bought chicken"));
    assert_eq!(report.connection, ConnectionStatus::Connected);

    handle.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), runtime).await.unwrap().unwrap();
    server.await.unwrap();

    assert!(matches!(handle.feed_animals().await, Err(RuntimeError::Stopped)));
}

#[tokio::test]
async fn rejected_intent_is_not_transmitted() {
    let (listener, endpoint) = listen().await;

    let server = tokio::spawn(async move {
        let mut socket = accept(&listener).await;
        assert_eq!(next_text(&mut socket).await, "STATE");
        reply(&mut socket, format!(r#"{{"type":"initial_state","state":{FARM}}}"#)).await;

        // Anything after the snapshot must be the feed purchase.
        assert_eq!(next_text(&mut socket).await, r#"{"action":"buy_feed","amount":10}"#);
        while let Some(Ok(_)) = socket.next().await {}
    });

    let (runtime, handle) = Runtime::new(config(endpoint));
    let runtime = tokio::spawn(runtime.run());
    wait_snapshot(&handle, |s| s.total_days == 1).await;

    let err = handle.buy_animal("cow", "Bessie").await.unwrap_err();
    assert!(matches!(err, RuntimeError::Client(_)));
    assert!(handle.report().last_error.is_some());

    handle.buy_feed(10).await.unwrap();
    handle.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), runtime).await.unwrap().unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn reconnects_after_server_drop() {
    let (listener, endpoint) = listen().await;

    let server = tokio::spawn(async move {
        let mut first = accept(&listener).await;
        assert_eq!(next_text(&mut first).await, "STATE");
        reply(&mut first, format!(r#"{{"type":"initial_state","state":{FARM}}}"#)).await;
        first.close(None).await.unwrap();
        drop(first);

        let mut second = accept(&listener).await;
        assert_eq!(next_text(&mut second).await, "STATE");
        let farm = FARM.replace("\"total_days\":1", "\"total_days\":2");
        reply(&mut second, format!(r#"{{"type":"initial_state","state":{farm}}}"#)).await;
        while let Some(Ok(_)) = second.next().await {}
    });

    let (runtime, handle) = Runtime::new(config(endpoint));
    let mut status = handle.watch_status();
    let runtime = tokio::spawn(runtime.run());

    // The second connection's snapshot can only arrive through a reconnect.
    wait_snapshot(&handle, |s| s.total_days == 2).await;
    wait_status(&mut status, |r| r.connection == ConnectionStatus::Connected).await;

    handle.shutdown().await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), runtime).await.unwrap().unwrap();
    server.await.unwrap();
}
