//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and drive it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use duel_relay_transport::{
        Connection, DEFAULT_PATH, Transport, TransportError, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn bind() -> (WebSocketTransport, String) {
        let transport = WebSocketTransport::bind("127.0.0.1:0", DEFAULT_PATH)
            .await
            .expect("should bind");
        let addr = transport
            .local_addr()
            .expect("should have local addr")
            .to_string();
        (transport, addr)
    }

    async fn connect_client(addr: &str, path: &str) -> ClientWs {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}{path}"))
            .await
            .expect("client should connect");
        ws
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (mut transport, addr) = bind().await;

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let mut client_ws = connect_client(&addr, DEFAULT_PATH).await;
        let server_conn = server_handle.await.expect("task should complete");
        assert!(server_conn.id().into_inner() > 0);

        // JSON goes out as a text frame.
        server_conn
            .send(br#"{"type":"start"}"#)
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_data().as_ref(), br#"{"type":"start"}"#);

        client_ws
            .send(Message::Text(r#"{"type":"join","room":"arena1"}"#.into()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":"join","room":"arena1"}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_non_utf8_goes_out_as_binary() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let mut client_ws = connect_client(&addr, DEFAULT_PATH).await;
        let server_conn = server_handle.await.unwrap();

        server_conn.send(&[0xff, 0xfe]).await.unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_binary());
        assert_eq!(msg.into_data().as_ref(), &[0xff, 0xfe]);
    }

    #[tokio::test]
    async fn test_websocket_binary_json_comes_back_as_text() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let mut client_ws = connect_client(&addr, DEFAULT_PATH).await;
        let server_conn = server_handle.await.unwrap();

        let payload = br#"{"type":"update","x":5}"#;
        client_ws
            .send(Message::Binary(payload.to_vec().into()))
            .await
            .unwrap();
        let received = server_conn.recv().await.unwrap().unwrap();
        assert_eq!(received, payload);

        // Only bytes cross the connection handle; the frame type is
        // chosen again on the way out.
        server_conn.send(&received).await.unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_data().as_ref(), payload);
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let mut client_ws = connect_client(&addr, DEFAULT_PATH).await;
        let server_conn = server_handle.await.unwrap();

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_send_while_recv_is_parked() {
        let (mut transport, addr) = bind().await;
        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });
        let mut client_ws = connect_client(&addr, DEFAULT_PATH).await;
        let server_conn =
            std::sync::Arc::new(server_handle.await.unwrap());

        let reader = std::sync::Arc::clone(&server_conn);
        let parked = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(
            Duration::from_secs(1),
            server_conn.send(br#"{"type":"start"}"#),
        )
        .await
        .expect("send must not wait behind recv")
        .unwrap();
        let msg = client_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), br#"{"type":"start"}"#);

        client_ws.send(Message::Text("ping".into())).await.unwrap();
        let got = parked.await.unwrap().unwrap();
        assert_eq!(got.as_deref(), Some(&b"ping"[..]));
    }

    #[tokio::test]
    async fn test_websocket_rejects_other_paths() {
        let (mut transport, addr) = bind().await;
        let server_handle =
            tokio::spawn(async move { transport.accept().await.map(|_| ()) });

        let client = tokio_tungstenite::connect_async(format!(
            "ws://{addr}/elsewhere"
        ))
        .await;
        assert!(client.is_err(), "upgrade on the wrong path must fail");

        let accepted = server_handle.await.unwrap();
        assert!(matches!(accepted, Err(TransportError::Upgrade(_))));
    }

    #[tokio::test]
    async fn test_idle_tcp_client_does_not_block_next_upgrade() {
        let (mut transport, addr) = bind().await;

        // A TCP client that never sends a handshake.
        let _idle = tokio::net::TcpStream::connect(&addr).await.unwrap();
        let stalled = transport.accept_stream().await.unwrap();
        let stalled_upgrade = tokio::spawn(stalled.upgrade());

        let client = tokio::spawn({
            let addr = addr.clone();
            async move { connect_client(&addr, DEFAULT_PATH).await }
        });
        let pending = tokio::time::timeout(
            Duration::from_secs(1),
            transport.accept_stream(),
        )
        .await
        .expect("listener must keep accepting")
        .unwrap();
        let conn = pending.upgrade().await.expect("second client upgrades");
        assert!(conn.id().into_inner() > 0);
        client.await.unwrap();

        assert!(!stalled_upgrade.is_finished());
        stalled_upgrade.abort();
    }
}
