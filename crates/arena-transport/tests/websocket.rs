//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener on an OS-assigned port and talk to it
//! with a `tokio-tungstenite` client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use arena_transport::{
        Connection, Transport, Upgrade, WebSocketConnection, WebSocketTransport,
    };
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds a transport on port 0, connects one client, and returns both
    /// ends of the connection.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            let pending = transport.accept().await.expect("should accept");
            pending.upgrade().await.expect("should upgrade")
        });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("accept task");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_send_and_receive_both_directions() {
        let (conn, mut client) = connected_pair().await;
        assert!(conn.id().into_inner() > 0);

        conn.send(br#"{"type":"hello"}"#).await.expect("send");
        let msg = client.next().await.unwrap().unwrap();
        // UTF-8 payloads travel as text frames.
        assert!(msg.is_text());
        assert_eq!(msg.into_data().as_ref(), br#"{"type":"hello"}"#);

        client
            .send(Message::text(r#"{"type":"player_shoot"}"#))
            .await
            .unwrap();
        let received = conn.recv().await.expect("recv").expect("data");
        assert_eq!(received, br#"{"type":"player_shoot"}"#);

        conn.close().await.expect("close");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (conn, mut client) = connected_pair().await;

        client.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_send_is_not_blocked_by_pending_recv() {
        let (conn, mut client) = connected_pair().await;
        let conn = Arc::new(conn);

        // Park a reader on the connection; the client stays silent.
        let reader = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), conn.send(b"tick"))
            .await
            .expect("send must not wait for the parked reader")
            .expect("send");
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"tick");

        client.send(Message::Close(None)).await.unwrap();
        let read = reader.await.expect("reader task").expect("recv");
        assert!(read.is_none());
    }

    #[tokio::test]
    async fn test_websocket_idle_for_resets_on_inbound_frame() {
        let (conn, mut client) = connected_pair().await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(conn.idle_for() >= Duration::from_millis(50));

        client.send(Message::text("x")).await.unwrap();
        conn.recv().await.expect("recv").expect("data");
        assert!(conn.idle_for() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_websocket_ping_reaches_client() {
        let (conn, mut client) = connected_pair().await;

        conn.ping().await.expect("ping");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_ping());
    }

    #[tokio::test]
    async fn test_websocket_accept_returns_before_upgrade_request() {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        // A raw TCP peer that never sends the HTTP upgrade.
        let _silent = tokio::net::TcpStream::connect(addr).await.expect("tcp connect");
        let pending = tokio::time::timeout(Duration::from_secs(1), transport.accept())
            .await
            .expect("accept must not wait for the upgrade request")
            .expect("should accept");
        assert!(pending.id().into_inner() > 0);

        let upgrade = tokio::time::timeout(Duration::from_millis(100), pending.upgrade()).await;
        assert!(upgrade.is_err(), "upgrade waits for the peer");
    }
}
