//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::{Connection, ConnectionId, Transport, TransportError};

/// The path clients upgrade on unless configured otherwise.
pub const DEFAULT_PATH: &str = "/ws";

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
///
/// Upgrades are only accepted on one path. The `Origin` header is never
/// inspected, so browser clients from any site may connect.
pub struct WebSocketTransport {
    listener: TcpListener,
    path: String,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address, accepting
    /// upgrades on `path`.
    pub async fn bind(addr: &str, path: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, path, "WebSocket transport listening");
        Ok(Self {
            listener,
            path: path.to_string(),
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns the path upgrades are accepted on.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Accepts the next TCP connection without upgrading it.
    ///
    /// The upgrade waits on the client, so a server should run
    /// [`PendingUpgrade::upgrade`] off its accept loop.
    pub async fn accept_stream(
        &mut self,
    ) -> Result<PendingUpgrade, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(PendingUpgrade {
            stream,
            addr,
            path: self.path.clone(),
        })
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        self.accept_stream().await?.upgrade().await
    }
}

/// A TCP connection that has not yet completed its WebSocket handshake.
pub struct PendingUpgrade {
    stream: TcpStream,
    addr: SocketAddr,
    path: String,
}

impl PendingUpgrade {
    /// The remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Runs the WebSocket handshake. Requests for any path other than the
    /// transport's get a 404.
    pub async fn upgrade(self) -> Result<WebSocketConnection, TransportError> {
        let Self { stream, addr, path } = self;
        let check_path = move |req: &Request, resp: Response| {
            if req.uri().path() == path {
                Ok(resp)
            } else {
                let mut err = ErrorResponse::new(Some(format!(
                    "no WebSocket endpoint at {}",
                    req.uri().path()
                )));
                *err.status_mut() = StatusCode::NOT_FOUND;
                Err(err)
            }
        };

        let ws = tokio_tungstenite::accept_hdr_async(stream, check_path)
            .await
            .map_err(|e| {
                tracing::debug!(%addr, error = %e, "WebSocket upgrade refused");
                TransportError::Upgrade(e.to_string())
            })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %addr, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
///
/// The socket is split so that a send never waits behind a parked
/// `recv`.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        // The wire format is JSON, so frames go out as text whenever
        // they can.
        let msg = match String::from_utf8(data.to_vec()) {
            Ok(text) => Message::Text(text.into()),
            Err(e) => Message::Binary(e.into_bytes().into()),
        };
        self.sink.lock().await.send(msg).await.map_err(send_error)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink.lock().await.close().await.map_err(send_error)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

fn send_error(e: tungstenite::Error) -> TransportError {
    match e {
        tungstenite::Error::ConnectionClosed
        | tungstenite::Error::AlreadyClosed => {
            TransportError::ConnectionClosed(e.to_string())
        }
        other => TransportError::SendFailed(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            other,
        )),
    }
}
