use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use fastwebsockets::{FragmentCollector, Frame, OpCode, WebSocketError, handshake};
use http_body_util::Empty;
use hyper::{
    Request,
    body::Bytes,
    header::{CONNECTION, UPGRADE},
    upgrade::Upgraded,
};
use hyper_util::rt::TokioIo;
use tokio::{net::TcpStream, time};
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore, pki_types::ServerName},
};
use webpki_roots::TLS_SERVER_ROOTS;

use super::super::error::{Result, WebSocketApiError};

#[derive(Clone, Debug)]
pub(super) enum WsMessage {
    Close,
    Text(String),
    Ping(Vec<u8>),
    Pong,
}

struct SpawnExecutor;

impl<Fut> hyper::rt::Executor<Fut> for SpawnExecutor
where
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    fn execute(&self, fut: Fut) {
        tokio::task::spawn(fut);
    }
}

pub(super) struct WebSocketApiConnection(FragmentCollector<TokioIo<Upgraded>>);

impl WebSocketApiConnection {
    pub async fn new(domain: &str, path: &str) -> Result<Self> {
        let api_addr = format!("{domain}:443");
        let api_uri = format!("wss://{domain}{path}");

        let server_name = ServerName::try_from(domain.to_string())
            .map_err(WebSocketApiError::InvalidDnsName)?;

        let tls_connector = {
            let mut root_cert_store = RootCertStore::empty();
            root_cert_store.extend(TLS_SERVER_ROOTS.iter().cloned());

            let config = ClientConfig::builder()
                .with_root_certificates(root_cert_store)
                .with_no_client_auth();

            TlsConnector::from(Arc::new(config))
        };

        let tcp_stream = TcpStream::connect(&api_addr)
            .await
            .map_err(WebSocketApiError::CreateTcpStream)?;
        let tls_stream = tls_connector
            .connect(server_name, tcp_stream)
            .await
            .map_err(WebSocketApiError::ConnectTcpStream)?;

        let req = Request::builder()
            .method("GET")
            .uri(api_uri)
            .header("Host", domain)
            .header(UPGRADE, "websocket")
            .header(CONNECTION, "upgrade")
            .header("Sec-WebSocket-Key", handshake::generate_key())
            .header("Sec-WebSocket-Version", "13")
            .body(Empty::<Bytes>::new())
            .map_err(WebSocketApiError::HttpUpgradeRequest)?;

        let (ws, _) = handshake::client(&SpawnExecutor, req, tls_stream)
            .await
            .map_err(WebSocketApiError::Handshake)?;
        let ws = FragmentCollector::new(ws);

        Ok(Self(ws))
    }

    async fn send_frame(&mut self, frame: Frame<'_>) -> Result<()> {
        self.0
            .write_frame(frame)
            .await
            .map_err(WebSocketApiError::WriteFrame)
    }

    pub async fn send_text(&mut self, text: String) -> Result<()> {
        let frame = Frame::text(text.into_bytes().into());
        self.send_frame(frame).await
    }

    pub async fn send_close(&mut self) -> Result<()> {
        let frame = Frame::close(1000, &[]);
        self.send_frame(frame).await
    }

    pub async fn send_pong(&mut self, payload: Vec<u8>) -> Result<()> {
        let frame = Frame::pong(payload.into());
        self.send_frame(frame).await
    }

    pub async fn send_ping(&mut self) -> Result<()> {
        let frame = Frame::new(true, OpCode::Ping, None, Vec::new().into());
        self.send_frame(frame).await
    }

    pub async fn read_message(&mut self) -> Result<WsMessage> {
        let frame = match self.0.read_frame().await {
            Ok(frame) => frame,
            Err(WebSocketError::ConnectionClosed) => return Ok(WsMessage::Close),
            Err(e) => return Err(WebSocketApiError::ReadFrame(e)),
        };

        let message = match frame.opcode {
            // The trading stream sends its JSON payloads as binary frames
            OpCode::Text | OpCode::Binary => {
                let text = String::from_utf8(frame.payload.to_vec())
                    .map_err(WebSocketApiError::DecodeText)?;
                WsMessage::Text(text)
            }
            OpCode::Close => WsMessage::Close,
            OpCode::Ping => WsMessage::Ping(frame.payload.to_vec()),
            OpCode::Pong => WsMessage::Pong,
            unhandled_opcode => {
                return Err(WebSocketApiError::UnhandledOpCode(unhandled_opcode));
            }
        };

        Ok(message)
    }

    /// Reads the next text payload, answering pings on the way.
    ///
    /// Used during the authentication exchange, before the heartbeat loop takes over.
    pub async fn read_text(&mut self, timeout: Duration) -> Result<String> {
        let read = async {
            loop {
                match self.read_message().await? {
                    WsMessage::Text(text) => return Ok(text),
                    WsMessage::Ping(payload) => self.send_pong(payload).await?,
                    WsMessage::Pong => {}
                    WsMessage::Close => return Err(WebSocketApiError::ServerRequestedClose),
                }
            }
        };

        time::timeout(timeout, read)
            .await
            .map_err(|_| WebSocketApiError::AuthenticationTimeout)?
    }
}

/// Silence detector: a connection quiet for one interval gets pinged, a connection quiet for
/// another interval after the ping is considered dead.
pub(super) struct Heartbeat {
    interval: Duration,
    timer: Pin<Box<time::Sleep>>,
    waiting_for_pong: bool,
}

impl Heartbeat {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timer: Box::pin(time::sleep(interval)),
            waiting_for_pong: false,
        }
    }

    /// Any incoming frame proves the connection alive.
    pub fn reset(&mut self) {
        self.waiting_for_pong = false;
        self.timer
            .as_mut()
            .reset(time::Instant::now() + self.interval);
    }

    pub async fn expired(&mut self) {
        self.timer.as_mut().await
    }

    /// Handles an expired timer, pinging the server or failing if a ping is already pending.
    pub async fn on_expired(&mut self, ws: &mut WebSocketApiConnection) -> Result<()> {
        if self.waiting_for_pong {
            return Err(WebSocketApiError::NoServerPong);
        }

        ws.send_ping().await?;

        self.waiting_for_pong = true;
        self.timer
            .as_mut()
            .reset(time::Instant::now() + self.interval);

        Ok(())
    }
}
