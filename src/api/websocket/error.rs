use std::{io, result, string::FromUtf8Error, sync::Arc};

use fastwebsockets::{OpCode, WebSocketError};
use hyper::http;
use thiserror::Error;
use tokio_rustls::rustls::pki_types::InvalidDnsNameError;

use super::state::WsConnectionStatus;

#[derive(Error, Debug)]
pub enum WebSocketApiError {
    #[error("NotConnected error, {0}")]
    NotConnected(Arc<WsConnectionStatus>),

    #[error("AlreadyRunning error, the stream loop can only be driven once")]
    AlreadyRunning,

    #[error("Terminated error, {0}")]
    Terminated(Arc<WsConnectionStatus>),

    #[error("InvalidDnsName error, {0}")]
    InvalidDnsName(InvalidDnsNameError),

    #[error("CreateTcpStream error, {0}")]
    CreateTcpStream(io::Error),

    #[error("ConnectTcpStream error, {0}")]
    ConnectTcpStream(io::Error),

    #[error("HttpUpgradeRequest error, {0}")]
    HttpUpgradeRequest(http::Error),

    #[error("Handshake error, {0}")]
    Handshake(WebSocketError),

    #[error("WriteFrame error, {0}")]
    WriteFrame(WebSocketError),

    #[error("EncodeJson error, {0}")]
    EncodeJson(serde_json::Error),

    #[error("ReadFrame error, {0}")]
    ReadFrame(WebSocketError),

    #[error("DecodeText error, {0}")]
    DecodeText(FromUtf8Error),

    #[error("DecodeJson error, {0}")]
    DecodeJson(serde_json::Error),

    #[error("UnhandledOpCode error, {0:?}")]
    UnhandledOpCode(OpCode),

    #[error("ServerRequestedClose error")]
    ServerRequestedClose,

    #[error("NoServerPong error")]
    NoServerPong,

    #[error("AuthenticationTimeout error")]
    AuthenticationTimeout,

    #[error("AuthenticationFailed error, code {code:?}: {msg}")]
    AuthenticationFailed { code: Option<u16>, msg: String },

    #[error("StreamError error, code {code}: {msg}")]
    StreamError { code: u16, msg: String },
}

impl WebSocketApiError {
    /// Returns `true` for errors that reconnecting can not fix.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::AuthenticationFailed { .. } | Self::AlreadyRunning | Self::Terminated(_) => true,
            // Connection limit exceeded, insufficient subscription
            Self::StreamError { code, .. } => matches!(code, 406 | 409),
            _ => false,
        }
    }
}

pub(crate) type Result<T> = result::Result<T, WebSocketApiError>;
