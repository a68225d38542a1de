//! Authenticated WebSocket session.
//!
//! A [`Session`] owns one persistent connection to the Home Assistant
//! WebSocket API. [`Session::connect`] dials and runs the authentication
//! handshake; afterwards [`Session::call`] exchanges one command for one
//! reply at a time.
//!
//! Replies are correlated with requests by program order: every call
//! writes its envelope and then blocks for the next frame. `call` takes
//! `&mut self`, so two commands can never be in flight on the same
//! session, and the id check on the reply only detects desync. Admitting
//! pipelined commands would need an id-keyed pending-request table and a
//! dedicated reader task.
//!
//! # Example
//!
//! ```rust,ignore
//! use hactl_api::Session;
//! use secrecy::SecretString;
//! use url::Url;
//!
//! let url = Url::parse("http://homeassistant.local:8123")?;
//! let token = SecretString::from("long-lived-token".to_string());
//!
//! let mut session = Session::connect(&url, &token, hactl_api::DEFAULT_HANDSHAKE_TIMEOUT).await?;
//! let registry = session.resolve_registry().await?;
//! session.close().await;
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace};
use url::Url;

use crate::error::Error;
use crate::protocol::{
    AUTH, AUTH_INVALID, AUTH_OK, AUTH_REQUIRED, AuthFrame, HandshakeFrame, ResponseEnvelope,
    command_envelope,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on dial + handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

const WEBSOCKET_PATH: &str = "/api/websocket";
const ENTITY_REGISTRY_UPDATE: &str = "config/entity_registry/update";

/// Close code reported when the stream ends without a close frame.
const ABNORMAL_CLOSURE: u16 = 1006;

// ── URL mapping ──────────────────────────────────────────────────────

/// Derive the WebSocket endpoint from a server URL.
///
/// `http(s)://host:port[/prefix]` becomes `ws(s)://host:port[/prefix]/api/websocket`.
/// A `ws(s)://` URL is used as-is when it already has a path, otherwise the
/// API path is appended.
pub fn websocket_url(base: &Url) -> Result<Url, Error> {
    let mut url = base.clone();
    let append_path = match base.scheme() {
        "http" => {
            set_scheme(&mut url, "ws")?;
            true
        }
        "https" => {
            set_scheme(&mut url, "wss")?;
            true
        }
        "ws" | "wss" => matches!(base.path(), "" | "/"),
        other => return Err(Error::UnsupportedScheme(other.to_owned())),
    };

    if append_path {
        let prefix = base.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{prefix}{WEBSOCKET_PATH}"));
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn set_scheme(url: &mut Url, scheme: &str) -> Result<(), Error> {
    url.set_scheme(scheme)
        .map_err(|()| Error::UnsupportedScheme(url.scheme().to_owned()))
}

// ── Session ──────────────────────────────────────────────────────────

/// One authenticated, full-duplex connection.
///
/// Dropping a session releases the socket; [`close`](Self::close) also
/// sends a close frame first.
pub struct Session {
    ws: WsStream,
    next_id: u64,
    ha_version: Option<String>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("next_id", &self.next_id)
            .field("ha_version", &self.ha_version)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Dial the server and run the authentication handshake.
    ///
    /// Fails with [`Error::WebSocketConnect`] when the server cannot be
    /// reached, [`Error::Authentication`] when the token is rejected and
    /// [`Error::Handshake`] when the server goes off-script. On every
    /// failure path the connection is released before returning.
    pub async fn connect(
        base_url: &Url,
        token: &SecretString,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let ws_url = websocket_url(base_url)?;
        tokio::time::timeout(timeout, Self::open(&ws_url, token))
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: timeout.as_secs(),
            })?
    }

    async fn open(ws_url: &Url, token: &SecretString) -> Result<Self, Error> {
        // Only one provider is compiled in; an Err just means it is already set.
        let _ = rustls::crypto::ring::default_provider().install_default();

        info!(url = %ws_url, "connecting to WebSocket API");
        let (ws, _response) = tokio_tungstenite::connect_async(ws_url.as_str())
            .await
            .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

        let mut session = Self {
            ws,
            next_id: 1,
            ha_version: None,
        };

        match session.authenticate(token).await {
            Ok(()) => {
                info!(version = session.ha_version.as_deref().unwrap_or("?"), "authenticated");
                Ok(session)
            }
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    /// `auth_required` → `auth` → `auth_ok` | `auth_invalid`.
    async fn authenticate(&mut self, token: &SecretString) -> Result<(), Error> {
        let hello = self.read_handshake_frame().await?;
        if hello.frame_type != AUTH_REQUIRED {
            return Err(Error::Handshake {
                expected: AUTH_REQUIRED,
                got: hello.frame_type,
            });
        }
        self.ha_version = hello.ha_version;

        let auth = AuthFrame {
            frame_type: AUTH,
            access_token: token.expose_secret(),
        };
        let text = serde_json::to_string(&auth).map_err(|e| Error::Protocol {
            message: format!("failed to encode auth frame: {e}"),
        })?;
        debug!("sending auth frame");
        self.write_text(text).await?;

        let verdict = self.read_handshake_frame().await?;
        match verdict.frame_type.as_str() {
            AUTH_OK => {
                if verdict.ha_version.is_some() {
                    self.ha_version = verdict.ha_version;
                }
                Ok(())
            }
            AUTH_INVALID => Err(Error::Authentication {
                message: verdict
                    .message
                    .unwrap_or_else(|| "invalid access token".into()),
            }),
            _ => Err(Error::Handshake {
                expected: "auth_ok or auth_invalid",
                got: verdict.frame_type,
            }),
        }
    }

    async fn read_handshake_frame(&mut self) -> Result<HandshakeFrame, Error> {
        let text = self.read_frame().await?;
        serde_json::from_str(&text).map_err(|e| Error::deserialization(&e, &text))
    }

    /// Server version announced during the handshake.
    pub fn ha_version(&self) -> Option<&str> {
        self.ha_version.as_deref()
    }

    /// The id the next command will carry.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    // ── Command / response ───────────────────────────────────────────

    /// Reserve the next command id. Ids are never reused, even when the
    /// call that took one fails.
    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Send a command and return the decoded reply envelope, whatever its
    /// `success` flag.
    ///
    /// `params` is merged into the envelope next to `id` and `type`; pass
    /// `Value::Null` for none.
    pub async fn call_raw(
        &mut self,
        command: &str,
        params: Value,
    ) -> Result<ResponseEnvelope, Error> {
        let id = self.allocate_id();
        let envelope = command_envelope(id, command, params)?;

        debug!(id, command, "sending command");
        self.write_text(envelope.to_string()).await?;

        let text = self.read_frame().await?;
        let reply: ResponseEnvelope =
            serde_json::from_str(&text).map_err(|e| Error::deserialization(&e, &text))?;

        if reply.id != Some(id) {
            return Err(Error::Protocol {
                message: format!(
                    "reply id {} does not match request id {id}",
                    reply.id.map_or_else(|| "<none>".into(), |got| got.to_string()),
                ),
            });
        }
        trace!(id, success = ?reply.success, "received reply");
        Ok(reply)
    }

    /// Send a command and return its `result` payload.
    ///
    /// `success: false` becomes [`Error::Api`] carrying the server message.
    pub async fn call(&mut self, command: &str, params: Value) -> Result<Value, Error> {
        self.call_raw(command, params).await?.into_result()
    }

    /// Send a command and deserialize its `result` payload into `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &mut self,
        command: &str,
        params: Value,
    ) -> Result<T, Error> {
        let result = self.call(command, params).await?;
        serde_json::from_value(result.clone())
            .map_err(|e| Error::deserialization(&e, &result.to_string()))
    }

    // ── Entity registry updates ──────────────────────────────────────

    /// Toggle whether an entity is exposed to the voice assistant.
    pub async fn set_exposed(&mut self, entity_id: &str, exposed: bool) -> Result<(), Error> {
        self.call(
            ENTITY_REGISTRY_UPDATE,
            json!({
                "entity_id": entity_id,
                "options": { "conversation": { "should_expose": exposed } },
            }),
        )
        .await?;
        Ok(())
    }

    /// Set the friendly name of an entity in the entity registry.
    pub async fn rename_entity(&mut self, entity_id: &str, name: &str) -> Result<(), Error> {
        self.call(
            ENTITY_REGISTRY_UPDATE,
            json!({ "entity_id": entity_id, "name": name }),
        )
        .await?;
        Ok(())
    }

    // ── Frame primitives ─────────────────────────────────────────────

    pub(crate) async fn write_text(&mut self, text: String) -> Result<(), Error> {
        self.ws
            .send(Message::text(text))
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    /// Read the next text frame.
    ///
    /// Ping/pong frames are transport noise and are skipped (tungstenite
    /// queues the pong itself). A close frame or end of stream is
    /// [`Error::WebSocketClosed`]. Cancel-safe.
    pub(crate) async fn read_frame(&mut self) -> Result<String, Error> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.as_str().to_owned()),
                Some(Ok(Message::Binary(_))) => {
                    return Err(Error::Protocol {
                        message: "unexpected binary frame".into(),
                    });
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {
                    trace!("WebSocket control frame");
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame.map_or_else(
                        || (ABNORMAL_CLOSURE, "closed without payload".to_owned()),
                        |cf| (u16::from(cf.code), cf.reason.as_str().to_owned()),
                    );
                    debug!(code, reason = %reason, "close frame received");
                    return Err(Error::WebSocketClosed { code, reason });
                }
                Some(Err(e)) => return Err(Error::Transport(e.to_string())),
                None => {
                    return Err(Error::WebSocketClosed {
                        code: ABNORMAL_CLOSURE,
                        reason: "stream ended".into(),
                    });
                }
            }
        }
    }

    /// Send a close frame and release the connection. Errors are logged,
    /// never returned: the socket is gone either way.
    pub async fn close(mut self) {
        if let Err(e) = self.ws.close(None).await {
            debug!(error = %e, "error while closing WebSocket");
        }
    }

    /// Close without consuming the session (used by the event loop, which
    /// keeps the session until it is dropped).
    pub(crate) async fn shutdown(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            debug!(error = %e, "error while closing WebSocket");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(base: &str) -> String {
        websocket_url(&Url::parse(base).unwrap()).unwrap().to_string()
    }

    #[test]
    fn http_maps_to_ws_api_path() {
        assert_eq!(
            ws("http://homeassistant.local:8123"),
            "ws://homeassistant.local:8123/api/websocket"
        );
    }

    #[test]
    fn https_maps_to_wss_and_keeps_prefix() {
        assert_eq!(
            ws("https://example.com/ha/"),
            "wss://example.com/ha/api/websocket"
        );
    }

    #[test]
    fn ws_url_with_path_is_used_verbatim() {
        assert_eq!(ws("ws://127.0.0.1:9000/custom"), "ws://127.0.0.1:9000/custom");
        assert_eq!(ws("wss://host"), "wss://host/api/websocket");
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let err = websocket_url(&Url::parse("ftp://host").unwrap()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedScheme(s) if s == "ftp"));
    }
}
