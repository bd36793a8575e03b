//! WebSocket channel (SockJS or plain).
//!
//! The API server exposes its socket endpoint through SockJS. Over the
//! websocket transport a SockJS session wraps every server message in a
//! one-letter frame:
//!
//! ```text
//! o                 session open
//! h                 heartbeat
//! a["m1","m2"]      array of messages  -> handed on as `["m1","m2"]`
//! c[3000,"reason"]  session closed     -> receive error
//! ```
//!
//! Client to server traffic is a bare JSON array of strings, which is exactly
//! what the codec produces, so the sink forwards frames unchanged.

use std::fmt;
use std::io;
use std::str::FromStr;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{FutureExt, SinkExt, StreamExt};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;
use uuid::Uuid;

use super::{DuplexChannel, FrameSink, FrameSource};
use crate::error::{ClientError, ClientResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Framing spoken on top of the websocket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// SockJS websocket session under `<address>/ws`.
    #[default]
    SockJs,
    /// Plain websocket at the address itself, frames passed through as-is.
    WebSocket,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SockJs => f.write_str("sockjs"),
            Self::WebSocket => f.write_str("websocket"),
        }
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sockjs" => Ok(Self::SockJs),
            "websocket" | "ws" => Ok(Self::WebSocket),
            other => Err(format!(
                "unknown transport '{}' (expected sockjs or websocket)",
                other
            )),
        }
    }
}

/// A connected websocket, not yet split.
pub struct WsChannel {
    stream: WsStream,
    transport: Transport,
}

impl WsChannel {
    /// Opens a websocket session to the API at `address`.
    pub async fn connect(address: &str, transport: Transport) -> ClientResult<Self> {
        let url = endpoint_url(address, transport)?;
        debug!(url = %url, %transport, "connecting");

        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| ClientError::Connect(format!("failed to connect to {}: {}", url, e)))?;

        debug!(status = %response.status(), "websocket handshake complete");
        Ok(Self { stream, transport })
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }
}

impl DuplexChannel for WsChannel {
    fn split(self) -> (Box<dyn FrameSink>, Box<dyn FrameSource>) {
        let (sink, stream) = self.stream.split();
        (
            Box::new(WsSink { sink }),
            Box::new(WsSource {
                stream,
                transport: self.transport,
            }),
        )
    }
}

/// Builds the websocket URL for `address`.
///
/// `http`/`https` map to `ws`/`wss`. SockJS sessions live at
/// `<address>/ws/<server>/<session>/websocket` with a random server id and
/// session id per connection.
pub fn endpoint_url(address: &str, transport: Transport) -> ClientResult<Url> {
    let mut url = Url::parse(address)
        .map_err(|e| ClientError::config(format!("invalid address '{}': {}", address, e)))?;

    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(ClientError::config(format!(
                "unsupported address scheme '{}'",
                other
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| ClientError::config(format!("cannot use '{}' with {}", address, scheme)))?;

    if transport == Transport::SockJs {
        let session = Uuid::new_v4();
        let server_id = format!("{:03}", session.as_u128() % 1000);
        let session_id = session.simple().to_string();

        url.path_segments_mut()
            .map_err(|_| ClientError::config(format!("'{}' cannot carry a path", address)))?
            .pop_if_empty()
            .extend(["ws", server_id.as_str(), session_id.as_str(), "websocket"]);
    }

    Ok(url)
}

struct WsSink {
    sink: SplitSink<WsStream, Message>,
}

impl FrameSink for WsSink {
    fn send(&mut self, frame: String) -> BoxFuture<'_, io::Result<()>> {
        async move {
            self.sink
                .send(Message::Text(frame.into()))
                .await
                .map_err(io::Error::other)
        }
        .boxed()
    }
}

struct WsSource {
    stream: SplitStream<WsStream>,
    transport: Transport,
}

impl FrameSource for WsSource {
    fn receive(&mut self) -> BoxFuture<'_, io::Result<Option<String>>> {
        async move {
            loop {
                let message = match self.stream.next().await {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => return Err(io::Error::other(e)),
                    None => return Ok(None),
                };

                match message {
                    Message::Text(text) => {
                        let frame = match self.transport {
                            Transport::SockJs => sockjs_unwrap(text.as_str())?,
                            Transport::WebSocket => Some(text.as_str().to_string()),
                        };
                        if let Some(frame) = frame {
                            return Ok(Some(frame));
                        }
                    }
                    Message::Close(close) => {
                        debug!(?close, "websocket closed by peer");
                        return Ok(None);
                    }
                    Message::Binary(data) => {
                        warn!(len = data.len(), "ignoring binary websocket message");
                    }
                    // ping/pong are answered by tungstenite itself
                    _ => {}
                }
            }
        }
        .boxed()
    }
}

/// Strips SockJS framing. `Ok(None)` for control frames that carry no data.
fn sockjs_unwrap(text: &str) -> io::Result<Option<String>> {
    let Some(kind) = text.chars().next() else {
        warn!("empty sockjs frame");
        return Ok(None);
    };
    let rest = &text[kind.len_utf8()..];

    match kind {
        'o' => {
            trace!("sockjs session open");
            Ok(None)
        }
        'h' => {
            trace!("sockjs heartbeat");
            Ok(None)
        }
        'a' => Ok(Some(rest.to_string())),
        // legacy single-message frame
        'm' => Ok(Some(format!("[{}]", rest))),
        'c' => {
            let reason = match serde_json::from_str::<(u16, String)>(rest) {
                Ok((code, reason)) => format!("{} {}", code, reason),
                Err(_) => rest.to_string(),
            };
            Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                format!("sockjs session closed: {}", reason),
            ))
        }
        _ => {
            warn!(frame = %text, "unknown sockjs frame");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailrpc_protocol::{
        InboundEnvelope, Payload, RequestEnvelope, decode_frame, decode_request, encode_request,
        encode_response,
    };
    use tokio::net::TcpListener;

    #[test]
    fn transport_parses_and_prints() {
        assert_eq!("sockjs".parse::<Transport>().unwrap(), Transport::SockJs);
        assert_eq!("WebSocket".parse::<Transport>().unwrap(), Transport::WebSocket);
        assert!("smoke-signals".parse::<Transport>().is_err());
        assert_eq!(Transport::WebSocket.to_string(), "websocket");
    }

    #[test]
    fn sockjs_url_layout() {
        let url = endpoint_url("http://127.0.0.1:5000", Transport::SockJs).unwrap();
        assert_eq!(url.scheme(), "ws");
        let segments: Vec<_> = url.path_segments().unwrap().collect();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], "ws");
        assert_eq!(segments[1].len(), 3);
        assert_eq!(segments[2].len(), 32);
        assert_eq!(segments[3], "websocket");

        let url = endpoint_url("https://api.example.org/v1/", Transport::SockJs).unwrap();
        assert_eq!(url.scheme(), "wss");
        assert!(url.path().starts_with("/v1/ws/"));
    }

    #[test]
    fn plain_url_only_changes_scheme() {
        let url = endpoint_url("http://localhost:5000/socket", Transport::WebSocket).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:5000/socket");
    }

    #[test]
    fn bad_addresses_are_config_errors() {
        assert!(matches!(
            endpoint_url("not a url", Transport::SockJs),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            endpoint_url("ftp://example.org", Transport::SockJs),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn sockjs_frames() {
        assert_eq!(sockjs_unwrap("o").unwrap(), None);
        assert_eq!(sockjs_unwrap("h").unwrap(), None);
        assert_eq!(sockjs_unwrap("").unwrap(), None);
        assert_eq!(
            sockjs_unwrap(r#"a["x","y"]"#).unwrap(),
            Some(r#"["x","y"]"#.to_string())
        );
        assert_eq!(sockjs_unwrap(r#"m"x""#).unwrap(), Some(r#"["x"]"#.to_string()));

        let err = sockjs_unwrap(r#"c[3000,"Go away!"]"#).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);
        assert!(err.to_string().contains("3000 Go away!"));
    }

    async fn local_listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        (listener, address)
    }

    #[tokio::test]
    async fn sockjs_session_roundtrip() {
        let (listener, address) = local_listener().await;

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text("o".to_string().into())).await.unwrap();
            ws.send(Message::Text("h".to_string().into())).await.unwrap();

            let request = match ws.next().await.unwrap().unwrap() {
                Message::Text(text) => decode_request(text.as_str()).unwrap(),
                other => panic!("unexpected message: {:?}", other),
            };
            let reply = InboundEnvelope::response(&request.id, Payload::new("{}"));
            let frame = format!("a{}", encode_response(&reply).unwrap());
            ws.send(Message::Text(frame.into())).await.unwrap();
            ws.send(Message::Text(r#"c[3000,"Go away!"]"#.to_string().into()))
                .await
                .unwrap();
        });

        let channel = WsChannel::connect(&address, Transport::SockJs)
            .await
            .unwrap();
        assert_eq!(channel.transport(), Transport::SockJs);
        let (mut sink, mut source) = channel.split();

        let request = RequestEnvelope::new("ws-1", "GET", "/accounts/me");
        sink.send(encode_request(&request).unwrap()).await.unwrap();

        let frame = source.receive().await.unwrap().unwrap();
        assert_eq!(decode_frame(&frame).unwrap().id, "ws-1");

        let err = source.receive().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionAborted);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn plain_websocket_passes_frames_through() {
        let (listener, address) = local_listener().await;

        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            ws.send(Message::Text(r#"["raw"]"#.to_string().into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        });

        let channel = WsChannel::connect(&address, Transport::WebSocket)
            .await
            .unwrap();
        let (_sink, mut source) = channel.split();

        assert_eq!(
            source.receive().await.unwrap(),
            Some(r#"["raw"]"#.to_string())
        );
        assert!(source.receive().await.unwrap().is_none());

        server.await.unwrap();
    }
}
