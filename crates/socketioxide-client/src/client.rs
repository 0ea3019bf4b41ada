use std::{
    borrow::Cow,
    fmt,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use engineioxide_core::Str;
use http::{Uri, uri::Scheme};
use serde::{Serialize, de::DeserializeOwned};
use socketioxide_core::value::PayloadValue;

use crate::{
    config::ClientConfig,
    errors::{ClientError, ConfigError},
    handler::{
        ConnectHandler, DisconnectHandler, Handlers, MakeErasedHandler, MessageHandler,
    },
    io,
    parser::Parser,
    socket::{ConnectionState, DisconnectReason, Socket},
    transport::{Transport, WsTransport},
};

/// A socket.io client connected to a single namespace.
///
/// Handlers are registered first, then the client is connected with [`Client::connect`].
///
/// ```no_run
/// # use socketioxide_client::{Client, ClientConfig};
/// # use socketioxide_client::extract::*;
/// # async fn doc() -> Result<(), socketioxide_client::ClientError> {
/// let client = Client::new("http://localhost:3000/chat", ClientConfig::default())?;
/// client.on("message", |Data::<String>(msg)| println!("received {msg}"))?;
/// client.connect().await?;
/// client.emit("message", "hello")?;
/// # Ok(())
/// # }
/// ```
pub struct Client<T: Transport = WsTransport> {
    url: String,
    ns: Str,
    config: ClientConfig,
    transport: T,
    handlers: Mutex<Option<Handlers>>,
    socket: OnceLock<Arc<Socket>>,
}

impl Client<WsTransport> {
    /// Create a new client with the default websocket transport.
    ///
    /// The path of the address selects the namespace, unless the config sets one.
    pub fn new(address: &str, config: ClientConfig) -> Result<Self, ConfigError> {
        Self::with_transport(address, config, WsTransport::default())
    }
}

impl<T: Transport> Client<T> {
    /// Create a new client with a custom [`Transport`].
    pub fn with_transport(
        address: &str,
        config: ClientConfig,
        transport: T,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (url, ns) = build_url(address, &config)?;
        Ok(Self {
            url,
            ns,
            config,
            transport,
            handlers: Mutex::new(Some(Handlers::default())),
            socket: OnceLock::new(),
        })
    }

    /// Register a handler for the given event.
    ///
    /// The `"connection"` and `"disconnection"` event names are reserved for lifecycle handlers.
    /// Fails with [`ClientError::AlreadyConnected`] once the client is connected.
    pub fn on<H, X>(
        &self,
        event: impl Into<Cow<'static, str>>,
        handler: H,
    ) -> Result<(), ClientError>
    where
        H: MessageHandler<X>,
        X: Send + Sync + 'static,
    {
        let mut handlers = self.handlers();
        let handlers = handlers.as_mut().ok_or(ClientError::AlreadyConnected)?;
        handlers.add_event(event.into(), MakeErasedHandler::new_message_boxed(handler));
        Ok(())
    }

    /// Register a handler called once the namespace is connected.
    pub fn on_connect<H, X>(&self, handler: H) -> Result<(), ClientError>
    where
        H: ConnectHandler<X>,
        X: Send + Sync + 'static,
    {
        let mut handlers = self.handlers();
        let handlers = handlers.as_mut().ok_or(ClientError::AlreadyConnected)?;
        handlers.set_connect(MakeErasedHandler::new_connect_boxed(handler));
        Ok(())
    }

    /// Register a handler called once the connection is closed.
    pub fn on_disconnect<H, X>(&self, handler: H) -> Result<(), ClientError>
    where
        H: DisconnectHandler<X>,
        X: Send + Sync + 'static,
    {
        let mut handlers = self.handlers();
        let handlers = handlers.as_mut().ok_or(ClientError::AlreadyConnected)?;
        handlers.set_disconnect(MakeErasedHandler::new_disconnect_boxed(handler));
        Ok(())
    }

    /// Connect the transport and start the read and write loops.
    ///
    /// It returns once the transport is connected, the engine.io handshake
    /// and the namespace connection happen in the background.
    /// A client can only be connected once.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let handlers = self.handlers().take().ok_or(ClientError::AlreadyConnected)?;

        let url = format!("{}&t={}", self.url, timestamp());
        let url = match url.parse::<Uri>() {
            Ok(url) => url,
            Err(_) => {
                *self.handlers() = Some(handlers);
                return Err(ConfigError::InvalidAddress(url).into());
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(%url, ns = self.ns.as_str(), "connecting");

        let conn = match self.transport.connect(&url, self.config.protocol).await {
            Ok(conn) => conn,
            Err(e) => {
                *self.handlers() = Some(handlers);
                return Err(e.into());
            }
        };

        let parser = Parser::new(conn.binary_framing());
        let (socket, rx) = Socket::new(
            self.ns.clone(),
            conn.protocol(),
            parser,
            Arc::new(handlers),
            &self.config,
        );
        self.socket
            .set(socket.clone())
            .map_err(|_| ClientError::AlreadyConnected)?;
        io::spawn(socket, conn, rx, self.config.max_concurrent_handlers);
        Ok(())
    }

    /// Emit an event with a single argument.
    /// See [`Socket::emit`].
    pub fn emit<D: ?Sized + Serialize>(
        &self,
        event: impl Into<String>,
        data: &D,
    ) -> Result<(), ClientError> {
        Ok(self.connected_socket()?.emit(event, data)?)
    }

    /// Emit an event with positional arguments.
    /// See [`Socket::emit_args`].
    pub fn emit_args(
        &self,
        event: impl Into<String>,
        args: Vec<PayloadValue>,
    ) -> Result<(), ClientError> {
        Ok(self.connected_socket()?.emit_args(event, args)?)
    }

    /// Emit an event and wait for its acknowledgement during the configured `ack_timeout`.
    /// See [`Socket::emit_with_ack`].
    pub async fn emit_with_ack<D: ?Sized + Serialize, R: DeserializeOwned>(
        &self,
        event: impl Into<String>,
        data: &D,
    ) -> Result<R, ClientError> {
        let socket = self.connected_socket()?;
        Ok(socket.emit_with_ack(event, data).await?)
    }

    /// Emit an event with positional arguments and wait for the response arguments.
    /// See [`Socket::ack`].
    pub async fn ack(
        &self,
        event: impl Into<String>,
        args: Vec<PayloadValue>,
        timeout: Duration,
    ) -> Result<Vec<PayloadValue>, ClientError> {
        let socket = self.connected_socket()?;
        socket
            .ack(event, args, timeout)
            .await
            .map_err(ClientError::from)
    }

    /// Close the connection. It is a no-op if the client is not connected.
    pub fn close(&self) {
        if let Some(socket) = self.socket.get() {
            socket.close();
        }
    }

    /// Wait for the connection to be closed.
    /// Returns `None` if the client was never connected.
    pub async fn closed(&self) -> Option<DisconnectReason> {
        match self.socket.get() {
            Some(socket) => Some(socket.closed().await),
            None => None,
        }
    }

    /// The state of the connection, [`ConnectionState::Closed`] before [`Client::connect`]
    pub fn state(&self) -> ConnectionState {
        self.socket
            .get()
            .map_or(ConnectionState::Closed, |s| s.state())
    }

    /// The engine.io session id
    pub fn id(&self) -> Option<&str> {
        self.socket.get().and_then(|s| s.id())
    }

    /// The namespace session id
    pub fn ns_id(&self) -> Option<&str> {
        self.socket.get().and_then(|s| s.ns_id())
    }

    /// The namespace this client connects to, `/` for the root namespace
    pub fn ns(&self) -> &str {
        if self.ns.is_empty() { "/" } else { &self.ns }
    }

    /// The [`Socket`] of the connection, once connected
    pub fn socket(&self) -> Option<Arc<Socket>> {
        self.socket.get().cloned()
    }

    fn connected_socket(&self) -> Result<&Arc<Socket>, ClientError> {
        self.socket.get().ok_or(ClientError::NotConnected)
    }

    fn handlers(&self) -> MutexGuard<'_, Option<Handlers>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Transport + fmt::Debug> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.url)
            .field("ns", &self.ns())
            .field("transport", &self.transport)
            .field("socket", &self.socket.get())
            .finish()
    }
}

/// Build the connection url, without the `t` parameter, and extract the namespace.
fn build_url(address: &str, config: &ClientConfig) -> Result<(String, Str), ConfigError> {
    let invalid = || ConfigError::InvalidAddress(address.to_string());
    if address.trim().is_empty() {
        return Err(invalid());
    }
    let uri: Uri = address.parse().map_err(|_| invalid())?;

    let scheme = match uri.scheme() {
        Some(s) if *s == Scheme::HTTP || s.as_str().eq_ignore_ascii_case("ws") => "ws",
        Some(s) if *s == Scheme::HTTPS || s.as_str().eq_ignore_ascii_case("wss") => "wss",
        Some(s) => return Err(ConfigError::UnsupportedScheme(s.to_string())),
        None => return Err(invalid()),
    };
    let authority = uri.authority().ok_or_else(invalid)?;

    let ns = match &config.namespace {
        Some(ns) => ns.as_str(),
        None => uri.path(),
    };
    let ns = match ns.trim_end_matches('/') {
        "" => Str::default(),
        ns if ns.starts_with('/') => Str::from(ns.to_string()),
        ns => Str::from(format!("/{ns}")),
    };

    let mut url = format!("{scheme}://{authority}{}?", config.engine_path());
    if let Some(query) = uri.query().filter(|q| !q.is_empty()) {
        url.push_str(query);
        url.push('&');
    }
    url.push_str("transport=websocket&EIO=");
    url.push_str(config.protocol.as_str());
    Ok((url, ns))
}

fn timestamp() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use engineioxide_core::ProtocolVersion;

    fn url(address: &str) -> Result<(String, Str), ConfigError> {
        build_url(address, &ClientConfig::default())
    }

    #[test]
    fn scheme_mapping() {
        let (url, ns) = url("http://localhost:3000").unwrap();
        assert_eq!(
            url,
            "ws://localhost:3000/socket.io/?transport=websocket&EIO=4"
        );
        assert_eq!(ns, "");

        let (url, _) = self::url("https://example.com").unwrap();
        assert!(url.starts_with("wss://example.com/socket.io/?"));
        let (url, _) = self::url("ws://example.com").unwrap();
        assert!(url.starts_with("ws://example.com/"));
        let (url, _) = self::url("wss://example.com").unwrap();
        assert!(url.starts_with("wss://example.com/"));
    }

    #[test]
    fn invalid_addresses() {
        assert_eq!(
            url("ftp://localhost").unwrap_err(),
            ConfigError::UnsupportedScheme("ftp".into())
        );
        assert!(matches!(url(""), Err(ConfigError::InvalidAddress(_))));
        assert!(matches!(url("   "), Err(ConfigError::InvalidAddress(_))));
        assert!(matches!(url("localhost"), Err(ConfigError::InvalidAddress(_))));
        assert!(matches!(url("http://"), Err(ConfigError::InvalidAddress(_))));
    }

    #[test]
    fn namespace_from_path() {
        assert_eq!(url("http://localhost/chat").unwrap().1, "/chat");
        assert_eq!(url("http://localhost/chat/").unwrap().1, "/chat");
        assert_eq!(url("http://localhost/").unwrap().1, "");

        let config = ClientConfig::builder().namespace("admin").build().unwrap();
        let (_, ns) = build_url("http://localhost/chat", &config).unwrap();
        assert_eq!(ns, "/admin");

        let config = ClientConfig::builder().namespace("/").build().unwrap();
        let (_, ns) = build_url("http://localhost/chat", &config).unwrap();
        assert_eq!(ns, "");
    }

    #[test]
    fn query_and_path() {
        let config = ClientConfig::builder()
            .path("/custom")
            .protocol(ProtocolVersion::V3)
            .build()
            .unwrap();
        let (url, _) = build_url("http://localhost:3000/chat?token=abc", &config).unwrap();
        assert_eq!(
            url,
            "ws://localhost:3000/custom/?token=abc&transport=websocket&EIO=3"
        );
    }

    #[test]
    fn connect_url_is_valid() {
        let (url, _) = url("http://localhost:3000?a=b").unwrap();
        let url: Uri = format!("{url}&t={}", timestamp()).parse().unwrap();
        assert_eq!(url.path(), "/socket.io/");
        assert!(url.query().unwrap().contains("&t="));
    }

    #[test]
    fn not_connected() {
        let client = Client::new("http://localhost", ClientConfig::default()).unwrap();
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(client.id().is_none());
        assert!(matches!(
            client.emit("msg", "hi"),
            Err(ClientError::NotConnected)
        ));
        client.close();
    }

    #[test]
    fn config_is_validated_on_construction() {
        let config = ClientConfig {
            max_buffer_size: 0,
            ..Default::default()
        };
        let err = Client::new("http://localhost", config).unwrap_err();
        assert_eq!(err, ConfigError::InvalidBufferSize(0));

        let config = ClientConfig {
            max_concurrent_handlers: usize::MAX,
            ..Default::default()
        };
        let err = Client::new("http://localhost", config).unwrap_err();
        assert_eq!(err, ConfigError::InvalidHandlerLimit(usize::MAX));
    }
}
