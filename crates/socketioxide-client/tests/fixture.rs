#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::Bytes;
use engineioxide_core::Str;
use http::Uri;
use socketioxide_client::{
    Client, ClientConfig, Connection, ConnectionState, Frame, ProtocolVersion, Transport,
    TransportError,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// An in-memory transport, the other end of the connection is a [`Server`].
pub struct MockTransport {
    conn: Mutex<Option<Connection>>,
    error: Option<TransportError>,
    url: Arc<Mutex<Option<Uri>>>,
}

/// The server side of a [`MockTransport`]
pub struct Server {
    tx: Option<mpsc::Sender<Result<Frame, TransportError>>>,
    rx: mpsc::Receiver<Frame>,
    url: Arc<Mutex<Option<Uri>>>,
}

impl MockTransport {
    pub fn new(protocol: ProtocolVersion, binary_framing: bool) -> (Self, Server) {
        Self::with_capacity(protocol, binary_framing, 256)
    }

    /// `capacity` is the number of frames the server can hold before the client writer blocks.
    pub fn with_capacity(
        protocol: ProtocolVersion,
        binary_framing: bool,
        capacity: usize,
    ) -> (Self, Server) {
        let (srv_tx, client_rx) = mpsc::channel(256);
        let (client_tx, srv_rx) = mpsc::channel::<Frame>(capacity);

        let sink = futures_util::sink::unfold(client_tx, |tx, frame: Frame| async move {
            tx.send(frame)
                .await
                .map_err(|_| TransportError::new(TransportError::ABNORMAL, "server gone"))?;
            Ok::<_, TransportError>(tx)
        });
        let stream = ReceiverStream::new(client_rx);
        let conn = Connection::new(sink, stream, protocol, binary_framing);

        let url = Arc::new(Mutex::new(None));
        let transport = MockTransport {
            conn: Mutex::new(Some(conn)),
            error: None,
            url: url.clone(),
        };
        let server = Server {
            tx: Some(srv_tx),
            rx: srv_rx,
            url,
        };
        (transport, server)
    }

    /// A transport that always fails to connect
    pub fn failing(error: TransportError) -> Self {
        MockTransport {
            conn: Mutex::new(None),
            error: Some(error),
            url: Arc::new(Mutex::new(None)),
        }
    }
}

impl Transport for MockTransport {
    async fn connect(
        &self,
        url: &Uri,
        _protocol: ProtocolVersion,
    ) -> Result<Connection, TransportError> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        *self.url.lock().unwrap() = Some(url.clone());
        self.conn
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| TransportError::new(TransportError::ABNORMAL, "already connected"))
    }
}

impl Server {
    /// The url the client connected to
    pub fn url(&self) -> Option<Uri> {
        self.url.lock().unwrap().clone()
    }

    pub async fn send(&self, text: &str) {
        self.send_frame(Frame::Text(Str::from(text.to_string()))).await;
    }

    pub async fn send_bin(&self, bin: impl Into<Bytes>) {
        self.send_frame(Frame::Binary(bin.into())).await;
    }

    pub async fn send_frame(&self, frame: Frame) {
        let tx = self.tx.as_ref().expect("server stream ended");
        tx.send(Ok(frame)).await.ok();
    }

    /// Fail the client read stream
    pub async fn fail(&self, err: TransportError) {
        let tx = self.tx.as_ref().expect("server stream ended");
        tx.send(Err(err)).await.ok();
    }

    /// End the client read stream
    pub fn end(&mut self) {
        self.tx.take();
    }

    /// Send the engine.io open packet
    pub async fn open(&self, ping_interval: u64, ping_timeout: u64) {
        let open = format!(
            r#"0{{"sid":"AAAAAAAAAAAAAAAA","upgrades":[],"pingInterval":{ping_interval},"pingTimeout":{ping_timeout},"maxPayload":1000000}}"#
        );
        self.send(&open).await;
    }

    /// Receive the next frame written by the client
    pub async fn recv(&mut self) -> Option<Frame> {
        tokio::time::timeout(Duration::from_secs(1), self.rx.recv())
            .await
            .expect("timeout waiting for a client frame")
    }

    /// Receive the next text frame written by the client
    pub async fn recv_text(&mut self) -> String {
        match self.recv().await {
            Some(Frame::Text(text)) => text.to_string(),
            frame => panic!("expected a text frame, got {frame:?}"),
        }
    }

    /// Receive the next binary frame written by the client
    pub async fn recv_bin(&mut self) -> Bytes {
        match self.recv().await {
            Some(Frame::Binary(bin)) => bin,
            frame => panic!("expected a binary frame, got {frame:?}"),
        }
    }

    /// Check that the client did not write anything
    pub fn is_idle(&mut self) -> bool {
        self.rx.try_recv().is_err()
    }
}

/// Print the client logs when `RUST_LOG` is set
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

pub fn config(ns: &str) -> ClientConfig {
    ClientConfig::builder().namespace(ns).build().unwrap()
}

/// Poll the client state until it matches or a second elapsed
pub async fn wait_state(client: &Client<MockTransport>, state: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(1), async {
        while client.state() != state {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timeout waiting for {state:?}, got {:?}", client.state()));
}

/// Create a client connected to the given namespace with the V4 protocol.
/// Handlers are registered with `setup` before connecting.
pub async fn connected(
    ns: &str,
    setup: impl FnOnce(&Client<MockTransport>),
) -> (Client<MockTransport>, Server) {
    connected_with(config(ns), setup).await
}

/// Same as [`connected`] with a custom config, its namespace must be set.
pub async fn connected_with(
    config: ClientConfig,
    setup: impl FnOnce(&Client<MockTransport>),
) -> (Client<MockTransport>, Server) {
    init_tracing();
    let ns = config.namespace.clone().expect("namespace is required");
    let ns = ns.as_str();
    let (transport, mut server) = MockTransport::new(ProtocolVersion::V4, false);
    let client = Client::with_transport("http://localhost:3000", config, transport).unwrap();
    setup(&client);
    client.connect().await.unwrap();

    server.open(25000, 20000).await;
    let connect = server.recv_text().await;
    assert!(connect.starts_with("40"), "unexpected connect packet {connect}");
    let ns = if ns == "/" { String::new() } else { format!("{ns},") };
    server.send(&format!(r#"40{ns}{{"sid":"ns-sid"}}"#)).await;
    wait_state(&client, ConnectionState::NamespaceConnected).await;
    (client, server)
}
