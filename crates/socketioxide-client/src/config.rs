//! Client configuration, built with a [`ClientConfigBuilder`].
use std::{borrow::Cow, time::Duration};

use engineioxide_core::ProtocolVersion;
use socketioxide_core::value::PayloadValue;
use tokio::sync::Semaphore;

use crate::errors::ConfigError;

/// Configuration of a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The namespace to connect to. If not set, the path of the address is used.
    pub namespace: Option<String>,

    /// The engine.io request path.
    ///
    /// Defaults to "/socket.io".
    pub path: Cow<'static, str>,

    /// An optional payload sent with the namespace connect packet.
    ///
    /// It is ignored with the V3 protocol.
    pub auth: Option<PayloadValue>,

    /// The engine.io protocol version.
    ///
    /// Defaults to [`ProtocolVersion::V4`].
    pub protocol: ProtocolVersion,

    /// The maximum number of packets that can be queued before being written to the transport.
    /// When the queue is full the connection is closed.
    ///
    /// Defaults to 128 packets.
    pub max_buffer_size: usize,

    /// The amount of time [`emit_with_ack`](crate::Client::emit_with_ack) waits for a response.
    ///
    /// Defaults to 5 seconds.
    pub ack_timeout: Duration,

    /// The maximum number of incoming packets dispatched at the same time,
    /// an async handler holds its slot until its future completes.
    /// When it is reached, reading from the transport is paused.
    ///
    /// Defaults to 128.
    pub max_concurrent_handlers: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            path: "/socket.io".into(),
            auth: None,
            protocol: ProtocolVersion::V4,
            max_buffer_size: 128,
            ack_timeout: Duration::from_secs(5),
            max_concurrent_handlers: 128,
        }
    }
}

impl ClientConfig {
    /// Create a new [`ClientConfigBuilder`] with the default configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Check the queue and handler limits.
    ///
    /// It is called by [`ClientConfigBuilder::build`] and when a [`Client`](crate::Client)
    /// is created, so a config built field by field is checked too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=Semaphore::MAX_PERMITS).contains(&self.max_buffer_size) {
            return Err(ConfigError::InvalidBufferSize(self.max_buffer_size));
        }
        if !(1..=Semaphore::MAX_PERMITS).contains(&self.max_concurrent_handlers) {
            return Err(ConfigError::InvalidHandlerLimit(
                self.max_concurrent_handlers,
            ));
        }
        Ok(())
    }

    /// The engine.io path, with a leading and a trailing slash.
    pub(crate) fn engine_path(&self) -> String {
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            "/".to_string()
        } else {
            format!("/{path}/")
        }
    }
}

/// Builder for a [`ClientConfig`]
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The namespace to connect to, it overrides the path of the address.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = Some(namespace.into());
        self
    }

    /// The engine.io request path.
    ///
    /// Defaults to "/socket.io".
    pub fn path(mut self, path: impl Into<Cow<'static, str>>) -> Self {
        self.config.path = path.into();
        self
    }

    /// The payload sent with the namespace connect packet.
    pub fn auth(mut self, auth: impl Into<PayloadValue>) -> Self {
        self.config.auth = Some(auth.into());
        self
    }

    /// The engine.io protocol version.
    ///
    /// Defaults to [`ProtocolVersion::V4`].
    pub fn protocol(mut self, protocol: ProtocolVersion) -> Self {
        self.config.protocol = protocol;
        self
    }

    /// The maximum number of packets that can be queued,
    /// between 2 and [`Semaphore::MAX_PERMITS`].
    ///
    /// Defaults to 128 packets.
    pub fn max_buffer_size(mut self, max_buffer_size: usize) -> Self {
        self.config.max_buffer_size = max_buffer_size;
        self
    }

    /// The default ack timeout.
    ///
    /// Defaults to 5 seconds.
    pub fn ack_timeout(mut self, ack_timeout: Duration) -> Self {
        self.config.ack_timeout = ack_timeout;
        self
    }

    /// The maximum number of incoming packets dispatched at the same time.
    /// A value of 0 is treated as 1.
    ///
    /// Defaults to 128.
    pub fn max_concurrent_handlers(mut self, max: usize) -> Self {
        self.config.max_concurrent_handlers = max.max(1);
        self
    }

    /// Build the [`ClientConfig`].
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
