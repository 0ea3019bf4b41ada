use std::{convert::Infallible, sync::Arc};

use engineioxide_core::ProtocolVersion;
use socketioxide_core::value::PayloadValue;

use crate::{
    handler::{FromConnectParts, FromDisconnectParts, FromMessageParts},
    socket::{DisconnectReason, Socket},
};

/// An Extractor that returns a reference to a [`Socket`].
#[derive(Debug)]
pub struct SocketRef(Arc<Socket>);

impl FromConnectParts for SocketRef {
    type Error = Infallible;
    fn from_connect_parts(s: &Arc<Socket>) -> Result<Self, Infallible> {
        Ok(SocketRef(s.clone()))
    }
}
impl FromMessageParts for SocketRef {
    type Error = Infallible;
    fn from_message_parts(
        s: &Arc<Socket>,
        _: &mut Vec<PayloadValue>,
        _: &Option<i64>,
    ) -> Result<Self, Infallible> {
        Ok(SocketRef(s.clone()))
    }
}
impl FromDisconnectParts for SocketRef {
    type Error = Infallible;
    fn from_disconnect_parts(s: &Arc<Socket>, _: DisconnectReason) -> Result<Self, Infallible> {
        Ok(SocketRef(s.clone()))
    }
}

impl std::ops::Deref for SocketRef {
    type Target = Socket;
    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl PartialEq for SocketRef {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl From<Arc<Socket>> for SocketRef {
    #[inline(always)]
    fn from(socket: Arc<Socket>) -> Self {
        Self(socket)
    }
}
impl Clone for SocketRef {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl FromDisconnectParts for DisconnectReason {
    type Error = Infallible;
    fn from_disconnect_parts(_: &Arc<Socket>, reason: DisconnectReason) -> Result<Self, Infallible> {
        Ok(reason)
    }
}

impl FromConnectParts for ProtocolVersion {
    type Error = Infallible;
    fn from_connect_parts(s: &Arc<Socket>) -> Result<Self, Infallible> {
        Ok(s.protocol())
    }
}
impl FromMessageParts for ProtocolVersion {
    type Error = Infallible;
    fn from_message_parts(
        s: &Arc<Socket>,
        _: &mut Vec<PayloadValue>,
        _: &Option<i64>,
    ) -> Result<Self, Infallible> {
        Ok(s.protocol())
    }
}
impl FromDisconnectParts for ProtocolVersion {
    type Error = Infallible;
    fn from_disconnect_parts(s: &Arc<Socket>, _: DisconnectReason) -> Result<Self, Infallible> {
        Ok(s.protocol())
    }
}
