//! Functions and types used to handle incoming events and lifecycle hooks.
//! There is three kinds of handlers: [connect], [message] and [disconnect].
//! All handlers can be sync or async. Message handlers run in the dispatch task of their packet,
//! lifecycle handlers are called inline and async ones are spawned on the runtime.
use std::{borrow::Cow, collections::HashMap, sync::Arc};

use crate::socket::{DisconnectReason, Socket};

pub mod connect;
pub mod disconnect;
pub mod message;

pub(crate) use connect::BoxedConnectHandler;
pub use connect::{ConnectHandler, FromConnectParts};
pub(crate) use disconnect::BoxedDisconnectHandler;
pub use disconnect::{DisconnectHandler, FromDisconnectParts};
pub(crate) use message::BoxedMessageHandler;
pub use message::{Ack, FromMessageParts, IntoAck, MessageHandler};

/// Handlers registered under this event name are called when the namespace is connected.
pub const CONNECTION_EVENT: &str = "connection";
/// Handlers registered under this event name are called when the connection is closed.
pub const DISCONNECTION_EVENT: &str = "disconnection";

/// Markers used to tell sync handlers from async handlers.
#[allow(clippy::empty_enum)]
mod private {
    #[derive(Debug, Copy, Clone)]
    pub enum Sync {}
    #[derive(Debug, Copy, Clone)]
    pub enum Async {}
}

/// A struct used to erase the type of a handler so it can be stored in a map
pub(crate) struct MakeErasedHandler<H, T> {
    handler: H,
    type_: std::marker::PhantomData<T>,
}
impl<H, T> MakeErasedHandler<H, T> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            type_: std::marker::PhantomData,
        }
    }
}

/// The handlers of a client. They are registered before connecting and only read afterwards.
#[derive(Default)]
pub(crate) struct Handlers {
    events: HashMap<Cow<'static, str>, BoxedMessageHandler>,
    connect: Option<BoxedConnectHandler>,
    disconnect: Option<BoxedDisconnectHandler>,
}

impl Handlers {
    pub fn add_event(&mut self, event: Cow<'static, str>, handler: BoxedMessageHandler) {
        self.events.insert(event, handler);
    }

    pub fn set_connect(&mut self, handler: BoxedConnectHandler) {
        self.connect = Some(handler);
    }

    pub fn set_disconnect(&mut self, handler: BoxedDisconnectHandler) {
        self.disconnect = Some(handler);
    }

    pub fn on_connect(&self, s: &Arc<Socket>) {
        if let Some(handler) = &self.connect {
            handler.call(s.clone());
        }
        if let Some(fut) = self
            .events
            .get(CONNECTION_EVENT)
            .and_then(|handler| handler.call(s.clone(), Vec::new(), None))
        {
            tokio::spawn(fut);
        }
    }

    pub fn on_disconnect(&self, s: &Arc<Socket>, reason: DisconnectReason) {
        if let Some(handler) = &self.disconnect {
            handler.call(s.clone(), reason);
        }
        if let Some(fut) = self
            .events
            .get(DISCONNECTION_EVENT)
            .and_then(|handler| handler.call(s.clone(), Vec::new(), None))
        {
            tokio::spawn(fut);
        }
    }

    /// The handler registered for an event sent by the server.
    /// Lifecycle handlers are never returned, they only run on lifecycle transitions.
    pub fn event(&self, event: &str) -> Option<&BoxedMessageHandler> {
        match event {
            CONNECTION_EVENT | DISCONNECTION_EVENT => None,
            event => self.events.get(event),
        }
    }
}

#[rustfmt::skip]
macro_rules! all_the_tuples {
    ($name:ident) => {
        $name!([]);
        $name!([T1]);
        $name!([T1, T2]);
        $name!([T1, T2, T3]);
        $name!([T1, T2, T3, T4]);
        $name!([T1, T2, T3, T4, T5]);
        $name!([T1, T2, T3, T4, T5, T6]);
        $name!([T1, T2, T3, T4, T5, T6, T7]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14, T15]);
        $name!([T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12, T13, T14, T15, T16]);
    };
}
pub(crate) use all_the_tuples;
