//! [`MessageHandler`] trait and implementations, used to handle the events sent by the server.
//! It has a flexible axum-like API, you can put any arguments as long as it implements the [`FromMessageParts`] trait.
//!
//! The return value of the handler implements [`IntoAck`]. If the server asked for an acknowledgement,
//! it is sent back as the ack response.
//!
//! ## Example with sync closures
//! ```rust
//! # use socketioxide_client::{Client, ClientConfig};
//! # use socketioxide_client::extract::*;
//! # use socketioxide_client::PayloadValue;
//! let client = Client::new("http://localhost:3000", ClientConfig::default()).unwrap();
//! client.on("message", |s: SocketRef, Data::<String>(msg)| {
//!     println!("Received message on {}: {}", s.ns(), msg);
//! }).unwrap();
//!
//! // The returned value is sent back if the server asked for an ack
//! client.on("add", |Data::<(i64, i64)>((a, b))| PayloadValue::from(a + b)).unwrap();
//! ```
//!
//! ## Example with async closures
//! An async handler holds its dispatch slot until its future completes, see
//! [`ClientConfigBuilder::max_concurrent_handlers`](crate::ClientConfigBuilder::max_concurrent_handlers).
//! ```rust
//! # use socketioxide_client::{Client, ClientConfig};
//! # use socketioxide_client::extract::*;
//! # use socketioxide_client::handler::Ack;
//! let client = Client::new("http://localhost:3000", ClientConfig::default()).unwrap();
//! client.on("ping", async |s: SocketRef, Args(args)| {
//!     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!     Ack(args.len())
//! }).unwrap();
//! ```
use std::{future::Future, pin::Pin, sync::Arc};

use serde::Serialize;
use socketioxide_core::value::{PayloadValue, ValueError};

use super::{MakeErasedHandler, private};
use crate::{errors::SendError, socket::Socket};

/// A Type Erased [`MessageHandler`] so it can be stored in a HashMap
pub(crate) type BoxedMessageHandler = Box<dyn ErasedMessageHandler>;

/// The remaining work of an async handler, sending the ack once the handler returns.
type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub(crate) trait ErasedMessageHandler: Send + Sync + 'static {
    fn call(
        &self,
        s: Arc<Socket>,
        args: Vec<PayloadValue>,
        ack_id: Option<i64>,
    ) -> Option<HandlerFuture>;
}

impl<T, H> MakeErasedHandler<H, T>
where
    T: Send + Sync + 'static,
    H: MessageHandler<T> + Send + Sync + 'static,
{
    pub fn new_message_boxed(inner: H) -> BoxedMessageHandler {
        Box::new(MakeErasedHandler::new(inner))
    }
}

impl<T, H> ErasedMessageHandler for MakeErasedHandler<H, T>
where
    T: Send + Sync + 'static,
    H: MessageHandler<T> + Send + Sync + 'static,
{
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self, s, args)))]
    #[inline(always)]
    fn call(
        &self,
        s: Arc<Socket>,
        args: Vec<PayloadValue>,
        ack_id: Option<i64>,
    ) -> Option<HandlerFuture> {
        self.handler.call(s, args, ack_id)
    }
}

/// A trait used to extract the arguments from the message event.
/// The `Result` associated type is used to return an error if the extraction fails,
/// in this case the [`MessageHandler`] is not called.
///
/// * See the [`message`](super::message) module doc for more details on message handler.
/// * See the [`extract`](crate::extract) module doc for more details on available extractors.
#[diagnostic::on_unimplemented(
    note = "Function argument is not a valid socketio extractor.",
    label = "Invalid extractor"
)]
pub trait FromMessageParts: Sized {
    /// The error type returned by the extractor
    type Error: std::error::Error + 'static;

    /// Extract the arguments from the message event.
    /// If it fails, the handler is not called.
    fn from_message_parts(
        s: &Arc<Socket>,
        args: &mut Vec<PayloadValue>,
        ack_id: &Option<i64>,
    ) -> Result<Self, Self::Error>;
}

/// Define a handler for a message event.
/// It is implemented for sync and async closures with up to 16 arguments.
/// They must implement the [`FromMessageParts`] trait and return a value implementing [`IntoAck`].
///
/// * See the [`message`](super::message) module doc for more details on message handler.
/// * See the [`extract`](crate::extract) module doc for more details on available extractors.
#[diagnostic::on_unimplemented(
    note = "This function is not a MessageHandler. Check that:
* It is a clonable sync or async `FnOnce` that returns a value implementing `IntoAck`.
* All its arguments are valid message extractors.\n",
    label = "Invalid MessageHandler"
)]
pub trait MessageHandler<T>: Send + Sync + 'static {
    /// Call the handler with the given arguments.
    ///
    /// Sync handlers run to completion and return `None`. Async handlers return their future,
    /// the caller drives it to completion.
    fn call(
        &self,
        s: Arc<Socket>,
        args: Vec<PayloadValue>,
        ack_id: Option<i64>,
    ) -> Option<HandlerFuture>;

    #[doc(hidden)]
    fn phantom(&self) -> std::marker::PhantomData<T> {
        std::marker::PhantomData
    }
}

/// The return value of a [`MessageHandler`], converted to the arguments of the ack response.
pub trait IntoAck {
    /// Convert the value to the ack response arguments
    fn into_ack(self) -> Result<Vec<PayloadValue>, ValueError>;
}

impl IntoAck for () {
    fn into_ack(self) -> Result<Vec<PayloadValue>, ValueError> {
        Ok(Vec::new())
    }
}
impl IntoAck for PayloadValue {
    fn into_ack(self) -> Result<Vec<PayloadValue>, ValueError> {
        Ok(vec![self])
    }
}
impl IntoAck for Vec<PayloadValue> {
    fn into_ack(self) -> Result<Vec<PayloadValue>, ValueError> {
        Ok(self)
    }
}
impl IntoAck for serde_json::Value {
    fn into_ack(self) -> Result<Vec<PayloadValue>, ValueError> {
        Ok(vec![self.into()])
    }
}

/// Wrap any serializable value to send it as a single ack argument.
#[derive(Debug, Clone)]
pub struct Ack<T>(pub T);

impl<T: Serialize> IntoAck for Ack<T> {
    fn into_ack(self) -> Result<Vec<PayloadValue>, ValueError> {
        Ok(vec![PayloadValue::from_data(&self.0)?])
    }
}

/// Send the handler result back if the server asked for an ack
fn send_ack(s: &Socket, ack_id: Option<i64>, res: impl IntoAck) {
    let Some(ack_id) = ack_id else {
        return;
    };
    let res = res
        .into_ack()
        .map_err(SendError::from)
        .and_then(|args| s.send_ack(ack_id, args));
    if let Err(_e) = res {
        #[cfg(feature = "tracing")]
        tracing::debug!(id = ack_id, "error sending ack response: {_e}");
    }
}

macro_rules! impl_handler {
    (
        [$($ty:ident),*]
    ) => {
        #[diagnostic::do_not_recommend]
        #[allow(non_snake_case, unused)]
        impl<F, R, $($ty,)*> MessageHandler<(private::Sync, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> R + Send + Sync + Clone + 'static,
            R: IntoAck + Send + 'static,
            $( $ty: FromMessageParts + Send, )*
        {
            fn call(
                &self,
                s: Arc<Socket>,
                mut args: Vec<PayloadValue>,
                ack_id: Option<i64>,
            ) -> Option<HandlerFuture> {
                $(
                    let $ty = match $ty::from_message_parts(&s, &mut args, &ack_id) {
                        Ok(v) => v,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::error!("Error while extracting data: {}", _e);
                            return None;
                        },
                    };
                )*

                let res = (self.clone())($($ty,)*);
                send_ack(&s, ack_id, res);
                None
            }
        }
    };
}

macro_rules! impl_handler_async {
    (
        [$($ty:ident),*]
    ) => {
        #[diagnostic::do_not_recommend]
        #[allow(non_snake_case, unused)]
        impl<F, Fut, $($ty,)*> MessageHandler<(private::Async, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Send + Sync + Clone + 'static,
            Fut: Future + Send + 'static,
            Fut::Output: IntoAck + Send,
            $( $ty: FromMessageParts + Send, )*
        {
            fn call(
                &self,
                s: Arc<Socket>,
                mut args: Vec<PayloadValue>,
                ack_id: Option<i64>,
            ) -> Option<HandlerFuture> {
                $(
                    let $ty = match $ty::from_message_parts(&s, &mut args, &ack_id) {
                        Ok(v) => v,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::error!("Error while extracting data: {}", _e);
                            return None;
                        },
                    };
                )*

                let fut = (self.clone())($($ty,)*);
                Some(Box::pin(async move {
                    let res = fut.await;
                    send_ack(&s, ack_id, res);
                }))
            }
        }
    };
}

super::all_the_tuples!(impl_handler);
super::all_the_tuples!(impl_handler_async);
