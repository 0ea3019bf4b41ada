//! [`ConnectHandler`] trait and implementations, used to react once the server accepted the namespace connection.
//! It has a flexible axum-like API, you can put any arguments as long as it implements the [`FromConnectParts`] trait.
//!
//! With the engine.io v3 protocol the root namespace is connected as soon as the session is open,
//! so the handler is called right after the handshake.
//!
//! ## Example with a sync closure
//! ```rust
//! # use socketioxide_client::{Client, ClientConfig};
//! # use socketioxide_client::extract::*;
//! let client = Client::new("http://localhost:3000/chat", ClientConfig::default()).unwrap();
//! client.on_connect(|s: SocketRef| {
//!     s.emit("join", "general").ok();
//! }).unwrap();
//! ```
//!
//! ## Example with an async function
//! ```rust
//! # use socketioxide_client::{Client, ClientConfig};
//! # use socketioxide_client::extract::*;
//! async fn handler(s: SocketRef) {
//!     let res: Result<String, _> = s.emit_with_ack("hello", "world").await;
//!     println!("server answered {:?}", res);
//! }
//! let client = Client::new("http://localhost:3000", ClientConfig::default()).unwrap();
//! client.on_connect(handler).unwrap();
//! ```
use std::{future::Future, sync::Arc};

use super::{MakeErasedHandler, private};
use crate::socket::Socket;

/// A Type Erased [`ConnectHandler`] so it can be stored
pub(crate) type BoxedConnectHandler = Box<dyn ErasedConnectHandler>;

pub(crate) trait ErasedConnectHandler: Send + Sync + 'static {
    fn call(&self, s: Arc<Socket>);
}

impl<T, H> MakeErasedHandler<H, T>
where
    T: Send + Sync + 'static,
    H: ConnectHandler<T> + Send + Sync + 'static,
{
    pub fn new_connect_boxed(inner: H) -> BoxedConnectHandler {
        Box::new(MakeErasedHandler::new(inner))
    }
}

impl<T, H> ErasedConnectHandler for MakeErasedHandler<H, T>
where
    T: Send + Sync + 'static,
    H: ConnectHandler<T> + Send + Sync + 'static,
{
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self, s), fields(ns = s.ns())))]
    #[inline(always)]
    fn call(&self, s: Arc<Socket>) {
        self.handler.call(s);
    }
}

/// A trait used to extract the arguments from the connect event.
/// The `Result` associated type is used to return an error if the extraction fails,
/// in this case the [`ConnectHandler`] is not called.
///
/// * See the [`connect`](super::connect) module doc for more details on connect handler.
/// * See the [`extract`](crate::extract) module doc for more details on available extractors.
#[diagnostic::on_unimplemented(
    note = "Function argument is not a valid socketio extractor.",
    label = "Invalid extractor"
)]
pub trait FromConnectParts: Sized {
    /// The error type returned by the extractor
    type Error: std::error::Error + 'static;

    /// Extract the arguments from the connect event.
    /// If it fails, the handler is not called.
    fn from_connect_parts(s: &Arc<Socket>) -> Result<Self, Self::Error>;
}

/// Define a handler for the connect event.
/// It is implemented for sync and async closures with up to 16 arguments.
/// They must implement the [`FromConnectParts`] trait and return nothing.
///
/// * See the [`connect`](super::connect) module doc for more details on connect handler.
/// * See the [`extract`](crate::extract) module doc for more details on available extractors.
#[diagnostic::on_unimplemented(
    note = "This function is not a ConnectHandler. Check that:
* It is a clonable sync or async `FnOnce` that returns nothing.
* All its arguments are valid connect extractors.\n",
    label = "Invalid ConnectHandler"
)]
pub trait ConnectHandler<T>: Send + Sync + 'static {
    /// Call the handler with the given arguments.
    fn call(&self, s: Arc<Socket>);

    #[doc(hidden)]
    fn phantom(&self) -> std::marker::PhantomData<T> {
        std::marker::PhantomData
    }
}

macro_rules! impl_handler {
    (
        [$($ty:ident),*]
    ) => {
        #[diagnostic::do_not_recommend]
        #[allow(non_snake_case, unused)]
        impl<F, $($ty,)*> ConnectHandler<(private::Sync, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) + Send + Sync + Clone + 'static,
            $( $ty: FromConnectParts + Send, )*
        {
            fn call(&self, s: Arc<Socket>) {
                $(
                    let $ty = match $ty::from_connect_parts(&s) {
                        Ok(v) => v,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::error!("Error while extracting data: {}", _e);
                            return;
                        },
                    };
                )*

                (self.clone())($($ty,)*);
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
        impl<F, Fut, $($ty,)*> ConnectHandler<(private::Async, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Send + Sync + Clone + 'static,
            Fut: Future<Output = ()> + Send + 'static,
            $( $ty: FromConnectParts + Send, )*
        {
            fn call(&self, s: Arc<Socket>) {
                $(
                    let $ty = match $ty::from_connect_parts(&s) {
                        Ok(v) => v,
                        Err(_e) => {
                            #[cfg(feature = "tracing")]
                            tracing::error!("Error while extracting data: {}", _e);
                            return;
                        },
                    };
                )*

                tokio::spawn((self.clone())($($ty,)*));
            }
        }
    };
}

super::all_the_tuples!(impl_handler);
super::all_the_tuples!(impl_handler_async);
