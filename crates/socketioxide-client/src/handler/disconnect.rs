//! [`DisconnectHandler`] trait and implementations, used to handle the end of the connection.
//! It has a flexible axum-like API, you can put any arguments as long as it implements the [`FromDisconnectParts`] trait.
//!
//! The handler is called exactly once per connection, whatever the reason of the close.
//!
//! ## Example with a sync closure
//! ```rust
//! # use socketioxide_client::{Client, ClientConfig, DisconnectReason};
//! # use socketioxide_client::extract::*;
//! let client = Client::new("http://localhost:3000", ClientConfig::default()).unwrap();
//! client.on_disconnect(|s: SocketRef, reason: DisconnectReason| {
//!     println!("Socket on {} was disconnected: {}", s.ns(), reason);
//! }).unwrap();
//! ```
use std::{future::Future, sync::Arc};

use super::{MakeErasedHandler, private};
use crate::socket::{DisconnectReason, Socket};

/// A Type Erased [`DisconnectHandler`] so it can be stored
pub(crate) type BoxedDisconnectHandler = Box<dyn ErasedDisconnectHandler>;

pub(crate) trait ErasedDisconnectHandler: Send + Sync + 'static {
    fn call(&self, s: Arc<Socket>, reason: DisconnectReason);
}

impl<T, H> MakeErasedHandler<H, T>
where
    T: Send + Sync + 'static,
    H: DisconnectHandler<T> + Send + Sync + 'static,
{
    pub fn new_disconnect_boxed(inner: H) -> BoxedDisconnectHandler {
        Box::new(MakeErasedHandler::new(inner))
    }
}

impl<T, H> ErasedDisconnectHandler for MakeErasedHandler<H, T>
where
    H: DisconnectHandler<T> + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self, s), fields(ns = s.ns())))]
    #[inline(always)]
    fn call(&self, s: Arc<Socket>, reason: DisconnectReason) {
        self.handler.call(s, reason);
    }
}

/// A trait used to extract the arguments from the disconnect event.
/// The `Result` associated type is used to return an error if the extraction fails,
/// in this case the [`DisconnectHandler`] is not called.
///
/// * See the [`disconnect`](super::disconnect) module doc for more details on disconnect handler.
/// * See the [`extract`](crate::extract) module doc for more details on available extractors.
#[diagnostic::on_unimplemented(
    note = "This function argument is not a valid socketio extractor.",
    label = "Invalid extractor"
)]
pub trait FromDisconnectParts: Sized {
    /// The error type returned by the extractor
    type Error: std::error::Error + 'static;

    /// Extract the arguments from the disconnect event.
    /// If it fails, the handler is not called
    fn from_disconnect_parts(s: &Arc<Socket>, reason: DisconnectReason)
    -> Result<Self, Self::Error>;
}

/// Define a handler for the disconnect event.
/// It is implemented for sync and async closures with up to 16 arguments.
/// They must implement the [`FromDisconnectParts`] trait.
///
/// * See the [`disconnect`](super::disconnect) module doc for more details on disconnect handler.
/// * See the [`extract`](crate::extract) module doc for more details on available extractors.
#[diagnostic::on_unimplemented(
    note = "This function is not a DisconnectHandler. Check that:
* It is a clonable sync or async `FnOnce` that returns nothing.
* All its arguments are valid disconnect extractors.\n",
    label = "Invalid DisconnectHandler"
)]
pub trait DisconnectHandler<T>: Send + Sync + 'static {
    /// Call the handler with the given arguments.
    fn call(&self, s: Arc<Socket>, reason: DisconnectReason);

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
        impl<F, $($ty,)*> DisconnectHandler<(private::Sync, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) + Send + Sync + Clone + 'static,
            $( $ty: FromDisconnectParts + Send, )*
        {
            fn call(&self, s: Arc<Socket>, reason: DisconnectReason) {
                $(
                    let $ty = match $ty::from_disconnect_parts(&s, reason) {
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
        impl<F, Fut, $($ty,)*> DisconnectHandler<(private::Async, $($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> Fut + Send + Sync + Clone + 'static,
            Fut: Future<Output = ()> + Send + 'static,
            $( $ty: FromDisconnectParts + Send, )*
        {
            fn call(&self, s: Arc<Socket>, reason: DisconnectReason) {
                $(
                    let $ty = match $ty::from_disconnect_parts(&s, reason) {
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
