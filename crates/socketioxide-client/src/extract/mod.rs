//! ### Extractors for [`ConnectHandler`], [`MessageHandler`] and [`DisconnectHandler`].
//!
//! They can be used to extract data from the context of the handler and get specific params:
//! * [`Data`]: decodes the event arguments, if decoding fails the handler won't be called.
//!   A single argument is decoded directly, several arguments are decoded as a sequence (e.g. a tuple).
//! * [`TryData`]: decodes the event arguments but with a `Result` type in case of error.
//! * [`Args`]: the raw positional arguments of the event.
//! * [`AckId`]: the ack id of the event, if the server asked for an acknowledgement.
//! * [`SocketRef`]: extracts a reference to the [`Socket`](crate::Socket).
//! * [`ProtocolVersion`](crate::ProtocolVersion): extracts the engine.io protocol version.
//! * [`DisconnectReason`](crate::DisconnectReason): extracts the reason of the disconnection.
//!
//! ### You can also implement your own Extractor!
//! Implement the [`FromConnectParts`], [`FromMessageParts`] and [`FromDisconnectParts`] traits
//! on any type to extract data from the context of the handler.
//!
//! [`FromConnectParts`]: crate::handler::FromConnectParts
//! [`FromMessageParts`]: crate::handler::FromMessageParts
//! [`FromDisconnectParts`]: crate::handler::FromDisconnectParts
//! [`ConnectHandler`]: crate::handler::ConnectHandler
//! [`MessageHandler`]: crate::handler::MessageHandler
//! [`DisconnectHandler`]: crate::handler::DisconnectHandler
//!
//! #### Example that extracts the first argument as a room name
//! ```rust
//! # use socketioxide_client::handler::FromMessageParts;
//! # use socketioxide_client::{Client, ClientConfig, Socket};
//! # use socketioxide_client::PayloadValue;
//! # use std::sync::Arc;
//! struct Room(String);
//!
//! #[derive(Debug)]
//! struct RoomNotFound;
//! impl std::fmt::Display for RoomNotFound {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "room not found")
//!     }
//! }
//! impl std::error::Error for RoomNotFound {}
//!
//! // If the room is missing, the handler won't be called
//! // and a tracing `error` log will be emitted (if the `tracing` feature is enabled)
//! impl FromMessageParts for Room {
//!     type Error = RoomNotFound;
//!     fn from_message_parts(
//!         _: &Arc<Socket>,
//!         args: &mut Vec<PayloadValue>,
//!         _: &Option<i64>,
//!     ) -> Result<Self, RoomNotFound> {
//!         let room = args.first().and_then(PayloadValue::as_str).ok_or(RoomNotFound)?;
//!         Ok(Room(room.to_string()))
//!     }
//! }
//!
//! let client = Client::new("http://localhost:3000", ClientConfig::default()).unwrap();
//! client.on("joined", |Room(room): Room| println!("joined {room}")).unwrap();
//! ```

mod data;
mod socket;

pub use data::*;
pub use socket::*;

pub(crate) use data::decode_args;

/// Private API.
#[doc(hidden)]
macro_rules! __impl_deref {
    ($ident:ident) => {
        impl<T> std::ops::Deref for $ident<T> {
            type Target = T;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<T> std::ops::DerefMut for $ident<T> {
            #[inline]
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };

    ($ident:ident<$($gen:ident),+>: $ty:ty) => {
        impl<$($gen),+> std::ops::Deref for $ident<$($gen),+> {
            type Target = $ty;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<$($gen),+> std::ops::DerefMut for $ident<$($gen),+> {
            #[inline]
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };

    ($ident:ident: $ty:ty) => {
        impl std::ops::Deref for $ident {
            type Target = $ty;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::ops::DerefMut for $ident {
            #[inline]
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }
    };
}
pub(crate) use __impl_deref;
