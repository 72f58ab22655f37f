//! # crownstone-sse
//!
//! Client for the Crownstone cloud server-sent event stream.
//!
//! The [`Client`] logs in to the cloud, keeps the event stream open, reconnects on any failure
//! and publishes every received event to listeners subscribed by event type. [`BlockingClient`]
//! runs the same client on a dedicated thread for programs without an async runtime.

#![deny(missing_debug_implementations, missing_docs)]
#![forbid(unsafe_code)]

pub mod api;
pub mod bus;
pub mod config;
pub mod sse;

mod blocking;
mod error;
mod session;

pub use blocking::BlockingClient;
pub use error::{AuthError, ClientError, ConnectError, Error, Result};
pub use session::Session;
pub use sse::{Client, ClientState, Event};
