//! Crownstone server-sent event stream: wire decoding, event types and the client.

pub mod event;
pub mod frame;

mod client;

pub use client::{Client, ClientState};
pub use event::{event_type, ClassifyError, Event};
pub use frame::{DecodeError, Frame, FrameError, FrameStream};
