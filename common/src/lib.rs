//! Text protocol shared by the rayo-kv server and client.
//!
//! - [`message`] parses command lines into [`message::Command`] and renders
//!   [`message::Response`] replies.
//! - [`codec`] frames newline-terminated lines for `tokio_util::codec::Framed`.

pub mod codec;
pub mod message;
