//! ptyrelay server: drives a CLI program from a browser over WebSocket.
//!
//! Each connection owns one [`SessionHandler`], which decodes client frames,
//! starts and stops a [`ptyrelay_bridge::ProcessBridge`], and forwards the
//! process output back as `output` frames.

pub mod connection;
pub mod handler;
pub mod logging;
pub mod protocol;
pub mod server;

pub use connection::handle_connection;
pub use handler::SessionHandler;
pub use protocol::{ClientMessage, ProtocolError, ServerMessage, SessionAction, SessionState};
pub use server::serve;
