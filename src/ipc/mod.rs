//! Unix-socket IPC between the CLI and the daemon.

pub mod client;
pub mod protocol;
pub mod server;

pub use client::send_request;
pub use protocol::{Request, Response};
pub use server::{IpcServer, RequestHandler};
