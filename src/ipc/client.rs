//! IPC client for sending requests to the daemon.

use crate::error::{JimakuError, Result};
use crate::ipc::protocol::{Request, Response};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Send a request to the daemon via Unix socket.
///
/// # Errors
/// Returns `JimakuError::IpcConnection` if the connection fails.
/// Returns `JimakuError::IpcProtocol` if serialization/deserialization fails.
pub async fn send_request(socket_path: &Path, request: Request) -> Result<Response> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| JimakuError::IpcConnection {
            message: format!("Failed to connect to daemon: {}", e),
        })?;

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let request_json = request.to_json().map_err(|e| JimakuError::IpcProtocol {
        message: format!("Failed to serialize request: {}", e),
    })?;

    writer
        .write_all(request_json.as_bytes())
        .await
        .map_err(|e| JimakuError::IpcConnection {
            message: format!("Failed to write request: {}", e),
        })?;

    writer
        .write_all(b"\n")
        .await
        .map_err(|e| JimakuError::IpcConnection {
            message: format!("Failed to write newline: {}", e),
        })?;

    writer
        .flush()
        .await
        .map_err(|e| JimakuError::IpcConnection {
            message: format!("Failed to flush writer: {}", e),
        })?;

    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .await
        .map_err(|e| JimakuError::IpcConnection {
            message: format!("Failed to read response: {}", e),
        })?;

    Response::from_json(response_line.trim()).map_err(|e| JimakuError::IpcProtocol {
        message: format!("Failed to deserialize response: {}", e),
    })
}
