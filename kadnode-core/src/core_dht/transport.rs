/*
    Transport - raw-TCP request/response framing shared by the outbound
    DHT engine, pinger, and replicator.

    Responsibilities:
    One JSON object per connection: write the request, half-close the send
    side, read the peer's response to end-of-stream, parse it. No length
    prefix, no multiplexing.

    Inputs:
    - an address/port to dial and a `Message` to send

    Outputs:
    - the decoded response `Message`, or `None` for an empty response buffer
    - an `io::Error` covering connect/write/read/parse failures uniformly,
      so callers can log-and-continue without matching on error kind
*/

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::message::Message;

/// Connect, send `request`, half-close, and read the response to EOF.
/// No deadline — per §5, only the pinger's probes carry explicit timeouts.
pub async fn send_request(
    addr: &str,
    port: u16,
    request: &Message,
) -> std::io::Result<Option<Message>> {
    let mut stream = TcpStream::connect((addr, port)).await?;
    write_and_half_close(&mut stream, request).await?;
    read_response(&mut stream).await
}

/// Connect, send `message`, and return as soon as the write completes —
/// no half-close wait, no response read. Used for STORE, where the spec
/// says explicitly that no reply is expected: waiting around for the
/// peer to process and close its end would only slow the caller down.
pub async fn send_fire_and_forget(addr: &str, port: u16, message: &Message) -> std::io::Result<()> {
    let mut stream = TcpStream::connect((addr, port)).await?;
    let bytes = message.encode().to_string();
    stream.write_all(bytes.as_bytes()).await?;
    Ok(())
}

/// Same as [`send_request`], but bounds the connect and read phases
/// separately. Used only by the pinger.
pub async fn send_request_timeout(
    addr: &str,
    port: u16,
    request: &Message,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> std::io::Result<Option<Message>> {
    let mut stream = tokio::time::timeout(connect_timeout, TcpStream::connect((addr, port)))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"))??;
    write_and_half_close(&mut stream, request).await?;
    tokio::time::timeout(read_timeout, read_response(&mut stream))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out"))?
}

async fn write_and_half_close(stream: &mut TcpStream, message: &Message) -> std::io::Result<()> {
    let bytes = message.encode().to_string();
    stream.write_all(bytes.as_bytes()).await?;
    stream.shutdown().await
}

async fn read_response(stream: &mut TcpStream) -> std::io::Result<Option<Message>> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let text = String::from_utf8_lossy(&buf);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let message =
        Message::decode(&value).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(Some(message))
}
