//! Client-side RFC 6455 opening handshake over a blocking stream.

use std::io::{BufRead, BufReader, Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha1::{Digest, Sha1};

use crate::error::Error;

const GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Performs the client handshake on an already-connected stream, writing
/// the upgrade request and validating the server's response line and
/// `Sec-WebSocket-Accept` header. Returns the stream's `BufReader` so
/// any bytes the server sent past the header block (there shouldn't be
/// any for a compliant server, but nothing is lost if so) aren't dropped.
pub fn client_handshake<S: Read + Write>(
    stream: &mut S,
    host: &str,
    path: &str,
    extra_headers: &[(String, String)],
    bearer_token: Option<&str>,
) -> Result<(), Error> {
    let mut key_raw = [0u8; 16];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut key_raw);
    let key = STANDARD.encode(key_raw);

    let mut request = format!(
        "GET {path} HTTP/1.1\r\n\
         Host: {host}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n"
    );
    if let Some(token) = bearer_token {
        request.push_str(&format!("Authorization: Bearer {token}\r\n"));
    }
    for (name, value) in extra_headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    request.push_str("\r\n");

    stream
        .write_all(request.as_bytes())
        .map_err(|e| Error::Network(e.to_string()))?;
    stream.flush().map_err(|e| Error::Network(e.to_string()))?;

    let mut reader = BufReader::new(&mut *stream);
    let mut status_line = String::new();
    reader
        .read_line(&mut status_line)
        .map_err(|e| Error::Network(e.to_string()))?;
    if !status_line.starts_with("HTTP/1.1 101") && !status_line.starts_with("HTTP/1.0 101") {
        return Err(Error::WebSocketProtocol(1002));
    }

    let mut accept_header: Option<String> = None;
    loop {
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| Error::Network(e.to_string()))?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("sec-websocket-accept") {
                accept_header = Some(value.trim().to_string());
            }
        }
    }

    let accept = accept_header.ok_or(Error::WebSocketProtocol(1002))?;
    let expected = accept_hash(&key);
    if accept != expected {
        return Err(Error::WebSocketProtocol(1002));
    }
    Ok(())
}

fn accept_hash(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(GUID.as_bytes());
    STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_hash_matches_rfc6455_example() {
        // The example from RFC 6455 section 1.3.
        assert_eq!(
            accept_hash("dGhlIHNhbXBsZSBub25jZQ=="),
            "s3pPLMBiTxaQ9kYGzzhZRbK+xOo="
        );
    }
}
