//! The open WebSocket connection: handshake already completed, frames
//! flow in both directions over one shared connection.

use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::Error;
use crate::frame::{self, Frame, OpCode};
use crate::transport::{connect, ConnectParams, ReadStream, WriteStream};

/// An open, authenticated WebSocket connection, shared between the
/// transmit and receive workers.
///
/// The read half and write half are split (see [`crate::transport::WsStream::split`])
/// and guarded by two independent mutexes: a send-mutex around `write`
/// serializes the transmit worker's audio frames against the receive
/// worker's close/pong echoes, while `read` is only ever touched by the
/// receive worker. A blocking read parked for up to `recv_timeout` never
/// contends with a send, matching the original's full-duplex Poco socket.
pub struct WebSocket {
    read: Mutex<ReadStream>,
    write: Mutex<WriteStream>,
    shutdown_handle: TcpStream,
    close_sent: AtomicBool,
    close_received: AtomicBool,
}

impl WebSocket {
    /// Connects, performs the opening handshake, and returns a ready
    /// connection. `path` and `host` are used both for the TCP/TLS
    /// connect and for the `Host`/request-line of the handshake.
    pub fn connect(
        params: &ConnectParams,
        path: &str,
        extra_headers: &[(String, String)],
        bearer_token: Option<&str>,
    ) -> Result<WebSocket, Error> {
        let mut stream = connect(params)?;
        crate::handshake::client_handshake(&mut stream, params.host, path, extra_headers, bearer_token)?;
        let (read, write, shutdown_handle) = stream.split();
        Ok(WebSocket {
            read: Mutex::new(read),
            write: Mutex::new(write),
            shutdown_handle,
            close_sent: AtomicBool::new(false),
            close_received: AtomicBool::new(false),
        })
    }

    /// `true` once a close frame has been sent or received. Once closed,
    /// no further data sends are permitted; the only legal remaining
    /// operation is `send_close` echoing the peer's close exactly once.
    pub fn is_closed(&self) -> bool {
        self.close_sent.load(Ordering::SeqCst) || self.close_received.load(Ordering::SeqCst)
    }

    /// Sends a binary frame (the only frame type the transmit worker
    /// emits for audio payloads).
    pub fn send_binary(&self, payload: &[u8]) -> Result<(), Error> {
        if self.is_closed() {
            return Err(Error::TlsClosed);
        }
        let mut guard = self.write.lock().expect("write lock poisoned");
        frame::write_frame(&mut *guard, OpCode::Binary, payload).map_err(Error::Io)
    }

    /// Sends a text frame (used for the `recog-break`/control messages
    /// the transmit worker emits between utterances).
    pub fn send_text(&self, payload: &str) -> Result<(), Error> {
        if self.is_closed() {
            return Err(Error::TlsClosed);
        }
        let mut guard = self.write.lock().expect("write lock poisoned");
        frame::write_frame(&mut *guard, OpCode::Text, payload.as_bytes()).map_err(Error::Io)
    }

    /// Sends a close frame with the given status code. Idempotent: a
    /// second call (e.g. the receive worker echoing a peer close while
    /// `Session::close` also sends one) is a no-op rather than an error.
    pub fn send_close(&self, status: u16) -> Result<(), Error> {
        if self.close_sent.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut guard = self.write.lock().expect("write lock poisoned");
        let body = status.to_be_bytes();
        frame::write_frame(&mut *guard, OpCode::Close, &body).map_err(Error::Io)
    }

    /// Replies to a ping with a pong carrying the same payload, through
    /// the same send-mutex as every other write.
    fn send_pong(&self, payload: &[u8]) -> Result<(), Error> {
        let mut guard = self.write.lock().expect("write lock poisoned");
        frame::write_frame(&mut *guard, OpCode::Pong, payload).map_err(Error::Io)
    }

    /// Forces the underlying socket closed, unblocking whichever worker
    /// is parked in `recv_frame` or a send call. Used by the monitor to
    /// tear the connection down once the first fatal error is seen. Goes
    /// through a dedicated socket handle rather than `read`/`write`, so it
    /// never has to wait behind a blocked read or write to take effect.
    pub fn shutdown(&self) {
        let _ = self.shutdown_handle.shutdown(std::net::Shutdown::Both);
    }

    /// Blocks until the next frame is available, or `recv_timeout`
    /// elapses on the underlying stream. Only the receive worker calls
    /// this, so the `read` lock is never contended.
    pub fn recv_frame(&self) -> Result<Frame, Error> {
        let frame = {
            let mut guard = self.read.lock().expect("read lock poisoned");
            frame::read_frame(&mut *guard).map_err(|e| {
                if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut {
                    Error::WebSocketReceiveTimeout
                } else {
                    Error::Io(e)
                }
            })?
        };
        if let Frame::Ping(ref payload) = frame {
            self.send_pong(payload)?;
        }
        if matches!(frame, Frame::Close { .. } | Frame::PeerGone) {
            self.close_received.store(true, Ordering::SeqCst);
        }
        Ok(frame)
    }
}
