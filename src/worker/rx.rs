//! Receive worker: blocks on incoming frames and dispatches decoded
//! results to the caller's sink. Grounded on `mimiioRxWorker.cpp`'s
//! close-status handling and its empty-text/empty-binary error codes.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::error::Error;
use crate::frame::Frame;

use super::{ResultSink, SharedState};

/// Runs until the connection closes, an error occurs, or a shutdown is
/// requested by the monitor. Always marks `shared.rx_finished` before
/// returning.
pub fn run_rx(shared: Arc<SharedState>, mut sink: Box<dyn ResultSink>) {
    shared.rx_started.store(true, Ordering::SeqCst);
    let result = rx_loop(&shared, sink.as_mut());
    if let Err(err) = result {
        record_error(&shared, err);
    }
    shared.rx_finished.store(true, Ordering::SeqCst);
}

fn rx_loop(shared: &SharedState, sink: &mut dyn ResultSink) -> Result<(), Error> {
    loop {
        if shared.shutdown_requested.load(Ordering::SeqCst) {
            return Ok(());
        }

        match shared.socket.recv_frame() {
            Ok(Frame::Text(bytes)) => {
                if bytes.is_empty() {
                    return Err(Error::EmptyText);
                }
                let text = String::from_utf8_lossy(&bytes);
                sink.on_text(&text);
            }
            Ok(Frame::Binary(bytes)) => {
                if bytes.is_empty() {
                    return Err(Error::EmptyBinary);
                }
                sink.on_binary(&bytes);
            }
            Ok(Frame::Ping(_)) | Ok(Frame::Pong(_)) => {
                // the pong reply already went out inside WebSocket::recv_frame
            }
            Ok(Frame::Close { status: 1000 }) => {
                let _ = shared.socket.send_close(1000);
                // A server close terminates receive and asks transmit to
                // drain and stop rather than idle-sleeping forever.
                shared.shutdown_requested.store(true, Ordering::SeqCst);
                return Ok(());
            }
            Ok(Frame::Close { status: 0 }) => {
                return Err(Error::CloseWithoutStatus);
            }
            Ok(Frame::Close { status }) => {
                let _ = shared.socket.send_close(status);
                return Err(Error::PeerClose(status));
            }
            Ok(Frame::Unknown { .. }) => {
                return Err(Error::UnknownFrame);
            }
            Ok(Frame::PeerGone) => {
                return Err(Error::PeerGone);
            }
            Err(Error::WebSocketReceiveTimeout) => {
                // idle read timeout, loop back around and re-check shutdown
                continue;
            }
            Err(err) => return Err(err),
        }
    }
}

fn record_error(shared: &SharedState, err: Error) {
    let code = err.code();
    match shared
        .first_error
        .compare_exchange(0, code, Ordering::SeqCst, Ordering::SeqCst)
    {
        Ok(_) => tracing::error!(code, "receive worker stopped: {err}"),
        Err(_) => tracing::warn!(code, "receive worker error after session already failed: {err}"),
    }
}
