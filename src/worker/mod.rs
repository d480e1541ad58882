//! The three-thread worker model: transmit, receive, and a monitor that
//! watches both for the first error and drives cooperative shutdown.

mod monitor;
mod rx;
mod tx;

pub use monitor::run_monitor;
pub use rx::run_rx;
pub use tx::run_tx;

use std::sync::atomic::{AtomicBool, AtomicI32};
use std::sync::Arc;

use crate::error::Error;
use crate::websocket::WebSocket;

/// Size of the PCM staging area the user source callback writes into.
/// Chunks larger than this are a fatal policy breach (`BufferOverrun`).
pub const TX_BUFFER_CAPACITY: usize = 262_144;

/// One pull from the caller's audio source: up to `len` bytes of raw PCM,
/// plus whether this is the end of the current utterance. Both fields can
/// be populated at once (a final, non-empty chunk that also requests a
/// `recog-break`).
pub struct AudioChunk {
    pub pcm: Vec<u8>,
    pub recog_break: bool,
}

/// Supplies audio to the transmit worker. Implemented directly by Rust
/// callers, or by a shim over a C function pointer at the FFI boundary.
pub trait AudioSource: Send {
    /// Returns the next chunk of work, blocking as needed.
    ///
    /// `Err(Error::UserCallback(code))` carries a caller-defined error
    /// reported through the tx callback's `tx_error` out-param; the
    /// transmit worker still makes a best-effort attempt to send
    /// `recog-break` before exiting with that code.
    ///
    /// `Err(Error::BufferOverrun)` signals the caller wrote more than the
    /// worker's scratch buffer can hold; the worker exits immediately
    /// with no `recog-break` sent.
    fn next_chunk(&mut self) -> Result<AudioChunk, Error>;
}

/// Receives decoded results from the receive worker.
pub trait ResultSink: Send {
    fn on_text(&mut self, text: &str);
    fn on_binary(&mut self, data: &[u8]);
}

/// State shared by all three worker threads plus the owning `Session`.
///
/// Mirrors the original's `errorno_`/`started_`/finished-flag fields,
/// spread across the tx/rx-specific controllers there into one struct
/// here since this crate runs both directions' workers from a single
/// `Session`.
pub struct SharedState {
    pub tx_started: AtomicBool,
    pub rx_started: AtomicBool,
    pub tx_finished: AtomicBool,
    pub rx_finished: AtomicBool,
    pub shutdown_requested: AtomicBool,
    /// 0 = no error yet; first writer wins (see `tx::record_error`/`rx::record_error`).
    pub first_error: AtomicI32,
    pub socket: Arc<WebSocket>,
}

impl SharedState {
    pub fn new(socket: Arc<WebSocket>) -> SharedState {
        SharedState {
            tx_started: AtomicBool::new(false),
            rx_started: AtomicBool::new(false),
            tx_finished: AtomicBool::new(false),
            rx_finished: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
            first_error: AtomicI32::new(0),
            socket,
        }
    }
}
