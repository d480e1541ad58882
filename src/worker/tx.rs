//! Transmit worker: pulls PCM from the caller's audio source, encodes it,
//! and sends it upstream. Grounded on `mimiioTxWorker.cpp`'s loop shape:
//! own a fixed scratch buffer, pull one chunk per iteration, encode,
//! drain, send, with `recog-break` flushing the encoder and emitting the
//! session's one terminating control message.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::encoder::Encoder;
use crate::error::Error;

use super::{AudioChunk, AudioSource, SharedState, TX_BUFFER_CAPACITY};

/// The only text command the transmit worker ever sends, and the last
/// frame sent by the client before close.
const RECOG_BREAK_MESSAGE: &str = r#"{"command":"recog-break"}"#;

const IDLE_SLEEP: Duration = Duration::from_millis(100);
const BUFFERING_SLEEP: Duration = Duration::from_millis(1);

/// Runs until `recog-break` is requested, an error occurs, or a shutdown
/// is requested by the monitor. Always marks `shared.tx_finished` before
/// returning.
pub fn run_tx(shared: Arc<SharedState>, mut source: Box<dyn AudioSource>, mut encoder: Box<dyn Encoder>) {
    shared.tx_started.store(true, Ordering::SeqCst);
    let result = tx_loop(&shared, source.as_mut(), encoder.as_mut());
    if let Err(err) = result {
        record_error(&shared, err);
    }
    shared.tx_finished.store(true, Ordering::SeqCst);
}

fn tx_loop(shared: &SharedState, source: &mut dyn AudioSource, encoder: &mut dyn Encoder) -> Result<(), Error> {
    loop {
        if shared.shutdown_requested.load(Ordering::SeqCst) {
            return Ok(());
        }

        let chunk = match source.next_chunk() {
            Ok(chunk) => chunk,
            Err(Error::UserCallback(code)) => {
                let _ = shared.socket.send_text(RECOG_BREAK_MESSAGE);
                return Err(Error::UserCallback(code));
            }
            Err(other) => return Err(other),
        };

        if chunk.pcm.len() > TX_BUFFER_CAPACITY {
            return Err(Error::BufferOverrun);
        }

        if chunk.pcm.is_empty() && !chunk.recog_break {
            thread::sleep(IDLE_SLEEP);
            continue;
        }

        encoder.encode(&chunk.pcm)?;
        let mut encoded = encoder.drain();

        if chunk.recog_break {
            encoder.flush()?;
            encoded.extend(encoder.drain());
            if !encoded.is_empty() {
                shared.socket.send_binary(&encoded)?;
            }
            shared.socket.send_text(RECOG_BREAK_MESSAGE)?;
            return Ok(());
        }

        if !encoded.is_empty() {
            shared.socket.send_binary(&encoded)?;
        } else {
            thread::sleep(BUFFERING_SLEEP);
        }
    }
}

fn record_error(shared: &SharedState, err: Error) {
    let code = err.code();
    match shared
        .first_error
        .compare_exchange(0, code, Ordering::SeqCst, Ordering::SeqCst)
    {
        Ok(_) => tracing::error!(code, "transmit worker stopped: {err}"),
        Err(_) => tracing::warn!(code, "transmit worker error after session already failed: {err}"),
    }
}
