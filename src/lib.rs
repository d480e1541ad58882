// Copyright 2024 The mimi-client contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A full-duplex WebSocket client for streaming speech recognition.
//!
//! A [`Session`] opens a WebSocket connection to a speech endpoint, then
//! runs three threads: one pulling audio from a caller-supplied
//! `AudioSource`, encoding it (PCM, FLAC, or FLAC passthrough) and
//! sending it; one blocking on incoming frames and dispatching decoded
//! text/binary results to a caller-supplied `ResultSink`; and a monitor
//! that watches both for the first error and tears the connection down
//! cooperatively once either side finishes.
//!
//! ```no_run
//! use mimi_client::config::SessionConfigBuilder;
//! use mimi_client::encoder::AudioFormat;
//! use mimi_client::session::Session;
//! use mimi_client::worker::{AudioChunk, AudioSource, ResultSink};
//!
//! struct Silence;
//! impl AudioSource for Silence {
//!     fn next_chunk(&mut self) -> Result<AudioChunk, mimi_client::Error> {
//!         Ok(AudioChunk { pcm: Vec::new(), recog_break: true })
//!     }
//! }
//!
//! struct PrintSink;
//! impl ResultSink for PrintSink {
//!     fn on_text(&mut self, text: &str) {
//!         println!("{text}");
//!     }
//!     fn on_binary(&mut self, _data: &[u8]) {}
//! }
//!
//! # fn main() -> Result<(), mimi_client::Error> {
//! let config = SessionConfigBuilder::new("speech.example.com", 443)
//!     .format(AudioFormat::Pcm)
//!     .sample_rate(16000)
//!     .build();
//! let mut session = Session::open(config)?;
//! session.start(Box::new(Silence), Box::new(PrintSink))?;
//! while session.is_active() {
//!     std::thread::sleep(std::time::Duration::from_millis(50));
//! }
//! session.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod encoder;
pub mod error;
mod ffi;
mod frame;
mod handshake;
mod logging;
mod proxy;
pub mod session;
mod transport;
mod websocket;
pub mod worker;

pub use error::Error;
pub use session::Session;

pub use ffi::{mimi_close, mimi_error, mimi_is_active, mimi_open, mimi_start, mimi_stream_state};
pub use ffi::{mimi_strerror, mimi_version};
pub use ffi::{OnRxCallback, OnTxCallback};

/// Exposed only so `benches/unmask.rs` can exercise the frame-masking
/// hot path without making the whole `frame` module public.
#[doc(hidden)]
pub fn mask_bytes(data: &mut [u8], key: [u8; 4]) {
    frame::apply_mask(data, &key);
}
