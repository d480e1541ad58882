//! Streaming FLAC encoder backed by `libflac-sys`.
//!
//! The FFI call sequence (create, configure, `init_stream` with a write
//! callback, `process_interleaved` per chunk, `finish`, `delete`) follows
//! the same shape as the reference FLAC-over-FFI encoder in the pack, with
//! the async mpsc-channel output replaced by a mutex-guarded `Vec<u8>`
//! buffer that the write callback appends to directly, since this
//! encoder runs synchronously inside the transmit worker thread rather
//! than as a spawned task.

use std::os::raw::c_void;
use std::sync::{Arc, Mutex};

use libflac_sys::{
    FLAC__StreamEncoder, FLAC__StreamEncoderWriteStatus,
    FLAC__STREAM_ENCODER_WRITE_STATUS_OK, FLAC__stream_encoder_delete,
    FLAC__stream_encoder_finish, FLAC__stream_encoder_init_stream, FLAC__stream_encoder_new,
    FLAC__stream_encoder_process_interleaved, FLAC__stream_encoder_set_bits_per_sample,
    FLAC__stream_encoder_set_channels, FLAC__stream_encoder_set_compression_level,
    FLAC__stream_encoder_set_sample_rate, FLAC__stream_encoder_set_streamable_subset,
    FLAC__stream_encoder_set_verify,
};

use crate::error::Error;

use super::{frame_size, Encoder};

const BITS_PER_SAMPLE: u32 = 16;

/// RAII wrapper so the encoder is always deleted, including on the
/// error paths during `new`.
struct EncoderHandle(*mut FLAC__StreamEncoder);

impl Drop for EncoderHandle {
    fn drop(&mut self) {
        if !self.0.is_null() {
            unsafe { FLAC__stream_encoder_delete(self.0) };
        }
    }
}

// The raw pointer is only ever touched from the worker thread that owns
// the `FlacEncoder`; `Send` is safe because libFLAC imposes no thread
// affinity on the encoder handle itself.
unsafe impl Send for EncoderHandle {}

pub struct FlacEncoder {
    handle: EncoderHandle,
    sample_rate: u32,
    channels: u8,
    output: Arc<Mutex<Vec<u8>>>,
    finished: bool,
}

unsafe extern "C" fn write_callback(
    _encoder: *const FLAC__StreamEncoder,
    buffer: *const u8,
    bytes: usize,
    _samples: u32,
    _current_frame: u32,
    client_data: *mut c_void,
) -> FLAC__StreamEncoderWriteStatus {
    let output = unsafe { &*(client_data as *const Mutex<Vec<u8>>) };
    let slice = unsafe { std::slice::from_raw_parts(buffer, bytes) };
    output.lock().expect("flac output buffer poisoned").extend_from_slice(slice);
    FLAC__STREAM_ENCODER_WRITE_STATUS_OK
}

impl FlacEncoder {
    pub fn new(sample_rate: u32, channels: u8, compression_level: u8) -> Result<FlacEncoder, Error> {
        if compression_level > 8 {
            return Err(Error::EncoderInit(format!(
                "FLAC compression level {compression_level} out of range 0..=8"
            )));
        }

        let raw = unsafe { FLAC__stream_encoder_new() };
        if raw.is_null() {
            return Err(Error::EncoderInit("FLAC__stream_encoder_new returned null".into()));
        }
        let handle = EncoderHandle(raw);

        let ensure = |ok: i32, what: &str| -> Result<(), Error> {
            if ok == 0 {
                Err(Error::EncoderInit(format!("{what} failed")))
            } else {
                Ok(())
            }
        };

        unsafe {
            ensure(
                FLAC__stream_encoder_set_channels(handle.0, channels as u32),
                "set_channels",
            )?;
            ensure(
                FLAC__stream_encoder_set_bits_per_sample(handle.0, BITS_PER_SAMPLE),
                "set_bits_per_sample",
            )?;
            ensure(
                FLAC__stream_encoder_set_sample_rate(handle.0, sample_rate),
                "set_sample_rate",
            )?;
            ensure(
                FLAC__stream_encoder_set_compression_level(handle.0, compression_level as u32),
                "set_compression_level",
            )?;
            ensure(
                FLAC__stream_encoder_set_streamable_subset(handle.0, 1),
                "set_streamable_subset",
            )?;
            ensure(FLAC__stream_encoder_set_verify(handle.0, 0), "set_verify")?;
        }

        let output = Arc::new(Mutex::new(Vec::new()));
        let client_data = Arc::as_ptr(&output) as *mut c_void;
        let init_status = unsafe {
            FLAC__stream_encoder_init_stream(
                handle.0,
                Some(write_callback),
                None,
                None,
                None,
                client_data,
            )
        };
        if init_status != 0 {
            return Err(Error::EncoderInit(format!(
                "FLAC__stream_encoder_init_stream returned status {init_status}"
            )));
        }

        Ok(FlacEncoder {
            handle,
            sample_rate,
            channels,
            output,
            finished: false,
        })
    }

    fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut *self.output.lock().expect("flac output buffer poisoned"))
    }

    fn pcm_to_interleaved_i32(&self, pcm: &[u8]) -> Vec<i32> {
        pcm.chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as i32)
            .collect()
    }
}

impl Encoder for FlacEncoder {
    fn content_type(&self) -> String {
        format!(
            "audio/x-flac;bit=16;rate={};channels={}",
            self.sample_rate, self.channels
        )
    }

    fn encode(&mut self, pcm: &[u8]) -> Result<(), Error> {
        if pcm.len() % frame_size(self.channels) != 0 {
            return Err(Error::EncoderProcess(format!(
                "input length {} is not a multiple of frame size {}",
                pcm.len(),
                frame_size(self.channels)
            )));
        }
        let samples = self.pcm_to_interleaved_i32(pcm);
        if samples.is_empty() {
            return Ok(());
        }
        let frames = samples.len() as u32 / self.channels as u32;
        let ok = unsafe {
            FLAC__stream_encoder_process_interleaved(self.handle.0, samples.as_ptr(), frames)
        };
        if ok == 0 {
            return Err(Error::EncoderProcess("FLAC__stream_encoder_process_interleaved failed".into()));
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let ok = unsafe { FLAC__stream_encoder_finish(self.handle.0) };
        if ok == 0 {
            return Err(Error::EncoderProcess("FLAC__stream_encoder_finish failed".into()));
        }
        Ok(())
    }

    fn drain(&mut self) -> Vec<u8> {
        self.take_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_compression_level() {
        assert!(FlacEncoder::new(16000, 1, 9).is_err());
    }

    #[test]
    fn encodes_a_short_silent_buffer() {
        let mut enc = FlacEncoder::new(16000, 1, 0).expect("encoder should initialize");
        let silence = vec![0u8; 4096 * 2];
        enc.encode(&silence).unwrap();
        let mut out = enc.drain();
        enc.flush().unwrap();
        out.extend(enc.drain());
        assert!(!out.is_empty(), "FLAC stream should contain at least a header");
        assert_eq!(&out[0..4], b"fLaC");
    }

    #[test]
    fn rejects_input_not_a_multiple_of_frame_size() {
        let mut enc = FlacEncoder::new(16000, 1, 0).expect("encoder should initialize");
        assert!(enc.encode(&[0u8]).is_err());
    }

    #[test]
    fn content_type_reports_rate_and_channels() {
        let enc = FlacEncoder::new(16000, 2, 0).expect("encoder should initialize");
        assert_eq!(enc.content_type(), "audio/x-flac;bit=16;rate=16000;channels=2");
    }
}
