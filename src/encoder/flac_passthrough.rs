//! Pass-through variant for callers that already hand this client
//! FLAC-encoded bytes and want no further processing.

use crate::error::Error;

use super::{frame_size, Encoder};

/// Appends verbatim; `flush` is a no-op since there is no internal
/// encoder state to finalize, matching the original's `flacPT.hpp`.
pub struct FlacPassThroughEncoder {
    sample_rate: u32,
    channels: u8,
    buffer: Vec<u8>,
}

impl FlacPassThroughEncoder {
    pub fn new(sample_rate: u32, channels: u8) -> FlacPassThroughEncoder {
        FlacPassThroughEncoder {
            sample_rate,
            channels,
            buffer: Vec::new(),
        }
    }
}

impl Encoder for FlacPassThroughEncoder {
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
        self.buffer.extend_from_slice(pcm);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn drain(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_bytes_unchanged() {
        let mut enc = FlacPassThroughEncoder::new(16000, 1);
        enc.encode(&[9, 9]).unwrap();
        assert_eq!(enc.drain(), vec![9, 9]);
    }
}
