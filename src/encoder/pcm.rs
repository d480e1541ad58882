//! Identity encoder: forwards raw PCM bytes untouched.

use crate::error::Error;

use super::{frame_size, Encoder};

/// Passes every byte fed to it straight through, buffering between
/// `encode` and `drain` just like the FLAC variants so the transmit
/// worker can treat all three encoders identically. Grounded in the
/// original's `pcm.hpp`.
pub struct PcmEncoder {
    sample_rate: u32,
    channels: u8,
    buffer: Vec<u8>,
}

impl PcmEncoder {
    pub fn new(sample_rate: u32, channels: u8) -> PcmEncoder {
        PcmEncoder {
            sample_rate,
            channels,
            buffer: Vec::new(),
        }
    }
}

impl Encoder for PcmEncoder {
    fn content_type(&self) -> String {
        format!(
            "audio/x-pcm;bit=16;rate={};channels={}",
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
        let mut enc = PcmEncoder::new(16000, 1);
        enc.encode(&[1, 2, 3, 4]).unwrap();
        assert_eq!(enc.drain(), vec![1, 2, 3, 4]);
        enc.flush().unwrap();
        assert_eq!(enc.drain(), Vec::<u8>::new());
    }

    #[test]
    fn rejects_input_not_a_multiple_of_frame_size() {
        let mut enc = PcmEncoder::new(16000, 1);
        assert!(enc.encode(&[1, 2, 3]).is_err());
    }

    #[test]
    fn content_type_reports_rate_and_channels() {
        let enc = PcmEncoder::new(16000, 1);
        assert_eq!(enc.content_type(), "audio/x-pcm;bit=16;rate=16000;channels=1");
    }
}
