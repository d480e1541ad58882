//! Audio encoder trait and the construction factory that picks a variant
//! from an [`AudioFormat`].

mod flac;
mod flac_passthrough;
mod pcm;

pub use flac::FlacEncoder;
pub use flac_passthrough::FlacPassThroughEncoder;
pub use pcm::PcmEncoder;

use crate::error::Error;

/// The audio formats this client can push upstream. Mirrors the
/// `MIMIIO_PCM`/`MIMIIO_FLAC_0`..`MIMIIO_FLAC_8`/`MIMIIO_FLAC_PASSTHROUGH`
/// tags in the original's public header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Pcm,
    Flac(u8),
    FlacPassThrough,
}

impl AudioFormat {
    /// Validates a requested FLAC compression level at construction time
    /// rather than deep inside a worker thread.
    pub fn flac(level: u8) -> Result<AudioFormat, Error> {
        if level > 8 {
            return Err(Error::EncoderInit(format!(
                "FLAC compression level {level} out of range 0..=8"
            )));
        }
        Ok(AudioFormat::Flac(level))
    }
}

/// The length, in bytes, one sample-frame occupies for 16-bit PCM at the
/// given channel count. `encode` rejects input whose length isn't a
/// multiple of this.
pub fn frame_size(channels: u8) -> usize {
    2 * channels as usize
}

/// Transforms raw 16-bit little-endian PCM into the wire payload the
/// transmit worker sends.
///
/// `encode` appends to an internal buffer rather than returning bytes
/// directly; `drain` empties that buffer atomically. This split lets the
/// FLAC variant's asynchronous write callback and the transmit worker's
/// explicit drain call share one buffer without either side guessing
/// when output became available.
pub trait Encoder: Send {
    /// MIME type advertised for this encoder's output.
    fn content_type(&self) -> String;

    /// Feeds one chunk of raw PCM. Returns `EncoderProcess` if `pcm`'s
    /// length isn't a multiple of the configured frame size.
    fn encode(&mut self, pcm: &[u8]) -> Result<(), Error>;

    /// Finalizes the stream: materializes any samples still buffered
    /// inside the encoder as output bytes available to `drain`. Calling
    /// `encode` after `flush` is undefined; this crate only calls
    /// `flush` once, immediately before exiting the transmit worker.
    fn flush(&mut self) -> Result<(), Error>;

    /// Removes and returns all bytes accumulated since the last call.
    fn drain(&mut self) -> Vec<u8>;
}

/// Builds the right `Encoder` for `format`, mirroring
/// `mimiioEncoderFactory::create`.
pub fn for_format(format: AudioFormat, sample_rate: u32, channels: u8) -> Result<Box<dyn Encoder>, Error> {
    match format {
        AudioFormat::Pcm => Ok(Box::new(PcmEncoder::new(sample_rate, channels))),
        AudioFormat::FlacPassThrough => Ok(Box::new(FlacPassThroughEncoder::new(sample_rate, channels))),
        AudioFormat::Flac(level) => Ok(Box::new(FlacEncoder::new(sample_rate, channels, level)?)),
    }
}
