// Ogg/Opus decoding session
//
// Bytes go in through `push` in chunks of any size; pages are synchronized,
// packets reassembled, and the decoded samples trimmed so that every link
// yields exactly (final granule - pre-skip) samples per channel, scaled to
// the decode rate.

pub mod demux;
pub mod engine;
pub mod pcm;

use std::io::Read;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::codec::OpusBackend;
use crate::decode::demux::Demuxer;
use crate::decode::pcm::PcmAccumulator;
use crate::error::Result;
use crate::ingest::{ReaderChunks, DEFAULT_CHUNK_SIZE};
use crate::ogg::PageSync;

pub use demux::{DemuxState, OutputFormat};
pub use engine::{LogicalStream, StreamPhase};

/// Decoder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Bytes read from the input per step
    pub chunk_size: usize,
    /// Force a decode rate instead of the one derived from the header.
    /// Values outside the supported set snap to the closest supported rate.
    pub output_rate: Option<u32>,
    /// Apply the output gain stored in the identification header
    pub apply_gain: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            chunk_size: DEFAULT_CHUNK_SIZE,
            output_rate: None,
            apply_gain: true,
        }
    }
}

/// Fully decoded, trimmed audio of a session
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: u16,
    /// Interleaved samples of all links in order
    pub samples: Vec<f32>,
    /// Number of chained links decoded
    pub links: usize,
}

impl DecodedAudio {
    /// Samples per channel
    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            channels => self.samples.len() / usize::from(channels),
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }
}

/// Push-based decoding session
pub struct OggOpusDecoder<B: OpusBackend> {
    sync: PageSync,
    demuxer: Demuxer<B>,
    pcm: PcmAccumulator,
    pages: usize,
}

impl<B: OpusBackend> OggOpusDecoder<B> {
    pub fn new(backend: B, options: DecodeOptions) -> Self {
        OggOpusDecoder {
            sync: PageSync::new(),
            demuxer: Demuxer::new(backend, options),
            pcm: PcmAccumulator::new(),
            pages: 0,
        }
    }

    /// Consume a chunk of input, decoding every page it completes
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.sync.feed(bytes);
        while let Some(page) = self.sync.page_out()? {
            self.pages += 1;
            self.demuxer.process_page(page, &mut self.pcm)?;
        }
        Ok(())
    }

    /// Samples per channel decoded so far
    pub fn frames_decoded(&self) -> usize {
        self.pcm.frames()
    }

    /// Signal end of input and hand out the decoded audio
    pub fn finish(mut self) -> Result<DecodedAudio> {
        if self.sync.buffered() > 0 {
            warn!(bytes = self.sync.buffered(), "trailing bytes do not form a page");
        }
        if self.sync.skipped() > 0 {
            debug!(bytes = self.sync.skipped(), "bytes skipped during page sync");
        }

        let summary = self.demuxer.finish()?;
        debug!(
            pages = self.pages,
            links = summary.links,
            frames = self.pcm.frames(),
            "decoding finished"
        );

        Ok(DecodedAudio {
            sample_rate: summary.format.sample_rate,
            channels: summary.format.channels,
            samples: self.pcm.into_samples(),
            links: summary.links,
        })
    }
}

/// Decode an in-memory Ogg/Opus file, feeding it in `options.chunk_size` pieces
pub fn decode_bytes<B: OpusBackend>(
    backend: B,
    data: &[u8],
    options: &DecodeOptions,
) -> Result<DecodedAudio> {
    let chunk_size = options.chunk_size.max(1);
    let mut decoder = OggOpusDecoder::new(backend, options.clone());
    for chunk in data.chunks(chunk_size) {
        decoder.push(chunk)?;
    }
    decoder.finish()
}

/// Decode an Ogg/Opus stream from a reader
pub fn decode_reader<B: OpusBackend, R: Read>(
    backend: B,
    reader: R,
    options: &DecodeOptions,
) -> Result<DecodedAudio> {
    let mut decoder = OggOpusDecoder::new(backend, options.clone());
    let mut chunks = ReaderChunks::new(reader, options.chunk_size);
    while let Some(chunk) = chunks.next_chunk()? {
        decoder.push(chunk)?;
    }
    decoder.finish()
}
