// Per-stream decoding with pre-skip and end trimming
//
// Granule positions count 48 kHz samples including the pre-skip. The number
// of samples a stream may emit up to a page is therefore
// (granule - pre_skip) * rate / 48000; anything the decoder produces beyond
// that (padding of the final frame) is discarded.

use tracing::debug;

use crate::codec::{MultistreamDecode, OpusBackend};
use crate::decode::pcm::PcmAccumulator;
use crate::error::{OggOpusError, Result};
use crate::opus::{OpusHeader, GRANULE_RATE, MAX_FRAME_SIZE};

/// Samples to discard and to keep from one decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trim {
    pub skip: usize,
    pub emit: usize,
}

/// Remaining output budget of a stream at a page boundary, never negative
pub fn max_output(page_granule: i64, granule_offset: i64, sample_rate: u32, link_out: i64) -> i64 {
    let allowed = (i128::from(page_granule) - i128::from(granule_offset)) * i128::from(sample_rate)
        / i128::from(GRANULE_RATE);
    (allowed - i128::from(link_out)).clamp(0, i128::from(i64::MAX)) as i64
}

/// Split a decoded frame into leading pre-skip and emitted tail
pub fn plan_trim(frame_size: usize, pre_skip_remaining: usize, max_out: i64) -> Trim {
    let skip = pre_skip_remaining.min(frame_size);
    let available = frame_size - skip;
    let emit = if max_out > 0 {
        available.min(usize::try_from(max_out).unwrap_or(usize::MAX))
    } else {
        0
    };
    Trim { skip, emit }
}

/// Owns the decoder of one logical stream and its trim state
pub struct DecodeEngine<D> {
    decoder: D,
    channels: usize,
    sample_rate: u32,
    buffer: Vec<f32>,
    pre_skip_remaining: usize,
    granule_offset: i64,
    link_out: i64,
}

impl<D: MultistreamDecode> DecodeEngine<D> {
    pub fn new(decoder: D, header: &OpusHeader, sample_rate: u32) -> Self {
        let channels = usize::from(header.channels);
        DecodeEngine {
            decoder,
            channels,
            sample_rate,
            buffer: vec![0.0; MAX_FRAME_SIZE * channels],
            pre_skip_remaining: header.pre_skip_at(sample_rate),
            granule_offset: i64::from(header.pre_skip),
            link_out: 0,
        }
    }

    /// Decode one audio packet and append its trimmed samples
    pub fn decode_packet(
        &mut self,
        packet: &[u8],
        page_granule: i64,
        pcm: &mut PcmAccumulator,
    ) -> Result<usize> {
        let frame_size = self
            .decoder
            .decode_float(packet, &mut self.buffer, MAX_FRAME_SIZE)
            .map_err(|e| OggOpusError::DecodeFailed(e.to_string()))?
            .min(MAX_FRAME_SIZE);

        let max_out =
            max_output(page_granule, self.granule_offset, self.sample_rate, self.link_out);
        let trim = plan_trim(frame_size, self.pre_skip_remaining, max_out);
        self.pre_skip_remaining -= trim.skip;

        if trim.emit > 0 {
            let start = trim.skip * self.channels;
            let end = start + trim.emit * self.channels;
            pcm.append(&self.buffer[start..end]);
        }
        self.link_out += trim.emit as i64;

        Ok(trim.emit)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Position of a logical stream within its two header packets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    AwaitingTags,
    Audio,
}

/// One link of a (possibly chained) Ogg/Opus file
pub struct LogicalStream<D> {
    serial: u32,
    header: OpusHeader,
    phase: StreamPhase,
    packet_count: u64,
    engine: DecodeEngine<D>,
}

impl<D: MultistreamDecode> LogicalStream<D> {
    /// Start a stream from its identification header packet.
    ///
    /// Without `forced_rate` the stream decodes at the rate its header asks for.
    pub fn start<B>(
        backend: &B,
        serial: u32,
        header_packet: &[u8],
        forced_rate: Option<u32>,
    ) -> Result<Self>
    where
        B: OpusBackend<Decoder = D>,
    {
        let header = OpusHeader::parse(header_packet)?;
        let sample_rate = forced_rate.unwrap_or_else(|| header.decode_sample_rate());

        let decoder = backend
            .create_decoder(sample_rate, &header.layout)
            .map_err(|e| OggOpusError::UnsupportedParameters(e.to_string()))?;

        debug!(
            serial,
            channels = header.channels,
            pre_skip = header.pre_skip,
            sample_rate,
            "starting logical stream"
        );

        let engine = DecodeEngine::new(decoder, &header, sample_rate);
        Ok(LogicalStream {
            serial,
            header,
            phase: StreamPhase::AwaitingTags,
            packet_count: 1,
            engine,
        })
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn header(&self) -> &OpusHeader {
        &self.header
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn has_tags(&self) -> bool {
        self.phase == StreamPhase::Audio
    }

    pub fn sample_rate(&self) -> u32 {
        self.engine.sample_rate()
    }

    /// Mark the comment header as seen; its content is not interpreted here
    pub fn accept_tags(&mut self) {
        self.phase = StreamPhase::Audio;
        self.packet_count += 1;
    }

    pub fn decode(
        &mut self,
        packet: &[u8],
        page_granule: i64,
        pcm: &mut PcmAccumulator,
    ) -> Result<usize> {
        let emitted = self.engine.decode_packet(packet, page_granule, pcm)?;
        self.packet_count += 1;
        Ok(emitted)
    }
}

impl<D> Drop for LogicalStream<D> {
    fn drop(&mut self) {
        debug!(
            serial = self.serial,
            packets = self.packet_count,
            samples = self.engine.link_out,
            "closing logical stream"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pre_skip_spans_frames() {
        // 312 samples of pre-skip against 120-sample frames
        let first = plan_trim(120, 312, 10_000);
        assert_eq!(first, Trim { skip: 120, emit: 0 });
        let second = plan_trim(120, 192, 10_000);
        assert_eq!(second, Trim { skip: 120, emit: 0 });
        let third = plan_trim(120, 72, 10_000);
        assert_eq!(third, Trim { skip: 72, emit: 48 });
    }

    #[test]
    fn test_end_trim_clamps_to_granule() {
        assert_eq!(plan_trim(960, 0, 100), Trim { skip: 0, emit: 100 });
        assert_eq!(plan_trim(960, 0, 0), Trim { skip: 0, emit: 0 });
        assert_eq!(plan_trim(960, 0, -5), Trim { skip: 0, emit: 0 });
    }

    #[test]
    fn test_max_output() {
        // Stream of 3 s at 48 kHz with pre-skip 312, nothing emitted yet
        assert_eq!(max_output(144_312, 312, 48_000, 0), 144_000);
        assert_eq!(max_output(144_312, 312, 48_000, 143_000), 1_000);
        // Decoding at 16 kHz scales the budget
        assert_eq!(max_output(48_312, 312, 16_000, 0), 16_000);
        // Budget already used up
        assert_eq!(max_output(960, 312, 48_000, 960), 0);
        // Page without a finished packet
        assert_eq!(max_output(-1, 312, 48_000, 0), 0);
    }
}
