// Shared helpers for integration tests
//
// `TestBackend` stands in for a real Opus codec. Its "packets" hold the
// source sample rate followed by raw little-endian f32 samples, so decoded
// output can be compared exactly with the input. The encoder delays its
// output by a configurable lookahead, like a real encoder does.

#![allow(dead_code)]

use std::collections::VecDeque;

use oggopus::codec::{
    CodecError, CodecSettings, MultistreamDecode, MultistreamEncode, OpusBackend,
};
use ogg::{PacketWriteEndInfo, PacketWriter};
use oggopus::opus::{ChannelLayout, OpusHeader, OpusTags};

pub const OPUS_BAD_ARG: i32 = -1;
pub const OPUS_BUFFER_TOO_SMALL: i32 = -2;
pub const OPUS_INVALID_PACKET: i32 = -4;

#[derive(Debug, Clone, Copy, Default)]
pub struct TestBackend {
    /// Encoder delay in samples per channel at the encoding rate
    pub lookahead: usize,
}

impl TestBackend {
    pub fn with_lookahead(lookahead: usize) -> Self {
        TestBackend { lookahead }
    }
}

pub struct TestDecoder {
    sample_rate: u32,
    channels: usize,
}

pub struct TestEncoder {
    sample_rate: u32,
    channels: usize,
    lookahead: usize,
    delay: VecDeque<f32>,
}

impl OpusBackend for TestBackend {
    type Decoder = TestDecoder;
    type Encoder = TestEncoder;

    fn create_decoder(
        &self,
        sample_rate: u32,
        layout: &ChannelLayout,
    ) -> Result<TestDecoder, CodecError> {
        if layout.channels == 0 {
            return Err(CodecError::new(OPUS_BAD_ARG, "invalid argument"));
        }
        Ok(TestDecoder {
            sample_rate,
            channels: usize::from(layout.channels),
        })
    }

    fn create_encoder(
        &self,
        sample_rate: u32,
        layout: &ChannelLayout,
        _settings: &CodecSettings,
    ) -> Result<TestEncoder, CodecError> {
        let channels = usize::from(layout.channels);
        Ok(TestEncoder {
            sample_rate,
            channels,
            lookahead: self.lookahead,
            delay: std::iter::repeat(0.0).take(self.lookahead * channels).collect(),
        })
    }
}

impl MultistreamDecode for TestDecoder {
    fn decode_float(
        &mut self,
        packet: &[u8],
        pcm: &mut [f32],
        max_frame_size: usize,
    ) -> Result<usize, CodecError> {
        let frame_bytes = 4 * self.channels;
        if packet.len() < 4 || (packet.len() - 4) % frame_bytes != 0 {
            return Err(CodecError::new(OPUS_INVALID_PACKET, "corrupted stream"));
        }
        let source_rate = u32::from_le_bytes([packet[0], packet[1], packet[2], packet[3]]);
        if source_rate == 0 {
            return Err(CodecError::new(OPUS_INVALID_PACKET, "corrupted stream"));
        }
        let samples: Vec<f32> = packet[4..]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let in_frames = samples.len() / self.channels;
        let out_frames = in_frames * self.sample_rate as usize / source_rate as usize;
        if out_frames > max_frame_size || pcm.len() < out_frames * self.channels {
            return Err(CodecError::new(OPUS_BUFFER_TOO_SMALL, "buffer too small"));
        }

        // Nearest-sample rate conversion
        for frame in 0..out_frames {
            let source = frame * source_rate as usize / self.sample_rate as usize;
            let from = source * self.channels;
            let to = frame * self.channels;
            pcm[to..to + self.channels].copy_from_slice(&samples[from..from + self.channels]);
        }
        Ok(out_frames)
    }
}

impl MultistreamEncode for TestEncoder {
    fn lookahead(&self) -> usize {
        self.lookahead
    }

    fn encode_float(
        &mut self,
        pcm: &[f32],
        frame_size: usize,
        out: &mut [u8],
    ) -> Result<usize, CodecError> {
        let len = frame_size * self.channels;
        if pcm.len() < len {
            return Err(CodecError::new(OPUS_BAD_ARG, "invalid argument"));
        }
        let packet_len = 4 + 4 * len;
        if out.len() < packet_len {
            return Err(CodecError::new(OPUS_BUFFER_TOO_SMALL, "buffer too small"));
        }

        self.delay.extend(&pcm[..len]);
        out[..4].copy_from_slice(&self.sample_rate.to_le_bytes());
        for (chunk, sample) in out[4..packet_len].chunks_exact_mut(4).zip(self.delay.drain(..len)) {
            chunk.copy_from_slice(&sample.to_le_bytes());
        }
        Ok(packet_len)
    }
}

/// Audio packet of the test codec
pub fn audio_packet(sample_rate: u32, samples: &[f32]) -> Vec<u8> {
    let mut packet = sample_rate.to_le_bytes().to_vec();
    for sample in samples {
        packet.extend_from_slice(&sample.to_le_bytes());
    }
    packet
}

pub fn header(channels: u8, pre_skip: u16, input_sample_rate: u32) -> OpusHeader {
    OpusHeader {
        version: 1,
        channels,
        pre_skip,
        input_sample_rate,
        output_gain: 0,
        mapping_family: 0,
        layout: ChannelLayout::single_stream(channels),
    }
}

/// Repeating ramp whose values survive f32 exactly
pub fn ramp(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i % 1000) as f32 / 1000.0).collect()
}

/// Hand-built logical stream: header and tags pages, then one page per packet
pub struct LinkBuilder {
    writer: PacketWriter<'static, Vec<u8>>,
    serial: u32,
    sample_rate: u32,
}

impl LinkBuilder {
    pub fn new(serial: u32, header: &OpusHeader) -> Self {
        let mut writer = PacketWriter::new(Vec::new());
        writer
            .write_packet(header.to_bytes(), serial, PacketWriteEndInfo::EndPage, 0)
            .unwrap();
        writer
            .write_packet(
                OpusTags::new("test vendor").to_bytes(),
                serial,
                PacketWriteEndInfo::EndPage,
                0,
            )
            .unwrap();
        LinkBuilder {
            writer,
            serial,
            sample_rate: header.decode_sample_rate(),
        }
    }

    pub fn packet(self, samples: &[f32], granule: u64, end: PacketWriteEndInfo) -> Self {
        let packet = audio_packet(self.sample_rate, samples);
        self.raw_packet(&packet, granule, end)
    }

    pub fn raw_packet(mut self, data: &[u8], granule: u64, end: PacketWriteEndInfo) -> Self {
        self.writer
            .write_packet(data.to_vec(), self.serial, end, granule)
            .unwrap();
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Each packet on a page of its own, the stream ending with the last one
pub fn single_pages(serial: u32, packets: &[Vec<u8>]) -> Vec<u8> {
    let mut writer = PacketWriter::new(Vec::new());
    for (index, packet) in packets.iter().enumerate() {
        let end = if index + 1 == packets.len() {
            PacketWriteEndInfo::EndStream
        } else {
            PacketWriteEndInfo::EndPage
        };
        writer.write_packet(packet.clone(), serial, end, 0).unwrap();
    }
    writer.into_inner()
}

/// Mono 48 kHz link of 20 ms ramp packets whose final granule is
/// `pre_skip + samples`
pub fn mono_link(serial: u32, pre_skip: u16, samples: usize) -> Vec<u8> {
    let decoded = samples + usize::from(pre_skip);
    let packets = (decoded + 959) / 960;
    let source = ramp(packets * 960);

    let mut link = LinkBuilder::new(serial, &header(1, pre_skip, 48_000));
    for index in 0..packets {
        let last = index + 1 == packets;
        let granule = if last { decoded } else { (index + 1) * 960 };
        let end = if last {
            PacketWriteEndInfo::EndStream
        } else {
            PacketWriteEndInfo::NormalPacket
        };
        link = link.packet(&source[index * 960..(index + 1) * 960], granule as u64, end);
    }
    link.finish()
}
