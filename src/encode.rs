// Ogg/Opus encoding
//
// Stream layout written:
// - Page 0 (BOS): OpusHead alone
// - Page 1: OpusTags alone
// - Audio pages of 20 ms packets; the last page carries EOS and a granule
//   position that trims the zero padding of the final frame

use std::io::Write;

use ::ogg::{PacketWriteEndInfo, PacketWriter};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::codec::{Application, CodecSettings, MultistreamEncode, OpusBackend};
use crate::error::{OggOpusError, Result};
use crate::opus::{ChannelLayout, OpusHeader, OpusTags, GRANULE_RATE, SUPPORTED_SAMPLE_RATES};

/// Frame duration used for every packet
pub const FRAME_DURATION_MS: u32 = 20;

/// Packet buffer per channel
const MAX_PACKET_SIZE: usize = 4000;

/// Encoder configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Input sample rate; must be one the codec runs at
    pub sample_rate: u32,
    pub channels: u8,
    pub application: Application,
    /// Target bitrate in bits per second
    pub bitrate: Option<i32>,
    /// Serial number of the logical stream; random by default so that
    /// separately encoded files can be chained
    pub serial: u32,
    pub vendor: String,
    pub comments: Vec<(String, String)>,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        EncoderSettings {
            sample_rate: GRANULE_RATE,
            channels: 2,
            application: Application::Audio,
            bitrate: None,
            serial: rand::random(),
            vendor: format!("oggopus {}", env!("CARGO_PKG_VERSION")),
            comments: Vec::new(),
        }
    }
}

impl EncoderSettings {
    fn codec_settings(&self) -> CodecSettings {
        CodecSettings {
            application: self.application,
            bitrate: self.bitrate,
        }
    }

    fn layout(&self) -> (u8, ChannelLayout) {
        if self.channels <= 2 {
            (0, ChannelLayout::single_stream(self.channels))
        } else {
            (255, ChannelLayout::uncoupled(self.channels))
        }
    }
}

/// Streaming encoder writing one logical Ogg/Opus stream
pub struct OggOpusEncoder<E: MultistreamEncode, W: Write> {
    encoder: E,
    writer: PacketWriter<'static, W>,
    serial: u32,
    channels: usize,
    sample_rate: u32,
    frame_size: usize,
    lookahead: usize,
    pre_skip: u16,
    pending: Vec<f32>,
    packet: Vec<u8>,
    input_frames: u64,
    encoded_frames: u64,
}

impl<E: MultistreamEncode, W: Write> OggOpusEncoder<E, W> {
    /// Create the codec and write both header pages
    pub fn new<B>(backend: &B, writer: W, settings: &EncoderSettings) -> Result<Self>
    where
        B: OpusBackend<Encoder = E>,
    {
        if !SUPPORTED_SAMPLE_RATES.contains(&settings.sample_rate) {
            return Err(OggOpusError::UnsupportedParameters(format!(
                "sample rate {} Hz is not one of {:?}",
                settings.sample_rate, SUPPORTED_SAMPLE_RATES
            )));
        }
        if settings.channels == 0 {
            return Err(OggOpusError::UnsupportedParameters(
                "channel count is zero".to_string(),
            ));
        }

        let (mapping_family, layout) = settings.layout();
        let encoder = backend
            .create_encoder(settings.sample_rate, &layout, &settings.codec_settings())
            .map_err(|e| OggOpusError::UnsupportedParameters(e.to_string()))?;

        let lookahead = encoder.lookahead();
        let pre_skip = u16::try_from(
            lookahead as u64 * u64::from(GRANULE_RATE) / u64::from(settings.sample_rate),
        )
        .map_err(|_| {
            OggOpusError::UnsupportedParameters(format!("encoder lookahead {} too long", lookahead))
        })?;

        let header = OpusHeader {
            version: 1,
            channels: settings.channels,
            pre_skip,
            input_sample_rate: settings.sample_rate,
            output_gain: 0,
            mapping_family,
            layout,
        };
        let mut tags = OpusTags::new(settings.vendor.clone());
        for (field, value) in &settings.comments {
            tags.push(field.clone(), value.clone());
        }

        let serial = settings.serial;
        let mut writer = PacketWriter::new(writer);
        writer.write_packet(header.to_bytes(), serial, PacketWriteEndInfo::EndPage, 0)?;
        writer.write_packet(tags.to_bytes(), serial, PacketWriteEndInfo::EndPage, 0)?;

        let channels = usize::from(settings.channels);
        let frame_size = (settings.sample_rate * FRAME_DURATION_MS / 1000) as usize;
        debug!(
            sample_rate = settings.sample_rate,
            channels,
            pre_skip,
            serial,
            "starting Opus encoder"
        );

        Ok(OggOpusEncoder {
            encoder,
            writer,
            serial,
            channels,
            sample_rate: settings.sample_rate,
            frame_size,
            lookahead,
            pre_skip,
            pending: Vec::with_capacity(frame_size * channels),
            packet: vec![0; MAX_PACKET_SIZE * channels],
            input_frames: 0,
            encoded_frames: 0,
        })
    }

    pub fn pre_skip(&self) -> u16 {
        self.pre_skip
    }

    /// Append interleaved samples; complete frames are encoded right away
    pub fn write(&mut self, interleaved: &[f32]) -> Result<()> {
        self.input_frames += (interleaved.len() / self.channels) as u64;
        self.pending.extend_from_slice(interleaved);

        let frame_len = self.frame_size * self.channels;
        let mut offset = 0;
        while self.pending.len() - offset >= frame_len {
            let granule = self.granule_after(self.encoded_frames + 1);
            let frame = self.pending[offset..offset + frame_len].to_vec();
            self.encode_frame(&frame, granule, PacketWriteEndInfo::NormalPacket)?;
            offset += frame_len;
        }
        self.pending.drain(..offset);
        Ok(())
    }

    /// Pad the tail, write the end-of-stream page and return the writer
    pub fn finish(mut self) -> Result<W> {
        let frame_len = self.frame_size * self.channels;
        // Every input sample must come out of the decoder, which lags by the lookahead
        let needed = self.input_frames + self.lookahead as u64;
        let end_granule = u64::from(self.pre_skip)
            + self.input_frames * u64::from(GRANULE_RATE) / u64::from(self.sample_rate);

        loop {
            let mut frame = std::mem::take(&mut self.pending);
            frame.resize(frame_len, 0.0);

            let last = (self.encoded_frames + 1) * self.frame_size as u64 >= needed;
            if last {
                self.encode_frame(&frame, end_granule, PacketWriteEndInfo::EndStream)?;
                break;
            }
            let granule = self.granule_after(self.encoded_frames + 1);
            self.encode_frame(&frame, granule, PacketWriteEndInfo::NormalPacket)?;
        }

        debug!(
            frames = self.input_frames,
            packets = self.encoded_frames,
            serial = self.serial,
            "Opus encoder finished"
        );
        let mut writer = self.writer.into_inner();
        writer.flush()?;
        Ok(writer)
    }

    /// Granule position after `frames` encoded frames
    fn granule_after(&self, frames: u64) -> u64 {
        frames * self.frame_size as u64 * u64::from(GRANULE_RATE) / u64::from(self.sample_rate)
    }

    fn encode_frame(
        &mut self,
        frame: &[f32],
        granule: u64,
        end: PacketWriteEndInfo,
    ) -> Result<()> {
        let len = self
            .encoder
            .encode_float(frame, self.frame_size, &mut self.packet)
            .map_err(|e| OggOpusError::EncodeFailed(e.to_string()))?;
        let packet = self.packet[..len].to_vec();
        self.writer.write_packet(packet, self.serial, end, granule)?;
        self.encoded_frames += 1;
        Ok(())
    }
}

/// Encode interleaved samples into an in-memory Ogg/Opus file
pub fn encode_pcm<B: OpusBackend>(
    backend: &B,
    samples: &[f32],
    settings: &EncoderSettings,
) -> Result<Vec<u8>> {
    let mut encoder = OggOpusEncoder::new(backend, Vec::new(), settings)?;
    encoder.write(samples)?;
    encoder.finish()
}
