// OpusHead identification header
//
// Layout (little-endian):
// - Magic signature "OpusHead" (8 bytes)
// - Version (1 byte, upper nibble is the major version and must be 0)
// - Output channel count (1 byte)
// - Pre-skip in 48 kHz samples (2 bytes)
// - Input sample rate (4 bytes, informational)
// - Output gain, Q7.8 dB (2 bytes)
// - Channel mapping family (1 byte)
// - Mapping table, only when the family is not 0:
//   stream count (1), coupled stream count (1), channel mapping (channels)

use serde::Serialize;

use crate::error::{OggOpusError, Result};
use crate::opus::{GRANULE_RATE, OPUS_HEAD, SUPPORTED_SAMPLE_RATES};

const FAMILY_ZERO_HEADER_SIZE: usize = 19;
const MAPPING_TABLE_OFFSET: usize = 21;

/// Stream-to-channel layout of a multistream packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelLayout {
    pub channels: u8,
    pub streams: u8,
    pub coupled_streams: u8,
    /// Decoded stream channel for every output channel, 255 for silence
    pub mapping: Vec<u8>,
}

impl ChannelLayout {
    /// Implicit layout of mapping family 0: one mono or stereo stream
    pub fn single_stream(channels: u8) -> Self {
        ChannelLayout {
            channels,
            streams: 1,
            coupled_streams: channels.saturating_sub(1),
            mapping: (0..channels).collect(),
        }
    }

    /// One uncoupled stream per channel, in channel order
    pub fn uncoupled(channels: u8) -> Self {
        ChannelLayout {
            channels,
            streams: channels,
            coupled_streams: 0,
            mapping: (0..channels).collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.streams == 0 {
            return Err(invalid("stream count is zero"));
        }
        if self.coupled_streams > self.streams {
            return Err(invalid("more coupled streams than streams"));
        }
        let decoded_channels = self.streams as usize + self.coupled_streams as usize;
        if decoded_channels > 255 {
            return Err(invalid("stream and coupled stream counts exceed 255"));
        }
        if let Some(&entry) = self
            .mapping
            .iter()
            .find(|&&entry| entry != 255 && entry as usize >= decoded_channels)
        {
            return Err(invalid(&format!(
                "mapping entry {} exceeds {} decoded channels",
                entry, decoded_channels
            )));
        }
        Ok(())
    }
}

/// Parsed identification header of one logical stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpusHeader {
    pub version: u8,
    pub channels: u8,
    pub pre_skip: u16,
    pub input_sample_rate: u32,
    pub output_gain: i16,
    pub mapping_family: u8,
    pub layout: ChannelLayout,
}

impl OpusHeader {
    /// Parse the first packet of a logical stream
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if packet.len() < FAMILY_ZERO_HEADER_SIZE {
            return Err(invalid(&format!("header is only {} bytes", packet.len())));
        }
        if &packet[0..8] != OPUS_HEAD {
            return Err(invalid("missing OpusHead signature"));
        }

        let version = packet[8];
        if version >> 4 != 0 {
            return Err(invalid(&format!("unsupported version {}", version)));
        }

        let channels = packet[9];
        if channels == 0 {
            return Err(invalid("channel count is zero"));
        }

        let pre_skip = u16::from_le_bytes([packet[10], packet[11]]);
        let input_sample_rate =
            u32::from_le_bytes([packet[12], packet[13], packet[14], packet[15]]);
        let output_gain = i16::from_le_bytes([packet[16], packet[17]]);
        let mapping_family = packet[18];

        let layout = match mapping_family {
            0 => {
                if channels > 2 {
                    return Err(invalid(&format!(
                        "mapping family 0 carries {} channels",
                        channels
                    )));
                }
                ChannelLayout::single_stream(channels)
            }
            family => {
                if family == 1 && channels > 8 {
                    return Err(invalid(&format!(
                        "mapping family 1 carries {} channels",
                        channels
                    )));
                }
                let table_end = MAPPING_TABLE_OFFSET + channels as usize;
                if packet.len() < table_end {
                    return Err(invalid("truncated channel mapping table"));
                }
                ChannelLayout {
                    channels,
                    streams: packet[19],
                    coupled_streams: packet[20],
                    mapping: packet[MAPPING_TABLE_OFFSET..table_end].to_vec(),
                }
            }
        };
        layout.validate()?;

        Ok(OpusHeader {
            version,
            channels,
            pre_skip,
            input_sample_rate,
            output_gain,
            mapping_family,
            layout,
        })
    }

    /// Serialize the header packet
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(MAPPING_TABLE_OFFSET + self.layout.mapping.len());
        data.extend_from_slice(OPUS_HEAD);
        data.push(self.version);
        data.push(self.channels);
        data.extend_from_slice(&self.pre_skip.to_le_bytes());
        data.extend_from_slice(&self.input_sample_rate.to_le_bytes());
        data.extend_from_slice(&self.output_gain.to_le_bytes());
        data.push(self.mapping_family);
        if self.mapping_family != 0 {
            data.push(self.layout.streams);
            data.push(self.layout.coupled_streams);
            data.extend_from_slice(&self.layout.mapping);
        }
        data
    }

    /// Rate the decoder runs at for this stream.
    ///
    /// An input rate of 0 means "unspecified" and decodes at 48 kHz.
    pub fn decode_sample_rate(&self) -> u32 {
        match self.input_sample_rate {
            0 => GRANULE_RATE,
            rate => closest_valid_sample_rate(rate),
        }
    }

    /// Pre-skip expressed in samples at `sample_rate`
    pub fn pre_skip_at(&self, sample_rate: u32) -> usize {
        (u64::from(self.pre_skip) * u64::from(sample_rate) / u64::from(GRANULE_RATE)) as usize
    }

    /// Linear amplitude factor for the output gain
    pub fn gain_factor(&self) -> f32 {
        10f32.powf(f32::from(self.output_gain) / (20.0 * 256.0))
    }
}

/// Nearest supported decode rate; on exact ties the lower rate wins
pub fn closest_valid_sample_rate(rate: u32) -> u32 {
    SUPPORTED_SAMPLE_RATES
        .iter()
        .copied()
        .min_by_key(|candidate| candidate.abs_diff(rate))
        .unwrap_or(rate)
}

fn invalid(message: &str) -> OggOpusError {
    OggOpusError::InvalidHeader(message.to_string())
}
