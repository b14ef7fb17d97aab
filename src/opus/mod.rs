// OPUS format support (in OGG container)
//
// OPUS File Structure:
// - Identification header: "OpusHead" (8 bytes) alone on the first page
// - Comment header: "OpusTags" (8 bytes) followed by Vorbis-style comments
// - Audio data pages; granule positions count 48 kHz samples
//
// Reference:
// - https://wiki.xiph.org/OggOpus
// - RFC 7845: Ogg Encapsulation for the Opus Audio Codec

pub mod header;
pub mod tags;

pub use header::{closest_valid_sample_rate, ChannelLayout, OpusHeader};
pub use tags::{OpusTags, Picture};

pub const OPUS_HEAD: &[u8; 8] = b"OpusHead";
pub const OPUS_TAGS: &[u8; 8] = b"OpusTags";

/// Rates the Opus codec can run at
pub const SUPPORTED_SAMPLE_RATES: [u32; 5] = [8000, 12000, 16000, 24000, 48000];

/// Granule positions and pre-skip are always counted at 48 kHz
pub const GRANULE_RATE: u32 = 48000;

/// 120 ms at 48 kHz, the longest frame a packet can carry
pub const MAX_FRAME_SIZE: usize = 960 * 6;
