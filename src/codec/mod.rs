// Opus codec engine interface
//
// The container logic never touches a codec directly; it asks an
// `OpusBackend` for decoder and encoder instances. Each instance owns its
// native state and releases it when dropped.

#[cfg(feature = "libopus")]
pub mod libopus;

#[cfg(feature = "libopus")]
pub use libopus::LibOpus;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::opus::ChannelLayout;

/// Error reported by a codec engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecError {
    /// Native error code, negative for libopus errors
    pub code: i32,
    pub message: String,
}

impl CodecError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        CodecError {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

impl std::error::Error for CodecError {}

/// Encoder tuning target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Application {
    Voip,
    #[default]
    Audio,
    LowDelay,
}

/// Settings handed to the codec when an encoder is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodecSettings {
    pub application: Application,
    /// Target bitrate in bits per second, codec default when `None`
    pub bitrate: Option<i32>,
}

/// Multistream decoder instance for one logical stream
pub trait MultistreamDecode {
    /// Decode `packet` into interleaved `pcm`, returning samples per channel.
    ///
    /// `pcm` holds at least `max_frame_size * channels` values.
    fn decode_float(
        &mut self,
        packet: &[u8],
        pcm: &mut [f32],
        max_frame_size: usize,
    ) -> Result<usize, CodecError>;
}

/// Multistream encoder instance
pub trait MultistreamEncode {
    /// Samples per channel the encoder delays its output by
    fn lookahead(&self) -> usize;

    /// Encode one frame of interleaved `pcm` into `out`, returning the packet length
    fn encode_float(
        &mut self,
        pcm: &[f32],
        frame_size: usize,
        out: &mut [u8],
    ) -> Result<usize, CodecError>;
}

/// Factory for codec instances
pub trait OpusBackend {
    type Decoder: MultistreamDecode;
    type Encoder: MultistreamEncode;

    fn create_decoder(
        &self,
        sample_rate: u32,
        layout: &ChannelLayout,
    ) -> Result<Self::Decoder, CodecError>;

    fn create_encoder(
        &self,
        sample_rate: u32,
        layout: &ChannelLayout,
        settings: &CodecSettings,
    ) -> Result<Self::Encoder, CodecError>;
}

impl<B: OpusBackend + ?Sized> OpusBackend for &B {
    type Decoder = B::Decoder;
    type Encoder = B::Encoder;

    fn create_decoder(
        &self,
        sample_rate: u32,
        layout: &ChannelLayout,
    ) -> Result<Self::Decoder, CodecError> {
        (**self).create_decoder(sample_rate, layout)
    }

    fn create_encoder(
        &self,
        sample_rate: u32,
        layout: &ChannelLayout,
        settings: &CodecSettings,
    ) -> Result<Self::Encoder, CodecError> {
        (**self).create_encoder(sample_rate, layout, settings)
    }
}
