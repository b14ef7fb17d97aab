//! oggopus - sample-accurate Ogg/Opus decoding and encoding
//!
//! The decoder accepts an Ogg/Opus byte stream in chunks of any size and
//! produces interleaved float PCM. The encoder delay (pre-skip) is removed
//! from the start of every link and the padding of the final frame from the
//! end, so each link yields exactly the samples its granule positions
//! describe. Chained files are decoded link after link.
//!
//! The Opus codec itself is supplied through [`codec::OpusBackend`]; the
//! `libopus` feature provides an implementation on top of the native library.

pub mod codec;
pub mod convert;
pub mod decode;
pub mod encode;
pub mod error;
pub mod ingest;
pub mod ogg;
pub mod opus;
pub mod probe;

pub use codec::{
    Application, CodecError, CodecSettings, MultistreamDecode, MultistreamEncode, OpusBackend,
};
#[cfg(feature = "libopus")]
pub use codec::LibOpus;
pub use convert::{ogg_to_wav, read_wav, wav_to_ogg, write_wav, ConversionSummary, WavAudio};
pub use decode::{decode_bytes, decode_reader, DecodeOptions, DecodedAudio, OggOpusDecoder};
pub use encode::{encode_pcm, EncoderSettings, OggOpusEncoder};
pub use error::{OggOpusError, Result};
pub use opus::{closest_valid_sample_rate, OpusHeader, OpusTags, Picture, SUPPORTED_SAMPLE_RATES};
pub use probe::{probe_bytes, probe_reader, LinkInfo, StreamInfo};
