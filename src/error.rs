// Error types for Ogg/Opus processing

use thiserror::Error;

/// Result type alias using `OggOpusError`
pub type Result<T> = std::result::Result<T, OggOpusError>;

/// Every failure aborts the session that raised it; there is no partial output.
#[derive(Error, Debug)]
pub enum OggOpusError {
    /// Page synchronization or packet assembly hit corrupt container data
    #[error("malformed Ogg container: {0}")]
    MalformedContainer(String),

    /// Input was consumed without a single Opus logical stream starting
    #[error("no Opus stream found in input")]
    NotAnOpusFile,

    /// A new identification header appeared under the serial of the running stream
    #[error("chained Opus stream reuses serial number {serial:#010x}")]
    ChainedWithoutSerialChange { serial: u32 },

    /// Identification header could not be parsed
    #[error("invalid Opus header: {0}")]
    InvalidHeader(String),

    /// Header packets share their page with other packets
    #[error("invalid packet layout: {0}")]
    InvalidPacket(String),

    /// Codec reported a negative sample count
    #[error("Opus decode failed: {0}")]
    DecodeFailed(String),

    /// Codec reported an error while encoding
    #[error("Opus encode failed: {0}")]
    EncodeFailed(String),

    /// Codec construction rejected the stream parameters
    #[error("unsupported stream parameters: {0}")]
    UnsupportedParameters(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}
