// File conversion between Ogg/Opus and WAV

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::Serialize;
use tracing::debug;

use crate::codec::OpusBackend;
use crate::decode::{decode_reader, DecodeOptions, DecodedAudio};
use crate::encode::{EncoderSettings, OggOpusEncoder};
use crate::error::{OggOpusError, Result};

/// Outcome of a conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionSummary {
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel
    pub frames: u64,
    pub links: usize,
}

/// Interleaved PCM read from a WAV file
#[derive(Debug, Clone, PartialEq)]
pub struct WavAudio {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

/// Decode an Ogg/Opus file into a 32-bit float WAV file
pub fn ogg_to_wav<B: OpusBackend>(
    backend: B,
    src: &Path,
    dest: &Path,
    options: &DecodeOptions,
) -> Result<ConversionSummary> {
    let file = File::open(src)?;
    let audio = decode_reader(backend, BufReader::new(file), options)?;
    write_wav(dest, &audio)?;

    debug!(src = %src.display(), dest = %dest.display(), frames = audio.frames(), "wrote WAV");
    Ok(ConversionSummary {
        sample_rate: audio.sample_rate,
        channels: audio.channels,
        frames: audio.frames() as u64,
        links: audio.links,
    })
}

/// Encode a WAV file as Ogg/Opus; rate and channel count come from the WAV
pub fn wav_to_ogg<B: OpusBackend>(
    backend: B,
    src: &Path,
    dest: &Path,
    settings: &EncoderSettings,
) -> Result<ConversionSummary> {
    let wav = read_wav(src)?;
    let channels = u8::try_from(wav.channels).map_err(|_| {
        OggOpusError::UnsupportedParameters(format!("{} channels", wav.channels))
    })?;
    let settings = EncoderSettings {
        sample_rate: wav.sample_rate,
        channels,
        ..settings.clone()
    };

    let writer = BufWriter::new(File::create(dest)?);
    let mut encoder = OggOpusEncoder::new(&backend, writer, &settings)?;
    encoder.write(&wav.samples)?;
    encoder.finish()?;

    let frames = (wav.samples.len() / usize::from(wav.channels.max(1))) as u64;
    debug!(src = %src.display(), dest = %dest.display(), frames, "wrote Ogg/Opus");
    Ok(ConversionSummary {
        sample_rate: wav.sample_rate,
        channels: wav.channels,
        frames,
        links: 1,
    })
}

/// Write decoded audio as 32-bit float WAV
pub fn write_wav(path: &Path, audio: &DecodedAudio) -> Result<()> {
    let spec = WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in &audio.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Read a WAV file into interleaved floats in [-1, 1]
pub fn read_wav(path: &Path) -> Result<WavAudio> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let samples = match spec.sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|s| s as f32 * scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok(WavAudio {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        samples,
    })
}
