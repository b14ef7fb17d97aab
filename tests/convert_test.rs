mod common;

use std::fs;

use common::{ramp, TestBackend};
use hound::{SampleFormat, WavSpec, WavWriter};
use oggopus::{
    ogg_to_wav, probe_bytes, read_wav, wav_to_ogg, DecodeOptions, EncoderSettings, OggOpusError,
};
use tempfile::tempdir;

fn write_int_wav(path: &std::path::Path, sample_rate: u32, channels: u16, samples: &[i16]) {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for &sample in samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_wav_round_trip_through_ogg() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("source.wav");
    let encoded = dir.path().join("encoded.opus");
    let decoded = dir.path().join("decoded.wav");

    let pcm: Vec<i16> = (0..2 * 24_000).map(|i| ((i * 37) % 20_000 - 10_000) as i16).collect();
    write_int_wav(&source, 24_000, 2, &pcm);

    let backend = TestBackend::with_lookahead(156);
    let settings = EncoderSettings {
        comments: vec![("TITLE".to_string(), "Round trip".to_string())],
        ..EncoderSettings::default()
    };
    let summary = wav_to_ogg(backend, &source, &encoded, &settings).unwrap();
    assert_eq!(summary.sample_rate, 24_000);
    assert_eq!(summary.channels, 2);
    assert_eq!(summary.frames, 24_000);

    let info = probe_bytes(&fs::read(&encoded).unwrap()).unwrap();
    assert_eq!(info.links.len(), 1);
    let link = &info.links[0];
    assert_eq!(link.header.pre_skip, 312);
    assert_eq!(link.header.input_sample_rate, 24_000);
    assert_eq!(link.duration_secs, 1.0);
    assert_eq!(link.tags.as_ref().and_then(|t| t.get("title")), Some("Round trip"));

    let summary = ogg_to_wav(backend, &encoded, &decoded, &DecodeOptions::default()).unwrap();
    assert_eq!(summary.frames, 24_000);
    assert_eq!(summary.links, 1);

    let original = read_wav(&source).unwrap();
    let result = read_wav(&decoded).unwrap();
    assert_eq!(result.sample_rate, 24_000);
    assert_eq!(result.channels, 2);
    assert_eq!(result.samples, original.samples);
}

#[test]
fn test_unsupported_wav_rate_is_rejected() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("cd.wav");
    write_int_wav(&source, 44_100, 1, &[0; 441]);

    let result = wav_to_ogg(
        TestBackend::default(),
        &source,
        &dir.path().join("out.opus"),
        &EncoderSettings::default(),
    );
    assert!(matches!(result, Err(OggOpusError::UnsupportedParameters(_))));
}

#[test]
fn test_missing_input_is_an_io_error() {
    let dir = tempdir().unwrap();
    let result = ogg_to_wav(
        TestBackend::default(),
        &dir.path().join("missing.opus"),
        &dir.path().join("out.wav"),
        &DecodeOptions::default(),
    );
    assert!(matches!(result, Err(OggOpusError::Io(_))));
}

#[test]
fn test_float_wav_output() {
    let dir = tempdir().unwrap();
    let encoded = dir.path().join("mono.opus");
    let decoded = dir.path().join("mono.wav");
    fs::write(&encoded, common::mono_link(1, 312, 4_800)).unwrap();

    ogg_to_wav(TestBackend::default(), &encoded, &decoded, &DecodeOptions::default()).unwrap();

    let reader = hound::WavReader::open(&decoded).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.sample_format, SampleFormat::Float);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(spec.sample_rate, 48_000);

    let wav = read_wav(&decoded).unwrap();
    assert_eq!(wav.samples[..], ramp(5_112)[312..]);
}
