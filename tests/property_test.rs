//! Property-based tests for decoding invariants
//!
//! These tests use proptest to verify invariants across many random inputs.

mod common;

use common::{mono_link, ramp, TestBackend};
use oggopus::{
    closest_valid_sample_rate, decode_bytes, encode_pcm, DecodeOptions, EncoderSettings,
    OggOpusDecoder, SUPPORTED_SAMPLE_RATES,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: output does not depend on how the input is chunked
    #[test]
    fn output_is_independent_of_chunk_size(chunk_size in 1usize..6000) {
        let data = mono_link(5, 312, 9_000);
        let reference = decode_bytes(TestBackend::default(), &data, &DecodeOptions::default())
            .unwrap();

        let options = DecodeOptions {
            chunk_size,
            ..DecodeOptions::default()
        };
        let chunked = decode_bytes(TestBackend::default(), &data, &options).unwrap();

        prop_assert_eq!(chunked.frames(), 9_000);
        prop_assert_eq!(chunked, reference);
    }

    /// Property: irregular push sizes give the same result as one push
    #[test]
    fn irregular_pushes_match_single_push(cuts in prop::collection::vec(1usize..900, 1..40)) {
        let data = mono_link(5, 312, 4_800);

        let mut decoder = OggOpusDecoder::new(TestBackend::default(), DecodeOptions::default());
        let mut rest = &data[..];
        for cut in cuts {
            let (chunk, tail) = rest.split_at(cut.min(rest.len()));
            decoder.push(chunk).unwrap();
            rest = tail;
        }
        decoder.push(rest).unwrap();
        let audio = decoder.finish().unwrap();

        prop_assert_eq!(&audio.samples[..], &ramp(5_112)[312..]);
    }

    /// Property: round-trip length equals the input length for every
    /// supported rate and any encoder delay
    #[test]
    fn round_trip_preserves_length(
        rate_index in 0usize..5,
        lookahead_ms in 0usize..10,
        frames in 0usize..5000,
        channels in 1u8..4,
    ) {
        let sample_rate = SUPPORTED_SAMPLE_RATES[rate_index];
        let backend = TestBackend::with_lookahead(lookahead_ms * sample_rate as usize / 1000);
        let input = ramp(frames * usize::from(channels));
        let settings = EncoderSettings {
            sample_rate,
            channels,
            ..EncoderSettings::default()
        };

        let data = encode_pcm(&backend, &input, &settings).unwrap();
        let audio = decode_bytes(backend, &data, &DecodeOptions::default()).unwrap();

        prop_assert_eq!(audio.sample_rate, sample_rate);
        prop_assert_eq!(audio.channels, u16::from(channels));
        prop_assert_eq!(audio.frames(), frames);
        prop_assert_eq!(audio.samples, input);
    }

    /// Property: rate selection is idempotent and picks a nearest supported rate
    #[test]
    fn closest_rate_is_nearest_and_stable(rate in 1u32..200_000) {
        let chosen = closest_valid_sample_rate(rate);

        prop_assert!(SUPPORTED_SAMPLE_RATES.contains(&chosen));
        prop_assert_eq!(closest_valid_sample_rate(chosen), chosen);
        for candidate in SUPPORTED_SAMPLE_RATES {
            prop_assert!(chosen.abs_diff(rate) <= candidate.abs_diff(rate));
        }
    }
}

#[test]
fn exact_ties_prefer_the_lower_rate() {
    assert_eq!(closest_valid_sample_rate(10_000), 8_000);
    assert_eq!(closest_valid_sample_rate(14_000), 12_000);
    assert_eq!(closest_valid_sample_rate(20_000), 16_000);
    assert_eq!(closest_valid_sample_rate(36_000), 24_000);
}
