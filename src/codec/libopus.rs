// Native Opus codec through libopus
//
// Decoder and encoder handles are created by libopus and destroyed in
// `Drop`, so every exit path (normal end, chaining, errors) releases them.

use std::ffi::CStr;
use std::os::raw::c_int;
use std::ptr::NonNull;

use audiopus_sys as ffi;
use tracing::debug;

use crate::codec::{
    Application, CodecError, CodecSettings, MultistreamDecode, MultistreamEncode, OpusBackend,
};
use crate::opus::ChannelLayout;

const OPUS_OK: c_int = 0;
const OPUS_BAD_ARG: c_int = -1;
const OPUS_APPLICATION_VOIP: c_int = 2048;
const OPUS_APPLICATION_AUDIO: c_int = 2049;
const OPUS_APPLICATION_RESTRICTED_LOWDELAY: c_int = 2051;
const OPUS_SET_BITRATE_REQUEST: c_int = 4002;
const OPUS_GET_LOOKAHEAD_REQUEST: c_int = 4027;

/// libopus-backed codec factory
#[derive(Debug, Default, Clone, Copy)]
pub struct LibOpus;

/// Owned `OpusMSDecoder`
pub struct LibOpusDecoder {
    raw: NonNull<ffi::OpusMSDecoder>,
    channels: usize,
}

// The handle is only reachable through `&mut self`
unsafe impl Send for LibOpusDecoder {}

/// Owned `OpusMSEncoder`
pub struct LibOpusEncoder {
    raw: NonNull<ffi::OpusMSEncoder>,
    channels: usize,
    lookahead: usize,
}

unsafe impl Send for LibOpusEncoder {}

impl OpusBackend for LibOpus {
    type Decoder = LibOpusDecoder;
    type Encoder = LibOpusEncoder;

    fn create_decoder(
        &self,
        sample_rate: u32,
        layout: &ChannelLayout,
    ) -> Result<LibOpusDecoder, CodecError> {
        let mut status: c_int = OPUS_OK;
        let raw = unsafe {
            ffi::opus_multistream_decoder_create(
                sample_rate as i32,
                c_int::from(layout.channels),
                c_int::from(layout.streams),
                c_int::from(layout.coupled_streams),
                layout.mapping.as_ptr(),
                &mut status,
            )
        };
        let raw = check_handle(raw, status)?;
        debug!(sample_rate, channels = layout.channels, "created libopus decoder");

        Ok(LibOpusDecoder {
            raw,
            channels: usize::from(layout.channels),
        })
    }

    fn create_encoder(
        &self,
        sample_rate: u32,
        layout: &ChannelLayout,
        settings: &CodecSettings,
    ) -> Result<LibOpusEncoder, CodecError> {
        let application = match settings.application {
            Application::Voip => OPUS_APPLICATION_VOIP,
            Application::Audio => OPUS_APPLICATION_AUDIO,
            Application::LowDelay => OPUS_APPLICATION_RESTRICTED_LOWDELAY,
        };

        let mut status: c_int = OPUS_OK;
        let raw = unsafe {
            ffi::opus_multistream_encoder_create(
                sample_rate as i32,
                c_int::from(layout.channels),
                c_int::from(layout.streams),
                c_int::from(layout.coupled_streams),
                layout.mapping.as_ptr(),
                application,
                &mut status,
            )
        };
        let raw = check_handle(raw, status)?;
        // Owned from here on so early returns release the handle
        let mut encoder = LibOpusEncoder {
            raw,
            channels: usize::from(layout.channels),
            lookahead: 0,
        };

        if let Some(bitrate) = settings.bitrate {
            let status = unsafe {
                ffi::opus_multistream_encoder_ctl(
                    encoder.raw.as_ptr(),
                    OPUS_SET_BITRATE_REQUEST,
                    bitrate as c_int,
                )
            };
            if status != OPUS_OK {
                return Err(CodecError::new(status, error_message(status)));
            }
        }

        let mut lookahead: i32 = 0;
        let status = unsafe {
            ffi::opus_multistream_encoder_ctl(
                encoder.raw.as_ptr(),
                OPUS_GET_LOOKAHEAD_REQUEST,
                &mut lookahead as *mut i32,
            )
        };
        if status != OPUS_OK {
            return Err(CodecError::new(status, error_message(status)));
        }
        encoder.lookahead = lookahead.max(0) as usize;
        debug!(sample_rate, lookahead, "created libopus encoder");

        Ok(encoder)
    }
}

impl MultistreamDecode for LibOpusDecoder {
    fn decode_float(
        &mut self,
        packet: &[u8],
        pcm: &mut [f32],
        max_frame_size: usize,
    ) -> Result<usize, CodecError> {
        if pcm.len() < max_frame_size * self.channels {
            return Err(CodecError::new(OPUS_BAD_ARG, "output buffer too small"));
        }
        let samples = unsafe {
            ffi::opus_multistream_decode_float(
                self.raw.as_ptr(),
                packet.as_ptr(),
                packet.len() as i32,
                pcm.as_mut_ptr(),
                max_frame_size as c_int,
                0,
            )
        };
        if samples < 0 {
            return Err(CodecError::new(samples, error_message(samples)));
        }
        Ok(samples as usize)
    }
}

impl Drop for LibOpusDecoder {
    fn drop(&mut self) {
        unsafe { ffi::opus_multistream_decoder_destroy(self.raw.as_ptr()) }
    }
}

impl MultistreamEncode for LibOpusEncoder {
    fn lookahead(&self) -> usize {
        self.lookahead
    }

    fn encode_float(
        &mut self,
        pcm: &[f32],
        frame_size: usize,
        out: &mut [u8],
    ) -> Result<usize, CodecError> {
        if pcm.len() < frame_size * self.channels {
            return Err(CodecError::new(OPUS_BAD_ARG, "input frame too short"));
        }
        let written = unsafe {
            ffi::opus_multistream_encode_float(
                self.raw.as_ptr(),
                pcm.as_ptr(),
                frame_size as c_int,
                out.as_mut_ptr(),
                out.len() as i32,
            )
        };
        if written < 0 {
            return Err(CodecError::new(written, error_message(written)));
        }
        Ok(written as usize)
    }
}

impl Drop for LibOpusEncoder {
    fn drop(&mut self) {
        unsafe { ffi::opus_multistream_encoder_destroy(self.raw.as_ptr()) }
    }
}

fn check_handle<T>(raw: *mut T, status: c_int) -> Result<NonNull<T>, CodecError> {
    match NonNull::new(raw) {
        Some(handle) if status == OPUS_OK => Ok(handle),
        // libopus never returns a handle together with an error status
        _ => {
            let code = if status == OPUS_OK { OPUS_BAD_ARG } else { status };
            Err(CodecError::new(code, error_message(code)))
        }
    }
}

fn error_message(code: c_int) -> String {
    let message = unsafe { ffi::opus_strerror(code) };
    if message.is_null() {
        return format!("libopus error {}", code);
    }
    unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned()
}
