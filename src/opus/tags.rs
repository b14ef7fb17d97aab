// OpusTags comment header
//
// - Magic signature "OpusTags" (8 bytes)
// - Vendor string length (LE u32) + vendor string (UTF-8)
// - Comment count (LE u32)
// - Per comment: length (LE u32) + "FIELD=value" (UTF-8)
//
// Cover art travels as a METADATA_BLOCK_PICTURE comment holding a base64
// encoded FLAC picture block.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use encoding_rs::UTF_8;
use serde::Serialize;

use crate::error::{OggOpusError, Result};
use crate::opus::OPUS_TAGS;

/// Comment field carrying embedded pictures
pub const PICTURE_FIELD: &str = "METADATA_BLOCK_PICTURE";

/// Parsed comment header
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpusTags {
    pub vendor: String,
    pub comments: Vec<(String, String)>,
}

impl OpusTags {
    pub fn new(vendor: impl Into<String>) -> Self {
        OpusTags {
            vendor: vendor.into(),
            comments: Vec::new(),
        }
    }

    /// Parse the second packet of a logical stream
    pub fn parse(packet: &[u8]) -> Result<Self> {
        if !packet.starts_with(OPUS_TAGS) {
            return Err(OggOpusError::InvalidHeader(
                "missing OpusTags signature".to_string(),
            ));
        }
        let mut reader = FieldReader::new(&packet[OPUS_TAGS.len()..]);

        let vendor = decode_utf8(reader.block()?);
        let count = reader.u32_le()? as usize;

        // Every comment needs at least its 4-byte length
        let mut comments = Vec::with_capacity(count.min(reader.remaining() / 4));
        for _ in 0..count {
            let text = decode_utf8(reader.block()?);
            // Parse comment (format: FIELD=value)
            if let Some((field, value)) = text.split_once('=') {
                comments.push((field.to_string(), value.to_string()));
            }
        }

        Ok(OpusTags { vendor, comments })
    }

    /// Serialize the comment header packet
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = OPUS_TAGS.to_vec();
        push_block(&mut data, self.vendor.as_bytes());
        data.extend_from_slice(&(self.comments.len() as u32).to_le_bytes());
        for (field, value) in &self.comments {
            push_block(&mut data, format!("{}={}", field, value).as_bytes());
        }
        data
    }

    /// Get a comment value by field name
    pub fn get(&self, field: &str) -> Option<&str> {
        self.comments
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(field))
            .map(|(_, v)| v.as_str())
    }

    pub fn push(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.comments.push((field.into(), value.into()));
    }

    /// Decode every embedded picture, skipping malformed ones
    pub fn pictures(&self) -> Vec<Picture> {
        self.comments
            .iter()
            .filter(|(field, _)| field.eq_ignore_ascii_case(PICTURE_FIELD))
            .filter_map(|(_, value)| BASE64.decode(value.trim()).ok())
            .filter_map(|block| Picture::parse(&block).ok())
            .collect()
    }
}

/// Embedded picture from a METADATA_BLOCK_PICTURE comment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Picture {
    pub picture_type: u32,
    pub mime_type: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub colors: u32,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Picture {
    /// Parse a FLAC picture block (big-endian fields)
    pub fn parse(block: &[u8]) -> Result<Self> {
        let mut reader = FieldReader::new(block);
        let picture_type = reader.u32_be()?;
        let mime_type = decode_utf8(reader.block_be()?);
        let description = decode_utf8(reader.block_be()?);
        let width = reader.u32_be()?;
        let height = reader.u32_be()?;
        let depth = reader.u32_be()?;
        let colors = reader.u32_be()?;
        let data = reader.block_be()?.to_vec();

        Ok(Picture {
            picture_type,
            mime_type,
            description,
            width,
            height,
            depth,
            colors,
            data,
        })
    }

    /// Human readable name of the picture type
    pub fn type_name(&self) -> &'static str {
        match self.picture_type {
            1 => "File Icon",
            2 => "Other File Icon",
            3 => "Cover (front)",
            4 => "Cover (back)",
            5 => "Leaflet page",
            6 => "Media",
            7 => "Lead artist",
            8 => "Artist",
            9 => "Conductor",
            10 => "Band",
            11 => "Composer",
            12 => "Lyricist",
            13 => "Recording Location",
            14 => "During recording",
            15 => "During performance",
            16 => "Video screen capture",
            17 => "Bright coloured fish",
            18 => "Illustration",
            19 => "Band logo",
            20 => "Publisher logo",
            _ => "Other",
        }
    }
}

struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        FieldReader { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(OggOpusError::InvalidHeader(format!(
                "field of {} bytes overruns tag data",
                len
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u32_le(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u32_be(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn block(&mut self) -> Result<&'a [u8]> {
        let len = self.u32_le()? as usize;
        self.take(len)
    }

    fn block_be(&mut self) -> Result<&'a [u8]> {
        let len = self.u32_be()? as usize;
        self.take(len)
    }
}

fn push_block(data: &mut Vec<u8>, block: &[u8]) {
    data.extend_from_slice(&(block.len() as u32).to_le_bytes());
    data.extend_from_slice(block);
}

fn decode_utf8(bytes: &[u8]) -> String {
    UTF_8.decode(bytes).0.into_owned()
}
