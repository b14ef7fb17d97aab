// Ogg page parsing and serialization

use crate::ogg::crc::crc32;
use crate::ogg::{
    OGG_HEADER_SIZE, OGG_HEADER_TYPE_BOS, OGG_HEADER_TYPE_CONTINUATION, OGG_HEADER_TYPE_EOS,
    OGG_SIGNATURE,
};

/// Granule position of a page on which no packet completes
pub const NO_GRANULE: i64 = -1;

/// Ogg page header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHeader {
    pub version: u8,
    pub header_type: u8,
    pub granule_position: i64,
    pub serial: u32,
    pub sequence: u32,
    pub checksum: u32,
    pub segment_table: Vec<u8>,
}

/// Ogg page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub header: PageHeader,
    pub body: Vec<u8>,
}

impl PageHeader {
    /// Parse a page header from the start of `data`.
    ///
    /// Returns `None` while `data` is too short to hold the fixed header and
    /// its segment table, or when the capture pattern does not match.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < OGG_HEADER_SIZE || &data[0..4] != OGG_SIGNATURE {
            return None;
        }

        let segment_count = data[26] as usize;
        if data.len() < OGG_HEADER_SIZE + segment_count {
            return None;
        }

        Some(PageHeader {
            version: data[4],
            header_type: data[5],
            granule_position: i64::from_le_bytes(le_array(&data[6..14])),
            serial: u32::from_le_bytes(le_array(&data[14..18])),
            sequence: u32::from_le_bytes(le_array(&data[18..22])),
            checksum: u32::from_le_bytes(le_array(&data[22..26])),
            segment_table: data[OGG_HEADER_SIZE..OGG_HEADER_SIZE + segment_count].to_vec(),
        })
    }

    /// Length of the serialized header including the segment table
    pub fn header_len(&self) -> usize {
        OGG_HEADER_SIZE + self.segment_table.len()
    }

    /// Calculate total page body size from segment table
    pub fn body_len(&self) -> usize {
        self.segment_table.iter().map(|&x| x as usize).sum()
    }

    /// Check if the first packet on this page continues one from the previous page
    pub fn is_continued(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_CONTINUATION != 0
    }

    /// Check if this is the beginning of a stream
    pub fn is_bos(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_BOS != 0
    }

    /// Check if this is the end of a stream
    pub fn is_eos(&self) -> bool {
        self.header_type & OGG_HEADER_TYPE_EOS != 0
    }

    /// Final lacing value; 255 means the last packet spills onto the next page
    pub fn last_lacing_value(&self) -> Option<u8> {
        self.segment_table.last().copied()
    }

    fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(OGG_SIGNATURE);
        out.push(self.version);
        out.push(self.header_type);
        out.extend_from_slice(&self.granule_position.to_le_bytes());
        out.extend_from_slice(&self.serial.to_le_bytes());
        out.extend_from_slice(&self.sequence.to_le_bytes());
        out.extend_from_slice(&self.checksum.to_le_bytes());
        out.push(self.segment_table.len() as u8);
        out.extend_from_slice(&self.segment_table);
    }
}

impl Page {
    pub fn serial(&self) -> u32 {
        self.header.serial
    }

    pub fn granule_position(&self) -> i64 {
        self.header.granule_position
    }

    /// Verify the stored checksum against the page contents
    pub fn checksum_matches(&self) -> bool {
        self.compute_checksum() == self.header.checksum
    }

    /// Serialize the page, filling in the checksum field
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.serialize_with_checksum(0);
        let checksum = crc32(&out);
        out[22..26].copy_from_slice(&checksum.to_le_bytes());
        out
    }

    fn compute_checksum(&self) -> u32 {
        crc32(&self.serialize_with_checksum(0))
    }

    fn serialize_with_checksum(&self, checksum: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header.header_len() + self.body.len());
        let header = PageHeader {
            checksum,
            ..self.header.clone()
        };
        header.write_to(&mut out);
        out.extend_from_slice(&self.body);
        out
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut array = [0u8; N];
    array.copy_from_slice(&bytes[..N]);
    array
}
