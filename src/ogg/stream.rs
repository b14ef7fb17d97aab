// Logical bitstream state: reassembles packets from the pages of one serial

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::error::{OggOpusError, Result};
use crate::ogg::page::{Page, NO_GRANULE};

/// One packet extracted from a logical bitstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub data: Vec<u8>,
    /// First packet of a beginning-of-stream page
    pub bos: bool,
    /// Last packet of an end-of-stream page
    pub eos: bool,
    /// Page granule position if this packet is the last one completed on its page
    pub granule_position: i64,
    pub packet_no: u64,
}

impl Packet {
    pub fn starts_with(&self, magic: &[u8]) -> bool {
        self.data.starts_with(magic)
    }
}

/// Packet assembler for a single serial number
#[derive(Debug)]
pub struct StreamState {
    serial: u32,
    partial: Vec<u8>,
    packets: VecDeque<Packet>,
    next_sequence: Option<u32>,
    packet_no: u64,
}

impl StreamState {
    pub fn new(serial: u32) -> Self {
        StreamState {
            serial,
            partial: Vec::new(),
            packets: VecDeque::new(),
            next_sequence: None,
            packet_no: 0,
        }
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Drop all buffered data and follow a different serial number
    pub fn reset_serial(&mut self, serial: u32) {
        debug!(from = self.serial, to = serial, "resetting stream state");
        *self = StreamState::new(serial);
    }

    /// Submit a page; the completed packets become available to `packet_out`
    pub fn page_in(&mut self, page: &Page) -> Result<()> {
        let header = &page.header;
        if header.serial != self.serial {
            return Err(OggOpusError::MalformedContainer(format!(
                "page serial {:#010x} submitted to stream {:#010x}",
                header.serial, self.serial
            )));
        }
        if page.body.len() != header.body_len() {
            return Err(OggOpusError::MalformedContainer(format!(
                "page body holds {} bytes, segment table declares {}",
                page.body.len(),
                header.body_len()
            )));
        }

        if let Some(expected) = self.next_sequence {
            if header.sequence != expected && !self.partial.is_empty() {
                warn!(
                    serial = self.serial,
                    expected,
                    found = header.sequence,
                    "page sequence gap, dropping partial packet"
                );
                self.partial.clear();
            }
        }
        self.next_sequence = Some(header.sequence.wrapping_add(1));

        // A fresh packet must not start while one is still pending
        if !header.is_continued() && !self.partial.is_empty() {
            warn!(serial = self.serial, "unterminated packet dropped");
            self.partial.clear();
        }

        let mut skipping = header.is_continued() && self.partial.is_empty();
        let mut at_packet_start = !header.is_continued();
        let mut offset = 0;
        let first_new = self.packets.len();

        for &lacing in &header.segment_table {
            let segment = &page.body[offset..offset + lacing as usize];
            offset += lacing as usize;

            if skipping {
                // Tail of a packet whose beginning was never seen
                if lacing < 255 {
                    skipping = false;
                    at_packet_start = true;
                }
                continue;
            }

            let starts_here = at_packet_start && self.partial.is_empty();
            self.partial.extend_from_slice(segment);
            at_packet_start = false;

            if lacing < 255 {
                let bos = header.is_bos() && starts_here && self.packets.len() == first_new;
                self.packets.push_back(Packet {
                    data: std::mem::take(&mut self.partial),
                    bos,
                    eos: false,
                    granule_position: NO_GRANULE,
                    packet_no: self.packet_no,
                });
                self.packet_no += 1;
                at_packet_start = true;
            }
        }

        if self.packets.len() > first_new {
            if let Some(last) = self.packets.back_mut() {
                last.granule_position = header.granule_position;
                last.eos = header.is_eos();
            }
        }

        Ok(())
    }

    /// Pull the next completed packet
    pub fn packet_out(&mut self) -> Option<Packet> {
        self.packets.pop_front()
    }

    /// Whether another completed packet is waiting
    pub fn has_packet(&self) -> bool {
        !self.packets.is_empty()
    }
}
