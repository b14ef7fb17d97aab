// Page synchronizer: turns an arbitrary byte stream into validated pages

use tracing::warn;

use crate::error::{OggOpusError, Result};
use crate::ogg::page::{Page, PageHeader};
use crate::ogg::{OGG_HEADER_SIZE, OGG_SIGNATURE};

/// Accumulates input bytes and hands out complete, checksum-verified pages.
///
/// Bytes that do not belong to a valid page (leading garbage, pages with a
/// bad checksum) are skipped until the next capture pattern.
#[derive(Debug, Default)]
pub struct PageSync {
    buffer: Vec<u8>,
    start: usize,
    skipped: usize,
}

impl PageSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of input
    pub fn feed(&mut self, bytes: &[u8]) {
        self.compact();
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes received but not yet returned as part of a page
    pub fn buffered(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// Total bytes discarded while searching for page boundaries
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Extract the next complete page, or `None` until more bytes arrive
    pub fn page_out(&mut self) -> Result<Option<Page>> {
        loop {
            let data = &self.buffer[self.start..];
            if data.len() < OGG_HEADER_SIZE {
                return Ok(None);
            }

            if &data[0..4] != OGG_SIGNATURE {
                self.resync();
                continue;
            }

            let header = match PageHeader::parse(data) {
                Some(header) => header,
                // Segment table not fully buffered yet
                None => return Ok(None),
            };

            let header_len = header.header_len();
            let total_len = header_len + header.body_len();
            if data.len() < total_len {
                return Ok(None);
            }

            let page = Page {
                body: data[header_len..total_len].to_vec(),
                header,
            };

            if !page.checksum_matches() {
                warn!(
                    serial = page.serial(),
                    sequence = page.header.sequence,
                    "page checksum mismatch, resynchronizing"
                );
                self.start += 1;
                self.skipped += 1;
                continue;
            }

            if page.header.version != 0 {
                return Err(OggOpusError::MalformedContainer(format!(
                    "unsupported stream structure version {}",
                    page.header.version
                )));
            }

            self.start += total_len;
            return Ok(Some(page));
        }
    }

    // Skip forward to the next candidate capture pattern
    fn resync(&mut self) {
        let data = &self.buffer[self.start..];
        let skip = data[1..]
            .windows(OGG_SIGNATURE.len())
            .position(|window| window == OGG_SIGNATURE)
            .map(|pos| pos + 1)
            // Keep a possible partial capture pattern at the tail
            .unwrap_or(data.len() + 1 - OGG_SIGNATURE.len());

        warn!(bytes = skip, "skipping bytes outside of any Ogg page");
        self.start += skip;
        self.skipped += skip;
    }

    fn compact(&mut self) {
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.start = 0;
        }
    }
}
