// Stream inspection without decoding
//
// Walks every page, collecting the headers, comments and final granule
// position of each Opus link. Non-Opus logical streams are skipped.

use std::collections::HashMap;
use std::io::Read;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{OggOpusError, Result};
use crate::ingest::{ReaderChunks, DEFAULT_CHUNK_SIZE};
use crate::ogg::{PageSync, StreamState, NO_GRANULE};
use crate::opus::{OpusHeader, OpusTags, GRANULE_RATE, OPUS_HEAD};

/// One Opus link of a file
#[derive(Debug, Clone, Serialize)]
pub struct LinkInfo {
    pub serial: u32,
    pub header: OpusHeader,
    /// Comment header, `None` when missing or unreadable
    pub tags: Option<OpusTags>,
    /// Granule position of the last page carrying one, -1 if none did
    pub last_granule: i64,
    pub pages: usize,
    pub duration_secs: f64,
}

impl LinkInfo {
    fn new(serial: u32, header: OpusHeader) -> Self {
        LinkInfo {
            serial,
            header,
            tags: None,
            last_granule: NO_GRANULE,
            pages: 0,
            duration_secs: 0.0,
        }
    }

    /// Playable samples at 48 kHz
    pub fn total_samples(&self) -> u64 {
        let samples = self.last_granule - i64::from(self.header.pre_skip);
        samples.max(0) as u64
    }
}

/// Summary of a whole Ogg/Opus file
#[derive(Debug, Clone, Serialize)]
pub struct StreamInfo {
    pub links: Vec<LinkInfo>,
    pub total_pages: usize,
    pub skipped_bytes: usize,
    pub duration_secs: f64,
}

#[derive(Default)]
struct Tracked {
    stream: Option<StreamState>,
    link: Option<usize>,
    packets: u64,
}

/// Inspect an in-memory Ogg/Opus file
pub fn probe_bytes(data: &[u8]) -> Result<StreamInfo> {
    let mut prober = Prober::default();
    for chunk in data.chunks(DEFAULT_CHUNK_SIZE) {
        prober.push(chunk)?;
    }
    prober.finish()
}

/// Inspect an Ogg/Opus stream from a reader
pub fn probe_reader<R: Read>(reader: R) -> Result<StreamInfo> {
    let mut prober = Prober::default();
    let mut chunks = ReaderChunks::new(reader, DEFAULT_CHUNK_SIZE);
    while let Some(chunk) = chunks.next_chunk()? {
        prober.push(chunk)?;
    }
    prober.finish()
}

#[derive(Default)]
struct Prober {
    sync: PageSync,
    streams: HashMap<u32, Tracked>,
    links: Vec<LinkInfo>,
    total_pages: usize,
}

impl Prober {
    fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.sync.feed(bytes);
        while let Some(page) = self.sync.page_out()? {
            self.total_pages += 1;
            let serial = page.serial();
            let tracked = self.streams.entry(serial).or_default();

            // A new BOS page restarts the logical stream under this serial
            if page.header.is_bos() || tracked.stream.is_none() {
                tracked.stream = Some(StreamState::new(serial));
                tracked.link = None;
                tracked.packets = 0;
            }
            let Some(stream) = tracked.stream.as_mut() else {
                continue;
            };
            stream.page_in(&page)?;

            while let Some(packet) = stream.packet_out() {
                tracked.packets += 1;
                match (tracked.packets, tracked.link) {
                    (1, _) if packet.bos && packet.starts_with(OPUS_HEAD) => {
                        match OpusHeader::parse(&packet.data) {
                            Ok(header) => {
                                debug!(serial, "found Opus link");
                                tracked.link = Some(self.links.len());
                                self.links.push(LinkInfo::new(serial, header));
                            }
                            Err(e) => warn!(serial, error = %e, "unreadable Opus header"),
                        }
                    }
                    (2, Some(index)) => match OpusTags::parse(&packet.data) {
                        Ok(tags) => self.links[index].tags = Some(tags),
                        Err(e) => warn!(serial, error = %e, "unreadable comment header"),
                    },
                    _ => {}
                }
            }

            if let Some(index) = tracked.link {
                let link = &mut self.links[index];
                link.pages += 1;
                if page.granule_position() != NO_GRANULE {
                    link.last_granule = page.granule_position();
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<StreamInfo> {
        if self.links.is_empty() {
            return Err(OggOpusError::NotAnOpusFile);
        }

        let mut links = self.links;
        for link in &mut links {
            link.duration_secs = link.total_samples() as f64 / f64::from(GRANULE_RATE);
        }
        let duration_secs = links.iter().map(|link| link.duration_secs).sum();

        Ok(StreamInfo {
            links,
            total_pages: self.total_pages,
            skipped_bytes: self.sync.skipped(),
            duration_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::ogg::{PacketWriteEndInfo, PacketWriter};
    use crate::opus::ChannelLayout;

    fn header_bytes(pre_skip: u16) -> Vec<u8> {
        OpusHeader {
            version: 1,
            channels: 2,
            pre_skip,
            input_sample_rate: 44_100,
            output_gain: 0,
            mapping_family: 0,
            layout: ChannelLayout::single_stream(2),
        }
        .to_bytes()
    }

    fn link(serial: u32, pre_skip: u16, end_granule: u64, title: &str) -> Vec<u8> {
        let mut tags = OpusTags::new("inspect test");
        tags.push("TITLE", title);

        let packets = [
            (header_bytes(pre_skip), 0, PacketWriteEndInfo::EndPage),
            (tags.to_bytes(), 0, PacketWriteEndInfo::EndPage),
            (vec![0xfc; 40], end_granule / 2, PacketWriteEndInfo::EndPage),
            (vec![0xfc; 40], end_granule, PacketWriteEndInfo::EndStream),
        ];
        let mut writer = PacketWriter::new(Vec::new());
        for (data, granule, end) in packets {
            writer.write_packet(data, serial, end, granule).unwrap();
        }
        writer.into_inner()
    }

    #[test]
    fn test_probe_chained_links() {
        let mut data = link(1, 312, 48_312, "first");
        data.extend(link(2, 3840, 3840 + 96_000, "second"));

        let info = probe_bytes(&data).unwrap();
        assert_eq!(info.links.len(), 2);
        assert_eq!(info.total_pages, 8);

        let first = &info.links[0];
        assert_eq!(first.serial, 1);
        assert_eq!(first.header.channels, 2);
        assert_eq!(first.total_samples(), 48_000);
        assert_eq!(first.tags.as_ref().and_then(|t| t.get("title")), Some("first"));

        let second = &info.links[1];
        assert_eq!(second.pages, 4);
        assert_eq!(second.duration_secs, 2.0);
        assert_eq!(info.duration_secs, 3.0);
    }

    #[test]
    fn test_probe_without_opus() {
        let mut writer = PacketWriter::new(Vec::new());
        writer
            .write_packet(b"\x01vorbis".to_vec(), 9, PacketWriteEndInfo::EndStream, 0)
            .unwrap();
        let data = writer.into_inner();

        assert!(matches!(probe_bytes(&data), Err(OggOpusError::NotAnOpusFile)));
    }
}
