// Demultiplexer: routes pages to the active Opus stream and handles chaining
//
// Only one logical stream is decoded at a time. A new identification header
// on a different serial closes the current link once its comment header has
// been seen; before that, additional Opus streams are ignored.

use tracing::{debug, warn};

use crate::codec::OpusBackend;
use crate::decode::engine::{LogicalStream, StreamPhase};
use crate::decode::pcm::PcmAccumulator;
use crate::decode::DecodeOptions;
use crate::error::{OggOpusError, Result};
use crate::ogg::{Packet, Page, StreamState};
use crate::opus::{closest_valid_sample_rate, OPUS_HEAD};

/// Container-level progress of a session
#[derive(Debug)]
pub enum DemuxState {
    /// No page seen yet
    Unstarted,
    /// Following the serial of the most recent page
    Active(StreamState),
    /// Input finished; further pages are ignored
    Draining,
}

/// Output format shared by all links of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Summary returned when the input ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemuxSummary {
    pub format: OutputFormat,
    pub links: usize,
}

pub struct Demuxer<B: OpusBackend> {
    state: DemuxState,
    links: LinkTracker<B>,
}

impl<B: OpusBackend> Demuxer<B> {
    pub fn new(backend: B, options: DecodeOptions) -> Self {
        Demuxer {
            state: DemuxState::Unstarted,
            links: LinkTracker {
                backend,
                options,
                current: None,
                format: None,
                total_links: 0,
                ignored_serial: None,
            },
        }
    }

    pub fn state(&self) -> &DemuxState {
        &self.state
    }

    /// Links started so far
    pub fn total_links(&self) -> usize {
        self.links.total_links
    }

    /// Feed one verified page, decoding any audio it completes into `pcm`
    pub fn process_page(&mut self, page: Page, pcm: &mut PcmAccumulator) -> Result<()> {
        let Demuxer { state, links } = self;

        if let DemuxState::Unstarted = state {
            *state = DemuxState::Active(StreamState::new(page.serial()));
        }
        let DemuxState::Active(stream) = state else {
            debug!(serial = page.serial(), "page after end of input ignored");
            return Ok(());
        };

        if stream.serial() != page.serial() {
            stream.reset_serial(page.serial());
        }
        stream.page_in(&page)?;

        while let Some(packet) = stream.packet_out() {
            links.handle_packet(stream, packet, &page, pcm)?;
        }
        Ok(())
    }

    /// End of input: release the active link and report what was decoded
    pub fn finish(&mut self) -> Result<DemuxSummary> {
        self.state = DemuxState::Draining;
        self.links.current = None;

        match self.links.format {
            Some(format) if self.links.total_links > 0 => Ok(DemuxSummary {
                format,
                links: self.links.total_links,
            }),
            _ => Err(OggOpusError::NotAnOpusFile),
        }
    }
}

struct LinkTracker<B: OpusBackend> {
    backend: B,
    options: DecodeOptions,
    current: Option<LogicalStream<B::Decoder>>,
    format: Option<OutputFormat>,
    total_links: usize,
    ignored_serial: Option<u32>,
}

impl<B: OpusBackend> LinkTracker<B> {
    fn handle_packet(
        &mut self,
        stream: &StreamState,
        packet: Packet,
        page: &Page,
        pcm: &mut PcmAccumulator,
    ) -> Result<()> {
        let serial = stream.serial();
        let is_head = packet.starts_with(OPUS_HEAD);

        if let Some(current) = &self.current {
            // A header is only expected again on a new serial
            if is_head && current.serial() == serial && (packet.bos || !current.has_tags()) {
                return Err(OggOpusError::ChainedWithoutSerialChange { serial });
            }
        }

        if packet.bos && is_head {
            if let Some(current) = &self.current {
                if !current.has_tags() {
                    self.ignore(serial, "additional Opus stream before comment header");
                    return Ok(());
                }
                debug!(from = current.serial(), to = serial, "chained stream");
                self.current = None;
            }
            return self.start_link(stream, &packet, page, pcm);
        }

        let current = match self.current.as_mut() {
            Some(current) if current.serial() == serial => current,
            _ => {
                self.ignore(serial, "packet outside the active Opus stream");
                return Ok(());
            }
        };

        match current.phase() {
            StreamPhase::AwaitingTags => {
                current.accept_tags();
                ensure_alone_on_page(stream, page, "comment header")
            }
            StreamPhase::Audio => current
                .decode(&packet.data, page.granule_position(), pcm)
                .map(|_| ()),
        }
    }

    fn start_link(
        &mut self,
        stream: &StreamState,
        packet: &Packet,
        page: &Page,
        pcm: &mut PcmAccumulator,
    ) -> Result<()> {
        let serial = stream.serial();
        // Later links decode at the rate the session started with
        let forced_rate = match self.format {
            Some(format) => Some(format.sample_rate),
            None => self.options.output_rate.map(closest_valid_sample_rate),
        };
        let link = LogicalStream::start(&self.backend, serial, &packet.data, forced_rate)?;
        ensure_alone_on_page(stream, page, "identification header")?;

        let format = OutputFormat {
            sample_rate: link.sample_rate(),
            channels: u16::from(link.header().channels),
        };
        match self.format {
            Some(existing) if existing.channels != format.channels => {
                return Err(OggOpusError::UnsupportedParameters(format!(
                    "link {:#010x} has {} channels, earlier links had {}",
                    serial, format.channels, existing.channels
                )));
            }
            Some(_) => {}
            None => self.format = Some(format),
        }

        let gain = if self.options.apply_gain {
            link.header().gain_factor()
        } else {
            1.0
        };
        pcm.configure(usize::from(format.channels), gain);

        self.total_links += 1;
        self.ignored_serial = None;
        self.current = Some(link);
        Ok(())
    }

    fn ignore(&mut self, serial: u32, reason: &str) {
        if self.ignored_serial != Some(serial) {
            warn!(serial, reason, "ignoring stream");
            self.ignored_serial = Some(serial);
        }
    }
}

/// Header packets must end their page with nothing following them
fn ensure_alone_on_page(stream: &StreamState, page: &Page, what: &str) -> Result<()> {
    if stream.has_packet() || page.header.last_lacing_value() == Some(255) {
        return Err(OggOpusError::InvalidPacket(format!(
            "{} shares its page with other packets",
            what
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, CodecSettings, MultistreamDecode, MultistreamEncode};
    use crate::ogg::PageSync;
    use ::ogg::{PacketWriteEndInfo, PacketWriter};
    use crate::opus::{ChannelLayout, OpusHeader, OpusTags};

    /// Decoder producing one 20 ms frame of silence per packet
    struct Silence;

    struct SilenceDecoder(usize);

    impl MultistreamDecode for SilenceDecoder {
        fn decode_float(
            &mut self,
            _packet: &[u8],
            pcm: &mut [f32],
            _max_frame_size: usize,
        ) -> std::result::Result<usize, CodecError> {
            pcm[..960 * self.0].fill(0.0);
            Ok(960)
        }
    }

    impl MultistreamEncode for SilenceDecoder {
        fn lookahead(&self) -> usize {
            0
        }

        fn encode_float(
            &mut self,
            _pcm: &[f32],
            _frame_size: usize,
            _out: &mut [u8],
        ) -> std::result::Result<usize, CodecError> {
            Ok(0)
        }
    }

    impl OpusBackend for Silence {
        type Decoder = SilenceDecoder;
        type Encoder = SilenceDecoder;

        fn create_decoder(
            &self,
            _sample_rate: u32,
            layout: &ChannelLayout,
        ) -> std::result::Result<SilenceDecoder, CodecError> {
            Ok(SilenceDecoder(usize::from(layout.channels)))
        }

        fn create_encoder(
            &self,
            _sample_rate: u32,
            layout: &ChannelLayout,
            _settings: &CodecSettings,
        ) -> std::result::Result<SilenceDecoder, CodecError> {
            Ok(SilenceDecoder(usize::from(layout.channels)))
        }
    }

    fn pages(serial: u32, channels: u8, audio_packets: usize) -> Vec<Page> {
        let header = OpusHeader {
            version: 1,
            channels,
            pre_skip: 0,
            input_sample_rate: 48_000,
            output_gain: 0,
            mapping_family: 0,
            layout: ChannelLayout::single_stream(channels),
        };
        let mut writer = PacketWriter::new(Vec::new());
        writer
            .write_packet(header.to_bytes(), serial, PacketWriteEndInfo::EndPage, 0)
            .unwrap();
        writer
            .write_packet(
                OpusTags::new("demux").to_bytes(),
                serial,
                PacketWriteEndInfo::EndPage,
                0,
            )
            .unwrap();
        for index in 1..=audio_packets {
            let end = if index == audio_packets {
                PacketWriteEndInfo::EndStream
            } else {
                PacketWriteEndInfo::EndPage
            };
            writer
                .write_packet(vec![0xf8], serial, end, (index * 960) as u64)
                .unwrap();
        }

        let mut sync = PageSync::new();
        sync.feed(&writer.into_inner());
        let mut pages = Vec::new();
        while let Some(page) = sync.page_out().unwrap() {
            pages.push(page);
        }
        pages
    }

    #[test]
    fn test_state_follows_input() {
        let mut demuxer = Demuxer::new(Silence, DecodeOptions::default());
        let mut pcm = PcmAccumulator::new();
        assert!(matches!(demuxer.state(), DemuxState::Unstarted));

        for page in pages(11, 2, 3) {
            demuxer.process_page(page, &mut pcm).unwrap();
            assert!(matches!(demuxer.state(), DemuxState::Active(_)));
        }
        assert_eq!(demuxer.total_links(), 1);
        assert_eq!(pcm.frames(), 3 * 960);

        let summary = demuxer.finish().unwrap();
        assert!(matches!(demuxer.state(), DemuxState::Draining));
        assert_eq!(
            summary.format,
            OutputFormat {
                sample_rate: 48_000,
                channels: 2
            }
        );

        // Nothing is decoded once the input has ended
        for page in pages(12, 2, 1) {
            demuxer.process_page(page, &mut pcm).unwrap();
        }
        assert_eq!(pcm.frames(), 3 * 960);
    }

    #[test]
    fn test_chain_counts_links() {
        let mut demuxer = Demuxer::new(Silence, DecodeOptions::default());
        let mut pcm = PcmAccumulator::new();
        for page in pages(1, 1, 2).into_iter().chain(pages(2, 1, 1)) {
            demuxer.process_page(page, &mut pcm).unwrap();
        }

        assert_eq!(demuxer.total_links(), 2);
        assert_eq!(pcm.frames(), 3 * 960);
        assert_eq!(demuxer.finish().unwrap().links, 2);
    }

    #[test]
    fn test_finish_without_stream() {
        let mut demuxer = Demuxer::new(Silence, DecodeOptions::default());
        assert!(matches!(demuxer.finish(), Err(OggOpusError::NotAnOpusFile)));
    }
}
