// Ogg container support
//
// Reading is push-based and lives here; pages are written with the `ogg`
// crate's `PacketWriter`.
//
// OGG File Structure:
// - OGG Page Header (27 bytes)
//   - Capture Pattern: "OggS" (4 bytes)
//   - Version: 0 (1 byte)
//   - Header Type: 1=continuation, 2=bos, 4=eos (1 byte)
//   - Granule Position (8 bytes)
//   - Bitstream Serial Number (4 bytes)
//   - Page Sequence Number (4 bytes)
//   - CRC Checksum (4 bytes)
//   - Number of Page Segments (1 byte)
//   - Segment Table (variable)
//
// Pages of one serial number form a logical bitstream. Packets are split
// into 255-byte lacing segments; a lacing value below 255 ends a packet.

pub mod crc;
pub mod page;
pub mod stream;
pub mod sync;

pub use page::{Page, PageHeader, NO_GRANULE};
pub use stream::{Packet, StreamState};
pub use sync::PageSync;

// OGG signature
pub const OGG_SIGNATURE: &[u8; 4] = b"OggS";

/// Fixed part of a page header, before the segment table
pub const OGG_HEADER_SIZE: usize = 27;

// OGG page header types
pub const OGG_HEADER_TYPE_CONTINUATION: u8 = 0x01;
pub const OGG_HEADER_TYPE_BOS: u8 = 0x02; // Beginning of Stream
pub const OGG_HEADER_TYPE_EOS: u8 = 0x04; // End of Stream
