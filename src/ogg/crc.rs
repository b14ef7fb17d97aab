// Ogg page checksum
//
// CRC-32 with generator polynomial 0x04c11db7, no reflection, initial value 0
// and no final XOR. It is computed over the whole page with the checksum
// field (bytes 22..26) set to zero.

const CRC_POLYNOMIAL: u32 = 0x04c1_1db7;

static CRC_TABLE: [u32; 256] = build_table();

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut index = 0;
    while index < 256 {
        let mut value = (index as u32) << 24;
        let mut bit = 0;
        while bit < 8 {
            value = if value & 0x8000_0000 != 0 {
                (value << 1) ^ CRC_POLYNOMIAL
            } else {
                value << 1
            };
            bit += 1;
        }
        table[index] = value;
        index += 1;
    }
    table
}

/// Checksum of a serialized page whose checksum field is already zeroed
pub fn crc32(data: &[u8]) -> u32 {
    data.iter().fold(0, |crc, &byte| {
        (crc << 8) ^ CRC_TABLE[(((crc >> 24) as u8) ^ byte) as usize]
    })
}
