//! ATASCII (Atari 8-bit) to Unicode decoding.
//!
//! Only the decode direction exists: ATASCII is read from asset files and shown to
//! callers, never produced from Unicode. Bytes without a defined meaning decode
//! to [`REPLACEMENT`] so the codec never fails.

/// Substituted for every byte outside the mapped range
pub const REPLACEMENT: char = '?';

/// ATASCII end-of-line
pub const ATASCII_EOL: u8 = 0x9B;

/// Glyphs for 0x00-0x1F, the ATASCII graphics block
const GRAPHICS: [char; 32] = [
    '\u{2665}', '\u{251C}', '\u{2595}', '\u{2518}', '\u{2524}', '\u{2510}', '\u{2571}', '\u{2572}',
    '\u{25E2}', '\u{2597}', '\u{25E3}', '\u{259D}', '\u{2598}', '\u{2594}', '\u{2582}', '\u{2596}',
    '\u{2663}', '\u{250C}', '\u{2500}', '\u{253C}', '\u{25CF}', '\u{2584}', '\u{258E}', '\u{252C}',
    '\u{2534}', '\u{258C}', '\u{2514}', '\u{241B}', '\u{2191}', '\u{2193}', '\u{2190}', '\u{2192}',
];

/// Decode one ATASCII byte.
pub fn decode(byte: u8) -> char {
    match byte {
        0x00..=0x1F => GRAPHICS[byte as usize],
        0x60 => '\u{2666}',
        0x7B => '\u{2660}',
        // clear screen, backspace and tab are shown as their keycap glyphs
        0x7D => '\u{21B0}',
        0x7E => '\u{25C0}',
        0x7F => '\u{25B6}',
        0x20..=0x7C => byte as char,
        ATASCII_EOL => '\n',
        _ => REPLACEMENT,
    }
}

/// Decode a whole ATASCII buffer.
pub fn decode_bytes(data: &[u8]) -> String {
    data.iter().map(|&b| decode(b)).collect()
}
