//! Terminal rendering
//!
//! Callers dial in from very different machines: plain ASCII terminals, Atari
//! 8-bit computers speaking ATASCII, and ANSI escape-sequence terminals. The
//! [`DisplayMode`] of a session selects how payload bytes are turned into the
//! bytes actually sent down the wire.

pub mod assets;
pub mod codec;

use std::fmt;

pub use assets::AssetLibrary;

/// How a session's output is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayMode {
    #[default]
    Plain,
    Atascii,
    Ansi,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 3] = [DisplayMode::Plain, DisplayMode::Atascii, DisplayMode::Ansi];

    /// Next mode in the fixed Plain -> Atascii -> Ansi -> Plain order
    pub fn cycle(self) -> Self {
        match self {
            DisplayMode::Plain => DisplayMode::Atascii,
            DisplayMode::Atascii => DisplayMode::Ansi,
            DisplayMode::Ansi => DisplayMode::Plain,
        }
    }

    /// Name shown to callers when switching modes
    pub fn label(self) -> &'static str {
        match self {
            DisplayMode::Plain => "ASCII",
            DisplayMode::Atascii => "ATASCII",
            DisplayMode::Ansi => "ANSI",
        }
    }

    /// File extension of asset files authored for this mode
    pub fn asset_extension(self) -> &'static str {
        match self {
            DisplayMode::Plain => "txt",
            DisplayMode::Atascii => "ata",
            DisplayMode::Ansi => "ans",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Produce the bytes to transmit for `payload` under `mode`.
///
/// ANSI payloads are passed through untouched; escape-sequence processing is
/// left to the caller's terminal.
pub fn render(mode: DisplayMode, payload: &[u8]) -> Vec<u8> {
    match mode {
        DisplayMode::Plain | DisplayMode::Ansi => payload.to_vec(),
        DisplayMode::Atascii => codec::decode_bytes(payload).into_bytes(),
    }
}
