//! Named asset files (welcome screens, menus) stored one folder per display mode.

use std::io;
use std::path::PathBuf;
use tokio::fs;

use crate::config::AssetsConfig;
use super::DisplayMode;

/// Name of the banner shown after login and by the `W` command
pub const WELCOME: &str = "welcome";

#[derive(Debug, Clone)]
pub struct AssetLibrary {
    ascii_folder: PathBuf,
    atascii_folder: PathBuf,
    ansi_folder: PathBuf,
}

impl AssetLibrary {
    pub fn new(config: &AssetsConfig) -> Self {
        AssetLibrary {
            ascii_folder: PathBuf::from(&config.ascii_folder),
            atascii_folder: PathBuf::from(&config.atascii_folder),
            ansi_folder: PathBuf::from(&config.ansi_folder),
        }
    }

    /// Location of asset `name` as authored for `mode`
    pub fn path_for(&self, mode: DisplayMode, name: &str) -> PathBuf {
        let folder = match mode {
            DisplayMode::Plain => &self.ascii_folder,
            DisplayMode::Atascii => &self.atascii_folder,
            DisplayMode::Ansi => &self.ansi_folder,
        };
        folder.join(format!("{}.{}", name, mode.asset_extension()))
    }

    /// Read asset `name` for `mode` in full. The bytes are returned raw; rendering
    /// is up to the caller.
    pub async fn load(&self, mode: DisplayMode, name: &str) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(mode, name)).await
    }
}
