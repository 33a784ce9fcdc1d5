//! Library entry for amisbbs components used by binary and tests.

pub mod bbs;
pub mod config;
pub mod logutil;
pub mod storage;
pub mod terminal;
