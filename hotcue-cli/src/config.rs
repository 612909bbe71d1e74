//! Conversion configuration

use std::path::PathBuf;

use hotcue_core::{MarkerScan, RewriteOptions};

#[derive(Debug, Clone)]
pub struct Config {
    /// rekordbox XML export to rewrite in place
    pub file: PathBuf,
    /// Convert even if the file does not look like a collection
    pub force: bool,
    /// Reader and marker scan settings
    pub rewrite: RewriteOptions,
}

impl Config {
    pub fn new(file: PathBuf, force: bool, scan_all: bool) -> Self {
        let scan = if scan_all { MarkerScan::All } else { MarkerScan::First };
        Self {
            file,
            force,
            rewrite: RewriteOptions {
                scan,
                ..RewriteOptions::default()
            },
        }
    }
}
