//! Error types for hotcue-core

use std::path::PathBuf;

use thiserror::Error;

use crate::segment::Encoding;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Read(#[from] std::io::Error),

    #[error("cannot decode bytes at offset {offset} as {encoding}")]
    Decode { offset: u64, encoding: Encoding },

    #[error("cannot encode char {ch:?} as {encoding}")]
    Encode { ch: char, encoding: Encoding },

    #[error("cannot write file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid delimiter: {0}")]
    InvalidDelimiter(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Open { path: path.into(), source }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Write { path: path.into(), source }
    }
}
