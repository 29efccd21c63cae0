//! Errors that abort a run. Designed rejections (a track leaving the detector,
//! an event without a reconstructed vertex) are not errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::distribution::DistributionError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Couldn't read config file `{path}`: {source}")]
    ConfigFile { path: PathBuf, source: std::io::Error },

    #[error("Malformed configuration: {0}")]
    ConfigSyntax(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid distribution `{name}`: {source}")]
    Distribution { name: String, source: DistributionError },

    #[error("Hit store encoding error: {0}")]
    Store(#[from] binrw::Error),

    #[error("`{path}` has hit store format version {found}, expected {expected}")]
    StoreVersion { path: PathBuf, found: u8, expected: u8 },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self { Self::Config(message.into()) }

    pub(crate) fn distribution(name: &str) -> impl FnOnce(DistributionError) -> Self + '_ {
        move |source| Self::Distribution { name: name.into(), source }
    }
}
