use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("couldn't write settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't serialize alarm: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("couldn't read config file: {0}")]
    Read(#[from] io::Error),

    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("couldn't find a home directory for the config")]
    NoProjectDirs,
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("audio device unavailable")]
    DeviceUnavailable,

    #[error("couldn't open sound file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("couldn't decode sound file {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("audio thread is gone")]
    Disconnected,
}
