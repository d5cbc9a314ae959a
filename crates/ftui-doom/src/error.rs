use std::path::PathBuf;

use thiserror::Error;

use crate::info::MobjType;

pub type Result<T> = std::result::Result<T, DoomError>;

/// Lump directory failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WadError {
    #[error("WAD data too small: {len} bytes")]
    TooSmall { len: usize },

    #[error("invalid WAD header")]
    BadHeader,

    #[error("invalid WAD directory ({lumps} lumps at offset {offset})")]
    BadDirectory { lumps: usize, offset: usize },

    #[error("lump not found: {0}")]
    LumpNotFound(String),

    #[error("bad lump size for {name}: {len} bytes")]
    BadLumpSize { name: String, len: usize },
}

/// Malformed asset data. Raised at load time; the caller aborts the load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("PLAYPAL too small: {len} bytes (need {need})")]
    PlaypalTooSmall { len: usize, need: usize },

    #[error("COLORMAP too small: {len} bytes (need {need})")]
    ColormapTooSmall { len: usize, need: usize },

    #[error("picture header truncated: {len} bytes")]
    PictureHeader { len: usize },

    #[error("picture dimensions out of range: {width}x{height}")]
    PictureDimensions { width: u16, height: u16 },

    #[error("picture column {column} truncated or out of bounds")]
    PictureColumn { column: usize },

    #[error("flat {name} too small: {len} bytes")]
    FlatTooSmall { name: String, len: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Error)]
pub enum DoomError {
    #[error(transparent)]
    Wad(#[from] WadError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("map not found: {0}")]
    MapNotFound(String),

    #[error("not a missile type: {0:?}")]
    UnknownMissileType(MobjType),
}
