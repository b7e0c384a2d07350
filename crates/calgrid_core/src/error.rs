use std::path::PathBuf;

use thiserror::Error;

/// Failures raised by an [`ImageSource`](crate::decode::ImageSource) while probing or decoding.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to read image {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode raster image {path}: {source}")]
    Raster {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to parse SVG {path}: {source}")]
    Svg {
        path: PathBuf,
        #[source]
        source: resvg::usvg::Error,
    },
    #[error("image {path} has unusable dimensions {width}x{height}")]
    InvalidDimensions {
        path: PathBuf,
        width: u32,
        height: u32,
    },
    #[error("image {path} needs {bytes} bytes to decode, above the {limit} byte limit")]
    TooLarge { path: PathBuf, bytes: u64, limit: u64 },
    #[error("unsupported image format for {0}")]
    UnsupportedFormat(PathBuf),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file {path} is not accessible: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("state file {path} is malformed: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("byte budget {requested} exceeds the platform ceiling of {ceiling} bytes")]
    BudgetAboveCeiling { requested: u64, ceiling: u64 },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("invalid title format `{0}`")]
    TitleFormat(String),
}
