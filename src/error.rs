//! Error types for NIfTI reading, writing and voxel access.

use thiserror::Error;

/// Errors produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Underlying file or stream failure (unreadable path, truncated file, failed write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Structurally invalid input: short header, corrupt gzip stream, bad dimensions.
    #[error("invalid NIfTI format: {0}")]
    Format(String),

    /// `bitpix / 8` is not one of the supported sample widths (2, 4 or 8 bytes).
    #[error("unsupported data type: bitpix {bitpix} (supported: 16, 32, 64)")]
    UnsupportedDatatype {
        /// Bits per voxel declared by the header.
        bitpix: i16,
    },

    /// A voxel coordinate fell outside the declared extent of its axis.
    #[error("index out of range: {axis} = {coord} (extent {extent})")]
    IndexOutOfRange {
        /// Axis name (`x`, `y`, `z` or `t`).
        axis: char,
        /// Requested coordinate.
        coord: usize,
        /// Extent of the axis.
        extent: usize,
    },

    /// Voxel access on an image loaded without its payload.
    #[error("voxel payload was not loaded")]
    MissingPayload,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
