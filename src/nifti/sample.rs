//! Conversion between on-disk voxel bytes and `f32` samples.
//!
//! The codec is resolved once per image from `bitpix` and the datatype code,
//! then dispatched with a plain `match` on every access.

use super::header::DataType;
use crate::error::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Byte-to-sample codec for one of the supported on-disk widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCodec {
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 16-bit integer (`DT_INT16`).
    Int16,
    /// IEEE-754 single precision.
    Float32,
    /// IEEE-754 double precision, narrowed to `f32` on read.
    Float64,
}

impl SampleCodec {
    /// Pick the codec for `nbyper` bytes per voxel.
    ///
    /// Two-byte data is signed only when the datatype code says `DT_INT16`;
    /// every other 2-byte code reads as unsigned.
    pub fn select(nbyper: usize, datatype: i16) -> Result<Self> {
        match nbyper {
            2 if DataType::from_code(datatype) == Some(DataType::Int16) => Ok(Self::Int16),
            2 => Ok(Self::UInt16),
            4 => Ok(Self::Float32),
            8 => Ok(Self::Float64),
            _ => Err(Error::UnsupportedDatatype {
                bitpix: (nbyper * 8).min(i16::MAX as usize) as i16,
            }),
        }
    }

    /// Codec that reads and writes `datatype` exactly.
    pub const fn for_datatype(datatype: DataType) -> Self {
        match datatype {
            DataType::UInt16 => Self::UInt16,
            DataType::Int16 => Self::Int16,
            DataType::Float32 => Self::Float32,
            DataType::Float64 => Self::Float64,
        }
    }

    /// Bytes consumed per sample.
    pub const fn width(self) -> usize {
        match self {
            Self::UInt16 | Self::Int16 => 2,
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Decode one sample. `bytes` must be exactly `width()` long.
    #[inline]
    pub fn decode(self, bytes: &[u8]) -> f32 {
        match self {
            Self::UInt16 => f32::from(LittleEndian::read_u16(bytes)),
            Self::Int16 => f32::from(LittleEndian::read_i16(bytes)),
            Self::Float32 => LittleEndian::read_f32(bytes),
            Self::Float64 => LittleEndian::read_f64(bytes) as f32,
        }
    }

    /// Encode one sample into `out`, which must be exactly `width()` long.
    ///
    /// Integer paths round to nearest and saturate; NaN stores as 0.
    #[inline]
    pub fn encode(self, value: f32, out: &mut [u8]) {
        match self {
            Self::UInt16 => LittleEndian::write_u16(out, value.round() as u16),
            Self::Int16 => LittleEndian::write_i16(out, value.round() as i16),
            Self::Float32 => LittleEndian::write_f32(out, value),
            Self::Float64 => LittleEndian::write_f64(out, f64::from(value)),
        }
    }
}
