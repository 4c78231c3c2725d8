//! NIfTI-1 header parsing and representation.
//!
//! The header is a fixed 348-byte little-endian record. Every field is kept
//! with its on-disk type, including the legacy ANALYZE 7.5 fields this crate
//! never interprets, so that a decode/encode round trip is byte-exact.

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Recognised NIfTI-1 magic values (single-file and dual-file layouts).
pub const MAGIC_N1: &[u8; 4] = b"n+1\0";
/// Dual-file magic. Accepted on read, never written by this crate.
pub const MAGIC_NI1: &[u8; 4] = b"ni1\0";

/// NIfTI-1 header field byte offsets.
mod offsets {
    pub const SIZEOF_HDR: usize = 0;
    pub const DATA_TYPE: usize = 4;
    pub const DB_NAME: usize = 14;
    pub const EXTENTS: usize = 32;
    pub const SESSION_ERROR: usize = 36;
    pub const REGULAR: usize = 38;
    pub const DIM_INFO: usize = 39;
    pub const DIM: usize = 40;
    pub const INTENT_P1: usize = 56;
    pub const INTENT_P2: usize = 60;
    pub const INTENT_P3: usize = 64;
    pub const INTENT_CODE: usize = 68;
    pub const DATATYPE: usize = 70;
    pub const BITPIX: usize = 72;
    pub const SLICE_START: usize = 74;
    pub const PIXDIM: usize = 76;
    pub const VOX_OFFSET: usize = 108;
    pub const SCL_SLOPE: usize = 112;
    pub const SCL_INTER: usize = 116;
    pub const SLICE_END: usize = 120;
    pub const SLICE_CODE: usize = 122;
    pub const XYZT_UNITS: usize = 123;
    pub const CAL_MAX: usize = 124;
    pub const CAL_MIN: usize = 128;
    pub const SLICE_DURATION: usize = 132;
    pub const TOFFSET: usize = 136;
    pub const GLMAX: usize = 140;
    pub const GLMIN: usize = 144;
    pub const DESCRIP: usize = 148;
    pub const AUX_FILE: usize = 228;
    pub const QFORM_CODE: usize = 252;
    pub const SFORM_CODE: usize = 254;
    pub const QUATERN_B: usize = 256;
    pub const QUATERN_C: usize = 260;
    pub const QUATERN_D: usize = 264;
    pub const QOFFSET_X: usize = 268;
    pub const QOFFSET_Y: usize = 272;
    pub const QOFFSET_Z: usize = 276;
    pub const SROW_X: usize = 280;
    pub const SROW_Y: usize = 296;
    pub const SROW_Z: usize = 312;
    pub const INTENT_NAME: usize = 328;
    pub const MAGIC: usize = 344;
}

/// `NIfTI` data type codes with a supported sample width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum DataType {
    /// Signed 16-bit integer
    Int16 = 4,
    /// 32-bit floating point
    Float32 = 16,
    /// 64-bit floating point
    Float64 = 64,
    /// Unsigned 16-bit integer
    UInt16 = 512,
}

impl DataType {
    /// Parse from a `NIfTI` datatype code. Codes outside the supported set yield `None`.
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            4 => Some(Self::Int16),
            16 => Some(Self::Float32),
            64 => Some(Self::Float64),
            512 => Some(Self::UInt16),
            _ => None,
        }
    }

    /// The on-disk datatype code.
    pub const fn code(self) -> i16 {
        self as i16
    }

    /// Size of each element in bytes.
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Int16 | Self::UInt16 => 2,
            Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Get the Rust type name for documentation.
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::Int16 => "i16",
            Self::UInt16 => "u16",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Spatial units for voxel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpatialUnits {
    #[default]
    /// Units are not specified.
    Unknown,
    /// Voxel dimensions expressed in meters.
    Meter,
    /// Voxel dimensions expressed in millimeters.
    Millimeter,
    /// Voxel dimensions expressed in micrometers.
    Micrometer,
}

impl SpatialUnits {
    fn from_code(code: u8) -> Self {
        match code & 0x07 {
            1 => Self::Meter,
            2 => Self::Millimeter,
            3 => Self::Micrometer,
            _ => Self::Unknown,
        }
    }

    fn to_code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Meter => 1,
            Self::Millimeter => 2,
            Self::Micrometer => 3,
        }
    }
}

/// Temporal units for time dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemporalUnits {
    #[default]
    /// Temporal spacing unspecified.
    Unknown,
    /// Temporal spacing in seconds.
    Second,
    /// Temporal spacing in milliseconds.
    Millisecond,
    /// Temporal spacing in microseconds.
    Microsecond,
}

impl TemporalUnits {
    fn from_code(code: u8) -> Self {
        match code & 0x38 {
            0x08 => Self::Second,
            0x10 => Self::Millisecond,
            0x18 => Self::Microsecond,
            _ => Self::Unknown,
        }
    }

    fn to_code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Second => 0x08,
            Self::Millisecond => 0x10,
            Self::Microsecond => 0x18,
        }
    }
}

/// The 348-byte NIfTI-1 header, field for field.
///
/// Derived quantities (voxel count, bytes per voxel, spacing) are computed on
/// demand from `dim`, `bitpix` and `pixdim`; they are never stored twice.
#[derive(Debug, Clone, PartialEq)]
pub struct NiftiHeader {
    /// Header size, 348 for NIfTI-1.
    pub sizeof_hdr: i32,
    /// Unused ANALYZE field.
    pub data_type: [u8; 10],
    /// Unused ANALYZE field.
    pub db_name: [u8; 18],
    /// Unused ANALYZE field.
    pub extents: i32,
    /// Unused ANALYZE field.
    pub session_error: i16,
    /// Unused ANALYZE field.
    pub regular: u8,
    /// MRI slice ordering (frequency, phase and slice dimensions).
    pub dim_info: u8,
    /// `dim[0]` is the dimension count, `dim[1..=7]` the per-axis extents.
    pub dim: [i16; 8],
    /// First intent parameter.
    pub intent_p1: f32,
    /// Second intent parameter.
    pub intent_p2: f32,
    /// Third intent parameter.
    pub intent_p3: f32,
    /// `NIFTI_INTENT_*` code.
    pub intent_code: i16,
    /// `NIfTI` datatype code (see [`DataType`]).
    pub datatype: i16,
    /// Bits per voxel.
    pub bitpix: i16,
    /// First slice index.
    pub slice_start: i16,
    /// Grid spacings; `pixdim[0]` is qfac.
    pub pixdim: [f32; 8],
    /// Byte offset of the voxel payload within the (decompressed) file.
    pub vox_offset: f32,
    /// Data scaling slope.
    pub scl_slope: f32,
    /// Data scaling intercept.
    pub scl_inter: f32,
    /// Last slice index.
    pub slice_end: i16,
    /// Slice timing order.
    pub slice_code: u8,
    /// Packed spatial and temporal unit codes.
    pub xyzt_units: u8,
    /// Maximum display intensity.
    pub cal_max: f32,
    /// Minimum display intensity.
    pub cal_min: f32,
    /// Time for one slice.
    pub slice_duration: f32,
    /// Time axis shift.
    pub toffset: f32,
    /// Unused ANALYZE field.
    pub glmax: i32,
    /// Unused ANALYZE field.
    pub glmin: i32,
    /// Free-form description, NUL padded.
    pub descrip: [u8; 80],
    /// Auxiliary filename, NUL padded.
    pub aux_file: [u8; 24],
    /// `NIFTI_XFORM_*` code for the quaternion transform.
    pub qform_code: i16,
    /// `NIFTI_XFORM_*` code for the affine rows.
    pub sform_code: i16,
    /// Quaternion b parameter.
    pub quatern_b: f32,
    /// Quaternion c parameter.
    pub quatern_c: f32,
    /// Quaternion d parameter.
    pub quatern_d: f32,
    /// Quaternion x shift.
    pub qoffset_x: f32,
    /// Quaternion y shift.
    pub qoffset_y: f32,
    /// Quaternion z shift.
    pub qoffset_z: f32,
    /// First row of the affine transform.
    pub srow_x: [f32; 4],
    /// Second row of the affine transform.
    pub srow_y: [f32; 4],
    /// Third row of the affine transform.
    pub srow_z: [f32; 4],
    /// Name or meaning of the data, NUL padded.
    pub intent_name: [u8; 16],
    /// `n+1\0` for single-file `NIfTI`.
    pub magic: [u8; 4],
}

impl Default for NiftiHeader {
    /// A header describing a 1x1x1x1 `Float32` volume in a single `.nii` file.
    fn default() -> Self {
        Self {
            sizeof_hdr: Self::SIZE as i32,
            data_type: [0; 10],
            db_name: [0; 18],
            extents: 0,
            session_error: 0,
            regular: b'r',
            dim_info: 0,
            dim: [4, 1, 1, 1, 1, 1, 1, 1],
            intent_p1: 0.0,
            intent_p2: 0.0,
            intent_p3: 0.0,
            intent_code: 0,
            datatype: DataType::Float32.code(),
            bitpix: 32,
            slice_start: 0,
            pixdim: [1.0; 8],
            vox_offset: Self::DEFAULT_VOX_OFFSET as f32,
            scl_slope: 1.0,
            scl_inter: 0.0,
            slice_end: 0,
            slice_code: 0,
            xyzt_units: SpatialUnits::Millimeter.to_code() | TemporalUnits::Second.to_code(),
            cal_max: 0.0,
            cal_min: 0.0,
            slice_duration: 0.0,
            toffset: 0.0,
            glmax: 0,
            glmin: 0,
            descrip: [0; 80],
            aux_file: [0; 24],
            qform_code: 0,
            sform_code: 1,
            quatern_b: 0.0,
            quatern_c: 0.0,
            quatern_d: 0.0,
            qoffset_x: 0.0,
            qoffset_y: 0.0,
            qoffset_z: 0.0,
            srow_x: [1.0, 0.0, 0.0, 0.0],
            srow_y: [0.0, 1.0, 0.0, 0.0],
            srow_z: [0.0, 0.0, 1.0, 0.0],
            intent_name: [0; 16],
            magic: *MAGIC_N1,
        }
    }
}

fn read_f32s<const N: usize>(bytes: &[u8], start: usize) -> [f32; N] {
    let mut out = [0.0f32; N];
    LittleEndian::read_f32_into(&bytes[start..start + N * 4], &mut out);
    out
}

fn write_f32s(buf: &mut [u8], start: usize, values: &[f32]) {
    LittleEndian::write_f32_into(values, &mut buf[start..start + values.len() * 4]);
}

fn copy_array<const N: usize>(bytes: &[u8], start: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[start..start + N]);
    out
}

fn trim_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

impl NiftiHeader {
    /// Size of NIfTI-1 header in bytes.
    pub const SIZE: usize = 348;

    /// Payload offset used for new images: the header plus the 4-byte extension flag.
    pub const DEFAULT_VOX_OFFSET: usize = 352;

    /// Build a header for a fresh `nx * ny * nz * nt` volume of the given type.
    pub fn for_volume(
        nx: usize,
        ny: usize,
        nz: usize,
        nt: usize,
        datatype: DataType,
    ) -> Result<Self> {
        let mut header = Self::default();
        for (i, &extent) in [nx, ny, nz, nt].iter().enumerate() {
            header.dim[i + 1] = i16::try_from(extent).map_err(|_| {
                Error::Format(format!(
                    "dimension {} extent {} exceeds NIfTI-1 limit {}",
                    i + 1,
                    extent,
                    i16::MAX
                ))
            })?;
        }
        header.datatype = datatype.code();
        header.bitpix = (datatype.byte_size() * 8) as i16;
        header.validate()?;
        Ok(header)
    }

    /// Decode a header from the first 348 bytes of `bytes`.
    ///
    /// Only little-endian headers are accepted. An unexpected `sizeof_hdr` or
    /// magic value is logged and tolerated; legacy writers are sloppy with both.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        use offsets::*;

        if bytes.len() < Self::SIZE {
            return Err(Error::Format(format!(
                "header too short: got {} bytes, need {}",
                bytes.len(),
                Self::SIZE
            )));
        }

        let sizeof_hdr = LittleEndian::read_i32(&bytes[SIZEOF_HDR..SIZEOF_HDR + 4]);
        if sizeof_hdr != Self::SIZE as i32 {
            if BigEndian::read_i32(&bytes[SIZEOF_HDR..SIZEOF_HDR + 4]) == Self::SIZE as i32 {
                return Err(Error::Format(
                    "big-endian headers are not supported".to_string(),
                ));
            }
            tracing::warn!(sizeof_hdr, "unexpected sizeof_hdr, expected 348");
        }

        let mut dim = [0i16; 8];
        LittleEndian::read_i16_into(&bytes[DIM..DIM + 16], &mut dim);

        let header = Self {
            sizeof_hdr,
            data_type: copy_array(bytes, DATA_TYPE),
            db_name: copy_array(bytes, DB_NAME),
            extents: LittleEndian::read_i32(&bytes[EXTENTS..EXTENTS + 4]),
            session_error: LittleEndian::read_i16(&bytes[SESSION_ERROR..SESSION_ERROR + 2]),
            regular: bytes[REGULAR],
            dim_info: bytes[DIM_INFO],
            dim,
            intent_p1: LittleEndian::read_f32(&bytes[INTENT_P1..INTENT_P1 + 4]),
            intent_p2: LittleEndian::read_f32(&bytes[INTENT_P2..INTENT_P2 + 4]),
            intent_p3: LittleEndian::read_f32(&bytes[INTENT_P3..INTENT_P3 + 4]),
            intent_code: LittleEndian::read_i16(&bytes[INTENT_CODE..INTENT_CODE + 2]),
            datatype: LittleEndian::read_i16(&bytes[DATATYPE..DATATYPE + 2]),
            bitpix: LittleEndian::read_i16(&bytes[BITPIX..BITPIX + 2]),
            slice_start: LittleEndian::read_i16(&bytes[SLICE_START..SLICE_START + 2]),
            pixdim: read_f32s(bytes, PIXDIM),
            vox_offset: LittleEndian::read_f32(&bytes[VOX_OFFSET..VOX_OFFSET + 4]),
            scl_slope: LittleEndian::read_f32(&bytes[SCL_SLOPE..SCL_SLOPE + 4]),
            scl_inter: LittleEndian::read_f32(&bytes[SCL_INTER..SCL_INTER + 4]),
            slice_end: LittleEndian::read_i16(&bytes[SLICE_END..SLICE_END + 2]),
            slice_code: bytes[SLICE_CODE],
            xyzt_units: bytes[XYZT_UNITS],
            cal_max: LittleEndian::read_f32(&bytes[CAL_MAX..CAL_MAX + 4]),
            cal_min: LittleEndian::read_f32(&bytes[CAL_MIN..CAL_MIN + 4]),
            slice_duration: LittleEndian::read_f32(&bytes[SLICE_DURATION..SLICE_DURATION + 4]),
            toffset: LittleEndian::read_f32(&bytes[TOFFSET..TOFFSET + 4]),
            glmax: LittleEndian::read_i32(&bytes[GLMAX..GLMAX + 4]),
            glmin: LittleEndian::read_i32(&bytes[GLMIN..GLMIN + 4]),
            descrip: copy_array(bytes, DESCRIP),
            aux_file: copy_array(bytes, AUX_FILE),
            qform_code: LittleEndian::read_i16(&bytes[QFORM_CODE..QFORM_CODE + 2]),
            sform_code: LittleEndian::read_i16(&bytes[SFORM_CODE..SFORM_CODE + 2]),
            quatern_b: LittleEndian::read_f32(&bytes[QUATERN_B..QUATERN_B + 4]),
            quatern_c: LittleEndian::read_f32(&bytes[QUATERN_C..QUATERN_C + 4]),
            quatern_d: LittleEndian::read_f32(&bytes[QUATERN_D..QUATERN_D + 4]),
            qoffset_x: LittleEndian::read_f32(&bytes[QOFFSET_X..QOFFSET_X + 4]),
            qoffset_y: LittleEndian::read_f32(&bytes[QOFFSET_Y..QOFFSET_Y + 4]),
            qoffset_z: LittleEndian::read_f32(&bytes[QOFFSET_Z..QOFFSET_Z + 4]),
            srow_x: read_f32s(bytes, SROW_X),
            srow_y: read_f32s(bytes, SROW_Y),
            srow_z: read_f32s(bytes, SROW_Z),
            intent_name: copy_array(bytes, INTENT_NAME),
            magic: copy_array(bytes, MAGIC),
        };

        if !header.has_valid_magic() {
            tracing::warn!(magic = ?header.magic, "unrecognised NIfTI magic, continuing");
        }

        Ok(header)
    }

    /// Encode the header back into its 348-byte on-disk form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        use offsets::*;

        let mut buf = [0u8; Self::SIZE];

        LittleEndian::write_i32(&mut buf[SIZEOF_HDR..SIZEOF_HDR + 4], self.sizeof_hdr);
        buf[DATA_TYPE..DATA_TYPE + 10].copy_from_slice(&self.data_type);
        buf[DB_NAME..DB_NAME + 18].copy_from_slice(&self.db_name);
        LittleEndian::write_i32(&mut buf[EXTENTS..EXTENTS + 4], self.extents);
        LittleEndian::write_i16(&mut buf[SESSION_ERROR..SESSION_ERROR + 2], self.session_error);
        buf[REGULAR] = self.regular;
        buf[DIM_INFO] = self.dim_info;

        LittleEndian::write_i16_into(&self.dim, &mut buf[DIM..DIM + 16]);

        LittleEndian::write_f32(&mut buf[INTENT_P1..INTENT_P1 + 4], self.intent_p1);
        LittleEndian::write_f32(&mut buf[INTENT_P2..INTENT_P2 + 4], self.intent_p2);
        LittleEndian::write_f32(&mut buf[INTENT_P3..INTENT_P3 + 4], self.intent_p3);
        LittleEndian::write_i16(&mut buf[INTENT_CODE..INTENT_CODE + 2], self.intent_code);
        LittleEndian::write_i16(&mut buf[DATATYPE..DATATYPE + 2], self.datatype);
        LittleEndian::write_i16(&mut buf[BITPIX..BITPIX + 2], self.bitpix);
        LittleEndian::write_i16(&mut buf[SLICE_START..SLICE_START + 2], self.slice_start);

        write_f32s(&mut buf, PIXDIM, &self.pixdim);

        LittleEndian::write_f32(&mut buf[VOX_OFFSET..VOX_OFFSET + 4], self.vox_offset);
        LittleEndian::write_f32(&mut buf[SCL_SLOPE..SCL_SLOPE + 4], self.scl_slope);
        LittleEndian::write_f32(&mut buf[SCL_INTER..SCL_INTER + 4], self.scl_inter);
        LittleEndian::write_i16(&mut buf[SLICE_END..SLICE_END + 2], self.slice_end);
        buf[SLICE_CODE] = self.slice_code;
        buf[XYZT_UNITS] = self.xyzt_units;
        LittleEndian::write_f32(&mut buf[CAL_MAX..CAL_MAX + 4], self.cal_max);
        LittleEndian::write_f32(&mut buf[CAL_MIN..CAL_MIN + 4], self.cal_min);
        LittleEndian::write_f32(&mut buf[SLICE_DURATION..SLICE_DURATION + 4], self.slice_duration);
        LittleEndian::write_f32(&mut buf[TOFFSET..TOFFSET + 4], self.toffset);
        LittleEndian::write_i32(&mut buf[GLMAX..GLMAX + 4], self.glmax);
        LittleEndian::write_i32(&mut buf[GLMIN..GLMIN + 4], self.glmin);

        buf[DESCRIP..DESCRIP + 80].copy_from_slice(&self.descrip);
        buf[AUX_FILE..AUX_FILE + 24].copy_from_slice(&self.aux_file);

        LittleEndian::write_i16(&mut buf[QFORM_CODE..QFORM_CODE + 2], self.qform_code);
        LittleEndian::write_i16(&mut buf[SFORM_CODE..SFORM_CODE + 2], self.sform_code);

        LittleEndian::write_f32(&mut buf[QUATERN_B..QUATERN_B + 4], self.quatern_b);
        LittleEndian::write_f32(&mut buf[QUATERN_C..QUATERN_C + 4], self.quatern_c);
        LittleEndian::write_f32(&mut buf[QUATERN_D..QUATERN_D + 4], self.quatern_d);
        LittleEndian::write_f32(&mut buf[QOFFSET_X..QOFFSET_X + 4], self.qoffset_x);
        LittleEndian::write_f32(&mut buf[QOFFSET_Y..QOFFSET_Y + 4], self.qoffset_y);
        LittleEndian::write_f32(&mut buf[QOFFSET_Z..QOFFSET_Z + 4], self.qoffset_z);

        write_f32s(&mut buf, SROW_X, &self.srow_x);
        write_f32s(&mut buf, SROW_Y, &self.srow_y);
        write_f32s(&mut buf, SROW_Z, &self.srow_z);

        buf[INTENT_NAME..INTENT_NAME + 16].copy_from_slice(&self.intent_name);
        buf[MAGIC..MAGIC + 4].copy_from_slice(&self.magic);

        buf
    }

    /// Returns true if the magic is `n+1\0` or `ni1\0`.
    pub fn has_valid_magic(&self) -> bool {
        &self.magic == MAGIC_N1 || &self.magic == MAGIC_NI1
    }

    /// Number of dimensions, `dim[0]`.
    pub fn ndim(&self) -> usize {
        self.dim[0].max(0) as usize
    }

    /// Extent of `axis` (1-based). Axes beyond `ndim` have extent 1.
    pub fn extent(&self, axis: usize) -> usize {
        if axis == 0 || axis > self.ndim().min(7) {
            1
        } else {
            self.dim[axis].max(0) as usize
        }
    }

    /// Total number of voxels. Saturates at `usize::MAX`; [`validate`](Self::validate)
    /// rejects headers where that would happen.
    pub fn num_voxels(&self) -> usize {
        (1..=self.ndim().min(7))
            .map(|axis| self.extent(axis))
            .fold(1usize, usize::saturating_mul)
    }

    /// Bytes per voxel, `bitpix / 8`.
    pub fn bytes_per_voxel(&self) -> usize {
        (self.bitpix.max(0) / 8) as usize
    }

    /// Total size of image data in bytes, saturating like [`num_voxels`](Self::num_voxels).
    pub fn data_size(&self) -> usize {
        self.num_voxels().saturating_mul(self.bytes_per_voxel())
    }

    /// Resolved datatype, if the code is one this crate knows.
    pub fn data_type(&self) -> Option<DataType> {
        DataType::from_code(self.datatype)
    }

    /// Grid spacing `pixdim[1..=7]`, copied verbatim.
    pub fn spacing(&self) -> [f32; 7] {
        let mut out = [0.0f32; 7];
        out.copy_from_slice(&self.pixdim[1..]);
        out
    }

    /// Payload offset as a byte position.
    pub fn payload_offset(&self) -> Result<usize> {
        if !self.vox_offset.is_finite() || self.vox_offset < 0.0 {
            return Err(Error::Format(format!(
                "vox_offset must be finite and non-negative, got {}",
                self.vox_offset
            )));
        }
        Ok(self.vox_offset as usize)
    }

    /// Spatial units decoded from `xyzt_units`.
    pub fn spatial_units(&self) -> SpatialUnits {
        SpatialUnits::from_code(self.xyzt_units)
    }

    /// Temporal units decoded from `xyzt_units`.
    pub fn temporal_units(&self) -> TemporalUnits {
        TemporalUnits::from_code(self.xyzt_units)
    }

    /// Repack `xyzt_units` from the given units.
    pub fn set_units(&mut self, spatial: SpatialUnits, temporal: TemporalUnits) {
        self.xyzt_units = spatial.to_code() | temporal.to_code();
    }

    /// Description text up to the first NUL.
    pub fn descrip_str(&self) -> String {
        trim_nul(&self.descrip)
    }

    /// Set the description, truncated to 79 bytes so it stays NUL terminated.
    pub fn set_descrip(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let len = bytes.len().min(79);
        self.descrip = [0; 80];
        self.descrip[..len].copy_from_slice(&bytes[..len]);
    }

    /// Intent name up to the first NUL.
    pub fn intent_name_str(&self) -> String {
        trim_nul(&self.intent_name)
    }

    /// 4x4 affine built from the sform rows.
    pub fn sform_affine(&self) -> [[f32; 4]; 4] {
        [self.srow_x, self.srow_y, self.srow_z, [0.0, 0.0, 0.0, 1.0]]
    }

    /// Check the invariants needed to address voxels.
    ///
    /// `dim[0]` must be in `1..=7`, every used extent at least 1, and
    /// `bitpix / 8` one of 2, 4 or 8.
    pub fn validate(&self) -> Result<()> {
        if !(1..=7).contains(&self.dim[0]) {
            return Err(Error::Format(format!(
                "ndim must be 1..=7, got {}",
                self.dim[0]
            )));
        }

        for axis in 1..=self.ndim() {
            if self.dim[axis] < 1 {
                return Err(Error::Format(format!(
                    "dimension {} must be positive, got {}",
                    axis, self.dim[axis]
                )));
            }
        }

        if !matches!(self.bytes_per_voxel(), 2 | 4 | 8) || self.bitpix % 8 != 0 {
            return Err(Error::UnsupportedDatatype {
                bitpix: self.bitpix,
            });
        }

        // Voxel count and byte size must fit in usize
        let mut voxels: usize = 1;
        for axis in 1..=self.ndim() {
            voxels = voxels
                .checked_mul(self.extent(axis))
                .ok_or_else(|| Error::Format("dimension product overflow".into()))?;
        }
        voxels
            .checked_mul(self.bytes_per_voxel())
            .ok_or_else(|| Error::Format("data size overflow".into()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated_header() -> NiftiHeader {
        let mut h = NiftiHeader::default();
        h.data_type = *b"dsr\0\0\0\0\0\0x";
        h.db_name[..5].copy_from_slice(b"brain");
        h.extents = 16384;
        h.session_error = -3;
        h.dim_info = 0x39;
        h.dim = [4, 91, 109, 91, 3, 1, 1, 1];
        h.intent_p1 = 1.5;
        h.intent_p2 = -2.0;
        h.intent_p3 = 0.25;
        h.intent_code = 1002;
        h.datatype = DataType::Int16.code();
        h.bitpix = 16;
        h.slice_start = 2;
        h.pixdim = [-1.0, 2.0, 2.0, 2.0, 2.5, 0.0, 0.0, 0.0];
        h.vox_offset = 352.0;
        h.scl_slope = 0.5;
        h.scl_inter = 10.0;
        h.slice_end = 88;
        h.slice_code = 3;
        h.xyzt_units = 0x0A;
        h.cal_max = 8000.0;
        h.cal_min = -100.0;
        h.slice_duration = 0.05;
        h.toffset = 1.25;
        h.glmax = 255;
        h.glmin = -7;
        h.set_descrip("FSL5.0");
        h.aux_file[..4].copy_from_slice(b"none");
        h.qform_code = 4;
        h.sform_code = 4;
        h.quatern_b = 0.1;
        h.quatern_c = -0.2;
        h.quatern_d = 0.3;
        h.qoffset_x = 90.0;
        h.qoffset_y = -126.0;
        h.qoffset_z = -72.0;
        h.srow_x = [-2.0, 0.0, 0.0, 90.0];
        h.srow_y = [0.0, 2.0, 0.0, -126.0];
        h.srow_z = [0.0, 0.0, 2.0, -72.0];
        h.intent_name[..6].copy_from_slice(b"zscore");
        h
    }

    #[test]
    fn test_header_roundtrip_preserves_every_field() {
        let header = populated_header();
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 348);

        let parsed = NiftiHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.to_bytes(), bytes);
    }

    #[test]
    fn test_field_offsets_match_layout() {
        let header = populated_header();
        let bytes = header.to_bytes();

        assert_eq!(LittleEndian::read_i32(&bytes[0..4]), 348);
        assert_eq!(LittleEndian::read_i16(&bytes[40..42]), 4);
        assert_eq!(LittleEndian::read_i16(&bytes[42..44]), 91);
        assert_eq!(LittleEndian::read_i16(&bytes[70..72]), 4);
        assert_eq!(LittleEndian::read_i16(&bytes[72..74]), 16);
        assert_eq!(LittleEndian::read_f32(&bytes[80..84]), 2.0);
        assert_eq!(LittleEndian::read_f32(&bytes[108..112]), 352.0);
        assert_eq!(bytes[123], 0x0A);
        assert_eq!(&bytes[148..154], b"FSL5.0");
        assert_eq!(LittleEndian::read_f32(&bytes[308..312]), -126.0);
        assert_eq!(&bytes[328..334], b"zscore");
        assert_eq!(&bytes[344..348], b"n+1\0");
    }

    #[test]
    fn test_short_header_is_format_error() {
        let bytes = vec![0u8; 200];
        let err = NiftiHeader::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_big_endian_header_rejected() {
        let mut bytes = NiftiHeader::default().to_bytes();
        BigEndian::write_i32(&mut bytes[0..4], 348);
        let err = NiftiHeader::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("big-endian"));
    }

    #[test]
    fn test_bad_magic_is_tolerated() {
        let mut bytes = NiftiHeader::default().to_bytes();
        bytes[344..348].copy_from_slice(b"BAD!");
        let parsed = NiftiHeader::from_bytes(&bytes).unwrap();
        assert!(!parsed.has_valid_magic());
        assert_eq!(&parsed.magic, b"BAD!");
    }

    #[test]
    fn test_dimension_model() {
        let header = populated_header();
        assert_eq!(header.ndim(), 4);
        assert_eq!(header.extent(1), 91);
        assert_eq!(header.extent(4), 3);
        assert_eq!(header.extent(5), 1);
        assert_eq!(header.num_voxels(), 91 * 109 * 91 * 3);
        assert_eq!(header.bytes_per_voxel(), 2);
        assert_eq!(header.data_size(), 91 * 109 * 91 * 3 * 2);
        assert_eq!(header.spacing(), [2.0, 2.0, 2.0, 2.5, 0.0, 0.0, 0.0]);
        assert_eq!(header.data_type(), Some(DataType::Int16));
    }

    #[test]
    fn test_extents_beyond_ndim_are_ignored() {
        let mut header = NiftiHeader::default();
        header.dim = [3, 4, 5, 6, 0, 0, 0, 0];
        assert_eq!(header.num_voxels(), 120);
        assert_eq!(header.extent(4), 1);
        header.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_unsupported_bitpix() {
        for bitpix in [8, 24, 128, 0] {
            let mut header = NiftiHeader::default();
            header.bitpix = bitpix;
            let err = header.validate().unwrap_err();
            assert!(
                matches!(err, Error::UnsupportedDatatype { bitpix: b } if b == bitpix),
                "bitpix {bitpix}"
            );
        }
    }

    #[test]
    fn test_validate_rejects_bad_dims() {
        let mut header = NiftiHeader::default();
        header.dim[0] = 0;
        assert!(matches!(header.validate(), Err(Error::Format(_))));

        header.dim[0] = 8;
        assert!(matches!(header.validate(), Err(Error::Format(_))));

        header.dim = [3, 10, 0, 10, 1, 1, 1, 1];
        assert!(matches!(header.validate(), Err(Error::Format(_))));
    }

    #[test]
    fn test_validate_rejects_dimension_overflow() {
        let mut header = NiftiHeader::default();
        header.dim = [7, i16::MAX, i16::MAX, i16::MAX, i16::MAX, i16::MAX, i16::MAX, i16::MAX];
        header.datatype = DataType::UInt16.code();
        header.bitpix = 16;

        // Derived sizes saturate instead of panicking
        assert_eq!(header.num_voxels(), usize::MAX);
        assert_eq!(header.data_size(), usize::MAX);

        match header.validate() {
            Err(Error::Format(msg)) => assert!(msg.contains("overflow"), "{msg}"),
            other => panic!("expected Format error, got {other:?}"),
        }
    }

    #[test]
    fn test_for_volume() {
        let header = NiftiHeader::for_volume(10, 20, 30, 2, DataType::Float64).unwrap();
        assert_eq!(header.dim[..5], [4, 10, 20, 30, 2]);
        assert_eq!(header.bitpix, 64);
        assert_eq!(header.datatype, 64);
        assert_eq!(header.payload_offset().unwrap(), 352);

        assert!(NiftiHeader::for_volume(40000, 1, 1, 1, DataType::Float32).is_err());
        assert!(NiftiHeader::for_volume(0, 1, 1, 1, DataType::Float32).is_err());
    }

    #[test]
    fn test_units_roundtrip() {
        let mut header = NiftiHeader::default();
        header.set_units(SpatialUnits::Micrometer, TemporalUnits::Millisecond);
        assert_eq!(header.spatial_units(), SpatialUnits::Micrometer);
        assert_eq!(header.temporal_units(), TemporalUnits::Millisecond);
        assert_eq!(header.xyzt_units, 0x13);
    }

    #[test]
    fn test_descrip_truncates() {
        let mut header = NiftiHeader::default();
        header.set_descrip(&"x".repeat(100));
        assert_eq!(header.descrip_str().len(), 79);
        assert_eq!(header.descrip[79], 0);
    }

    #[test]
    fn test_negative_vox_offset_rejected() {
        let mut header = NiftiHeader::default();
        header.vox_offset = -4.0;
        assert!(header.payload_offset().is_err());
        header.vox_offset = f32::NAN;
        assert!(header.payload_offset().is_err());
    }
}
