//! In-memory NIfTI image: header, resolved sample codec and voxel payload.

use super::header::{DataType, NiftiHeader};
use super::sample::SampleCodec;
use crate::error::{Error, Result};
use ndarray::Array2;

/// A NIfTI-1 volume with coordinate-indexed voxel access.
///
/// The header is the single source of truth for shape and spacing; the
/// extents and counts below are computed from it on every call. Voxels are
/// stored in the on-disk encoding and converted on access, x fastest.
#[derive(Clone)]
pub struct NiftiImage {
    header: NiftiHeader,
    codec: SampleCodec,
    data: Option<Vec<u8>>,
}

impl std::fmt::Debug for NiftiImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NiftiImage")
            .field("dim", &self.header.dim)
            .field("codec", &self.codec)
            .field("payload_bytes", &self.data.as_ref().map(Vec::len))
            .finish_non_exhaustive()
    }
}

impl NiftiImage {
    /// Create a zero-filled `Float32` volume of `nx * ny * nz * nt` voxels.
    ///
    /// # Example
    /// ```ignore
    /// let img = NiftiImage::build(100, 100, 100, 20)?;
    /// assert_eq!(img.dims(), (100, 100, 100, 20));
    /// ```
    pub fn build(nx: usize, ny: usize, nz: usize, nt: usize) -> Result<Self> {
        Self::build_with((nx, ny, nz, nt), DataType::Float32)
    }

    /// Create a zero-filled volume with an explicit sample type.
    pub fn build_with(dims: (usize, usize, usize, usize), datatype: DataType) -> Result<Self> {
        let (nx, ny, nz, nt) = dims;
        let header = NiftiHeader::for_volume(nx, ny, nz, nt, datatype)?;
        let data = vec![0u8; header.data_size()];
        Ok(Self {
            codec: SampleCodec::for_datatype(datatype),
            header,
            data: Some(data),
        })
    }

    /// Assemble an image from a decoded header and an optional payload.
    ///
    /// The header is validated and the codec resolved here. A payload longer
    /// than `nbyper * nvox` is truncated; a shorter one is rejected.
    pub fn from_parts(header: NiftiHeader, data: Option<Vec<u8>>) -> Result<Self> {
        header.validate()?;
        let codec = SampleCodec::select(header.bytes_per_voxel(), header.datatype)?;

        let data = match data {
            Some(mut bytes) => {
                let expected = header.data_size();
                if bytes.len() < expected {
                    return Err(Error::Format(format!(
                        "payload truncated: got {} bytes, need {}",
                        bytes.len(),
                        expected
                    )));
                }
                bytes.truncate(expected);
                Some(bytes)
            }
            None => None,
        };

        Ok(Self {
            header,
            codec,
            data,
        })
    }

    /// The image header.
    pub fn header(&self) -> &NiftiHeader {
        &self.header
    }

    /// The codec selected for this image.
    pub fn codec(&self) -> SampleCodec {
        self.codec
    }

    /// Datatype named by the header, if it is a known code.
    pub fn dtype(&self) -> Option<DataType> {
        self.header.data_type()
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.header.ndim()
    }

    /// Extent along x.
    pub fn nx(&self) -> usize {
        self.header.extent(1)
    }

    /// Extent along y.
    pub fn ny(&self) -> usize {
        self.header.extent(2)
    }

    /// Extent along z.
    pub fn nz(&self) -> usize {
        self.header.extent(3)
    }

    /// Extent along t.
    pub fn nt(&self) -> usize {
        self.header.extent(4)
    }

    /// Extent along the fifth axis.
    pub fn nu(&self) -> usize {
        self.header.extent(5)
    }

    /// Extent along the sixth axis.
    pub fn nv(&self) -> usize {
        self.header.extent(6)
    }

    /// Extent along the seventh axis.
    pub fn nw(&self) -> usize {
        self.header.extent(7)
    }

    /// Total number of voxels.
    pub fn nvox(&self) -> usize {
        self.header.num_voxels()
    }

    /// Bytes per voxel.
    pub fn nbyper(&self) -> usize {
        self.codec.width()
    }

    /// Grid spacings `dx..dw`.
    pub fn spacing(&self) -> [f32; 7] {
        self.header.spacing()
    }

    /// `(nx, ny, nz, nt)`.
    pub fn dims(&self) -> (usize, usize, usize, usize) {
        (self.nx(), self.ny(), self.nz(), self.nt())
    }

    /// Whether voxel data is present (false for header-only loads).
    pub fn has_payload(&self) -> bool {
        self.data.is_some()
    }

    /// Raw payload in its on-disk encoding.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        self.data.as_deref().ok_or(Error::MissingPayload)
    }

    fn payload_mut(&mut self) -> Result<&mut [u8]> {
        self.data.as_deref_mut().ok_or(Error::MissingPayload)
    }

    /// Byte offset of `(x, y, z, t)`, after checking every coordinate.
    fn byte_offset(&self, x: usize, y: usize, z: usize, t: usize) -> Result<usize> {
        let (nx, ny, nz, nt) = self.dims();
        for (axis, coord, extent) in [('x', x, nx), ('y', y, ny), ('z', z, nz), ('t', t, nt)] {
            if coord >= extent {
                return Err(Error::IndexOutOfRange {
                    axis,
                    coord,
                    extent,
                });
            }
        }
        let index = t * (nx * ny * nz) + z * (nx * ny) + y * nx + x;
        Ok(index * self.nbyper())
    }

    /// Sample at `(x, y, z, t)`.
    pub fn get(&self, x: usize, y: usize, z: usize, t: usize) -> Result<f32> {
        let offset = self.byte_offset(x, y, z, t)?;
        let width = self.nbyper();
        let data = self.as_bytes()?;
        Ok(self.codec.decode(&data[offset..offset + width]))
    }

    /// Overwrite the sample at `(x, y, z, t)`.
    ///
    /// The value is converted to the image's sample type, so 16-bit images
    /// round and saturate and 64-bit images store the widened `f32`.
    pub fn set(&mut self, x: usize, y: usize, z: usize, t: usize, value: f32) -> Result<()> {
        let offset = self.byte_offset(x, y, z, t)?;
        let width = self.nbyper();
        let codec = self.codec;
        let data = self.payload_mut()?;
        codec.encode(value, &mut data[offset..offset + width]);
        Ok(())
    }

    /// The `nx` by `ny` plane at `(z, t)`, indexed `[[x, y]]`.
    pub fn slice(&self, z: usize, t: usize) -> Result<Array2<f32>> {
        let base = self.byte_offset(0, 0, z, t)?;
        let data = self.as_bytes()?;
        let (nx, ny, ..) = self.dims();
        let width = self.nbyper();
        let codec = self.codec;

        Ok(Array2::from_shape_fn((nx, ny), |(x, y)| {
            let offset = base + (y * nx + x) * width;
            codec.decode(&data[offset..offset + width])
        }))
    }

    /// Samples at `(x, y, z)` across every time point.
    pub fn time_series(&self, x: usize, y: usize, z: usize) -> Result<Vec<f32>> {
        let first = self.byte_offset(x, y, z, 0)?;
        let data = self.as_bytes()?;
        let (nx, ny, nz, _) = self.dims();
        let width = self.nbyper();
        let volume_bytes = nx * ny * nz * width;

        let count = data.len() / volume_bytes;
        Ok((0..count.min(self.nt()))
            .map(|t| {
                let offset = first + t * volume_bytes;
                self.codec.decode(&data[offset..offset + width])
            })
            .collect())
    }
}
