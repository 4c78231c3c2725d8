//! NIfTI file I/O.
//!
//! Reading goes through [`open_stream`], which transparently gunzips paths
//! ending in `.gz`. Writing never looks at the extension: compression is
//! chosen explicitly through [`SaveOptions`].

use super::header::NiftiHeader;
use super::image::NiftiImage;
use crate::error::{Error, Result};
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

const GZIP_BUFFER_SIZE: usize = 256 * 1024; // 256KB buffer for streaming decompression
const WRITE_BUFFER_SIZE: usize = 1024 * 1024;
const PAYLOAD_PREALLOC_LIMIT: usize = 64 * 1024 * 1024;

// ============================================================================
// Decompression Gateway
// ============================================================================

/// Byte stream over a `.nii` or `.nii.gz` file.
///
/// Owns the file handle; it is closed when the stream is dropped.
pub enum NiftiStream {
    /// Uncompressed file.
    Raw(BufReader<File>),
    /// Gzip-compressed file (multi-member streams are read to the end).
    Gzip(MultiGzDecoder<BufReader<File>>),
}

impl NiftiStream {
    /// Whether the underlying file is gzip compressed.
    pub fn is_compressed(&self) -> bool {
        matches!(self, Self::Gzip(_))
    }

    /// Corrupt gzip data and early EOF are format errors; anything else the
    /// OS reports stays an I/O error.
    fn map_read_error(&self, e: io::Error, what: &str) -> Error {
        match e.kind() {
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData if self.is_compressed() => {
                Error::Format(format!("gzip stream decode failed while reading {what}: {e}"))
            }
            io::ErrorKind::UnexpectedEof if self.is_compressed() => Error::Format(format!(
                "gzip stream ended early while reading {what}: {e}"
            )),
            io::ErrorKind::UnexpectedEof => {
                Error::Format(format!("file truncated while reading {what}"))
            }
            _ => Error::Io(e),
        }
    }

    /// Fill `buf` completely.
    fn read_section(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        self.read_exact(buf).map_err(|e| self.map_read_error(e, what))
    }

    /// Discard exactly `count` bytes.
    fn skip(&mut self, count: usize, what: &str) -> Result<()> {
        let copied = io::copy(&mut self.by_ref().take(count as u64), &mut io::sink());
        let copied = copied.map_err(|e| self.map_read_error(e, what))?;
        if copied < count as u64 {
            return Err(Error::Format(format!(
                "file truncated while skipping {what}: {copied} of {count} bytes"
            )));
        }
        Ok(())
    }

    /// Read exactly `expected` bytes without trusting `expected` for the
    /// allocation: the buffer only grows as data actually arrives.
    fn read_exact_len(&mut self, expected: usize, what: &str) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(expected.min(PAYLOAD_PREALLOC_LIMIT));
        let read = self.by_ref().take(expected as u64).read_to_end(&mut data);
        read.map_err(|e| self.map_read_error(e, what))?;
        if data.len() < expected {
            return Err(Error::Format(format!(
                "file truncated while reading {what}: {} of {expected} bytes",
                data.len()
            )));
        }
        Ok(data)
    }
}

impl Read for NiftiStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Raw(r) => r.read(buf),
            Self::Gzip(r) => r.read(buf),
        }
    }
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "gz")
}

/// Open `path` for reading, decompressing when its final extension is `gz`.
pub fn open_stream<P: AsRef<Path>>(path: P) -> Result<NiftiStream> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(GZIP_BUFFER_SIZE, file);

    if is_gzipped(path) {
        Ok(NiftiStream::Gzip(MultiGzDecoder::new(reader)))
    } else {
        Ok(NiftiStream::Raw(reader))
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Options for [`load_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Read the voxel payload. When false only the header is decoded.
    pub read_payload: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { read_payload: true }
    }
}

impl LoadOptions {
    /// Options that read header and payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether the payload is read.
    #[must_use]
    pub fn read_payload(mut self, read_payload: bool) -> Self {
        self.read_payload = read_payload;
        self
    }
}

/// Output compression for [`save_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Plain `.nii` bytes.
    None,
    /// Whole-file gzip at the given level (0-9).
    Gzip {
        /// Deflate level, clamped to 9.
        level: u32,
    },
}

impl Default for Compression {
    fn default() -> Self {
        Self::Gzip { level: 6 }
    }
}

/// Options for [`save_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOptions {
    /// How the output file is compressed. Defaults to gzip.
    pub compression: Compression,
}

impl SaveOptions {
    /// Default options: gzip at level 6.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uncompressed output.
    pub fn uncompressed() -> Self {
        Self {
            compression: Compression::None,
        }
    }

    /// Set the output compression.
    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

// ============================================================================
// Loading
// ============================================================================

fn read_header(stream: &mut NiftiStream) -> Result<NiftiHeader> {
    let mut bytes = [0u8; NiftiHeader::SIZE];
    stream.read_section(&mut bytes, "header")?;
    NiftiHeader::from_bytes(&bytes)
}

/// Load a NIfTI image from file.
///
/// Supports both `.nii` and `.nii.gz`. With `read_payload = false` only the
/// header is decoded and voxel access returns [`Error::MissingPayload`].
///
/// # Example
/// ```ignore
/// let img = niftikit::nifti::load("MNI152.nii.gz", true)?;
/// println!("{}", img.get(50, 50, 50, 0)?);
/// ```
#[must_use = "this function returns a loaded image that should be used"]
pub fn load<P: AsRef<Path>>(path: P, read_payload: bool) -> Result<NiftiImage> {
    load_with(path, &LoadOptions::new().read_payload(read_payload))
}

/// Load a NIfTI image with explicit options.
pub fn load_with<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<NiftiImage> {
    let path = path.as_ref();
    let mut stream = open_stream(path)?;
    tracing::debug!(
        path = %path.display(),
        compressed = stream.is_compressed(),
        "opened NIfTI file"
    );

    let header = read_header(&mut stream)?;
    header.validate()?;

    if !options.read_payload {
        return NiftiImage::from_parts(header, None);
    }

    let offset = header.payload_offset()?;
    if offset < NiftiHeader::SIZE {
        return Err(Error::Format(format!(
            "vox_offset {} lies inside the {}-byte header",
            offset,
            NiftiHeader::SIZE
        )));
    }
    stream.skip(offset - NiftiHeader::SIZE, "header padding")?;

    let data = stream.read_exact_len(header.data_size(), "voxel payload")?;

    tracing::info!(
        path = %path.display(),
        dim = ?&header.dim[..=header.ndim()],
        bitpix = header.bitpix,
        "loaded NIfTI image"
    );
    NiftiImage::from_parts(header, Some(data))
}

/// Load only the header from a NIfTI file (fast metadata inspection).
///
/// The header is decoded but not validated, so files with unsupported
/// datatypes can still be inspected.
pub fn load_header<P: AsRef<Path>>(path: P) -> Result<NiftiHeader> {
    let mut stream = open_stream(path)?;
    read_header(&mut stream)
}

// ============================================================================
// Saving
// ============================================================================

fn write_nifti<W: Write>(
    writer: &mut W,
    header: &NiftiHeader,
    offset: usize,
    data: &[u8],
) -> Result<()> {
    writer.write_all(&header.to_bytes())?;

    // Padding to vox_offset (typically 352); zero extension flag
    let padding = offset - NiftiHeader::SIZE;
    if padding > 0 {
        writer.write_all(&vec![0u8; padding])?;
    }

    writer.write_all(data)?;
    Ok(())
}

/// Save a NIfTI image, gzip compressed.
///
/// The output is always compressed regardless of the file extension; use
/// [`save_with`] with [`SaveOptions::uncompressed`] to write plain bytes.
///
/// # Example
/// ```ignore
/// niftikit::nifti::save(&img, "output.nii.gz")?;
/// ```
pub fn save<P: AsRef<Path>>(image: &NiftiImage, path: P) -> Result<()> {
    save_with(image, path, &SaveOptions::default())
}

/// Save a NIfTI image with explicit options.
///
/// Writes the header, zero padding up to `vox_offset`, then the payload.
pub fn save_with<P: AsRef<Path>>(
    image: &NiftiImage,
    path: P,
    options: &SaveOptions,
) -> Result<()> {
    let path = path.as_ref();
    let header = image.header();
    header.validate()?;

    let offset = header.payload_offset()?;
    if offset < NiftiHeader::SIZE {
        return Err(Error::Format(format!(
            "vox_offset {} lies inside the {}-byte header",
            offset,
            NiftiHeader::SIZE
        )));
    }
    let data = image.as_bytes()?;

    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

    match options.compression {
        Compression::None => {
            write_nifti(&mut writer, header, offset, data)?;
            writer.flush()?;
        }
        Compression::Gzip { level } => {
            let mut encoder = GzEncoder::new(writer, flate2::Compression::new(level.min(9)));
            write_nifti(&mut encoder, header, offset, data)?;
            encoder.finish()?.flush()?;
        }
    }

    tracing::info!(
        path = %path.display(),
        compression = ?options.compression,
        bytes = offset + data.len(),
        "saved NIfTI image"
    );
    Ok(())
}
