//! `NIfTI` file format support.
//!
//! `NIfTI` (Neuroimaging Informatics Technology Initiative) is a standard format
//! for neuroimaging data. This module reads and writes single-file NIfTI-1
//! volumes (`.nii` and `.nii.gz`) and gives coordinate-indexed access to them.

pub(crate) mod header;
pub(crate) mod image;
pub mod io;
pub(crate) mod sample;

pub use header::{DataType, NiftiHeader, SpatialUnits, TemporalUnits, MAGIC_N1, MAGIC_NI1};
pub use image::NiftiImage;
pub use io::{
    load, load_header, load_with, open_stream, save, save_with, Compression, LoadOptions,
    NiftiStream, SaveOptions,
};
pub use sample::SampleCodec;
