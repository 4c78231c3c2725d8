//! # niftikit
//!
//! Reading and writing of NIfTI-1 neuroimaging volumes (`.nii` and `.nii.gz`)
//! with coordinate-indexed access to individual samples, 2-D slices and
//! per-voxel time series.
//!
//! ```ignore
//! use niftikit::nifti::{self, NiftiImage};
//!
//! let mut img = nifti::load("brain.nii.gz", true)?;
//! let v = img.get(50, 50, 50, 0)?;
//! img.set(50, 50, 50, 0, v + 1.0)?;
//! nifti::save(&img, "edited.nii.gz")?;
//!
//! let blank = NiftiImage::build(100, 100, 100, 20)?;
//! assert_eq!(blank.dims(), (100, 100, 100, 20));
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod nifti;

pub use error::{Error, Result};
