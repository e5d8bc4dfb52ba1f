//! Library to read thermograms from RIS thermal camera recordings.
//!
//! A `.ris` file is a radiometric video container: a short text header
//! of `<metaitem .../>` tags closed by `</description>` and a trailing
//! `</ris>` marker, followed by raw 16-bit sensor values stored
//! frame-major, then row-major. This crate provides two
//! functionalities:
//!
//! 1. [Parse the header](RisHeader) to recover the recorded image
//! width, image height, frame count, and the byte offset where pixel
//! data begins.
//!
//! 2. [Extract a thermogram](read_thermogram): decode a rectangular,
//! temporal sub-window of the pixel data into an owned 3-D array of
//! `u16` samples indexed `[frame, row, column]`, ready for raster
//! encoders or phase-map processing downstream.
//!
//! # Usage
//!
//! Reading a full recording:
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use std::fs::File;
//! use ris_processing::{read_thermogram, WindowSpec};
//!
//! let mut file = File::open("recording.ris")?;
//! let thermogram = read_thermogram(&mut file, WindowSpec::default())?;
//! let (frames, rows, cols) = thermogram.dim();
//! # Ok(())
//! # }
//! ```
//!
//! Reading a cropped window of the first ten frames:
//!
//! ```rust
//! # fn test_compile() -> anyhow::Result<()> {
//! use std::fs::File;
//! use ris_processing::{read_thermogram, WindowSpec};
//!
//! let window = WindowSpec {
//!     width: Some(64),
//!     height: Some(64),
//!     frame_count: Some(10),
//!     ..WindowSpec::default()
//! };
//! let thermogram = read_thermogram(&mut File::open("recording.ris")?, window)?;
//! # Ok(())
//! # }
//! ```
//!
//! The window arithmetic deliberately matches the camera vendor's
//! reference reader; see [`WindowSpec`] for the details that matter
//! when the window starts are non-zero.

pub mod ris;
pub mod thermogram;

pub mod stats;

pub mod cli;

pub use crate::ris::{read_thermogram, RisError, RisHeader, WindowSpec};
pub use crate::thermogram::Thermogram;
