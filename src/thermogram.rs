//! The decoded recording handed to downstream consumers.

use ndarray::{Array3, ArrayView2, Axis};

/// A decoded radiometric recording: raw `u16` sensor values indexed
/// `[frame, row, column]`, row-major within a frame, frames in
/// acquisition order.
///
/// The array is an owned value; it keeps no tie to the stream it was
/// decoded from, which may be closed once extraction returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Thermogram {
    pub data: Array3<u16>,
}

impl Thermogram {
    /// Dimensions as `(frames, rows, cols)`.
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn num_frames(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// View of a single frame as a `rows x cols` array.
    pub fn frame(&self, idx: usize) -> ArrayView2<'_, u16> {
        self.data.index_axis(Axis(0), idx)
    }
}
