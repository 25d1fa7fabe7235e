//! Aligned, zero-padded copy of a feature matrix
//!
//! Each row is widened from `cols` to `padded_cols` (the next multiple of
//! eight) and zero-filled, so every row starts on a 32-byte boundary and
//! any kernel tier can run over whole rows.

use crate::memory::{AlignedBuffer, MemoryError, MemoryResult};

use super::input::FeatureMatrix;

/// Row width granularity: one 256-bit vector of f32
pub const PAD_LANES: usize = 8;

/// Alignment of padded buffers: one 256-bit vector
pub const PAD_ALIGNMENT: usize = 32;

/// `n` rounded up to a multiple of [`PAD_LANES`]
#[inline]
pub const fn padded_len(n: usize) -> usize {
    n.div_ceil(PAD_LANES) * PAD_LANES
}

/// Padded row width and total element count for a `rows x cols` matrix
fn storage_len(rows: usize, cols: usize) -> MemoryResult<(usize, usize)> {
    let overflow = || MemoryError::LayoutOverflow {
        len: rows.saturating_mul(cols),
        alignment: PAD_ALIGNMENT,
    };
    let padded_cols = cols
        .div_ceil(PAD_LANES)
        .checked_mul(PAD_LANES)
        .ok_or_else(overflow)?;
    let len = rows.checked_mul(padded_cols).ok_or_else(overflow)?;
    Ok((padded_cols, len))
}

#[derive(Debug)]
pub struct PaddedMatrix {
    data: AlignedBuffer,
    rows: usize,
    cols: usize,
    padded_cols: usize,
}

impl PaddedMatrix {
    /// Copy `x` row by row into a fresh aligned buffer
    pub fn from_features(x: &FeatureMatrix<'_>) -> MemoryResult<Self> {
        let cols = x.cols();
        let (padded_cols, len) = storage_len(x.rows(), cols)?;
        let mut data = AlignedBuffer::zeroed(len, PAD_ALIGNMENT)?;

        for (dst, src) in data.chunks_exact_mut(padded_cols.max(1)).zip(x.iter_rows()) {
            dst[..cols].copy_from_slice(src);
        }

        Ok(Self {
            data,
            rows: x.rows(),
            cols,
            padded_cols,
        })
    }

    /// Padded row `i`, 32-byte aligned
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.padded_cols..(i + 1) * self.padded_cols]
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn padded_cols(&self) -> usize {
        self.padded_cols
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}
