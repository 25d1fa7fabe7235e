//! Borrowed views over caller-owned training and inference data

use crate::error::ForgeResult;
use crate::shape_error;

/// Row-major `[rows x cols]` view over `f32` samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureMatrix<'a> {
    data: &'a [f32],
    rows: usize,
    cols: usize,
}

impl<'a> FeatureMatrix<'a> {
    /// Wrap `data` as `rows` samples of `cols` features
    ///
    /// # Errors
    /// `InvalidShape` if `data.len() != rows * cols`.
    pub fn new(data: &'a [f32], rows: usize, cols: usize) -> ForgeResult<Self> {
        let expected = rows
            .checked_mul(cols)
            .ok_or_else(|| shape_error!("{} x {} overflows usize", rows, cols))?;
        if data.len() != expected {
            return Err(shape_error!(
                "{} x {} matrix needs {} values, got {}",
                rows,
                cols,
                expected,
                data.len()
            ));
        }
        Ok(Self { data, rows, cols })
    }

    /// Wrap `data` using an array shape, which must be 2-D
    pub fn from_shape(data: &'a [f32], shape: &[usize]) -> ForgeResult<Self> {
        match shape {
            &[rows, cols] => Self::new(data, rows, cols),
            _ => Err(shape_error!(
                "X must be 2-D (n_samples, n_features), got {} dimensions",
                shape.len()
            )),
        }
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
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Sample `i`
    ///
    /// # Panics
    /// If `i >= rows`.
    #[inline]
    pub fn row(&self, i: usize) -> &'a [f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &'a [f32]> {
        let view = *self;
        (0..self.rows).map(move |i| view.row(i))
    }
}

/// Validate a label array's shape, which must be 1-D and match `data`
pub fn labels_from_shape<'a>(data: &'a [i32], shape: &[usize]) -> ForgeResult<&'a [i32]> {
    match shape {
        &[n] if n == data.len() => Ok(data),
        &[n] => Err(shape_error!(
            "Y declares {} labels but holds {}",
            n,
            data.len()
        )),
        _ => Err(shape_error!(
            "Y must be 1-D (n_samples,), got {} dimensions",
            shape.len()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogForgeError;

    #[test]
    fn test_feature_matrix_rows() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let x = FeatureMatrix::new(&data, 3, 2).unwrap();
        assert_eq!(x.rows(), 3);
        assert_eq!(x.cols(), 2);
        assert_eq!(x.row(1), &[3.0, 4.0]);
        let rows: Vec<&[f32]> = x.iter_rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], &[5.0, 6.0]);
    }

    #[test]
    fn test_feature_matrix_length_mismatch() {
        let data = [1.0; 5];
        assert!(matches!(
            FeatureMatrix::new(&data, 2, 3),
            Err(LogForgeError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_from_shape_rejects_non_2d() {
        let data = [0.0; 6];
        assert!(FeatureMatrix::from_shape(&data, &[2, 3]).is_ok());
        assert!(FeatureMatrix::from_shape(&data, &[6]).is_err());
        assert!(FeatureMatrix::from_shape(&data, &[1, 2, 3]).is_err());
        assert!(FeatureMatrix::from_shape(&data, &[]).is_err());
    }

    #[test]
    fn test_empty_matrix() {
        let x = FeatureMatrix::new(&[], 0, 4).unwrap();
        assert!(x.is_empty());
        assert_eq!(x.iter_rows().count(), 0);
    }

    #[test]
    fn test_labels_from_shape() {
        let y = [0, 1, 1];
        assert_eq!(labels_from_shape(&y, &[3]).unwrap(), &y);
        assert!(labels_from_shape(&y, &[3, 1]).is_err());
        assert!(labels_from_shape(&y, &[4]).is_err());
    }
}
