//! Wavenumber filters for an unshifted 2-d FFT.
//!
//! In the unshifted layout the small wavenumbers sit in the corners and the
//! largest in the middle, so a low-pass filter zeroes a disc around the
//! array centre and keeps a band along the corners.

use ndarray::{Array2, ArrayView2, Zip};
use rustfft::num_complex::Complex64;

use crate::error::{ensure_square, AnalysisError, Result};
use crate::fft::ifft2;

/// Circular low-pass mask for a square array of the given shape.
///
/// Cells closer to the centre than `corner_distance - low_pass_index` are 0,
/// everything else is 1. An index at or beyond the corner distance keeps
/// every wavenumber.
pub fn build_filter(shape: (usize, usize), low_pass_index: f64) -> Result<Array2<f64>> {
    let (height, width) = shape;
    ensure_square(shape)?;
    if !(low_pass_index >= 0.0 && low_pass_index.is_finite()) {
        return Err(AnalysisError::InvalidFilterIndex(low_pass_index));
    }

    let center = ((height / 2) as f64, (width / 2) as f64);
    let largest_distance = (center.0 * center.0 + center.1 * center.1).sqrt();
    let radius = (largest_distance - low_pass_index).max(0.0);
    let squared_rad = radius * radius;
    tracing::debug!(height, radius, low_pass_index, "building low pass filter");

    let mut filter = Array2::<f64>::ones(shape);
    Zip::indexed(&mut filter).par_for_each(|(row, col), out| {
        let dr = row as f64 - center.0;
        let dc = col as f64 - center.1;
        if dr * dr + dc * dc < squared_rad {
            *out = 0.0;
        }
    });
    Ok(filter)
}

/// Rectangular mask keeping the outer `band` rows and columns.
///
/// A cruder first attempt at a low-pass filter: it keeps the small
/// wavenumbers along the edges but its corners are square.
pub fn build_edge_filter(shape: (usize, usize), band: usize) -> Array2<f64> {
    let (height, width) = shape;
    Array2::from_shape_fn(shape, |(row, col)| {
        let near_row_edge = row < band || row + band >= height;
        let near_col_edge = col < band || col + band >= width;
        if near_row_edge || near_col_edge {
            1.0
        } else {
            0.0
        }
    })
}

/// Multiply a transform by a mask of the same shape.
pub fn apply_filter(
    transform: ArrayView2<Complex64>,
    filter: ArrayView2<f64>,
) -> Result<Array2<Complex64>> {
    if transform.dim() != filter.dim() {
        return Err(AnalysisError::ShapeMismatch {
            expected: transform.dim(),
            found: filter.dim(),
        });
    }
    let mut out = transform.to_owned();
    Zip::from(&mut out)
        .and(filter)
        .par_for_each(|v, &f| *v *= f);
    Ok(out)
}

/// Filter a transform and return the real part of its inverse.
pub fn filtered_inverse(
    transform: ArrayView2<Complex64>,
    filter: ArrayView2<f64>,
) -> Result<Array2<f64>> {
    let filtered = apply_filter(transform, filter)?;
    Ok(ifft2(filtered.view()).mapv(|v| v.re))
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) mod python {
    use numpy::{Complex64, IntoPyArray, PyArray2, PyReadonlyArray2};
    use pyo3::prelude::*;

    use super::*;

    /// Circular low-pass filter of the given (square) shape.
    ///
    /// Raises ValueError for a non-square shape.
    #[pyfunction]
    #[pyo3(name = "build_filter")]
    pub fn build_filter_py(
        py: Python<'_>,
        shape: (usize, usize),
        low_pass_index: f64,
    ) -> PyResult<Py<PyArray2<f64>>> {
        let filter = py.allow_threads(|| build_filter(shape, low_pass_index))?;
        Ok(filter.into_pyarray(py).unbind())
    }

    /// Rectangular filter keeping the outer `band` rows and columns.
    #[pyfunction]
    #[pyo3(name = "build_edge_filter")]
    pub fn build_edge_filter_py(py: Python<'_>, shape: (usize, usize), band: usize) -> Py<PyArray2<f64>> {
        build_edge_filter(shape, band).into_pyarray(py).unbind()
    }

    #[pyfunction]
    #[pyo3(name = "apply_filter")]
    pub fn apply_filter_py<'py>(
        py: Python<'py>,
        fft_data: PyReadonlyArray2<'py, Complex64>,
        filter: PyReadonlyArray2<'py, f64>,
    ) -> PyResult<Bound<'py, PyArray2<Complex64>>> {
        Ok(apply_filter(fft_data.as_array(), filter.as_array())?.into_pyarray(py))
    }

    /// Real part of the inverse transform of `fft_data * filter`.
    #[pyfunction]
    #[pyo3(name = "filtered_inverse")]
    pub fn filtered_inverse_py<'py>(
        py: Python<'py>,
        fft_data: PyReadonlyArray2<'py, Complex64>,
        filter: PyReadonlyArray2<'py, f64>,
    ) -> PyResult<Bound<'py, PyArray2<f64>>> {
        Ok(filtered_inverse(fft_data.as_array(), filter.as_array())?.into_pyarray(py))
    }
}
