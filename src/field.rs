//! Loading of 2-d scalar fields and a quick look at their value distribution.
//!
//! The notebooks read `tau` from netCDF on the Python side and hand the array
//! straight to `SpectralField`; `.npy` files can be read here directly.

use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ShapeBuilder};
use ndarray_stats::{QuantileExt, SummaryStatisticsExt};
use rayon::prelude::*;

use crate::error::{AnalysisError, Result};

/// Read a 2-d `.npy` array of `f64` or `f32` values.
pub fn load_npy_field(path: &Path) -> Result<Array2<f64>> {
    let bytes = std::fs::read(path)?;
    let field = load_npy_bytes(&bytes)?;
    tracing::debug!(path = %path.display(), shape = ?field.dim(), "loaded npy field");
    Ok(field)
}

/// Parse an in-memory `.npy` buffer into a 2-d array.
pub fn load_npy_bytes(bytes: &[u8]) -> Result<Array2<f64>> {
    let npy = npyz::NpyFile::new(bytes)?;
    let shape = npy.shape().to_vec();
    let fortran = npy.order() == npyz::Order::Fortran;
    if shape.len() != 2 {
        return Err(AnalysisError::NotTwoDimensional(shape.len()));
    }

    let data: Vec<f64> = match npy.try_data::<f64>() {
        Ok(reader) => reader.collect::<std::io::Result<_>>()?,
        Err(npy) => {
            let descr = npy.dtype().descr();
            let reader = npy.try_data::<f32>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("unsupported npy dtype {descr}, expected f4 or f8"),
                )
            })?;
            reader
                .map(|v| v.map(f64::from))
                .collect::<std::io::Result<_>>()?
        }
    };

    let dims = (shape[0] as usize, shape[1] as usize);
    Ok(Array2::from_shape_vec(dims.set_f(fortran), data)?)
}

/// Mean, range and histogram of the finite values in a field.
#[derive(Debug, Clone)]
pub struct FieldSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// `counts.len() + 1` bin edges.
    pub edges: Array1<f64>,
    pub counts: Array1<usize>,
}

impl FieldSummary {
    /// Summarise `field` using `nbins` equal-width bins spanning its range.
    ///
    /// Non-finite values (masked pixels) are skipped. As in numpy, the last
    /// bin is closed and a constant field gets the range `value +/- 0.5`.
    pub fn of(field: ArrayView2<f64>, nbins: usize) -> Result<Self> {
        let finite: Vec<f64> = field.iter().copied().filter(|v| v.is_finite()).collect();
        let values = ArrayView1::from(finite.as_slice());
        let mean = SummaryStatisticsExt::mean(&values).map_err(|_| AnalysisError::EmptyField)?;
        let min = *values.min().map_err(|_| AnalysisError::EmptyField)?;
        let max = *values.max().map_err(|_| AnalysisError::EmptyField)?;

        let nbins = nbins.max(1);
        let (lo, hi) = if min == max { (min - 0.5, max + 0.5) } else { (min, max) };
        let width = (hi - lo) / nbins as f64;
        let edges = Array1::from_shape_fn(nbins + 1, |i| lo + width * i as f64);
        let counts = histogram_counts(&finite, lo, width, nbins);

        Ok(Self {
            count: finite.len(),
            mean,
            min,
            max,
            edges,
            counts: Array1::from(counts),
        })
    }
}

fn histogram_counts(values: &[f64], lo: f64, width: f64, nbins: usize) -> Vec<usize> {
    values
        .par_iter()
        .fold(
            || vec![0usize; nbins],
            |mut acc, &v| {
                let idx = (((v - lo) / width).floor() as usize).min(nbins - 1);
                acc[idx] += 1;
                acc
            },
        )
        .reduce(
            || vec![0usize; nbins],
            |mut a, b| {
                a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                a
            },
        )
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) mod python {
    use std::path::PathBuf;

    use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArray2};
    use pyo3::prelude::*;

    use super::*;

    /// Summary of the finite values of a field.
    #[pyclass(name = "FieldSummary")]
    pub struct PyFieldSummary {
        #[pyo3(get)]
        pub count: usize,
        #[pyo3(get)]
        pub mean: f64,
        #[pyo3(get)]
        pub min: f64,
        #[pyo3(get)]
        pub max: f64,
        #[pyo3(get)]
        pub edges: Py<PyArray1<f64>>,
        #[pyo3(get)]
        pub counts: Py<PyArray1<u64>>,
    }

    #[pyfunction]
    #[pyo3(name = "load_npy_field")]
    pub fn load_npy_field_py(py: Python<'_>, path: PathBuf) -> PyResult<Py<PyArray2<f64>>> {
        let field = py.allow_threads(|| load_npy_field(&path))?;
        Ok(field.into_pyarray(py).unbind())
    }

    /// Mean, range and `nbins`-bin histogram of a field, skipping NaNs.
    #[pyfunction]
    #[pyo3(name = "field_summary", signature = (field, nbins = 10))]
    pub fn field_summary_py(
        py: Python<'_>,
        field: PyReadonlyArray2<f64>,
        nbins: usize,
    ) -> PyResult<PyFieldSummary> {
        let summary = FieldSummary::of(field.as_array(), nbins)?;
        Ok(PyFieldSummary {
            count: summary.count,
            mean: summary.mean,
            min: summary.min,
            max: summary.max,
            edges: summary.edges.into_pyarray(py).unbind(),
            counts: summary.counts.mapv(|c| c as u64).into_pyarray(py).unbind(),
        })
    }
}
