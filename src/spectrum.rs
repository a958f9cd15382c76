//! Spectral view of a square 2-d field.
//!
//! `SpectralField` is built once from a loaded field: the mean is removed,
//! the forward transform is stored, and the wavenumber metadata the notebook
//! needs for plotting is derived from the pixel scale.

use ndarray::{Array1, Array2, ArrayView2, Zip};
use rustfft::num_complex::Complex64;

use crate::error::{ensure_square, AnalysisError, Result};
use crate::fft::{fft2_real, fftshift, ifft2};

/// Immutable field + transform + metadata.
#[derive(Debug, Clone)]
pub struct SpectralField {
    /// Short label for titles (file stem in the notebooks).
    pub name: String,
    /// Variable the field was read from, e.g. `tau`.
    pub var: String,
    /// Pixel size in km.
    pub scale_km: f64,
    /// Number of pixels along each side.
    pub xdim: usize,
    /// `xdim / 2`, the number of radial bins kept by the annular average.
    pub midpoint: usize,
    /// Half the sampling wavenumber, 1/km.
    pub nyquist: f64,
    /// `(i + 1 - midpoint) / (xdim * scale_km)` for `i < midpoint`, in 1/km.
    /// Runs from the most negative wavenumber up to 0.
    pub k_vals: Array1<f64>,
    /// Mean-removed field.
    pub data: Array2<f64>,
    /// Unshifted forward transform of `data`.
    pub fft_data: Array2<Complex64>,
}

impl SpectralField {
    /// Remove the mean from `field` and compute its 2-d transform.
    ///
    /// Fails for non-square or empty input and for a pixel scale that is not
    /// positive and finite.
    pub fn from_field(
        field: ArrayView2<f64>,
        scale_km: f64,
        name: impl Into<String>,
        var: impl Into<String>,
    ) -> Result<Self> {
        let xdim = ensure_square(field.dim())?;
        if !(scale_km > 0.0 && scale_km.is_finite()) {
            return Err(AnalysisError::InvalidScale(scale_km));
        }
        let mean = field.mean().ok_or(AnalysisError::EmptyField)?;
        let data = field.mapv(|v| v - mean);

        let delta_k = 1.0 / scale_km;
        let nyquist = delta_k * 0.5;
        let midpoint = xdim / 2;
        let k_vals = Array1::from_shape_fn(midpoint, |i| {
            ((i + 1) as f64 - midpoint as f64) / (xdim as f64 * scale_km)
        });

        let fft_data = fft2_real(data.view());
        tracing::debug!(xdim, scale_km, mean, "built spectral field");

        Ok(Self {
            name: name.into(),
            var: var.into(),
            scale_km,
            xdim,
            midpoint,
            nyquist,
            k_vals,
            data,
            fft_data,
        })
    }

    /// Centred power spectrum of the stored transform.
    pub fn power_spectrum(&self) -> Array2<f64> {
        power_spectrum(self.fft_data.view())
    }

    /// Inverse transform of the stored spectrum; recovers `data`.
    pub fn round_trip(&self) -> Array2<f64> {
        ifft2(self.fft_data.view()).mapv(|v| v.re)
    }
}

/// Spectral density with the zero wavenumber shifted to the centre.
///
/// `|F|^2 / (rows * cols)`, real part only.
pub fn power_spectrum(transform: ArrayView2<Complex64>) -> Array2<f64> {
    let (rows, cols) = transform.dim();
    let norm = (rows * cols) as f64;
    let shifted = fftshift(transform);
    let mut dens = Array2::<f64>::zeros((rows, cols));
    Zip::from(&mut dens)
        .and(&shifted)
        .par_for_each(|out, &f| *out = (f * f.conj()).re / norm);
    dens
}

/// Unshifted `|F|^2`, the quantity imaged when checking a filter.
pub fn fft_magnitude_squared(transform: ArrayView2<Complex64>) -> Array2<f64> {
    transform.mapv(|f| (f * f.conj()).re)
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) mod python {
    use numpy::{Complex64, IntoPyArray, PyArray1, PyArray2, PyReadonlyArray2};
    use pyo3::prelude::*;

    use super::*;

    /// Mean-removed square field with its 2-d FFT.
    ///
    /// Args:
    ///     data: square 2-d array (e.g. optical depth read from netCDF).
    ///     scale: pixel size in km.
    ///     name: label used in plot titles.
    ///     var: variable name the field was read from.
    #[pyclass(name = "SpectralField", frozen)]
    pub struct PySpectralField {
        inner: SpectralField,
    }

    #[pymethods]
    impl PySpectralField {
        #[new]
        #[pyo3(signature = (data, scale, name = String::new(), var = String::from("tau")))]
        pub fn new(
            py: Python<'_>,
            data: PyReadonlyArray2<f64>,
            scale: f64,
            name: String,
            var: String,
        ) -> PyResult<Self> {
            let field = data.as_array().to_owned();
            let inner = py.allow_threads(|| SpectralField::from_field(field.view(), scale, name, var))?;
            Ok(Self { inner })
        }

        #[getter]
        fn xdim(&self) -> usize {
            self.inner.xdim
        }

        #[getter]
        fn midpoint(&self) -> usize {
            self.inner.midpoint
        }

        #[getter]
        fn nyquist(&self) -> f64 {
            self.inner.nyquist
        }

        #[getter]
        fn scale(&self) -> f64 {
            self.inner.scale_km
        }

        #[getter]
        fn filename(&self) -> String {
            self.inner.name.clone()
        }

        #[getter]
        fn var(&self) -> String {
            self.inner.var.clone()
        }

        #[getter]
        fn k_vals<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
            self.inner.k_vals.clone().into_pyarray(py)
        }

        #[getter]
        fn data<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
            self.inner.data.clone().into_pyarray(py)
        }

        #[getter]
        fn fft_data<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<Complex64>> {
            self.inner.fft_data.clone().into_pyarray(py)
        }

        fn power_spectrum<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
            py.allow_threads(|| self.inner.power_spectrum()).into_pyarray(py)
        }

        fn round_trip<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
            py.allow_threads(|| self.inner.round_trip()).into_pyarray(py)
        }
    }

    /// Centred spectral density |F|^2 / N^2 of an unshifted transform.
    #[pyfunction]
    #[pyo3(name = "power_spectrum")]
    pub fn power_spectrum_py<'py>(
        py: Python<'py>,
        fft_data: PyReadonlyArray2<'py, Complex64>,
    ) -> Bound<'py, PyArray2<f64>> {
        power_spectrum(fft_data.as_array()).into_pyarray(py)
    }

    /// Unshifted |F|^2.
    #[pyfunction]
    #[pyo3(name = "fft_magnitude_squared")]
    pub fn fft_magnitude_squared_py<'py>(
        py: Python<'py>,
        fft_data: PyReadonlyArray2<'py, Complex64>,
    ) -> Bound<'py, PyArray2<f64>> {
        fft_magnitude_squared(fft_data.as_array()).into_pyarray(py)
    }

    #[pyfunction]
    pub fn fft2<'py>(py: Python<'py>, data: PyReadonlyArray2<'py, f64>) -> Bound<'py, PyArray2<Complex64>> {
        crate::fft::fft2_real(data.as_array()).into_pyarray(py)
    }

    #[pyfunction]
    pub fn ifft2<'py>(
        py: Python<'py>,
        fft_data: PyReadonlyArray2<'py, Complex64>,
    ) -> Bound<'py, PyArray2<Complex64>> {
        crate::fft::ifft2(fft_data.as_array()).into_pyarray(py)
    }
}
