//! Annular averaging of a 2-d power spectrum.
//!
//! The spectrum E(kx, ky) is integrated around rings of constant radius
//! about the array centre and averaged into 1-d radial bins, giving E(k).
//! Rows are accumulated in parallel; binning is a plain sum so the order in
//! which partial results are reduced does not matter beyond rounding.

use std::f64::consts::{PI, SQRT_2};

use ndarray::{Array1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::error::{ensure_square, AnalysisError, Result};

/// Where the radius of a cell is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RadialOrigin {
    /// `r = |(i + 1, j + 1) - N/2|`, as the reference notebooks compute it.
    #[default]
    OneBased,
    /// `r = |(i, j) - N/2|`, centred exactly on the fftshift zero-frequency cell.
    ZeroBased,
}

impl RadialOrigin {
    #[inline]
    fn offset(self) -> f64 {
        match self {
            RadialOrigin::OneBased => 1.0,
            RadialOrigin::ZeroBased => 0.0,
        }
    }
}

/// 1-d radial spectrum.
#[derive(Debug, Clone)]
pub struct AnnularSpectrum {
    /// Bin numbers `1..=midpoint`.
    pub k_bins: Array1<f64>,
    /// Averaged power in each bin.
    pub avg_spec: Array1<f64>,
}

/// Per-bin running sums of `r * E` and cell counts.
struct BinAccumulator {
    sums: Vec<f64>,
    counts: Vec<u64>,
}

impl BinAccumulator {
    fn new(numbins: usize) -> Self {
        Self {
            sums: vec![0.0; numbins],
            counts: vec![0; numbins],
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.sums.iter_mut().zip(other.sums).for_each(|(a, b)| *a += b);
        self.counts.iter_mut().zip(other.counts).for_each(|(a, b)| *a += b);
        self
    }
}

/// Number of bins needed to cover the centre-to-corner radius.
///
/// Fails when the width would ask for more bins than the field has cells.
pub fn bin_count(xdim: usize, avg_binwidth: f64) -> Result<usize> {
    let too_small = AnalysisError::BinWidthTooSmall { avg_binwidth, xdim };
    let bins = (SQRT_2 * xdim as f64 / avg_binwidth).round();
    let cells = xdim.saturating_mul(xdim);
    if !(bins.is_finite() && bins <= cells as f64) {
        return Err(too_small);
    }
    (bins as usize).checked_add(1).ok_or(too_small)
}

/// Annular average with the default one-based radius convention.
pub fn annular_avg(spectral_dens: ArrayView2<f64>, avg_binwidth: f64) -> Result<AnnularSpectrum> {
    annular_avg_with(spectral_dens, avg_binwidth, RadialOrigin::default())
}

/// Integrate `spectral_dens` around rings of width `avg_binwidth` pixels.
///
/// Each bin holds `sum(r * E) * w / count / (4 pi^2)`; only the first
/// `floor(N / 2)` bins are returned. A cell whose radius falls past the last
/// allocated bin is reported as `BinOutOfRange`.
pub fn annular_avg_with(
    spectral_dens: ArrayView2<f64>,
    avg_binwidth: f64,
    origin: RadialOrigin,
) -> Result<AnnularSpectrum> {
    let xdim = ensure_square(spectral_dens.dim())?;
    if !(avg_binwidth > 0.0 && avg_binwidth.is_finite()) {
        return Err(AnalysisError::InvalidBinWidth(avg_binwidth));
    }
    let midpoint = xdim / 2;
    let numbins = bin_count(xdim, avg_binwidth)?;
    let half = xdim as f64 / 2.0;
    let offset = origin.offset();

    tracing::debug!(xdim, numbins, avg_binwidth, ?origin, "integrating annular average");

    let acc = spectral_dens
        .axis_iter(Axis(0))
        .into_par_iter()
        .enumerate()
        .try_fold(
            || BinAccumulator::new(numbins),
            |mut acc, (i, row)| {
                let di = i as f64 + offset - half;
                for (j, &value) in row.iter().enumerate() {
                    let dj = j as f64 + offset - half;
                    let kradial = (di * di + dj * dj).sqrt();
                    let bin = (kradial / avg_binwidth).floor() as usize;
                    if bin >= numbins {
                        return Err(AnalysisError::BinOutOfRange { bin, numbins });
                    }
                    acc.sums[bin] += kradial * value;
                    acc.counts[bin] += 1;
                }
                Ok(acc)
            },
        )
        .try_reduce(|| BinAccumulator::new(numbins), |a, b| Ok(a.merge(b)))?;

    let norm = avg_binwidth / (4.0 * PI * PI);
    let avg_spec: Array1<f64> = acc
        .sums
        .iter()
        .zip(&acc.counts)
        .take(midpoint)
        .map(|(&sum, &count)| {
            if count > 0 {
                sum * norm / count as f64
            } else {
                0.0
            }
        })
        .collect();
    let k_bins = Array1::from_shape_fn(midpoint, |i| (i + 1) as f64);

    Ok(AnnularSpectrum { k_bins, avg_spec })
}

/// Convert bin numbers to dimensional wavenumbers (1/km).
///
/// The last bin maps to the Nyquist wavenumber.
pub fn wavenumbers(k_bins: &Array1<f64>, nyquist: f64) -> Array1<f64> {
    let n = k_bins.len() as f64;
    k_bins.mapv(|k| k * nyquist / n)
}

/// Reference power law `offset * k^slope`, -5/3 for Kolmogorov turbulence.
pub fn kolmogorov_line(knum: &Array1<f64>, slope: f64, offset: f64) -> Array1<f64> {
    knum.mapv(|k| offset * k.powf(slope))
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) mod python {
    use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1, PyReadonlyArray2};
    use pyo3::prelude::*;

    use super::*;

    /// Integrate the 2-d power spectrum around rings and average into 1-d bins.
    ///
    /// Args:
    ///     spectral_dens: square 2-d power spectrum, zero wavenumber centred.
    ///     avg_binwidth: width of the radial bins in pixels.
    ///     zero_based: measure radii from the centre cell instead of the
    ///         one-based offset of the reference notebooks.
    ///
    /// Returns:
    ///     (k_bins, avg_spec), each of length N // 2.
    #[pyfunction]
    #[pyo3(name = "annular_avg", signature = (spectral_dens, avg_binwidth, zero_based = false))]
    pub fn annular_avg_py<'py>(
        py: Python<'py>,
        spectral_dens: PyReadonlyArray2<'py, f64>,
        avg_binwidth: f64,
        zero_based: bool,
    ) -> PyResult<(Bound<'py, PyArray1<f64>>, Bound<'py, PyArray1<f64>>)> {
        let origin = if zero_based {
            RadialOrigin::ZeroBased
        } else {
            RadialOrigin::OneBased
        };
        let view = spectral_dens.as_array();
        let out = annular_avg_with(view, avg_binwidth, origin)?;
        Ok((out.k_bins.into_pyarray(py), out.avg_spec.into_pyarray(py)))
    }

    /// Bin numbers to wavenumbers (1/km), last bin at the Nyquist wavenumber.
    #[pyfunction]
    #[pyo3(name = "wavenumbers")]
    pub fn wavenumbers_py<'py>(
        py: Python<'py>,
        k_bins: PyReadonlyArray1<'py, f64>,
        nyquist: f64,
    ) -> Bound<'py, PyArray1<f64>> {
        wavenumbers(&k_bins.as_array().to_owned(), nyquist).into_pyarray(py)
    }

    /// `offset * knum ** slope` for comparison with the measured spectrum.
    #[pyfunction]
    #[pyo3(name = "kolmogorov_line", signature = (knum, slope = -5.0 / 3.0, offset = 1.0))]
    pub fn kolmogorov_line_py<'py>(
        py: Python<'py>,
        knum: PyReadonlyArray1<'py, f64>,
        slope: f64,
        offset: f64,
    ) -> Bound<'py, PyArray1<f64>> {
        kolmogorov_line(&knum.as_array().to_owned(), slope, offset).into_pyarray(py)
    }
}
