//! Mixed-layer model with an interactive surface flux and subsidence.
//!
//! State is the layer potential temperature `theta` (K) and depth `h` (m).
//! The surface heat flux follows a bulk drag law against the sea surface,
//! the entrainment flux is a fixed fraction of it, and the inversion jump
//! `deltheta` is diagnosed from a linear free-troposphere profile.
//! Fluxes are kinematic (K m/s).

use ndarray::Array1;

use crate::error::{AnalysisError, Result};
use crate::integrator::{integrate, time_grid};

pub const SECONDS_PER_DAY: f64 = 86400.0;

/// Coefficients of the mixed-layer tendencies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixedLayerCoeffs {
    /// 10 m wind speed U (m/s)
    pub wind_speed: f64,
    /// Bulk transfer coefficient Cd
    pub drag_coeff: f64,
    /// Sea-surface temperature (K)
    pub sst: f64,
    /// Free-troposphere theta at the surface (K)
    pub intercept: f64,
    /// Free-troposphere lapse rate (K/m)
    pub gamma: f64,
    /// Large-scale divergence D (1/s)
    pub subsidence: f64,
    /// Ratio -F_int / F_0
    pub entrainment_ratio: f64,
}

impl Default for MixedLayerCoeffs {
    fn default() -> Self {
        Self {
            wind_speed: 7.0,
            drag_coeff: 1.0e-3,
            sst: 310.0,
            intercept: 292.0,
            gamma: 6.0e-3,
            subsidence: 5.0e-6,
            entrainment_ratio: 0.2,
        }
    }
}

impl MixedLayerCoeffs {
    /// Free-troposphere potential temperature at height `h`.
    #[inline]
    pub fn theta_ft(&self, h: f64) -> f64 {
        theta_ft(h, self.intercept, self.gamma)
    }
}

/// Linear free-troposphere profile `intercept + gamma * h`.
#[inline]
pub fn theta_ft(h: f64, intercept: f64, gamma: f64) -> f64 {
    intercept + h * gamma
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixedLayerState {
    pub theta: f64,
    pub h: f64,
}

impl MixedLayerState {
    pub fn new(theta: f64, h: f64) -> Self {
        Self { theta, h }
    }

    /// Inversion jump `theta_ft(h) - theta`.
    pub fn deltheta(&self, coeffs: &MixedLayerCoeffs) -> f64 {
        coeffs.theta_ft(self.h) - self.theta
    }
}

/// Diagnosed fluxes and velocities for one state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixedLayerFluxes {
    pub deltheta: f64,
    /// Surface flux F_0
    pub surface_flux: f64,
    /// Entrainment flux F_int at the layer top
    pub entrainment_flux: f64,
    /// Entrainment velocity w_e (m/s)
    pub went: f64,
    /// Subsidence velocity w_s at the layer top (m/s)
    pub wsubs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixedLayerTendency {
    /// K/s
    pub dtheta_dt: f64,
    /// m/s
    pub dh_dt: f64,
}

/// Fluxes for `state`. Fails when the inversion has vanished or the layer
/// has no depth, where the tendencies are undefined.
pub fn fluxes(state: &MixedLayerState, coeffs: &MixedLayerCoeffs) -> Result<MixedLayerFluxes> {
    if !(state.h > 0.0) {
        return Err(AnalysisError::NonPositiveHeight(state.h));
    }
    let theta_top = coeffs.theta_ft(state.h);
    let deltheta = theta_top - state.theta;
    if !(deltheta > 0.0 && deltheta.is_finite()) {
        return Err(AnalysisError::DegenerateInversion {
            theta: state.theta,
            theta_top,
        });
    }

    let surface_flux = coeffs.wind_speed * coeffs.drag_coeff * (coeffs.sst - state.theta);
    let entrainment_flux = -coeffs.entrainment_ratio * surface_flux;
    let went = -entrainment_flux / deltheta;
    let wsubs = -coeffs.subsidence * state.h;

    Ok(MixedLayerFluxes {
        deltheta,
        surface_flux,
        entrainment_flux,
        went,
        wsubs,
    })
}

/// Time derivative of (theta, h).
pub fn derivatives(state: &MixedLayerState, coeffs: &MixedLayerCoeffs) -> Result<MixedLayerTendency> {
    let f = fluxes(state, coeffs)?;
    Ok(MixedLayerTendency {
        dtheta_dt: (f.surface_flux - f.entrainment_flux) / state.h,
        dh_dt: f.went + f.wsubs,
    })
}

/// Integrated trajectory, one row per output time.
#[derive(Debug, Clone)]
pub struct MixedLayerRun {
    pub time_days: Array1<f64>,
    pub theta: Array1<f64>,
    pub h: Array1<f64>,
    pub deltheta: Array1<f64>,
}

impl MixedLayerRun {
    pub fn len(&self) -> usize {
        self.time_days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_days.is_empty()
    }
}

/// Integrate the model from `initial` over `times` (seconds).
pub fn run_mixed_layer(
    coeffs: &MixedLayerCoeffs,
    initial: MixedLayerState,
    times: &[f64],
    substeps: usize,
) -> Result<MixedLayerRun> {
    let output = integrate(
        |y: &[f64; 2], _t| {
            let d = derivatives(&MixedLayerState::new(y[0], y[1]), coeffs)?;
            Ok([d.dtheta_dt, d.dh_dt])
        },
        [initial.theta, initial.h],
        times,
        substeps,
    )?;

    let theta = output.column(0).to_owned();
    let h = output.column(1).to_owned();
    let deltheta = h.mapv(|hv| coeffs.theta_ft(hv)) - &theta;
    let time_days = times.iter().map(|t| t / SECONDS_PER_DAY).collect();

    if let (Some(th), Some(hh)) = (theta.last(), h.last()) {
        tracing::info!(steps = times.len(), theta = th, h = hh, "mixed layer run finished");
    }
    Ok(MixedLayerRun {
        time_days,
        theta,
        h,
        deltheta,
    })
}

/// Everything needed for one run, defaulting to the 15 day case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixedLayerConfig {
    pub coeffs: MixedLayerCoeffs,
    pub initial: MixedLayerState,
    /// Output interval (s)
    pub dt_out: f64,
    /// Run length (s)
    pub t_final: f64,
    /// RK4 steps per output interval
    pub substeps: usize,
}

impl Default for MixedLayerConfig {
    fn default() -> Self {
        Self {
            coeffs: MixedLayerCoeffs::default(),
            initial: MixedLayerState::new(288.0, 400.0),
            dt_out: 15.0 * 60.0,
            t_final: 15.0 * SECONDS_PER_DAY,
            substeps: 10,
        }
    }
}

impl MixedLayerConfig {
    pub fn run(&self) -> Result<MixedLayerRun> {
        let times = time_grid(self.dt_out, self.t_final)?;
        run_mixed_layer(&self.coeffs, self.initial, times.as_slice().unwrap_or_default(), self.substeps)
    }
}

// ── PyO3 wrappers ───────────────────────────────────────────────────────────

#[cfg(feature = "python")]
pub(crate) mod python {
    use numpy::{IntoPyArray, PyArray1, PyReadonlyArray1};
    use pyo3::prelude::*;

    use super::*;

    /// Mixed-layer coefficients; defaults reproduce the 15 day case.
    #[pyclass(name = "MixedLayerCoeffs")]
    #[derive(Clone)]
    pub struct PyMixedLayerCoeffs {
        #[pyo3(get, set)]
        pub wind_speed: f64,
        #[pyo3(get, set)]
        pub drag_coeff: f64,
        #[pyo3(get, set)]
        pub sst: f64,
        #[pyo3(get, set)]
        pub intercept: f64,
        #[pyo3(get, set)]
        pub gamma: f64,
        #[pyo3(get, set)]
        pub subsidence: f64,
        #[pyo3(get, set)]
        pub entrainment_ratio: f64,
    }

    #[pymethods]
    impl PyMixedLayerCoeffs {
        #[new]
        #[pyo3(signature = (
            wind_speed = 7.0,
            drag_coeff = 1.0e-3,
            sst = 310.0,
            intercept = 292.0,
            gamma = 6.0e-3,
            subsidence = 5.0e-6,
            entrainment_ratio = 0.2
        ))]
        pub fn new(
            wind_speed: f64,
            drag_coeff: f64,
            sst: f64,
            intercept: f64,
            gamma: f64,
            subsidence: f64,
            entrainment_ratio: f64,
        ) -> Self {
            Self {
                wind_speed,
                drag_coeff,
                sst,
                intercept,
                gamma,
                subsidence,
                entrainment_ratio,
            }
        }

        pub fn theta_ft(&self, h: f64) -> f64 {
            MixedLayerCoeffs::from(self).theta_ft(h)
        }
    }

    impl From<&PyMixedLayerCoeffs> for MixedLayerCoeffs {
        fn from(c: &PyMixedLayerCoeffs) -> Self {
            Self {
                wind_speed: c.wind_speed,
                drag_coeff: c.drag_coeff,
                sst: c.sst,
                intercept: c.intercept,
                gamma: c.gamma,
                subsidence: c.subsidence,
                entrainment_ratio: c.entrainment_ratio,
            }
        }
    }

    /// Result table of a mixed-layer run.
    #[pyclass(name = "MixedLayerRun")]
    pub struct PyMixedLayerRun {
        #[pyo3(get)]
        pub time: Py<PyArray1<f64>>,
        #[pyo3(get)]
        pub theta: Py<PyArray1<f64>>,
        #[pyo3(get)]
        pub h: Py<PyArray1<f64>>,
        #[pyo3(get)]
        pub deltheta: Py<PyArray1<f64>>,
    }

    /// Free-troposphere theta (K) at height h (m).
    #[pyfunction]
    #[pyo3(name = "theta_ft")]
    pub fn theta_ft_py(h: f64, intercept: f64, gamma: f64) -> f64 {
        theta_ft(h, intercept, gamma)
    }

    /// Tendencies (dtheta/dt, dh/dt) for one state.
    ///
    /// Raises ValueError where the inversion has vanished or h <= 0.
    #[pyfunction]
    pub fn dmixed_vars(theta: f64, h: f64, coeffs: &PyMixedLayerCoeffs) -> PyResult<(f64, f64)> {
        let d = derivatives(&MixedLayerState::new(theta, h), &coeffs.into())?;
        Ok((d.dtheta_dt, d.dh_dt))
    }

    /// Integrate from (theta0, h0) and sample at `times` (s).
    ///
    /// Returns:
    ///     MixedLayerRun with time in days, theta, h and deltheta columns.
    #[pyfunction]
    #[pyo3(name = "run_mixed_layer", signature = (coeffs, theta0, h0, times, substeps = 10))]
    pub fn run_mixed_layer_py(
        py: Python<'_>,
        coeffs: &PyMixedLayerCoeffs,
        theta0: f64,
        h0: f64,
        times: PyReadonlyArray1<f64>,
        substeps: usize,
    ) -> PyResult<PyMixedLayerRun> {
        let times = times.as_array().to_vec();
        let coeffs = MixedLayerCoeffs::from(coeffs);
        let run = py.allow_threads(|| {
            run_mixed_layer(&coeffs, MixedLayerState::new(theta0, h0), &times, substeps)
        })?;
        Ok(PyMixedLayerRun {
            time: run.time_days.into_pyarray(py).unbind(),
            theta: run.theta.into_pyarray(py).unbind(),
            h: run.h.into_pyarray(py).unbind(),
            deltheta: run.deltheta.into_pyarray(py).unbind(),
        })
    }

    /// Output times `0, dt_out, ...` below `t_final`, like `np.arange`.
    #[pyfunction]
    #[pyo3(name = "time_grid")]
    pub fn time_grid_py(py: Python<'_>, dt_out: f64, t_final: f64) -> PyResult<Py<PyArray1<f64>>> {
        Ok(time_grid(dt_out, t_final)?.into_pyarray(py).unbind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_theta_ft() {
        assert_relative_eq!(theta_ft(400.0, 292.0, 6.0e-3), 294.4, epsilon = 1e-12);
        let coeffs = MixedLayerCoeffs::default();
        assert_relative_eq!(coeffs.theta_ft(0.0), 292.0);
    }

    #[test]
    fn test_derivatives_at_initial_state() {
        let coeffs = MixedLayerCoeffs::default();
        let state = MixedLayerState::new(288.0, 400.0);
        let f = fluxes(&state, &coeffs).unwrap();
        assert_relative_eq!(f.deltheta, 6.4, epsilon = 1e-12);
        assert_relative_eq!(f.surface_flux, 0.154, epsilon = 1e-12);
        assert_relative_eq!(f.entrainment_flux, -0.0308, epsilon = 1e-12);
        assert_relative_eq!(f.went, 0.0308 / 6.4, epsilon = 1e-12);
        assert_relative_eq!(f.wsubs, -0.002, epsilon = 1e-12);

        let d = derivatives(&state, &coeffs).unwrap();
        assert_relative_eq!(d.dtheta_dt, 0.1848 / 400.0, epsilon = 1e-12);
        assert_relative_eq!(d.dh_dt, 0.0308 / 6.4 - 0.002, epsilon = 1e-12);
    }

    #[test]
    fn test_vanishing_inversion_is_rejected() {
        let coeffs = MixedLayerCoeffs::default();
        let h = 400.0;
        let state = MixedLayerState::new(coeffs.theta_ft(h), h);
        assert_eq!(state.deltheta(&coeffs), 0.0);
        assert!(matches!(
            derivatives(&state, &coeffs),
            Err(AnalysisError::DegenerateInversion { .. })
        ));

        let inverted = MixedLayerState::new(coeffs.theta_ft(h) + 1.0, h);
        assert!(derivatives(&inverted, &coeffs).is_err());
    }

    #[test]
    fn test_non_positive_height_is_rejected() {
        let coeffs = MixedLayerCoeffs::default();
        for h in [0.0, -10.0, f64::NAN] {
            assert!(matches!(
                derivatives(&MixedLayerState::new(280.0, h), &coeffs),
                Err(AnalysisError::NonPositiveHeight(_))
            ));
        }
    }

    #[test]
    fn test_no_surface_flux_means_pure_subsidence() {
        let coeffs = MixedLayerCoeffs::default();
        let state = MixedLayerState::new(coeffs.sst, 5000.0);
        let d = derivatives(&state, &coeffs).unwrap();
        assert_eq!(d.dtheta_dt, 0.0);
        assert_relative_eq!(d.dh_dt, -coeffs.subsidence * 5000.0);
    }

    #[test]
    fn test_short_run_table() {
        let coeffs = MixedLayerCoeffs::default();
        let times = [0.0, 900.0, 1800.0];
        let run = run_mixed_layer(&coeffs, MixedLayerState::new(288.0, 400.0), &times, 10).unwrap();
        assert_eq!(run.len(), 3);
        assert_eq!(run.theta[0], 288.0);
        assert_eq!(run.h[0], 400.0);
        assert_relative_eq!(run.deltheta[0], 6.4, epsilon = 1e-12);
        assert_relative_eq!(run.time_days[2], 1800.0 / 86400.0);
        assert!(run.theta[2] > run.theta[1] && run.h[2] > run.h[1]);
        for i in 0..run.len() {
            assert_relative_eq!(
                run.deltheta[i],
                coeffs.theta_ft(run.h[i]) - run.theta[i],
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_default_config_values() {
        let config = MixedLayerConfig::default();
        assert_eq!(config.dt_out, 900.0);
        assert_eq!(config.t_final, 1_296_000.0);
        assert_eq!(config.initial, MixedLayerState::new(288.0, 400.0));
    }
}
