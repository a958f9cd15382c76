//! Fixed-step fourth-order Runge-Kutta integration onto an output time grid.

use ndarray::{Array1, Array2};

use crate::error::{AnalysisError, Result};

/// Output times `0, dt_out, 2 dt_out, ...` strictly below `t_final`.
pub fn time_grid(dt_out: f64, t_final: f64) -> Result<Array1<f64>> {
    if !(dt_out > 0.0 && dt_out.is_finite()) {
        return Err(AnalysisError::InvalidTimeGrid(format!(
            "output interval must be positive, got {dt_out}"
        )));
    }
    if !(t_final > 0.0 && t_final.is_finite()) {
        return Err(AnalysisError::InvalidTimeGrid(format!(
            "run length must be positive, got {t_final}"
        )));
    }
    let n = (t_final / dt_out).ceil() as usize;
    Ok(Array1::from_shape_fn(n, |i| i as f64 * dt_out))
}

fn rk4_step<const N: usize, F>(rhs: &mut F, y: &[f64; N], t: f64, h: f64) -> Result<[f64; N]>
where
    F: FnMut(&[f64; N], f64) -> Result<[f64; N]>,
{
    let axpy = |a: f64, x: &[f64; N]| -> [f64; N] {
        let mut out = *y;
        out.iter_mut().zip(x).for_each(|(o, &xi)| *o += a * xi);
        out
    };
    let k1 = rhs(y, t)?;
    let k2 = rhs(&axpy(0.5 * h, &k1), t + 0.5 * h)?;
    let k3 = rhs(&axpy(0.5 * h, &k2), t + 0.5 * h)?;
    let k4 = rhs(&axpy(h, &k3), t + h)?;

    let mut next = *y;
    for i in 0..N {
        next[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
    }
    Ok(next)
}

/// Integrate `dy/dt = rhs(y, t)` from `y0` at `times[0]` and record the
/// state at every entry of `times`.
///
/// Each output interval is split into `substeps` equal RK4 steps. The first
/// row of the result is `y0`. Any error from `rhs` stops the integration.
pub fn integrate<const N: usize, F>(
    mut rhs: F,
    y0: [f64; N],
    times: &[f64],
    substeps: usize,
) -> Result<Array2<f64>>
where
    F: FnMut(&[f64; N], f64) -> Result<[f64; N]>,
{
    if times.is_empty() {
        return Err(AnalysisError::InvalidTimeGrid("no output times".into()));
    }
    if substeps == 0 {
        return Err(AnalysisError::InvalidTimeGrid("substeps must be at least 1".into()));
    }
    if let Some(w) = times.windows(2).find(|w| !(w[1] > w[0])) {
        return Err(AnalysisError::InvalidTimeGrid(format!(
            "output times must increase strictly, found {} then {}",
            w[0], w[1]
        )));
    }

    let mut out = Array2::<f64>::zeros((times.len(), N));
    out.row_mut(0).iter_mut().zip(&y0).for_each(|(o, &v)| *o = v);

    let mut y = y0;
    for (row, w) in times.windows(2).enumerate() {
        let h = (w[1] - w[0]) / substeps as f64;
        let mut t = w[0];
        for _ in 0..substeps {
            y = rk4_step(&mut rhs, &y, t, h).inspect_err(|e| {
                tracing::warn!(t, error = %e, "integration stopped");
            })?;
            t += h;
        }
        out.row_mut(row + 1).iter_mut().zip(&y).for_each(|(o, &v)| *o = v);
    }
    tracing::debug!(steps = times.len(), substeps, "integration finished");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_time_grid_matches_arange() {
        let grid = time_grid(900.0, 3600.0).unwrap();
        assert_eq!(grid.to_vec(), vec![0.0, 900.0, 1800.0, 2700.0]);
        let grid = time_grid(1.5, 4.0).unwrap();
        assert_eq!(grid.to_vec(), vec![0.0, 1.5, 3.0]);
        assert!(time_grid(0.0, 10.0).is_err());
        assert!(time_grid(1.0, -10.0).is_err());
    }

    #[test]
    fn test_exponential_decay() {
        let times: Vec<f64> = (0..=10).map(|i| i as f64 * 0.1).collect();
        let out = integrate(|y: &[f64; 1], _t| Ok([-2.0 * y[0]]), [1.0], &times, 10).unwrap();
        assert_eq!(out.dim(), (11, 1));
        assert_eq!(out[[0, 0]], 1.0);
        for (i, &t) in times.iter().enumerate() {
            assert_relative_eq!(out[[i, 0]], (-2.0 * t).exp(), max_relative = 1e-7);
        }
    }

    #[test]
    fn test_harmonic_oscillator_two_components() {
        let times: Vec<f64> = (0..=20).map(|i| i as f64 * std::f64::consts::PI / 10.0).collect();
        let out = integrate(|y: &[f64; 2], _t| Ok([y[1], -y[0]]), [1.0, 0.0], &times, 50).unwrap();
        let last = times.len() - 1;
        // Two full periods: back to the start
        assert_relative_eq!(out[[last, 0]], 1.0, epsilon = 1e-8);
        assert!(out[[last, 1]].abs() < 1e-8);
    }

    #[test]
    fn test_time_dependent_rhs() {
        let times = [0.0, 1.0, 2.0];
        let out = integrate(|_y: &[f64; 1], t| Ok([2.0 * t]), [0.0], &times, 1).unwrap();
        // A tendency linear in t is integrated exactly
        assert_relative_eq!(out[[2, 0]], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bad_grids() {
        let rhs = |y: &[f64; 1], _t: f64| -> Result<[f64; 1]> { Ok([y[0]]) };
        assert!(integrate(rhs, [1.0], &[], 1).is_err());
        assert!(integrate(rhs, [1.0], &[0.0, 1.0], 0).is_err());
        assert!(matches!(
            integrate(rhs, [1.0], &[0.0, 1.0, 1.0], 1),
            Err(AnalysisError::InvalidTimeGrid(_))
        ));
    }

    #[test]
    fn test_rhs_error_propagates() {
        let out = integrate(
            |_y: &[f64; 1], t| {
                if t > 0.5 {
                    Err(AnalysisError::NonPositiveHeight(0.0))
                } else {
                    Ok([1.0])
                }
            },
            [0.0],
            &[0.0, 1.0],
            4,
        );
        assert!(matches!(out, Err(AnalysisError::NonPositiveHeight(_))));
    }
}
