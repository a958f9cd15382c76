use std::f64::consts::PI;

use a500algos::annular::{annular_avg, wavenumbers};
use a500algos::field::{load_npy_field, FieldSummary};
use a500algos::filter::{build_filter, filtered_inverse};
use a500algos::mixed_layer::{MixedLayerConfig, MixedLayerState};
use a500algos::spectrum::SpectralField;
use approx::{assert_abs_diff_eq, assert_relative_eq};
use ndarray::Array2;
use npyz::WriterBuilder;

const N: usize = 64;

fn mode(i: usize, j: usize, k: usize) -> f64 {
    let x = 2.0 * PI * (k * i) as f64 / N as f64;
    let y = 2.0 * PI * (k * j) as f64 / N as f64;
    x.cos() * y.cos()
}

#[test]
fn spectral_pipeline_removes_high_wavenumbers() {
    let low = Array2::from_shape_fn((N, N), |(i, j)| mode(i, j, 2));
    let field = Array2::from_shape_fn((N, N), |(i, j)| 3.0 + mode(i, j, 2) + mode(i, j, 16));

    let sf = SpectralField::from_field(field.view(), 0.025, "synthetic", "tau").unwrap();
    let original = annular_avg(sf.power_spectrum().view(), 1.0).unwrap();
    assert_eq!(original.avg_spec.len(), N / 2);
    assert!(original.avg_spec.iter().all(|v| v.is_finite() && *v >= 0.0));

    let knum = wavenumbers(&original.k_bins, sf.nyquist);
    assert_relative_eq!(knum[N / 2 - 1], sf.nyquist, epsilon = 1e-12);

    // (16, 16) sits well inside the zeroed disc, (2, 2) stays near the corners
    let filter = build_filter((N, N), 20.0).unwrap();
    let smoothed = filtered_inverse(sf.fft_data.view(), filter.view()).unwrap();
    for (a, b) in smoothed.iter().zip(low.iter()) {
        assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
    }

    let refiltered = SpectralField::from_field(smoothed.view(), 0.025, "smoothed", "tau").unwrap();
    let after = annular_avg(refiltered.power_spectrum().view(), 1.0).unwrap();
    for bin in [21, 22, 24] {
        assert!(original.avg_spec[bin] > 1.0);
        assert!(after.avg_spec[bin] < 1e-12 * original.avg_spec[bin]);
    }
    assert!(after.avg_spec.sum() < original.avg_spec.sum());
}

#[test]
fn default_mixed_layer_run_stays_physical() {
    let config = MixedLayerConfig::default();
    let run = config.run().unwrap();

    assert_eq!(run.len(), 1440);
    assert_eq!(run.theta[0], 288.0);
    assert_eq!(run.h[0], 400.0);
    assert_relative_eq!(run.time_days[1439], 1439.0 * 900.0 / 86400.0, epsilon = 1e-12);
    assert!(run.deltheta.iter().all(|&d| d > 0.0));
    assert!(run.theta.iter().all(|&t| t < config.coeffs.sst));
    assert!(run.h.iter().all(|&h| h > 0.0));

    let theta_end = run.theta[1439];
    let h_end = run.h[1439];
    assert!(theta_end > 309.0 && theta_end < 310.0, "theta = {theta_end}");
    assert!(h_end > 2500.0 && h_end < 3500.0, "h = {h_end}");
}

#[test]
fn warmer_start_gives_deeper_layer() {
    let base = MixedLayerConfig::default();
    let warm = MixedLayerConfig {
        initial: MixedLayerState::new(290.0, 400.0),
        t_final: 2.0 * 86400.0,
        ..base
    };
    let cold = MixedLayerConfig {
        t_final: 2.0 * 86400.0,
        ..base
    };
    let warm_run = warm.run().unwrap();
    let cold_run = cold.run().unwrap();
    let last = warm_run.len() - 1;
    // Weaker initial inversion entrains faster
    assert!(warm_run.h[last] > cold_run.h[last]);
    assert!(warm_run.theta[last] > cold_run.theta[last]);
}

#[test]
fn npy_loader_reads_npyz_output() {
    let field = Array2::from_shape_fn((4, 6), |(i, j)| (i * 6 + j) as f64 * 0.5 - 2.0);

    let mut bytes = Vec::new();
    {
        let mut writer = npyz::WriteOptions::<f64>::new()
            .default_dtype()
            .shape(&[4, 6])
            .writer(&mut bytes)
            .begin_nd()
            .unwrap();
        writer.extend(field.iter().copied()).unwrap();
        writer.finish().unwrap();
    }

    let path = std::env::temp_dir().join(format!("a500algos-field-{}.npy", std::process::id()));
    std::fs::write(&path, &bytes).unwrap();
    let loaded = load_npy_field(&path);
    std::fs::remove_file(&path).unwrap();
    let loaded = loaded.unwrap();
    assert_eq!(loaded, field);

    let summary = FieldSummary::of(loaded.view(), 4).unwrap();
    assert_eq!(summary.count, 24);
    assert_relative_eq!(summary.min, -2.0);
    assert_relative_eq!(summary.max, 9.5);
    assert_eq!(summary.counts.sum(), 24);
}
