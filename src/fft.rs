//! Two-dimensional discrete Fourier transforms on `ndarray` grids.
//!
//! Thin layer over `rustfft`: a 2-d transform is a pass of 1-d transforms
//! along the rows followed by a pass along the columns. The inverse is
//! normalised by `1 / (rows * cols)` so `ifft2(fft2(x)) == x`, matching numpy.

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use rustfft::num_complex::Complex64;
use rustfft::{FftDirection, FftPlanner};

/// Run 1-d transforms along every row of a standard-layout array.
fn transform_rows(data: &mut Array2<Complex64>, planner: &mut FftPlanner<f64>, direction: FftDirection) {
    let cols = data.ncols();
    let fft = planner.plan_fft(cols, direction);
    data.as_slice_mut()
        .expect("standard layout")
        .par_chunks_mut(cols)
        .for_each(|row| fft.process(row));
}

fn transform_2d(input: ArrayView2<Complex64>, direction: FftDirection) -> Array2<Complex64> {
    let (rows, cols) = input.dim();
    if rows == 0 || cols == 0 {
        return input.to_owned();
    }
    tracing::debug!(rows, cols, ?direction, "2-d fft");

    let mut planner = FftPlanner::<f64>::new();
    let mut data = input.as_standard_layout().into_owned();
    transform_rows(&mut data, &mut planner, direction);

    // Columns: transpose so each column is contiguous, transform, transpose back
    let mut transposed = data.t().as_standard_layout().into_owned();
    transform_rows(&mut transposed, &mut planner, direction);
    transposed.t().as_standard_layout().into_owned()
}

/// Forward 2-d FFT (unnormalised).
pub fn fft2(input: ArrayView2<Complex64>) -> Array2<Complex64> {
    transform_2d(input, FftDirection::Forward)
}

/// Forward 2-d FFT of a real field.
pub fn fft2_real(input: ArrayView2<f64>) -> Array2<Complex64> {
    let complex = input.mapv(|v| Complex64::new(v, 0.0));
    fft2(complex.view())
}

/// Inverse 2-d FFT, normalised by the number of elements.
pub fn ifft2(input: ArrayView2<Complex64>) -> Array2<Complex64> {
    let (rows, cols) = input.dim();
    let mut out = transform_2d(input, FftDirection::Inverse);
    if rows > 0 && cols > 0 {
        let norm = 1.0 / (rows * cols) as f64;
        out.par_mapv_inplace(|v| v * norm);
    }
    out
}

/// Move the zero-frequency term to the centre of the array.
///
/// Each axis is rolled by `n / 2`, so for odd sizes the result matches
/// `numpy.fft.fftshift` rather than a symmetric split.
pub fn fftshift<T: Clone>(input: ArrayView2<T>) -> Array2<T> {
    let (rows, cols) = input.dim();
    let (half_r, half_c) = (rows / 2, cols / 2);
    Array2::from_shape_fn((rows, cols), |(i, j)| {
        input[[(i + rows - half_r) % rows, (j + cols - half_c) % cols]].clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_fft2_of_constant_is_dc_only() {
        let field = Array2::from_elem((4, 4), 2.0);
        let spec = fft2_real(field.view());
        assert_abs_diff_eq!(spec[[0, 0]].re, 32.0, epsilon = 1e-12);
        for ((i, j), v) in spec.indexed_iter() {
            if (i, j) != (0, 0) {
                assert!(v.norm() < 1e-12, "non-zero at ({i}, {j}): {v}");
            }
        }
    }

    #[test]
    fn test_fft2_single_mode() {
        // cos(2 pi x / 4) along columns puts energy in column bins 1 and 3
        let field = Array2::from_shape_fn((4, 4), |(_, j)| {
            (2.0 * std::f64::consts::PI * j as f64 / 4.0).cos()
        });
        let spec = fft2_real(field.view());
        assert_abs_diff_eq!(spec[[0, 1]].re, 8.0, epsilon = 1e-10);
        assert_abs_diff_eq!(spec[[0, 3]].re, 8.0, epsilon = 1e-10);
        assert_abs_diff_eq!(spec[[1, 1]].norm(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_round_trip_rectangular() {
        let field = Array2::from_shape_fn((6, 5), |(i, j)| (i * 7 + j * 3) as f64 % 5.0 - 1.5);
        let back = ifft2(fft2_real(field.view()).view());
        for (a, b) in field.iter().zip(back.iter()) {
            assert_abs_diff_eq!(*a, b.re, epsilon = 1e-12);
            assert_abs_diff_eq!(b.im, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_fftshift_even_and_odd() {
        let even = array![[0, 1, 2, 3], [4, 5, 6, 7], [8, 9, 10, 11], [12, 13, 14, 15]];
        let shifted = fftshift(even.view());
        assert_eq!(shifted[[2, 2]], 0);
        assert_eq!(shifted.row(0).to_vec(), vec![10, 11, 8, 9]);

        // numpy: fftshift([0, 1, 2]) == [2, 0, 1]
        let odd = array![[0, 1, 2]];
        assert_eq!(fftshift(odd.view()).row(0).to_vec(), vec![2, 0, 1]);
        let odd_col = array![[0], [1], [2]];
        assert_eq!(fftshift(odd_col.view()).column(0).to_vec(), vec![2, 0, 1]);
    }
}
