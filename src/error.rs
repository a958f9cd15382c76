//! Error type shared by every kernel in the crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("expecting square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("field contains no values")]
    EmptyField,

    #[error("expected a 2-d array, got {0} dimensions")]
    NotTwoDimensional(usize),

    #[error("shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("bin width must be positive and finite, got {0}")]
    InvalidBinWidth(f64),

    #[error("bin width {avg_binwidth} is too small for a {xdim}x{xdim} field")]
    BinWidthTooSmall { avg_binwidth: f64, xdim: usize },

    #[error("pixel scale must be positive and finite, got {0} km")]
    InvalidScale(f64),

    #[error("radial bin {bin} is outside the {numbins} allocated bins")]
    BinOutOfRange { bin: usize, numbins: usize },

    #[error("low pass index must be non-negative and finite, got {0}")]
    InvalidFilterIndex(f64),

    #[error("inversion strength is not positive: theta = {theta} K, theta_top = {theta_top} K")]
    DegenerateInversion { theta: f64, theta_top: f64 },

    #[error("mixed layer height must be positive, got {0} m")]
    NonPositiveHeight(f64),

    #[error("invalid time grid: {0}")]
    InvalidTimeGrid(String),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(feature = "python")]
impl From<AnalysisError> for pyo3::PyErr {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Io(e) => pyo3::exceptions::PyOSError::new_err(e.to_string()),
            other => pyo3::exceptions::PyValueError::new_err(other.to_string()),
        }
    }
}

/// Fail unless `dim` describes a square array.
pub(crate) fn ensure_square(dim: (usize, usize)) -> Result<usize> {
    let (rows, cols) = dim;
    if rows != cols {
        return Err(AnalysisError::NotSquare { rows, cols });
    }
    Ok(rows)
}
