//! Analysis kernels for the atmospheric-physics course notebooks.
//!
//! Two independent pipelines share this crate: the well-mixed boundary layer
//! model (`mixed_layer`, `integrator`) and the 2-d spectral analysis of
//! cloud fields (`field`, `fft`, `spectrum`, `annular`, `filter`). With the
//! `python` feature the same functions are exposed as the `a500algos`
//! extension module.

pub mod annular;
pub mod error;
pub mod fft;
pub mod field;
pub mod filter;
pub mod integrator;
pub mod mixed_layer;
pub mod spectrum;

pub use error::{AnalysisError, Result};

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn a500algos(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    py_module.add_function(wrap_pyfunction!(init_logging, py_module)?)?;

    // Register submodules
    register_mixed_layer_module(py_module)?;
    register_spectrum_module(py_module)?;
    register_annular_module(py_module)?;
    register_filter_module(py_module)?;
    register_field_module(py_module)?;

    py_module.add("__doc__", "Mixed-layer model and cloud field spectral analysis implemented in Rust.")?;

    Ok(())
}

/// Route `tracing` output to stderr.
///
/// `RUST_LOG` wins over `level` when it is set. Calling this twice is a no-op.
#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(signature = (level = "info"))]
fn init_logging(level: &str) -> PyResult<()> {
    use tracing_subscriber::EnvFilter;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| pyo3::exceptions::PyValueError::new_err(format!("bad log level {level:?}: {e}")))?,
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

#[cfg(feature = "python")]
fn register_mixed_layer_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    use mixed_layer::python as ml;

    let submodule = PyModule::new(py_module.py(), "mixed_layer")?;
    submodule.add("__doc__", "Well-mixed boundary layer model.")?;
    submodule.add("SECONDS_PER_DAY", mixed_layer::SECONDS_PER_DAY)?;
    submodule.add_class::<ml::PyMixedLayerCoeffs>()?;
    submodule.add_class::<ml::PyMixedLayerRun>()?;
    submodule.add_function(wrap_pyfunction!(ml::theta_ft_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(ml::dmixed_vars, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(ml::run_mixed_layer_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(ml::time_grid_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_spectrum_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    use spectrum::python as sp;

    let submodule = PyModule::new(py_module.py(), "spectrum")?;
    submodule.add("__doc__", "2-d FFT and power spectrum of square fields.")?;
    submodule.add_class::<sp::PySpectralField>()?;
    submodule.add_function(wrap_pyfunction!(sp::power_spectrum_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(sp::fft_magnitude_squared_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(sp::fft2, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(sp::ifft2, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_annular_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "annular")?;
    submodule.add("__doc__", "Radial averaging of 2-d power spectra.")?;
    submodule.add_function(wrap_pyfunction!(annular::python::annular_avg_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(annular::python::wavenumbers_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(annular::python::kolmogorov_line_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_filter_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "filter")?;
    submodule.add("__doc__", "Wavenumber filters for unshifted transforms.")?;
    submodule.add_function(wrap_pyfunction!(filter::python::build_filter_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(filter::python::build_edge_filter_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(filter::python::apply_filter_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(filter::python::filtered_inverse_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}

#[cfg(feature = "python")]
fn register_field_module(py_module: &Bound<'_, PyModule>) -> PyResult<()> {
    let submodule = PyModule::new(py_module.py(), "field")?;
    submodule.add("__doc__", "Loading and summarising 2-d fields.")?;
    submodule.add_class::<field::python::PyFieldSummary>()?;
    submodule.add_function(wrap_pyfunction!(field::python::load_npy_field_py, &submodule)?)?;
    submodule.add_function(wrap_pyfunction!(field::python::field_summary_py, &submodule)?)?;
    py_module.add_submodule(&submodule)?;
    Ok(())
}
