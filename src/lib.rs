//! GLM-WASM: WebAssembly-accelerated General Linear Model fitting
//!
//! This crate fits per-voxel General Linear Models over 4D fMRI time-series
//! data, compiled to WebAssembly for browser-based medical image processing.
//!
//! # Modules
//! - `glm`: Per-voxel GLM fitting and residualization
//! - `solvers`: Dense Cholesky solver for the normal equations
//! - `matrix`: Regressor matrix type and plain-text parsing
//! - `volume`: Image volume handles
//! - `nifti_io`: NIfTI load/save from byte arrays
//! - `modules`: Processing-module framework (self-describing, invokable)
//! - `cmdline`: Generic command-line runner (native targets)

pub mod glm;
pub mod matrix;
pub mod solvers;
pub mod volume;

// I/O modules
pub mod nifti_io;

// Framework layer
pub mod modules;

#[cfg(not(target_arch = "wasm32"))]
pub mod cmdline;

use wasm_bindgen::prelude::*;

use crate::glm::{clamp_task_count, GlmParams};
use crate::matrix::Matrix;
use crate::volume::Volume;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

#[allow(unused_macros)]
macro_rules! console_log {
    ($($t:tt)*) => (log(&format_args!($($t)*).to_string()))
}

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// ============================================================================
// WASM Exports: GLM
// ============================================================================

/// WASM-accessible per-voxel GLM fit
///
/// # Arguments
/// * `input` - 4D time-series (nx * ny * nz * nt, Fortran order)
/// * `mask` - Uint8Array mask (nx * ny * nz), 1 = fit, 0 = skip; empty = no mask
/// * `nx`, `ny`, `nz`, `nt` - Input dimensions
/// * `regressor` - Design matrix, row-major (rows * cols)
/// * `rows`, `cols` - Design matrix shape (rows = time points)
/// * `numtasks` - Requested task count; values outside [1, cols) fall back to cols
/// * `debug` - Emit fit diagnostics
///
/// # Returns
/// Beta maps as Float64Array (nx * ny * nz * effective task count)
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn compute_glm_wasm(
    input: &[f64],
    mask: &[u8],
    nx: usize, ny: usize, nz: usize, nt: usize,
    regressor: &[f64],
    rows: usize, cols: usize,
    numtasks: i32,
    debug: bool,
) -> Result<Vec<f64>, JsValue> {
    console_log!("WASM computeGLM: {}x{}x{}x{}, regressor {}x{}, numtasks={}",
                 nx, ny, nz, nt, rows, cols, numtasks);

    let regressor = Matrix::new(regressor.to_vec(), rows, cols)
        .map_err(|e| JsValue::from_str(&e))?;

    let mask_opt = if mask.is_empty() { None } else { Some(mask) };
    let params = GlmParams {
        num_tasks: clamp_task_count(numtasks, cols),
        use_mask: mask_opt.is_some(),
    };

    let betas = glm::compute_glm(input, mask_opt, nx, ny, nz, nt, &regressor, &params, debug)
        .map_err(|e| JsValue::from_str(&e))?;

    console_log!("WASM computeGLM complete: {} task maps", params.num_tasks);
    Ok(betas)
}

/// WASM-accessible residualization (regress the design matrix out)
///
/// Same argument layout as `compute_glm_wasm` without the task count.
/// Returns the residual time-series with the shape of the input; voxels
/// outside the mask pass through unchanged.
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn regress_out_wasm(
    input: &[f64],
    mask: &[u8],
    nx: usize, ny: usize, nz: usize, nt: usize,
    regressor: &[f64],
    rows: usize, cols: usize,
    debug: bool,
) -> Result<Vec<f64>, JsValue> {
    console_log!("WASM regressOut: {}x{}x{}x{}, regressor {}x{}",
                 nx, ny, nz, nt, rows, cols);

    let regressor = Matrix::new(regressor.to_vec(), rows, cols)
        .map_err(|e| JsValue::from_str(&e))?;

    let mask_opt = if mask.is_empty() { None } else { Some(mask) };

    let residual = glm::regress_out(input, mask_opt, nx, ny, nz, nt, &regressor, debug)
        .map_err(|e| JsValue::from_str(&e))?;

    console_log!("WASM regressOut complete");
    Ok(residual)
}

// ============================================================================
// WASM Exports: NIfTI I/O
// ============================================================================

/// Load a NIfTI file (3D or 4D) from bytes
///
/// Returns a JS object with: data (Float64Array), dims (array of 4),
/// voxelSize (array), affine (array)
#[wasm_bindgen]
pub fn load_nifti_wasm(bytes: &[u8]) -> Result<js_sys::Object, JsValue> {
    let volume = nifti_io::load_nifti(bytes)
        .map_err(|e| JsValue::from_str(&e))?;

    let (nx, ny, nz, nt) = volume.dims;
    console_log!("WASM load_nifti: {}x{}x{}x{}, voxel=({:.2},{:.2},{:.2})",
                 nx, ny, nz, nt,
                 volume.voxel_size.0, volume.voxel_size.1, volume.voxel_size.2);

    let result = js_sys::Object::new();

    let data = js_sys::Float64Array::from(volume.data.as_slice());
    js_sys::Reflect::set(&result, &"data".into(), &data)?;

    let dims = js_sys::Array::new();
    dims.push(&JsValue::from(nx as u32));
    dims.push(&JsValue::from(ny as u32));
    dims.push(&JsValue::from(nz as u32));
    dims.push(&JsValue::from(nt as u32));
    js_sys::Reflect::set(&result, &"dims".into(), &dims)?;

    let voxel_size = js_sys::Array::new();
    voxel_size.push(&JsValue::from(volume.voxel_size.0));
    voxel_size.push(&JsValue::from(volume.voxel_size.1));
    voxel_size.push(&JsValue::from(volume.voxel_size.2));
    js_sys::Reflect::set(&result, &"voxelSize".into(), &voxel_size)?;

    let affine = js_sys::Float64Array::from(volume.affine.as_slice());
    js_sys::Reflect::set(&result, &"affine".into(), &affine)?;

    Ok(result)
}

/// Save data as NIfTI bytes
///
/// # Arguments
/// * `data` - Volume data as Float64Array (nx * ny * nz * nt)
/// * `nx`, `ny`, `nz`, `nt` - Dimensions (nt = 1 for 3D)
/// * `vsx`, `vsy`, `vsz` - Voxel sizes in mm
/// * `affine` - 4x4 affine matrix (16 elements, row-major)
///
/// # Returns
/// NIfTI file as Uint8Array
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn save_nifti_wasm(
    data: &[f64],
    nx: usize, ny: usize, nz: usize, nt: usize,
    vsx: f64, vsy: f64, vsz: f64,
    affine: &[f64],
) -> Result<Vec<u8>, JsValue> {
    let volume = volume_from_parts(data, nx, ny, nz, nt, vsx, vsy, vsz, affine)?;

    let bytes = nifti_io::save_nifti(&volume)
        .map_err(|e| JsValue::from_str(&e))?;

    console_log!("WASM save_nifti: {}x{}x{}x{}, {} bytes", nx, ny, nz, nt, bytes.len());
    Ok(bytes)
}

/// Save data as gzipped NIfTI bytes (.nii.gz)
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn save_nifti_gz_wasm(
    data: &[f64],
    nx: usize, ny: usize, nz: usize, nt: usize,
    vsx: f64, vsy: f64, vsz: f64,
    affine: &[f64],
) -> Result<Vec<u8>, JsValue> {
    let volume = volume_from_parts(data, nx, ny, nz, nt, vsx, vsy, vsz, affine)?;

    let bytes = nifti_io::save_nifti_gz(&volume)
        .map_err(|e| JsValue::from_str(&e))?;

    console_log!("WASM save_nifti_gz: {}x{}x{}x{}, {} bytes (compressed)",
                 nx, ny, nz, nt, bytes.len());
    Ok(bytes)
}

#[allow(clippy::too_many_arguments)]
fn volume_from_parts(
    data: &[f64],
    nx: usize, ny: usize, nz: usize, nt: usize,
    vsx: f64, vsy: f64, vsz: f64,
    affine: &[f64],
) -> Result<Volume, JsValue> {
    if affine.len() != 16 {
        return Err(JsValue::from_str("Affine matrix must have 16 elements"));
    }
    let mut affine_arr = [0.0f64; 16];
    affine_arr.copy_from_slice(affine);

    Volume::new(data.to_vec(), (nx, ny, nz, nt), (vsx, vsy, vsz), affine_arr)
        .map_err(|e| JsValue::from_str(&e))
}

// ============================================================================
// WASM Exports: Utilities
// ============================================================================

/// Check if WASM module is loaded and working
#[wasm_bindgen]
pub fn wasm_health_check() -> bool {
    console_log!("GLM-WASM module loaded successfully!");
    true
}

/// Get version string
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// ============================================================================
// Tests
// ============================================================================
