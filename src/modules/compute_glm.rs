//! The computeGLM processing module
//!
//! Validates and normalizes parameters (mask presence, task count) and
//! forwards the input handles to the GLM engine. Any engine failure is
//! collapsed into a single failed-invocation report: the caller learns only
//! that the operation failed.

use crate::glm::{clamp_task_count, compute_glm, GlmParams};
use crate::matrix::Matrix;
use crate::volume::Volume;

use super::{
    DataKind, DataObject, InputDescription, ModuleDescription, OutputDescription,
    ParamDescription, ParamKind, ParamValue, ParamValues, ProcessingModule,
};

/// Derive the engine configuration from the requested task count, the
/// regressor's column count, and mask presence
pub fn normalize_params(requested: i32, columns: usize, mask_present: bool) -> GlmParams {
    GlmParams {
        num_tasks: clamp_task_count(requested, columns),
        use_mask: mask_present,
    }
}

/// Per-voxel GLM beta-map computation over a 4D time-series
#[derive(Default)]
pub struct ComputeGlmModule {
    input: Option<Volume>,
    mask: Option<Volume>,
    regressor: Option<Matrix>,
    output: Option<Volume>,
}

impl ComputeGlmModule {
    pub fn new() -> Self {
        Self::default()
    }

    fn invoke(&mut self, vals: &ParamValues, debug: bool) -> Result<(), String> {
        let input = self.input.as_ref()
            .ok_or("missing required input 'input'")?;
        let regressor = self.regressor.as_ref()
            .ok_or("missing required input 'regressor'")?;

        let params = normalize_params(
            vals.get_int("numtasks", 0),
            regressor.cols,
            self.mask.is_some(),
        );

        if debug {
            println!(
                "invoking computeGLM: numtasks={} usemask={}",
                params.num_tasks, params.use_mask
            );
        }

        let mask_bits = self.mask.as_ref().map(|m| m.to_mask());
        let (nx, ny, nz, nt) = input.dims;

        let betas = compute_glm(
            &input.data,
            mask_bits.as_deref(),
            nx, ny, nz, nt,
            regressor,
            &params,
            debug,
        )?;

        self.output = Some(Volume::new(
            betas,
            (nx, ny, nz, params.num_tasks),
            input.voxel_size,
            input.affine,
        )?);

        Ok(())
    }
}

impl ProcessingModule for ComputeGlmModule {
    fn name(&self) -> &'static str {
        "computeGLM"
    }

    fn create_description(&self) -> ModuleDescription {
        ModuleDescription {
            name: "computeGLM",
            description: "Fit a General Linear Model at every voxel of a 4D \
                          time-series and produce per-task beta maps",
            params: vec![
                ParamDescription {
                    name: "numtasks",
                    description: "Number of task beta maps to output \
                                  (0 or out of range = all regressor columns)",
                    kind: ParamKind::Int,
                    default: ParamValue::Int(0),
                },
                ParamDescription {
                    name: "debug",
                    description: "Print diagnostic output during the fit",
                    kind: ParamKind::Bool,
                    default: ParamValue::Bool(false),
                },
            ],
            inputs: vec![
                InputDescription {
                    name: "input",
                    description: "The 4D fMRI time-series to fit",
                    kind: DataKind::Image,
                    required: true,
                },
                InputDescription {
                    name: "mask",
                    description: "Mask restricting the fit to a subset of voxels",
                    kind: DataKind::Image,
                    required: false,
                },
                InputDescription {
                    name: "regressor",
                    description: "Design matrix (rows = time points, columns = tasks)",
                    kind: DataKind::Matrix,
                    required: true,
                },
            ],
            outputs: vec![
                OutputDescription {
                    name: "output",
                    description: "Beta maps, one frame per task",
                    kind: DataKind::Image,
                },
            ],
        }
    }

    fn set_input(&mut self, name: &str, obj: DataObject) {
        match (name, obj) {
            ("input", DataObject::Image(v)) => self.input = Some(v),
            ("mask", DataObject::Image(v)) => self.mask = Some(v),
            ("regressor", DataObject::Matrix(m)) => self.regressor = Some(m),
            _ => {}
        }
    }

    fn take_output(&mut self, name: &str) -> Option<DataObject> {
        if name == "output" {
            self.output.take().map(DataObject::Image)
        } else {
            None
        }
    }

    fn direct_invoke_algorithm(&mut self, vals: &ParamValues) -> bool {
        self.output = None;
        let debug = vals.get_bool("debug", false);

        match self.invoke(vals, debug) {
            Ok(()) => true,
            Err(e) => {
                eprintln!("---- failed to invoke computeGLM: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::scaled_identity_affine;

    fn ramp_regressor(nt: usize) -> Matrix {
        let mut data = Vec::with_capacity(nt * 2);
        for t in 0..nt {
            data.push(1.0);
            data.push(t as f64);
        }
        Matrix::new(data, nt, 2).unwrap()
    }

    fn series_volume(nvox_dims: (usize, usize, usize), nt: usize) -> Volume {
        let (nx, ny, nz) = nvox_dims;
        let nvox = nx * ny * nz;
        let mut data = vec![0.0; nvox * nt];
        for t in 0..nt {
            for v in 0..nvox {
                data[v + t * nvox] = 2.0 + v as f64 * t as f64;
            }
        }
        Volume::new(data, (nx, ny, nz, nt), (1.0, 1.0, 1.0),
                    scaled_identity_affine(1.0, 1.0, 1.0)).unwrap()
    }

    #[test]
    fn test_usemask_tracks_mask_presence() {
        assert!(!normalize_params(0, 3, false).use_mask);
        assert!(normalize_params(0, 3, true).use_mask);
    }

    #[test]
    fn test_normalize_clamps_task_count() {
        assert_eq!(normalize_params(0, 3, false).num_tasks, 3);
        assert_eq!(normalize_params(7, 3, false).num_tasks, 3);
        assert_eq!(normalize_params(2, 3, false).num_tasks, 2);
    }

    #[test]
    fn test_invoke_stores_engine_output_verbatim() {
        let nt = 8;
        let input = series_volume((2, 2, 1), nt);
        let regressor = ramp_regressor(nt);

        // Run the engine directly with the same normalized parameters
        let params = normalize_params(0, regressor.cols, false);
        let expected = compute_glm(&input.data, None, 2, 2, 1, nt,
                                   &regressor, &params, false).unwrap();

        let mut module = ComputeGlmModule::new();
        module.set_input("input", DataObject::Image(input));
        module.set_input("regressor", DataObject::Matrix(regressor));

        let ok = module.direct_invoke_algorithm(&ParamValues::new());
        assert!(ok);

        let out = match module.take_output("output") {
            Some(DataObject::Image(v)) => v,
            _ => panic!("output slot should hold an image"),
        };
        assert_eq!(out.dims, (2, 2, 1, 2));
        assert_eq!(out.data, expected);
    }

    #[test]
    fn test_engine_failure_reports_false_and_no_output() {
        let input = series_volume((2, 2, 1), 8);
        let regressor = ramp_regressor(10); // wrong row count

        let mut module = ComputeGlmModule::new();
        module.set_input("input", DataObject::Image(input));
        module.set_input("regressor", DataObject::Matrix(regressor));

        let ok = module.direct_invoke_algorithm(&ParamValues::new());
        assert!(!ok);
        assert!(module.take_output("output").is_none());
    }

    #[test]
    fn test_missing_input_reports_false() {
        let mut module = ComputeGlmModule::new();
        module.set_input("regressor", DataObject::Matrix(ramp_regressor(8)));

        assert!(!module.direct_invoke_algorithm(&ParamValues::new()));
        assert!(module.take_output("output").is_none());
    }

    #[test]
    fn test_mask_input_restricts_fit() {
        let nt = 8;
        let input = series_volume((2, 1, 1), nt);
        let regressor = ramp_regressor(nt);

        // Mask out the second voxel
        let mask = Volume::new(vec![1.0, 0.0], (2, 1, 1, 1), (1.0, 1.0, 1.0),
                               scaled_identity_affine(1.0, 1.0, 1.0)).unwrap();

        let mut module = ComputeGlmModule::new();
        module.set_input("input", DataObject::Image(input));
        module.set_input("mask", DataObject::Image(mask));
        module.set_input("regressor", DataObject::Matrix(regressor));

        assert!(module.direct_invoke_algorithm(&ParamValues::new()));
        let out = match module.take_output("output") {
            Some(DataObject::Image(v)) => v,
            _ => panic!("output slot should hold an image"),
        };
        // Masked voxel has zero betas in every task map
        assert_eq!(out.data[1], 0.0);
        assert_eq!(out.data[3], 0.0);
        assert!((out.data[0] - 2.0).abs() < 1e-9);
    }
}
