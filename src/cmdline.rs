//! Generic command-line runner for processing modules
//!
//! Builds a CLI from a module's description: every parameter becomes a flag
//! carrying its help text and default, every declared input and output
//! becomes a path option. The exit code reflects the single operation.

use std::fs;

use clap::{Arg, ArgAction, Command};

use crate::matrix::parse_matrix;
use crate::modules::{
    DataKind, DataObject, ModuleDescription, ParamKind, ParamValue, ParamValues,
    ProcessingModule,
};
use crate::nifti_io::{load_nifti, save_nifti, save_nifti_gz};

/// Parse arguments, run the module, save outputs
///
/// Returns the process exit code: 0 on success, 1 on any failure.
pub fn load_parse(module: &mut dyn ProcessingModule, args: &[String]) -> i32 {
    match run(module, args) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {}", e);
            1
        }
    }
}

fn run(module: &mut dyn ProcessingModule, args: &[String]) -> Result<(), String> {
    let desc = module.create_description();
    let matches = build_command(&desc).get_matches_from(args);

    let mut vals = ParamValues::new();
    for p in &desc.params {
        let value = match p.kind {
            ParamKind::Bool => ParamValue::Bool(matches.get_flag(p.name)),
            ParamKind::Int => match matches.get_one::<String>(p.name) {
                Some(s) => ParamValue::Int(
                    s.parse().map_err(|e| format!("invalid --{}: {}", p.name, e))?,
                ),
                None => p.default.clone(),
            },
            ParamKind::Float => match matches.get_one::<String>(p.name) {
                Some(s) => ParamValue::Float(
                    s.parse().map_err(|e| format!("invalid --{}: {}", p.name, e))?,
                ),
                None => p.default.clone(),
            },
            ParamKind::Str => match matches.get_one::<String>(p.name) {
                Some(s) => ParamValue::Str(s.clone()),
                None => p.default.clone(),
            },
        };
        vals.set(p.name, value);
    }

    for inp in &desc.inputs {
        if let Some(path) = matches.get_one::<String>(inp.name) {
            module.set_input(inp.name, load_data_object(inp.kind, path)?);
        }
    }

    if !module.direct_invoke_algorithm(&vals) {
        return Err(format!("{} failed", desc.name));
    }

    for out in &desc.outputs {
        let path = matches.get_one::<String>(out.name)
            .ok_or_else(|| format!("missing --{}", out.name))?;
        match module.take_output(out.name) {
            Some(DataObject::Image(v)) => {
                let bytes = if path.ends_with(".gz") {
                    save_nifti_gz(&v)?
                } else {
                    save_nifti(&v)?
                };
                fs::write(path, bytes)
                    .map_err(|e| format!("failed to write '{}': {}", path, e))?;
                println!("saved {}: {}", out.name, path);
            }
            Some(DataObject::Matrix(_)) => {
                return Err(format!("matrix output '{}' is not supported", out.name));
            }
            None => {
                return Err(format!("module produced no '{}' output", out.name));
            }
        }
    }

    Ok(())
}

fn build_command(desc: &ModuleDescription) -> Command {
    let mut cmd = Command::new(desc.name)
        .about(desc.description)
        .arg_required_else_help(true);

    for inp in &desc.inputs {
        cmd = cmd.arg(
            Arg::new(inp.name)
                .long(inp.name)
                .value_name("FILE")
                .help(inp.description)
                .required(inp.required),
        );
    }

    for out in &desc.outputs {
        cmd = cmd.arg(
            Arg::new(out.name)
                .long(out.name)
                .value_name("FILE")
                .help(out.description)
                .required(true),
        );
    }

    for p in &desc.params {
        let mut arg = Arg::new(p.name).long(p.name).help(p.description);
        arg = match p.kind {
            ParamKind::Bool => arg.action(ArgAction::SetTrue),
            _ => arg.value_name("VALUE"),
        };
        cmd = cmd.arg(arg);
    }

    cmd
}

fn load_data_object(kind: DataKind, path: &str) -> Result<DataObject, String> {
    match kind {
        DataKind::Image => {
            let bytes = fs::read(path)
                .map_err(|e| format!("failed to read '{}': {}", path, e))?;
            Ok(DataObject::Image(load_nifti(&bytes)?))
        }
        DataKind::Matrix => {
            let text = fs::read_to_string(path)
                .map_err(|e| format!("failed to read '{}': {}", path, e))?;
            Ok(DataObject::Matrix(parse_matrix(&text)?))
        }
    }
}
