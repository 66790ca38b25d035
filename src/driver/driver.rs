//! Pipeline orchestration: read the source file, compile it to linear IR,
//! then emit assembly, dump the IR, or interpret it.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use log::debug;
use thiserror::Error;

use crate::backend::riscv::RiscvCodegen;
use crate::common::error::CompileError;
use crate::compile_to_ir;
use crate::ir::interp::{Interpreter, RuntimeError};
use crate::ir::printer;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{0}")]
    Compile(#[from] CompileError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("{path}: {source}")]
    Io { path: String, source: io::Error },
}

/// Where the pipeline stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    /// Default: generate RISC-V assembly text.
    Assembly,
    /// --emit-ir: dump the linear IR.
    Ir,
    /// --run: interpret the program; its return value becomes the exit code.
    Run,
}

pub struct Driver {
    pub input: PathBuf,
    /// Output path for Assembly and Ir modes; standard output when absent.
    pub output: Option<PathBuf>,
    pub mode: EmitMode,
}

impl Driver {
    /// Run the pipeline to completion and return the process exit code.
    pub fn run(&self) -> Result<i32, DriverError> {
        let source = fs::read_to_string(&self.input).map_err(|source| DriverError::Io {
            path: self.input.display().to_string(),
            source,
        })?;
        debug!("read {} byte(s) from {}", source.len(), self.input.display());

        let program = compile_to_ir(&source)?;
        debug!(
            "lowered {} function(s), {} global word(s)",
            program.funcs.len(),
            program.global_len
        );

        match self.mode {
            EmitMode::Ir => {
                self.write_output(&printer::render(&program))?;
                Ok(0)
            }
            EmitMode::Assembly => {
                let assembly = RiscvCodegen::new().generate(&program);
                debug!("generated {} byte(s) of assembly", assembly.len());
                self.write_output(&assembly)?;
                Ok(0)
            }
            EmitMode::Run => {
                let stdin = io::stdin();
                let stdout = io::stdout();
                let result = Interpreter::new(&program, stdin.lock(), stdout.lock()).run()?;
                debug!("program returned {}", result);
                // Exit codes carry 8 bits.
                Ok(result & 0xff)
            }
        }
    }

    fn write_output(&self, text: &str) -> Result<(), DriverError> {
        match &self.output {
            Some(path) => fs::write(path, text).map_err(|source| DriverError::Io {
                path: path.display().to_string(),
                source,
            }),
            None => io::stdout().write_all(text.as_bytes()).map_err(|source| DriverError::Io {
                path: "<stdout>".to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_reports_the_path() {
        let driver = Driver {
            input: PathBuf::from("/no/such/file.sy"),
            output: None,
            mode: EmitMode::Assembly,
        };
        let error = driver.run().unwrap_err();
        assert!(error.to_string().contains("/no/such/file.sy"));
    }

    #[test]
    fn test_compile_error_keeps_phase_prefix() {
        let dir = std::env::temp_dir();
        let path = dir.join("sysyc_driver_test_bad.sy");
        fs::write(&path, "int main() { return x; }").unwrap();
        let driver = Driver { input: path.clone(), output: None, mode: EmitMode::Assembly };
        let error = driver.run().unwrap_err();
        assert!(error.to_string().starts_with("semantic error:"));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_assembly_written_to_file() {
        let dir = std::env::temp_dir();
        let input = dir.join("sysyc_driver_test_ok.sy");
        let output = dir.join("sysyc_driver_test_ok.s");
        fs::write(&input, "int main() { return 0; }").unwrap();
        let driver = Driver {
            input: input.clone(),
            output: Some(output.clone()),
            mode: EmitMode::Assembly,
        };
        assert_eq!(driver.run().unwrap(), 0);
        let assembly = fs::read_to_string(&output).unwrap();
        assert!(assembly.contains("main:"));
        fs::remove_file(input).ok();
        fs::remove_file(output).ok();
    }
}
