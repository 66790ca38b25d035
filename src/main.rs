use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use sysyc::driver::{Driver, EmitMode};

/// Compiler for a SysY-flavoured C subset, targeting RISC-V.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Source file to compile
    input: PathBuf,

    /// Write output here instead of standard output
    #[arg(short)]
    output: Option<PathBuf>,

    /// Dump the linear IR instead of generating assembly
    #[arg(long, conflicts_with = "run")]
    emit_ir: bool,

    /// Interpret the program; its return value becomes the exit code
    #[arg(long)]
    run: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mode = if args.run {
        EmitMode::Run
    } else if args.emit_ir {
        EmitMode::Ir
    } else {
        EmitMode::Assembly
    };
    let driver = Driver { input: args.input, output: args.output, mode };

    match driver.run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(error) => {
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}
