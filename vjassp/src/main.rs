use anyhow::{Context, Result};
use clap::Parser;
use indexmap::IndexSet;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use vjassp_emit::generate;
use vjassp_lower::lower;
use vjassp_package::load_units;
use vjassp_syntax::{ErrorManager, ErrorReporter, FileManager};

const DEFAULT_ENTRY: &str = "main.jp";
const TARGET_EXTENSION: &str = "j";

#[derive(Parser, Debug)]
#[command(version, about = "Compiles vJASS+ (.jp) sources into vJASS (.j)")]
struct CliArgs {
    /// Entry source file; defaults to main.jp in the current directory
    entry: Option<PathBuf>,

    /// Defines consulted by `when NAME import` directives (NAME or NAME=VALUE)
    defines: Vec<String>,
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(args: CliArgs) -> Result<ExitCode> {
    let entry = args.entry.unwrap_or_else(|| PathBuf::from(DEFAULT_ENTRY));
    let defines: IndexSet<String> = args
        .defines
        .iter()
        .map(|define| define.split('=').next().unwrap_or(define).to_string())
        .collect();

    let mut error_manager = ErrorManager::default();
    let mut file_manager = FileManager::default();

    let units = load_units(&mut file_manager, &error_manager, &entry, &defines)
        .with_context(|| format!("cannot read entry file {}", entry.display()))?;
    if error_manager.has_errors() {
        return Ok(drain(&mut error_manager, &file_manager));
    }

    let unit_count = units.len();
    let program = lower(
        &error_manager,
        units.into_iter().map(|unit| (unit.path, unit.ast)).collect(),
    );
    if error_manager.has_errors() {
        return Ok(drain(&mut error_manager, &file_manager));
    }

    let output = generate(&error_manager, &program);
    if error_manager.has_errors() {
        return Ok(drain(&mut error_manager, &file_manager));
    }

    // anything left at this point is a warning
    let _ = drain(&mut error_manager, &file_manager);

    let target = entry.with_extension(TARGET_EXTENSION);
    fs::write(&target, output)
        .with_context(|| format!("cannot write output file {}", target.display()))?;

    println!("Compiled {unit_count} unit(s) into {}", target.display());
    Ok(ExitCode::SUCCESS)
}

fn drain(error_manager: &mut ErrorManager, file_manager: &FileManager) -> ExitCode {
    let code = if error_manager.has_bugs() {
        2
    } else if error_manager.has_errors() {
        1
    } else {
        0
    };

    for err in error_manager.take() {
        eprintln!("{}", err.display(file_manager));
    }

    ExitCode::from(code)
}
