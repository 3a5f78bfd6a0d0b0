//! myl Compiler Driver
//!
//! Reads one `.myl` source file and writes the NASM assembly for it.
//! Assembling, linking and running the result are left to external tools.

use clap::{Parser, Subcommand};
use log::{debug, info};
use myl_codegen::generate;
use myl_frontend::Frontend;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mylc")]
#[command(about = "myl compiler for Windows x64")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a myl source file to NASM assembly
    Compile {
        /// Input source file
        input: PathBuf,

        /// Output assembly file (defaults to the input with an .asm extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the pass 1 IR as JSON
        #[arg(long)]
        emit_ir: bool,

        /// Print the token stream
        #[arg(long)]
        emit_tokens: bool,

        /// Debug logging
        #[arg(short, long)]
        verbose: bool,
    },
}

struct CompileOptions {
    emit_ir: bool,
    emit_tokens: bool,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile { input, output, emit_ir, emit_tokens, verbose } => {
            init_logging(verbose);
            let options = CompileOptions { emit_ir, emit_tokens };
            if let Err(e) = compile_file(&input, output.as_deref(), &options) {
                eprintln!("Error compiling {}: {}", input.display(), e);
                std::process::exit(1);
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn compile_file(
    input_path: &Path,
    output_path: Option<&Path>,
    options: &CompileOptions,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    info!("Compiling {}", input_path.display());
    let source = fs::read_to_string(input_path).map_err(myl_common::CompileError::from)?;
    let filename = input_path.display().to_string();

    if options.emit_tokens {
        for token in Frontend::tokenize_source(&source, &filename)? {
            let kind = token.kind.to_string();
            println!(
                "{:>4}:{:<3} {:<18} {}",
                token.location.line, token.location.column, kind, token.text
            );
        }
    }

    let mut ctx = Frontend::lower_source(&source, &filename)?;
    if options.emit_ir {
        println!("{}", serde_json::to_string_pretty(&ctx.instructions)?);
    }

    let program = generate(&mut ctx)?;
    debug!(
        "{} functions, {} data entries",
        program.frames.len(),
        program.data.len()
    );

    let final_output_path = default_output_path(input_path, output_path);
    fs::write(&final_output_path, program.to_string()).map_err(myl_common::CompileError::from)?;
    println!("Assembly written to: {}", final_output_path.display());
    Ok(final_output_path)
}

fn default_output_path(input_path: &Path, output_path: Option<&Path>) -> PathBuf {
    match output_path {
        Some(path) => path.to_path_buf(),
        None => input_path.with_extension("asm"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mylc-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("src/hello.myl"), None),
            PathBuf::from("src/hello.asm")
        );
        assert_eq!(
            default_output_path(Path::new("hello.myl"), Some(Path::new("out.s"))),
            PathBuf::from("out.s")
        );
    }

    #[test]
    fn test_compile_file_writes_assembly() {
        let dir = scratch_dir("write");
        let input = dir.join("hello.myl");
        fs::write(&input, "pub def boot(): i32\n return 0\nend\n").unwrap();

        let options = CompileOptions { emit_ir: false, emit_tokens: false };
        let written = compile_file(&input, None, &options).unwrap();
        assert_eq!(written, dir.join("hello.asm"));

        let asm = fs::read_to_string(&written).unwrap();
        assert!(asm.contains("call boot"));
        assert!(asm.contains("section .text"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_compile_error_is_reported() {
        let dir = scratch_dir("error");
        let input = dir.join("bad.myl");
        fs::write(&input, "def f(): i32\nend\n").unwrap();

        let options = CompileOptions { emit_ir: false, emit_tokens: false };
        let err = compile_file(&input, None, &options).unwrap_err();
        assert!(err.to_string().contains("never returns a value"));
        assert!(!dir.join("bad.asm").exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_input() {
        let options = CompileOptions { emit_ir: false, emit_tokens: false };
        let err = compile_file(Path::new("/nonexistent/x.myl"), None, &options).unwrap_err();
        assert!(err.to_string().contains("IO error"));
    }
}
