//! `splc` CLI: compile an SPL source file (or stdin) to NASM assembly.

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use splc::{compile_config, CompileError, CompilerConfig};

#[derive(Parser)]
#[command(name = "splc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile SPL source to x86-64 NASM assembly", long_about = None)]
struct Cli {
    /// Input .spl source file; omitted or "-" reads stdin until EOF
    input: Option<PathBuf>,

    /// Output path for the generated assembly; omitted or "-" writes stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Annotate emitted assembly with source-line comments
    #[arg(long)]
    emit_comments: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "splc=info"
                    .parse()
                    .expect("static directive always parses"),
            ),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(cli: Cli) -> Result<(), CompileError> {
    let source = read_input(cli.input.as_deref())?;
    let config = CompilerConfig::new().with_line_comments(cli.emit_comments);

    let mut asm = Vec::new();
    compile_config(&source, &config, &mut asm)?;

    write_output(cli.output.as_deref(), &asm)
}

/// Reads the named file, or stdin when `path` is `None` or `-`. The
/// compiler's framing convention is a trailing NUL byte; a file read from
/// disk must already end that way, while stdin is read to EOF and the
/// sentinel appended here since an interactive/piped stream has no way to
/// supply it itself.
fn read_input(path: Option<&std::path::Path>) -> Result<Vec<u8>, CompileError> {
    match path {
        Some(path) if path != std::path::Path::new("-") => {
            info!("reading {}", path.display());
            fs::read(path).map_err(|e| {
                CompileError::internal(format!("failed reading {}: {}", path.display(), e))
            })
        }
        _ => {
            info!("reading stdin");
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .map_err(|e| CompileError::internal(format!("failed reading stdin: {}", e)))?;
            if buf.last() != Some(&0) {
                buf.push(0);
            }
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&std::path::Path>, asm: &[u8]) -> Result<(), CompileError> {
    match path {
        Some(path) if path != std::path::Path::new("-") => {
            info!("writing {}", path.display());
            fs::write(path, asm).map_err(|e| {
                CompileError::internal(format!("failed writing {}: {}", path.display(), e))
            })
        }
        _ => io::stdout()
            .write_all(asm)
            .map_err(|e| CompileError::internal(format!("failed writing stdout: {}", e))),
    }
}
