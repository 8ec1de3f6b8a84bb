use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::Parser;
use paprika::{
    error::CompileError,
    pipeline::{compile, Compilation},
    util::fmt::tree,
    vm::{Limits, Machine},
};
use tracing_subscriber::EnvFilter;

/// Compiles Paprika programs into stack machine listings.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source file to compile.
    #[arg(value_name = "SOURCE", default_value = "program.pap")]
    source: PathBuf,

    /// Where to write the listing. Defaults to SOURCE with a `.pasm` extension.
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[arg(long, help = "Execute the program and print its result")]
    run: bool,

    #[arg(long, help = "Print the typed syntax tree")]
    dump_ast: bool,

    #[arg(short, long, help = "Log every stage (overrides RUST_LOG)")]
    verbose: bool,

    #[arg(long, value_name = "N", help = "Maximum call depth when running")]
    max_call_depth: Option<usize>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("paprika=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();
}

fn execute(cli: &Cli) -> Result<()> {
    let path = &cli.source;
    let src = fs::read_to_string(path)
        .with_context(|| format!("failed to read source file {}", path.display()))?;
    let compilation = compile(&src).map_err(|error| locate(path, &src, error))?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| path.with_extension("pasm"));
    write_listing(&output, &compilation)?;
    tracing::info!(
        source = %path.display(),
        output = %output.display(),
        functions = compilation.program.functions.len(),
        "compiled"
    );

    let mut stdout = io::stdout().lock();
    if cli.dump_ast {
        tree::print_module(&mut stdout, &compilation.interner, &compilation.module)
            .context("failed to print the syntax tree")?;
    }
    if cli.run {
        let mut limits = Limits::default();
        if let Some(depth) = cli.max_call_depth {
            limits.max_call_depth = depth;
        }
        Machine::new(&compilation.program, limits)
            .execute(&mut stdout)
            .context("program failed")?;
    }
    stdout.flush()?;
    Ok(())
}

fn write_listing(path: &Path, compilation: &Compilation) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create output file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    compilation
        .program
        .write_listing(&mut writer)
        .and_then(|()| writer.flush())
        .with_context(|| format!("failed to write output file {}", path.display()))
}

/// Prefixes a compile error with the `path:line:col` it points at.
fn locate(path: &Path, src: &str, error: CompileError) -> anyhow::Error {
    let location = match error.span() {
        Some(span) => {
            let (line, col) = line_col(src, span.lo);
            format!("{}:{line}:{col}", path.display())
        }
        None => path.display().to_string(),
    };
    anyhow::Error::new(error).context(location)
}

/// One-based line and column of a byte offset.
fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let before = src.get(..offset).unwrap_or(src);
    let line = before.matches('\n').count() + 1;
    let col = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_is_one_based() {
        let src = "ab\ncd\n";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 1), (1, 2));
        assert_eq!(line_col(src, 3), (2, 1));
        assert_eq!(line_col(src, 6), (3, 1));
    }
}
