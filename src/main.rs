use clap::Parser;
use std::path::PathBuf;
use std::process;

/// Single-pass compiler for a small S-expression imperative language,
/// emitting 32-bit x86 assembly.
#[derive(Parser, Debug)]
#[command(name = "sx86c", version, about)]
struct Cli {
    /// Source file to compile.
    source: PathBuf,

    /// Output assembly file (defaults to out.asm).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(sx86c::driver::OUTFILE));

    let source = std::fs::read_to_string(&cli.source)
        .map_err(|e| format!("{}: {}", cli.source.display(), e))?;

    tracing::info!(source = %cli.source.display(), output = %output.display(), "compiling");
    sx86c::driver::compile_to_file(&source, &output)?;
    tracing::info!(output = %output.display(), "wrote assembly");
    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
