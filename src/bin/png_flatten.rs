use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use png_flatten::flatten_file;

/// Flatten PNG alpha over a white background.
#[derive(Parser)]
#[command(name = "png-flatten")]
struct Cli {
    /// Path to input PNG
    input: PathBuf,
    /// Path to output PNG (default: overwrite or <input>.flattened.png)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Overwrite the input file in place
    #[arg(long)]
    in_place: bool,
    /// Log progress while processing
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbosity = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Error
    };
    pretty_env_logger::formatted_builder()
        .filter_level(verbosity)
        .init();

    if !cli.input.is_file() {
        eprintln!("Input file not found: {}", cli.input.display());
        return ExitCode::from(2);
    }
    match flatten_file(&cli.input, cli.output.as_deref(), cli.in_place) {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(1)
        }
    }
}
