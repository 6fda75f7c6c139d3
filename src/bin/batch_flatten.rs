use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use png_flatten::flatten_file;

/// Flatten every PNG in a directory and write a JSON report next to the
/// results.
#[derive(Parser)]
#[command(name = "batch-flatten")]
struct Cli {
    /// Directory containing PNG files to process
    input_dir: PathBuf,
    /// Directory the flattened copies and the report are written to
    #[arg(short, long, default_value = "flattened")]
    output_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    let cli = Cli::parse();
    fs::create_dir_all(&cli.output_dir)?;
    let images = fs::read_dir(&cli.input_dir)
        .context("Failed to read input folder")?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let path = entry.path();
            path.is_file() && path.extension() == Some(OsStr::new("png"))
        });

    let mut processed_images = Vec::new();
    let mut failed_images = Vec::new();
    for image in images {
        let image_path = image.path();
        let name = image_path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_owned();
        let destination = cli.output_dir.join(&name);
        match flatten_file(&image_path, Some(&destination), false) {
            Ok(path) => {
                log::info!("{} -> {}", image_path.display(), path.display());
                processed_images.push(name);
            }
            Err(err) => {
                log::error!("{}: {err:#}", image_path.display());
                failed_images.push(name);
            }
        }
    }

    let now = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Iso8601::DEFAULT)?;
    let results = serde_json::json!({
        "date": now,
        "processed_images": processed_images,
        "failed_images": failed_images,
    });
    fs::write(
        cli.output_dir.join("flatten_results.json"),
        results.to_string(),
    )?;
    Ok(())
}
