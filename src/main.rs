//! annobox command line: load images, a YOLO dataset or a generic JSON
//! export, and write annotations in the requested format.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use annobox::config::AnnotatorConfig;
use annobox::format::ExportOptions;
use annobox::services::{
    DirectoryDataset, DirectorySink, ImageSource, NativeDecoderThread, is_image_file,
};
use annobox::{Session, SessionError};

#[derive(Parser, Debug)]
#[command(
    name = "annobox",
    version,
    about = "Bounding-box annotation engine with generic JSON and YOLO export"
)]
struct Cli {
    /// Image files to load
    inputs: Vec<PathBuf>,

    /// YOLO dataset directory (data.yaml + split folders)
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Dataset split to load (train, val, test, valid); all splits when unset
    #[arg(long, requires = "dataset")]
    split: Option<String>,

    /// Generic JSON annotations to import
    #[arg(long, value_name = "FILE")]
    import: Option<PathBuf>,

    /// Export format id
    #[arg(long, default_value = "json", value_parser = ["json", "yolo"])]
    format: String,

    /// Output directory
    #[arg(long, value_name = "DIR", default_value = ".")]
    out: PathBuf,

    /// Output file name for single-file formats
    #[arg(long)]
    name: Option<String>,

    /// Configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Labels to define, in class order
    #[arg(long, value_delimiter = ',')]
    labels: Vec<String>,
}

fn load_config(path: Option<&Path>) -> Result<AnnotatorConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(AnnotatorConfig::load(path)?),
        None => {
            let default = Path::new(AnnotatorConfig::default_filename());
            if default.is_file() {
                Ok(AnnotatorConfig::load(default)?)
            } else {
                Ok(AnnotatorConfig::default())
            }
        }
    }
}

fn run(cli: Cli, config: AnnotatorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::new(config);

    if let Some(path) = &cli.import {
        let content = std::fs::read_to_string(path)?;
        let result = session.import("json", &content, false)?;
        log::info!(
            "Imported {} images, {} boxes, {} labels from {:?}",
            result.images_imported,
            result.annotations_imported,
            result.labels_imported,
            path
        );
    }

    let mut decoder = NativeDecoderThread::spawn()?;

    if let Some(dataset) = &cli.dataset {
        let provider = DirectoryDataset::default();
        let name = dataset.to_string_lossy();
        session.load_dataset(&provider, &name, cli.split.as_deref(), &mut decoder)?;
    }

    for label in &cli.labels {
        if let Err(e) = session.add_label(label, None) {
            log::warn!("Skipping label {:?}: {}", label, e);
        }
    }

    for path in &cli.inputs {
        if !is_image_file(path) {
            log::warn!("Skipping {:?}: not a supported image", path);
            continue;
        }
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        session.add_image_source(ImageSource::Path(path.clone()), &filename, &mut decoder);
    }

    while let Some(outcome) = decoder.wait_one() {
        match session.apply_decode(outcome) {
            Ok(_) => {}
            Err(SessionError::Decode { filename, error }) => {
                log::warn!("Dropped {}: {}", filename, error);
            }
            Err(e) => return Err(e.into()),
        }
    }

    let options = match cli.name {
        Some(name) => ExportOptions::new().file_name(name),
        None => ExportOptions::new(),
    };
    let mut sink = DirectorySink::new(&cli.out)?;
    let result = session.export_to(&cli.format, &options, &mut sink)?;

    if result.has_errors() {
        log::warn!("Export finished with {} warnings", result.warnings.len());
    }
    println!(
        "{} images, {} boxes exported to {} ({} images skipped, {} boxes skipped)",
        result.images_exported,
        result.annotations_exported,
        cli.out.display(),
        result.images_skipped,
        result.boxes_skipped
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    env_logger::Builder::new()
        .filter_level(config.log_level.to_level_filter())
        .parse_default_env()
        .init();

    match run(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
