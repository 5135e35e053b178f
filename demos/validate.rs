//! Conformance validation driver.
//!
//! Enumerates `enroll*`/`search*` raster images from a directory, runs the
//! reference engine through the full lifecycle, and prints one
//! `probeId candidateId distance statusCode` line per candidate to stdout.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use iris_1n::raster_parser::read_raster;
use iris_1n::{
    EyeLabel, Harness, HarnessConfig, IrisAnnulus, ReferenceEngine, SubjectSamples,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding enroll*/search* raster images (binary PGM/PPM)
    #[arg(long, default_value = "images")]
    images: PathBuf,

    /// Enrollment store directory (created if absent)
    #[arg(long, default_value = "enroll")]
    enroll_dir: PathBuf,

    /// Read-only engine configuration directory
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    /// Candidate-list length for every query
    #[arg(long, default_value_t = 10)]
    candidates: u32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut enroll_paths = Vec::new();
    let mut search_paths = Vec::new();

    for entry in fs::read_dir(&args.images)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with("enroll") {
            enroll_paths.push(path);
        } else if name.starts_with("search") {
            search_paths.push(path);
        }
    }
    enroll_paths.sort();
    search_paths.sort();

    let enrollment = load_subjects(&enroll_paths, false)?;
    let searches = load_subjects(&search_paths, true)?;

    fs::create_dir_all(&args.enroll_dir)?;

    let mut harness = Harness::new(
        ReferenceEngine::new(),
        HarnessConfig {
            config_dir: args.config_dir,
            enroll_dir: args.enroll_dir,
            num_candidates: args.candidates,
        },
    );

    let (tx, rx) = mpsc::channel();
    let printer = thread::spawn(move || {
        for output in rx {
            print!("{output}");
        }
    });

    let result = harness.run(&enrollment, &searches, &tx, None);
    drop(tx);
    let _ = printer.join();

    result.map_err(Into::into)
}

fn load_subjects(
    paths: &[PathBuf],
    two_eye_first: bool,
) -> Result<Vec<SubjectSamples>, Box<dyn Error>> {
    let mut subjects = Vec::with_capacity(paths.len());
    for (position, path) in paths.iter().enumerate() {
        let mut iris = read_raster(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        if name == "enroll8.pgm" {
            // Provide iris coordinates for one image to exercise the hint path.
            iris.location = IrisAnnulus {
                limbus_center_x: 320,
                limbus_center_y: 240,
                pupil_radius: 38,
                limbus_radius: 119,
            };
        }

        let irides = if two_eye_first && position == 0 {
            // Two-eye probe: eye labels must always be specified whenever
            // more than one image is provided.
            let mut mirrored = iris.clone();
            mirrored.data.reverse();
            vec![
                iris.with_label(EyeLabel::Left),
                mirrored.with_label(EyeLabel::Right),
            ]
        } else {
            vec![iris]
        };

        subjects.push(SubjectSamples::new(name, irides));
    }
    Ok(subjects)
}
