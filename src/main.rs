// SPDX-License-Identifier: MPL-2.0
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use upload_scrubber::config::{self, Config};
use upload_scrubber::upload::{HandledUpload, UploadMimes, UploadOutcome, UploadRecord};
use upload_scrubber::Sanitizer;

const USAGE: &str = "\
Usage: upload_scrubber [OPTIONS] FILE...

Strips EXIF, XMP and comment metadata from images, keeping the ICC profile.

Options:
  -o, --output PATH   Write the cleaned image here instead of in place (one FILE only)
  -m, --mime TYPE     Declared MIME type (default: guessed from the extension)
  -c, --config PATH   Settings file (default: platform config directory)
  -h, --help          Print this help";

struct Args {
    output: Option<PathBuf>,
    mime: Option<String>,
    config: Option<PathBuf>,
    files: Vec<PathBuf>,
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut args = pico_args::Arguments::from_env();

    if args.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let output: Option<PathBuf> = args
        .opt_value_from_str(["-o", "--output"])
        .map_err(|e| e.to_string())?;
    let mime: Option<String> = args
        .opt_value_from_str(["-m", "--mime"])
        .map_err(|e| e.to_string())?;
    let config: Option<PathBuf> = args
        .opt_value_from_str(["-c", "--config"])
        .map_err(|e| e.to_string())?;

    let mut files = Vec::new();
    for arg in args.finish() {
        let arg = PathBuf::from(arg);
        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option '{}'", arg.display()));
        }
        files.push(arg);
    }

    if files.is_empty() {
        return Err("no input files".to_string());
    }
    if output.is_some() && files.len() > 1 {
        return Err("--output requires exactly one FILE".to_string());
    }

    Ok(Some(Args {
        output,
        mime,
        config,
        files,
    }))
}

fn load_config(path: Option<&PathBuf>) -> Config {
    let loaded = match path {
        Some(path) => config::load_from_path(path),
        None => config::load(),
    };
    loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not load settings, using defaults");
        Config::default()
    })
}

fn print_outcome(handled: &HandledUpload) {
    let path = handled.record.path.display();
    match &handled.outcome {
        UploadOutcome::Sanitized(report) => {
            let mut notes = vec![format!("{} block(s) removed", report.removed.total())];
            if report.removed.gps {
                notes.push("GPS position removed".to_string());
            }
            if report.profile_restored {
                notes.push("ICC profile kept".to_string());
            }
            println!(
                "sanitized  {path} -> {} ({}: {})",
                report.output.display(),
                report.format,
                notes.join(", ")
            );
        }
        UploadOutcome::Skipped => {
            println!("skipped    {path} ({})", handled.record.mime_type);
        }
        UploadOutcome::Failed(error) => println!("failed     {path}: {error}"),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("error: {message}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let config = load_config(args.config.as_ref());
    let sanitizer = Sanitizer::from_config(&config);
    let mimes = UploadMimes::default();

    for file in args.files {
        let mime_type = args
            .mime
            .clone()
            .or_else(|| mimes.mime_for_path(&file).map(str::to_string))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let record = UploadRecord::new(file, mime_type);

        let handled = match &args.output {
            Some(output) => sanitizer.handle_upload_to(record, output),
            None => sanitizer.handle_upload(record),
        };
        print_outcome(&handled);
    }

    ExitCode::SUCCESS
}
