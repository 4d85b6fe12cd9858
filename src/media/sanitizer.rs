// SPDX-License-Identifier: MPL-2.0
//! The metadata stripping pipeline.
//!
//! A call reads the input file, parses it as a container of its format,
//! captures the embedded ICC profile, strips every metadata block, puts the
//! profile back and writes the result atomically to the output path.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use upload_scrubber::media::sanitizer::strip_metadata;
//!
//! // Clean in place.
//! let report = strip_metadata(Path::new("photo.jpg"), None)?;
//! println!("removed {} blocks", report.removed.total());
//! # Ok::<(), upload_scrubber::error::SanitizeError>(())
//! ```

use crate::config::{defaults, Config};
use crate::error::{ProfileReadError, SanitizeError};
use crate::media::container::{self, RemovedMetadata};
use crate::media::format::ImageFormat;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Switches for the optional pipeline steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeOptions {
    /// Fully decode the pixels (or SVG tree) before touching the file.
    pub verify_decode: bool,
    /// Re-embed a valid ICC profile after stripping.
    pub preserve_icc_profile: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            verify_decode: defaults::DEFAULT_VERIFY_DECODE,
            preserve_icc_profile: defaults::DEFAULT_PRESERVE_ICC_PROFILE,
        }
    }
}

impl From<&Config> for SanitizeOptions {
    fn from(config: &Config) -> Self {
        Self {
            verify_decode: config.verify_decode(),
            preserve_icc_profile: config.preserve_icc_profile(),
        }
    }
}

/// What a successful run removed and where it wrote the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripReport {
    pub format: ImageFormat,
    pub output: PathBuf,
    pub removed: RemovedMetadata,
    /// `true` if an ICC profile was embedded in the output.
    pub profile_restored: bool,
}

/// In-memory result of sanitizing one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub bytes: Vec<u8>,
    pub removed: RemovedMetadata,
    pub profile_restored: bool,
}

/// The metadata sanitizer. Holds configuration only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sanitizer {
    options: SanitizeOptions,
}

impl Sanitizer {
    pub fn new(options: SanitizeOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(SanitizeOptions::from(config))
    }

    pub fn options(&self) -> SanitizeOptions {
        self.options
    }

    /// Strips `input`, detecting its format from the file content.
    ///
    /// The result goes to `output`, or back to `input` when `output` is
    /// `None`.
    ///
    /// # Errors
    /// [`SanitizeError::Decode`] if the file cannot be read, is not a
    /// supported image or fails to decode; [`SanitizeError::EncodeOrWrite`]
    /// if the cleaned file cannot be serialized or written. The destination
    /// is left untouched on error.
    pub fn strip_metadata(
        &self,
        input: &Path,
        output: Option<&Path>,
    ) -> Result<StripReport, SanitizeError> {
        let bytes = read_input(input)?;
        let format = ImageFormat::detect(&bytes).ok_or_else(|| {
            SanitizeError::Decode(format!(
                "{} is not a supported image format",
                input.display()
            ))
        })?;
        self.strip_bytes_to(input, bytes, format, output)
    }

    /// Strips `input` as an image of the declared `format`.
    ///
    /// # Errors
    /// Same as [`Sanitizer::strip_metadata`]. Content that does not match
    /// `format` is a decode error.
    pub fn strip_metadata_as(
        &self,
        input: &Path,
        output: Option<&Path>,
        format: ImageFormat,
    ) -> Result<StripReport, SanitizeError> {
        let bytes = read_input(input)?;
        self.strip_bytes_to(input, bytes, format, output)
    }

    /// Runs the pipeline on bytes already in memory.
    ///
    /// # Errors
    /// [`SanitizeError::Decode`] for unparseable or undecodable content,
    /// [`SanitizeError::EncodeOrWrite`] if the cleaned container cannot be
    /// serialized or, with `verify_decode` on, no longer decodes.
    pub fn sanitize_bytes(
        &self,
        bytes: Vec<u8>,
        format: ImageFormat,
    ) -> Result<Sanitized, SanitizeError> {
        if self.options.verify_decode {
            verify_decodes(&bytes, format)?;
        }

        let mut container = container::parse(format, bytes)?;

        let profile = match container.icc_profile() {
            Ok(profile) => Some(profile),
            Err(ProfileReadError::Missing) => None,
            Err(ProfileReadError::Malformed(reason)) => {
                tracing::warn!(%format, %reason, "dropping malformed ICC profile");
                None
            }
        };

        let removed = container.strip()?;

        let profile_restored = match profile {
            Some(profile) if self.options.preserve_icc_profile => {
                container.restore_icc_profile(&profile);
                true
            }
            _ => false,
        };

        let bytes = container.encode()?;
        if self.options.verify_decode {
            verify_output(&bytes, format)?;
        }
        Ok(Sanitized {
            bytes,
            removed,
            profile_restored,
        })
    }

    fn strip_bytes_to(
        &self,
        input: &Path,
        bytes: Vec<u8>,
        format: ImageFormat,
        output: Option<&Path>,
    ) -> Result<StripReport, SanitizeError> {
        let output = output.unwrap_or(input);
        let sanitized = self.sanitize_bytes(bytes, format)?;

        let permissions = fs::metadata(input).ok().map(|meta| meta.permissions());
        write_atomically(output, &sanitized.bytes, permissions)?;

        let report = StripReport {
            format,
            output: output.to_path_buf(),
            removed: sanitized.removed,
            profile_restored: sanitized.profile_restored,
        };
        tracing::debug!(
            path = %report.output.display(),
            %format,
            exif = report.removed.exif,
            xmp = report.removed.xmp,
            comments = report.removed.comments,
            other = report.removed.other,
            gps = report.removed.gps,
            profile_restored = report.profile_restored,
            "stripped image metadata"
        );
        Ok(report)
    }
}

/// Strips `input` with the default options, detecting its format.
///
/// # Errors
/// See [`Sanitizer::strip_metadata`].
pub fn strip_metadata(input: &Path, output: Option<&Path>) -> Result<StripReport, SanitizeError> {
    Sanitizer::default().strip_metadata(input, output)
}

/// Strips `input` as `format` with the default options.
///
/// # Errors
/// See [`Sanitizer::strip_metadata_as`].
pub fn strip_metadata_as(
    input: &Path,
    output: Option<&Path>,
    format: ImageFormat,
) -> Result<StripReport, SanitizeError> {
    Sanitizer::default().strip_metadata_as(input, output, format)
}

fn read_input(input: &Path) -> Result<Vec<u8>, SanitizeError> {
    fs::read(input)
        .map_err(|e| SanitizeError::Decode(format!("Failed to read {}: {e}", input.display())))
}

fn verify_decodes(bytes: &[u8], format: ImageFormat) -> Result<(), SanitizeError> {
    match format.raster() {
        Some(raster) => image_rs::load_from_memory_with_format(bytes, raster)
            .map(drop)
            .map_err(|e| SanitizeError::Decode(format!("Failed to decode {format}: {e}"))),
        None => resvg::usvg::Tree::from_data(bytes, &resvg::usvg::Options::default())
            .map(drop)
            .map_err(|e| SanitizeError::Decode(format!("Failed to decode SVG: {e}"))),
    }
}

/// Checks the cleaned bytes before they replace anything on disk.
fn verify_output(bytes: &[u8], format: ImageFormat) -> Result<(), SanitizeError> {
    verify_decodes(bytes, format).map_err(|e| {
        SanitizeError::EncodeOrWrite(format!("Sanitized {format} no longer decodes: {e}"))
    })
}

/// Writes `bytes` to a temporary sibling of `path` and renames it into place.
fn write_atomically(
    path: &Path,
    bytes: &[u8],
    permissions: Option<fs::Permissions>,
) -> Result<(), SanitizeError> {
    let write_error =
        |e: std::io::Error| SanitizeError::EncodeOrWrite(format!("Failed to write {}: {e}", path.display()));

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(bytes).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    if let Some(permissions) = permissions {
        temp.as_file().set_permissions(permissions).map_err(write_error)?;
    }
    temp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}
