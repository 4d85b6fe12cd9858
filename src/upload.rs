// SPDX-License-Identifier: MPL-2.0
//! Upload hook: the boundary between the host and the sanitizer.
//!
//! The host hands over a stored upload as an [`UploadRecord`]. Supported
//! image types are sanitized in place; everything else passes through. A
//! sanitizer failure is logged and swallowed so that an upload never fails
//! because of metadata stripping, and the record always comes back
//! unchanged.

use crate::error::SanitizeError;
use crate::media::format::ImageFormat;
use crate::media::sanitizer::{Sanitizer, StripReport};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A stored upload, as seen by the hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRecord {
    pub path: PathBuf,
    /// Declared MIME type.
    pub mime_type: String,
}

impl UploadRecord {
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }

    /// The supported format named by the declared MIME type.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime(&self.mime_type)
    }
}

/// What the hook did with an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Sanitized(StripReport),
    /// The MIME type is not one the sanitizer handles.
    Skipped,
    /// The sanitizer failed; the stored file is untouched.
    Failed(SanitizeError),
}

/// The record returned to the host plus the outcome, for callers that want
/// to report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledUpload {
    pub record: UploadRecord,
    pub outcome: UploadOutcome,
}

impl Sanitizer {
    /// Sanitizes a stored upload in place.
    pub fn handle_upload(&self, record: UploadRecord) -> HandledUpload {
        self.process_upload(record, None)
    }

    /// Like [`Sanitizer::handle_upload`], writing the cleaned file to
    /// `output` and leaving the upload itself untouched.
    pub fn handle_upload_to(&self, record: UploadRecord, output: &Path) -> HandledUpload {
        self.process_upload(record, Some(output))
    }

    fn process_upload(&self, record: UploadRecord, output: Option<&Path>) -> HandledUpload {
        let Some(format) = record.format() else {
            tracing::debug!(
                path = %record.path.display(),
                mime_type = %record.mime_type,
                "upload type not sanitized"
            );
            return HandledUpload {
                record,
                outcome: UploadOutcome::Skipped,
            };
        };

        let outcome = match self.strip_metadata_as(&record.path, output, format) {
            Ok(report) => UploadOutcome::Sanitized(report),
            Err(error) => {
                tracing::warn!(
                    path = %record.path.display(),
                    mime_type = %record.mime_type,
                    kind = error.kind(),
                    %error,
                    "metadata stripping failed, keeping upload as is"
                );
                UploadOutcome::Failed(error)
            }
        };

        HandledUpload { record, outcome }
    }
}

/// Upload hook with the default sanitizer settings.
///
/// Always returns `record` unchanged.
pub fn handle_upload(record: UploadRecord) -> UploadRecord {
    Sanitizer::default().handle_upload(record).record
}

/// File extension to MIME type map used to build upload records.
///
/// Starts from the host's usual image types, plus SVG and WebP, which
/// uploads are allowed to carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMimes {
    by_extension: BTreeMap<String, String>,
}

const HOST_MIMES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ico", "image/x-icon"),
    ("pdf", "application/pdf"),
];

const EXTRA_MIMES: &[(&str, &str)] = &[("svg", "image/svg+xml"), ("webp", "image/webp")];

impl Default for UploadMimes {
    fn default() -> Self {
        let mut mimes = Self::empty();
        for (extension, mime) in HOST_MIMES.iter().chain(EXTRA_MIMES) {
            mimes.insert(extension, mime);
        }
        mimes
    }
}

impl UploadMimes {
    pub fn empty() -> Self {
        Self {
            by_extension: BTreeMap::new(),
        }
    }

    /// Registers (or replaces) the MIME type for an extension.
    pub fn insert(&mut self, extension: &str, mime_type: &str) {
        self.by_extension.insert(
            extension.trim_start_matches('.').to_ascii_lowercase(),
            mime_type.to_string(),
        );
    }

    #[must_use]
    pub fn mime_for_extension(&self, extension: &str) -> Option<&str> {
        self.by_extension
            .get(&extension.trim_start_matches('.').to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn mime_for_path<P: AsRef<Path>>(&self, path: P) -> Option<&str> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.mime_for_extension(e))
    }

    /// Builds an upload record for `path`, or `None` for an unknown
    /// extension.
    pub fn record_for_path(&self, path: impl Into<PathBuf>) -> Option<UploadRecord> {
        let path = path.into();
        let mime_type = self.mime_for_path(&path)?.to_string();
        Some(UploadRecord { path, mime_type })
    }
}
