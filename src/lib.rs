// SPDX-License-Identifier: MPL-2.0
//! `upload_scrubber` strips privacy-relevant metadata from uploaded images.
//!
//! EXIF (including GPS positions), XMP packets, comments and editor data
//! are removed from JPEG, PNG, GIF, WebP and SVG files, while the embedded
//! ICC colour profile is kept so colours render the same. Files are edited
//! at the container level: pixel data is never re-encoded.
//!
//! The [`upload`] module is the entry point for a host that stores uploads;
//! [`media::sanitizer`] exposes the stripping pipeline directly.

#![doc(html_root_url = "https://docs.rs/upload_scrubber/0.1.0")]

pub mod config;
pub mod error;
pub mod media;
pub mod upload;

pub use media::sanitizer::{strip_metadata, Sanitizer, StripReport};
pub use upload::{handle_upload, UploadOutcome, UploadRecord};
