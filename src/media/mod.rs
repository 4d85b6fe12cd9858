// SPDX-License-Identifier: MPL-2.0
//! Image metadata stripping.
//!
//! [`sanitizer`] holds the read → strip → restore profile → write pipeline.
//! The per-format modules parse a file into a [`MetadataContainer`] that
//! knows which of its blocks are metadata and which are image data.

pub mod container;
pub mod format;
pub mod gif;
pub mod icc;
pub mod jpeg;
pub mod png;
pub mod sanitizer;
pub mod svg;
pub mod webp;

// Re-export commonly used types
pub use container::{MetadataContainer, RemovedMetadata};
pub use format::{ImageFormat, SUPPORTED_MIME_TYPES};
pub use icc::IccProfile;
pub use sanitizer::{strip_metadata, strip_metadata_as, SanitizeOptions, Sanitizer, StripReport};
