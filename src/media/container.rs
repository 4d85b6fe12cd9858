// SPDX-License-Identifier: MPL-2.0
//! Parsed image containers and the strip/restore operations on them.
//!
//! Each supported format parses into a container that keeps the file's
//! segments or chunks verbatim. Stripping removes metadata blocks and leaves
//! everything needed to render the image untouched, so cleaning a file never
//! re-encodes its pixels.

use crate::error::{ProfileReadError, SanitizeError};
use crate::media::format::ImageFormat;
use crate::media::icc::IccProfile;
use crate::media::{gif, jpeg, png, svg, webp};

/// Tally of the metadata blocks removed from one image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovedMetadata {
    /// EXIF blocks (JPEG APP1, PNG eXIf, WebP EXIF).
    pub exif: usize,
    /// XMP packets, including SVG `<metadata>` elements.
    pub xmp: usize,
    /// Comments and free-text blocks.
    pub comments: usize,
    /// Other vendor or editor metadata.
    pub other: usize,
    /// Embedded colour profiles (restored afterwards when valid).
    pub icc_profiles: usize,
    /// Whether any removed EXIF block carried GPS coordinates.
    pub gps: bool,
}

impl RemovedMetadata {
    /// Number of non-profile blocks removed.
    pub fn total(&self) -> usize {
        self.exif + self.xmp + self.comments + self.other
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0 && self.icc_profiles == 0
    }
}

/// A parsed image whose metadata can be stripped in place.
pub trait MetadataContainer {
    /// Reads the embedded ICC profile.
    fn icc_profile(&self) -> Result<IccProfile, ProfileReadError>;

    /// Removes every metadata block, colour profile included.
    ///
    /// On error the container is left as parsed and must not be written.
    fn strip(&mut self) -> Result<RemovedMetadata, SanitizeError>;

    /// Embeds `profile` into a stripped container.
    fn restore_icc_profile(&mut self, profile: &IccProfile);

    /// Serializes the container.
    fn encode(self: Box<Self>) -> Result<Vec<u8>, SanitizeError>;
}

/// Parses `bytes` as a container of the declared `format`.
pub fn parse(format: ImageFormat, bytes: Vec<u8>) -> Result<Box<dyn MetadataContainer>, SanitizeError> {
    let container: Box<dyn MetadataContainer> = match format {
        ImageFormat::Jpeg => Box::new(jpeg::JpegContainer::parse(bytes)?),
        ImageFormat::Png => Box::new(png::PngContainer::parse(bytes)?),
        ImageFormat::Gif => Box::new(gif::GifContainer::parse(&bytes)?),
        ImageFormat::WebP => Box::new(webp::WebPContainer::parse(bytes)?),
        ImageFormat::Svg => Box::new(svg::SvgContainer::parse(bytes)?),
    };
    Ok(container)
}

/// Returns `true` if a raw EXIF payload records a GPS position.
///
/// Accepts payloads with or without the `Exif\0\0` prefix used by JPEG and
/// some WebP writers. Unparseable payloads count as "no GPS".
pub fn exif_has_gps(raw: &[u8]) -> bool {
    let tiff = raw.strip_prefix(b"Exif\0\0").unwrap_or(raw);
    let Ok(exif) = exif::Reader::new().read_raw(tiff.to_vec()) else {
        return false;
    };
    exif.get_field(exif::Tag::GPSLatitude, exif::In::PRIMARY)
        .is_some()
        || exif
            .get_field(exif::Tag::GPSLongitude, exif::In::PRIMARY)
            .is_some()
        || exif
            .get_field(exif::Tag::GPSLatitudeRef, exif::In::PRIMARY)
            .is_some()
}
