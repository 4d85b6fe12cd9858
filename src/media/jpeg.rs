// SPDX-License-Identifier: MPL-2.0
//! JPEG metadata stripping.
//!
//! Metadata lives in APPn and COM segments ahead of the scan data. APP0
//! (JFIF) and APP14 (Adobe colour transform) change how the pixels are
//! decoded and are kept; every other application segment and all comments
//! are dropped. The ICC profile is carried in one or more APP2 segments and
//! is reassembled and re-chunked by `img-parts`. Anything stored after the
//! end-of-image marker (vendor trailers, appended secondary images) is
//! dropped as well.

use crate::error::{ProfileReadError, SanitizeError};
use crate::media::container::{exif_has_gps, MetadataContainer, RemovedMetadata};
use crate::media::icc::IccProfile;
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageICC};

const APP0: u8 = 0xE0;
const APP1: u8 = 0xE1;
const APP2: u8 = 0xE2;
const APP14: u8 = 0xEE;
const APP15: u8 = 0xEF;
const COM: u8 = 0xFE;
const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;

const EXIF_MARKER: &[u8] = b"Exif\0\0";
const XMP_MARKER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_EXTENSION_MARKER: &[u8] = b"http://ns.adobe.com/xmp/extension/\0";
const ICC_MARKER: &[u8] = b"ICC_PROFILE\0";

/// What a segment holds, as far as stripping is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentKind {
    Exif,
    Xmp,
    Icc,
    Comment,
    OtherApp,
    Image,
}

fn classify(marker: u8, contents: &[u8]) -> SegmentKind {
    match marker {
        COM => SegmentKind::Comment,
        APP1 if contents.starts_with(EXIF_MARKER) => SegmentKind::Exif,
        APP1 if contents.starts_with(XMP_MARKER) || contents.starts_with(XMP_EXTENSION_MARKER) => {
            SegmentKind::Xmp
        }
        APP2 if contents.starts_with(ICC_MARKER) => SegmentKind::Icc,
        APP0 | APP14 => SegmentKind::Image,
        m if (APP1..=APP15).contains(&m) => SegmentKind::OtherApp,
        _ => SegmentKind::Image,
    }
}

/// Offset just past the EOI marker of the primary image, or `None` if the
/// marker structure cannot be followed that far.
fn primary_image_end(bytes: &[u8]) -> Option<usize> {
    if bytes.get(..2)? != [0xFF, SOI] {
        return None;
    }
    let mut pos = 2;
    loop {
        if *bytes.get(pos)? != 0xFF {
            return None;
        }
        // Fill bytes may pad any marker.
        while *bytes.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        let marker = bytes[pos + 1];
        pos += 2;
        match marker {
            EOI => return Some(pos),
            TEM | 0xD0..=0xD7 => {}
            _ => {
                let length = u16::from_be_bytes([*bytes.get(pos)?, *bytes.get(pos + 1)?]);
                let length = usize::from(length);
                if length < 2 {
                    return None;
                }
                pos += length;
                if marker == SOS {
                    pos = entropy_coded_end(bytes, pos)?;
                }
            }
        }
    }
}

/// Skips entropy-coded data starting at `pos` and returns the offset of the
/// next real marker.
fn entropy_coded_end(bytes: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        if *bytes.get(pos)? != 0xFF {
            pos += 1;
            continue;
        }
        match *bytes.get(pos + 1)? {
            // Stuffed zero or restart marker: still scan data.
            0x00 | 0xD0..=0xD7 => pos += 2,
            0xFF => pos += 1,
            _ => return Some(pos),
        }
    }
}

pub struct JpegContainer {
    jpeg: Jpeg,
    /// Bytes found after the primary image's EOI marker.
    trailer: Option<Vec<u8>>,
}

impl JpegContainer {
    pub fn parse(mut bytes: Vec<u8>) -> Result<Self, SanitizeError> {
        let trailer = primary_image_end(&bytes)
            .filter(|&end| end < bytes.len())
            .map(|end| bytes.split_off(end));
        let jpeg = Jpeg::from_bytes(Bytes::from(bytes))
            .map_err(|e| SanitizeError::Decode(format!("Failed to parse JPEG: {e}")))?;
        Ok(Self { jpeg, trailer })
    }
}

impl MetadataContainer for JpegContainer {
    fn icc_profile(&self) -> Result<IccProfile, ProfileReadError> {
        IccProfile::from_block(self.jpeg.icc_profile())
    }

    fn strip(&mut self) -> Result<RemovedMetadata, SanitizeError> {
        let mut removed = RemovedMetadata::default();

        if let Some(trailer) = self.trailer.take() {
            tracing::debug!(bytes = trailer.len(), "dropping data after JPEG end of image");
            removed.other += 1;
        }

        self.jpeg.segments_mut().retain(|segment| {
            let contents = segment.contents();
            match classify(segment.marker(), contents) {
                SegmentKind::Image => return true,
                SegmentKind::Exif => {
                    removed.exif += 1;
                    removed.gps |= exif_has_gps(contents);
                }
                SegmentKind::Xmp => removed.xmp += 1,
                SegmentKind::Icc => removed.icc_profiles = 1,
                SegmentKind::Comment => removed.comments += 1,
                SegmentKind::OtherApp => removed.other += 1,
            }
            false
        });

        Ok(removed)
    }

    fn restore_icc_profile(&mut self, profile: &IccProfile) {
        self.jpeg.set_icc_profile(Some(profile.to_bytes()));
    }

    fn encode(self: Box<Self>) -> Result<Vec<u8>, SanitizeError> {
        let mut output = Vec::new();
        self.jpeg
            .encoder()
            .write_to(&mut output)
            .map_err(|e| SanitizeError::EncodeOrWrite(format!("Failed to write JPEG: {e}")))?;
        if let Some(trailer) = self.trailer {
            output.extend_from_slice(&trailer);
        }
        Ok(output)
    }
}
