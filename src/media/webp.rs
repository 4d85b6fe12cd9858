// SPDX-License-Identifier: MPL-2.0
//! WebP metadata stripping.
//!
//! Metadata only exists in the extended (VP8X) layout, as `EXIF`, `XMP ` and
//! `ICCP` chunks advertised by flag bits in the VP8X header. Removing a chunk
//! clears its flag; restoring the profile puts the `ICCP` chunk right after
//! VP8X, where the container layout requires it.

use crate::error::{ProfileReadError, SanitizeError};
use crate::media::container::{exif_has_gps, MetadataContainer, RemovedMetadata};
use crate::media::icc::IccProfile;
use img_parts::riff::{RiffChunk, RiffContent};
use img_parts::webp::WebP;
use img_parts::Bytes;

const CHUNK_VP8X: [u8; 4] = *b"VP8X";
const CHUNK_ICCP: [u8; 4] = *b"ICCP";
const CHUNK_EXIF: [u8; 4] = *b"EXIF";
const CHUNK_XMP: [u8; 4] = *b"XMP ";

const FLAG_ICC: u8 = 0x20;
const FLAG_EXIF: u8 = 0x08;
const FLAG_XMP: u8 = 0x04;

pub struct WebPContainer {
    webp: WebP,
}

impl WebPContainer {
    pub fn parse(bytes: Vec<u8>) -> Result<Self, SanitizeError> {
        let webp = WebP::from_bytes(Bytes::from(bytes))
            .map_err(|e| SanitizeError::Decode(format!("Failed to parse WebP: {e}")))?;
        Ok(Self { webp })
    }

    fn chunk_data(&self, id: [u8; 4]) -> Option<Bytes> {
        self.webp
            .chunks()
            .iter()
            .find(|chunk| chunk.id() == id)
            .and_then(|chunk| match chunk.content() {
                RiffContent::Data(data) => Some(data.clone()),
                _ => None,
            })
    }

    /// Rewrites the VP8X flag byte. No-op for simple (lossy/lossless) files.
    fn update_flags(&mut self, update: impl FnOnce(u8) -> u8) {
        let Some(index) = self
            .webp
            .chunks()
            .iter()
            .position(|chunk| chunk.id() == CHUNK_VP8X)
        else {
            return;
        };
        let Some(mut header) = self.chunk_data(CHUNK_VP8X).map(|data| data.to_vec()) else {
            return;
        };
        let Some(flags) = header.first_mut() else {
            return;
        };

        *flags = update(*flags);
        self.webp.chunks_mut()[index] =
            RiffChunk::new(CHUNK_VP8X, RiffContent::Data(Bytes::from(header)));
    }
}

impl MetadataContainer for WebPContainer {
    fn icc_profile(&self) -> Result<IccProfile, ProfileReadError> {
        IccProfile::from_block(self.chunk_data(CHUNK_ICCP))
    }

    fn strip(&mut self) -> Result<RemovedMetadata, SanitizeError> {
        let mut removed = RemovedMetadata::default();

        self.webp.chunks_mut().retain(|chunk| {
            match chunk.id() {
                CHUNK_EXIF => {
                    removed.exif += 1;
                    if let RiffContent::Data(data) = chunk.content() {
                        removed.gps |= exif_has_gps(data);
                    }
                }
                CHUNK_XMP => removed.xmp += 1,
                CHUNK_ICCP => removed.icc_profiles = 1,
                _ => return true,
            }
            false
        });

        self.update_flags(|flags| flags & !(FLAG_ICC | FLAG_EXIF | FLAG_XMP));
        Ok(removed)
    }

    fn restore_icc_profile(&mut self, profile: &IccProfile) {
        let Some(vp8x) = self
            .webp
            .chunks()
            .iter()
            .position(|chunk| chunk.id() == CHUNK_VP8X)
        else {
            // Simple-format files cannot carry a profile.
            return;
        };

        self.webp.chunks_mut().insert(
            vp8x + 1,
            RiffChunk::new(CHUNK_ICCP, RiffContent::Data(profile.to_bytes())),
        );
        self.update_flags(|flags| flags | FLAG_ICC);
    }

    fn encode(self: Box<Self>) -> Result<Vec<u8>, SanitizeError> {
        let mut output = Vec::new();
        self.webp
            .encoder()
            .write_to(&mut output)
            .map_err(|e| SanitizeError::EncodeOrWrite(format!("Failed to write WebP: {e}")))?;
        Ok(output)
    }
}

/// Builds an extended WebP around the image chunk of a simple WebP file.
#[cfg(test)]
pub(crate) fn extended_webp(
    simple: &[u8],
    width: u32,
    height: u32,
    extra: &[([u8; 4], &[u8])],
) -> Vec<u8> {
    fn push_chunk(out: &mut Vec<u8>, id: [u8; 4], data: &[u8]) {
        out.extend_from_slice(&id);
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
        if data.len() % 2 == 1 {
            out.push(0);
        }
    }

    let mut flags = 0u8;
    for (id, _) in extra {
        flags |= match *id {
            CHUNK_ICCP => FLAG_ICC,
            CHUNK_EXIF => FLAG_EXIF,
            CHUNK_XMP => FLAG_XMP,
            _ => 0,
        };
    }
    let mut vp8x = vec![flags, 0, 0, 0];
    vp8x.extend_from_slice(&(width - 1).to_le_bytes()[..3]);
    vp8x.extend_from_slice(&(height - 1).to_le_bytes()[..3]);

    // Simple layout: "RIFF" size "WEBP" followed by exactly one image chunk.
    let image_chunk = &simple[12..];

    let mut body = b"WEBP".to_vec();
    push_chunk(&mut body, CHUNK_VP8X, &vp8x);
    for (id, data) in extra.iter().filter(|(id, _)| *id == CHUNK_ICCP) {
        push_chunk(&mut body, *id, data);
    }
    body.extend_from_slice(image_chunk);
    for (id, data) in extra.iter().filter(|(id, _)| *id != CHUNK_ICCP) {
        push_chunk(&mut body, *id, data);
    }

    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

#[cfg(test)]
pub(crate) fn simple_webp(width: u32, height: u32) -> Vec<u8> {
    use image_rs::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([10, 200, 40, 255])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::WebP)
        .expect("encode webp");
    bytes
}
