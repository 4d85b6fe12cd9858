// SPDX-License-Identifier: MPL-2.0
//! PNG metadata stripping.
//!
//! Only the ancillary chunks that carry descriptive data are removed. Chunks
//! that affect rendering (palette, transparency, gamma, chromaticities,
//! sRGB intent, physical size, APNG animation) stay where they are.

use crate::error::{ProfileReadError, SanitizeError};
use crate::media::container::{exif_has_gps, MetadataContainer, RemovedMetadata};
use crate::media::icc::IccProfile;
use img_parts::png::Png;
use img_parts::{Bytes, ImageICC};

const CHUNK_TEXT: [u8; 4] = *b"tEXt";
const CHUNK_ZTXT: [u8; 4] = *b"zTXt";
const CHUNK_ITXT: [u8; 4] = *b"iTXt";
const CHUNK_EXIF: [u8; 4] = *b"eXIf";
const CHUNK_TIME: [u8; 4] = *b"tIME";
const CHUNK_ICCP: [u8; 4] = *b"iCCP";

/// iTXt keyword under which XMP packets are stored.
const XMP_KEYWORD: &[u8] = b"XML:com.adobe.xmp\0";

pub struct PngContainer {
    png: Png,
}

impl PngContainer {
    pub fn parse(bytes: Vec<u8>) -> Result<Self, SanitizeError> {
        let png = Png::from_bytes(Bytes::from(bytes))
            .map_err(|e| SanitizeError::Decode(format!("Failed to parse PNG: {e}")))?;
        Ok(Self { png })
    }
}

impl MetadataContainer for PngContainer {
    fn icc_profile(&self) -> Result<IccProfile, ProfileReadError> {
        let has_iccp = self
            .png
            .chunks()
            .iter()
            .any(|chunk| chunk.kind() == CHUNK_ICCP);

        match self.png.icc_profile() {
            Some(profile) => IccProfile::parse(profile),
            None if has_iccp => Err(ProfileReadError::Malformed(
                "iCCP chunk could not be decompressed".to_string(),
            )),
            None => Err(ProfileReadError::Missing),
        }
    }

    fn strip(&mut self) -> Result<RemovedMetadata, SanitizeError> {
        let mut removed = RemovedMetadata::default();

        self.png.chunks_mut().retain(|chunk| {
            let contents = chunk.contents();
            match chunk.kind() {
                CHUNK_EXIF => {
                    removed.exif += 1;
                    removed.gps |= exif_has_gps(contents);
                }
                CHUNK_ITXT if contents.starts_with(XMP_KEYWORD) => removed.xmp += 1,
                CHUNK_TEXT | CHUNK_ZTXT | CHUNK_ITXT => removed.comments += 1,
                CHUNK_TIME => removed.other += 1,
                CHUNK_ICCP => removed.icc_profiles = 1,
                _ => return true,
            }
            false
        });

        Ok(removed)
    }

    fn restore_icc_profile(&mut self, profile: &IccProfile) {
        self.png.set_icc_profile(Some(profile.to_bytes()));
    }

    fn encode(self: Box<Self>) -> Result<Vec<u8>, SanitizeError> {
        let mut output = Vec::new();
        self.png
            .encoder()
            .write_to(&mut output)
            .map_err(|e| SanitizeError::EncodeOrWrite(format!("Failed to write PNG: {e}")))?;
        Ok(output)
    }
}
