// SPDX-License-Identifier: MPL-2.0
//! GIF metadata stripping.
//!
//! A GIF is a header, an optional global colour table and a sequence of
//! blocks. Metadata rides in extension blocks: comments (label `0xFE`) and
//! application extensions such as `XMP DataXMP`. The loop-count extensions
//! (`NETSCAPE2.0`, `ANIMEXTS1.0`) drive playback and are kept. An ICC
//! profile is stored in an `ICCRGBG1` / `012` application extension whose
//! sub-blocks concatenate to the profile.
//!
//! Blocks are kept verbatim; nothing after the trailer survives.

use crate::error::{ProfileReadError, SanitizeError};
use crate::media::container::{MetadataContainer, RemovedMetadata};
use crate::media::icc::IccProfile;

const EXTENSION_INTRODUCER: u8 = 0x21;
const IMAGE_SEPARATOR: u8 = 0x2C;
const TRAILER: u8 = 0x3B;

const LABEL_COMMENT: u8 = 0xFE;
const LABEL_APPLICATION: u8 = 0xFF;

/// Screen descriptor plus the 6-byte signature.
const HEADER_LEN: usize = 13;
const APP_ID_LEN: usize = 11;
const MAX_SUB_BLOCK: usize = 255;

const ICC_APP_ID: &[u8; APP_ID_LEN] = b"ICCRGBG1012";
const XMP_APP_ID: &[u8; APP_ID_LEN] = b"XMP DataXMP";
const PLAYBACK_APP_IDS: &[&[u8; APP_ID_LEN]] = &[b"NETSCAPE2.0", b"ANIMEXTS1.0"];

#[derive(Debug, Clone)]
enum Block {
    /// Extension block; `app_id` is set for application extensions.
    Extension {
        label: u8,
        app_id: Option<[u8; APP_ID_LEN]>,
        raw: Vec<u8>,
    },
    /// Image descriptor, local colour table and image data.
    Image(Vec<u8>),
}

pub struct GifContainer {
    /// Signature, screen descriptor and global colour table.
    header: Vec<u8>,
    blocks: Vec<Block>,
}

/// Forward-only reader over the raw file with bounds-checked reads.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn byte(&mut self) -> Result<u8, SanitizeError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| truncated(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    fn skip(&mut self, len: usize) -> Result<(), SanitizeError> {
        if self.pos + len > self.bytes.len() {
            return Err(truncated(self.pos));
        }
        self.pos += len;
        Ok(())
    }

    /// Skips a chain of data sub-blocks up to and including the terminator.
    fn skip_sub_blocks(&mut self) -> Result<(), SanitizeError> {
        loop {
            let len = self.byte()? as usize;
            if len == 0 {
                return Ok(());
            }
            self.skip(len)?;
        }
    }

    fn since(&self, start: usize) -> Vec<u8> {
        self.bytes[start..self.pos].to_vec()
    }
}

fn truncated(pos: usize) -> SanitizeError {
    SanitizeError::Decode(format!("GIF data truncated at byte {pos}"))
}

fn color_table_len(packed: u8) -> usize {
    if packed & 0x80 == 0 {
        0
    } else {
        3 * (1usize << ((packed & 0x07) + 1))
    }
}

impl GifContainer {
    pub fn parse(bytes: &[u8]) -> Result<Self, SanitizeError> {
        if !(bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a")) {
            return Err(SanitizeError::Decode("Missing GIF signature".to_string()));
        }

        let mut cursor = Cursor { bytes, pos: 0 };
        cursor.skip(HEADER_LEN)?;
        cursor.skip(color_table_len(bytes[10]))?;
        let header = cursor.since(0);

        let mut blocks = Vec::new();
        loop {
            let start = cursor.pos;
            match cursor.byte()? {
                TRAILER => break,
                IMAGE_SEPARATOR => {
                    // left, top, width, height
                    cursor.skip(8)?;
                    let packed = cursor.byte()?;
                    cursor.skip(color_table_len(packed))?;
                    // LZW minimum code size
                    cursor.skip(1)?;
                    cursor.skip_sub_blocks()?;
                    blocks.push(Block::Image(cursor.since(start)));
                }
                EXTENSION_INTRODUCER => {
                    let label = cursor.byte()?;
                    let app_id = if label == LABEL_APPLICATION {
                        let id_start = cursor.pos + 1;
                        let id_len = bytes.get(cursor.pos).copied().map(usize::from);
                        match bytes.get(id_start..id_start + APP_ID_LEN) {
                            Some(id) if id_len == Some(APP_ID_LEN) => {
                                let mut app_id = [0u8; APP_ID_LEN];
                                app_id.copy_from_slice(id);
                                Some(app_id)
                            }
                            _ => None,
                        }
                    } else {
                        None
                    };
                    cursor.skip_sub_blocks()?;
                    blocks.push(Block::Extension {
                        label,
                        app_id,
                        raw: cursor.since(start),
                    });
                }
                other => {
                    return Err(SanitizeError::Decode(format!(
                        "Unexpected GIF block 0x{other:02X} at byte {start}"
                    )));
                }
            }
        }

        Ok(Self { header, blocks })
    }

    fn profile_block(&self) -> Option<&[u8]> {
        self.blocks.iter().find_map(|block| match block {
            Block::Extension {
                app_id: Some(id),
                raw,
                ..
            } if id == ICC_APP_ID => Some(raw.as_slice()),
            _ => None,
        })
    }
}

/// Concatenates the sub-blocks of an application extension after its
/// identifier block.
fn application_payload(raw: &[u8]) -> Option<Vec<u8>> {
    // introducer, label, id block (length byte + 11 bytes)
    let mut pos = 2 + 1 + APP_ID_LEN;
    let mut payload = Vec::new();
    loop {
        let len = *raw.get(pos)? as usize;
        if len == 0 {
            return Some(payload);
        }
        payload.extend_from_slice(raw.get(pos + 1..pos + 1 + len)?);
        pos += 1 + len;
    }
}

fn encode_application_extension(app_id: &[u8; APP_ID_LEN], payload: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(payload.len() + payload.len() / MAX_SUB_BLOCK + 16);
    raw.extend_from_slice(&[EXTENSION_INTRODUCER, LABEL_APPLICATION, APP_ID_LEN as u8]);
    raw.extend_from_slice(app_id);
    for chunk in payload.chunks(MAX_SUB_BLOCK) {
        raw.push(chunk.len() as u8);
        raw.extend_from_slice(chunk);
    }
    raw.push(0);
    raw
}

impl MetadataContainer for GifContainer {
    fn icc_profile(&self) -> Result<IccProfile, ProfileReadError> {
        let Some(raw) = self.profile_block() else {
            return Err(ProfileReadError::Missing);
        };
        let payload = application_payload(raw).ok_or_else(|| {
            ProfileReadError::Malformed("ICCRGBG1 extension sub-blocks are truncated".to_string())
        })?;
        IccProfile::parse(payload)
    }

    fn strip(&mut self) -> Result<RemovedMetadata, SanitizeError> {
        let mut removed = RemovedMetadata::default();

        self.blocks.retain(|block| {
            let Block::Extension { label, app_id, .. } = block else {
                return true;
            };
            match (*label, app_id) {
                (LABEL_COMMENT, _) => removed.comments += 1,
                (LABEL_APPLICATION, Some(id)) if id == ICC_APP_ID => removed.icc_profiles = 1,
                (LABEL_APPLICATION, Some(id)) if id == XMP_APP_ID => removed.xmp += 1,
                (LABEL_APPLICATION, Some(id)) if PLAYBACK_APP_IDS.contains(&id) => return true,
                (LABEL_APPLICATION, _) => removed.other += 1,
                _ => return true,
            }
            false
        });

        Ok(removed)
    }

    fn restore_icc_profile(&mut self, profile: &IccProfile) {
        let raw = encode_application_extension(ICC_APP_ID, profile.as_bytes());
        // Loop control stays first, right after the global colour table.
        let index = self
            .blocks
            .iter()
            .take_while(|block| {
                matches!(
                    block,
                    Block::Extension { label: LABEL_APPLICATION, app_id: Some(id), .. }
                        if PLAYBACK_APP_IDS.contains(&id)
                )
            })
            .count();
        self.blocks.insert(
            index,
            Block::Extension {
                label: LABEL_APPLICATION,
                app_id: Some(*ICC_APP_ID),
                raw,
            },
        );
    }

    fn encode(self: Box<Self>) -> Result<Vec<u8>, SanitizeError> {
        let mut output = self.header;
        for block in self.blocks {
            match block {
                Block::Extension { raw, .. } | Block::Image(raw) => output.extend(raw),
            }
        }
        output.push(TRAILER);
        Ok(output)
    }
}

#[cfg(test)]
pub(crate) fn plain_gif() -> Vec<u8> {
    use image_rs::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor as IoCursor;

    let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(5, 3, Rgba([250, 250, 0, 255])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut IoCursor::new(&mut bytes), ImageFormat::Gif)
        .expect("encode gif");
    bytes
}

/// Inserts extension blocks right after the header and global colour table.
#[cfg(test)]
pub(crate) fn with_extensions(gif: &[u8], extensions: &[Vec<u8>]) -> Vec<u8> {
    let body_start = HEADER_LEN + color_table_len(gif[10]);
    let mut out = gif[..body_start].to_vec();
    for extension in extensions {
        out.extend_from_slice(extension);
    }
    out.extend_from_slice(&gif[body_start..]);
    out
}

#[cfg(test)]
pub(crate) fn comment_extension(text: &[u8]) -> Vec<u8> {
    let mut raw = vec![EXTENSION_INTRODUCER, LABEL_COMMENT, text.len() as u8];
    raw.extend_from_slice(text);
    raw.push(0);
    raw
}

#[cfg(test)]
pub(crate) fn icc_extension(profile: &[u8]) -> Vec<u8> {
    encode_application_extension(ICC_APP_ID, profile)
}

#[cfg(test)]
pub(crate) fn xmp_extension(packet: &[u8]) -> Vec<u8> {
    encode_application_extension(XMP_APP_ID, packet)
}
