// SPDX-License-Identifier: MPL-2.0
//! ICC colour profile blobs.
//!
//! The sanitizer treats a profile as opaque bytes. It only checks the fixed
//! header fields needed to tell a real profile from a damaged block, so that
//! a truncated or foreign payload is not carried over into the cleaned file.

use crate::error::ProfileReadError;
use img_parts::Bytes;

/// Size of the fixed ICC profile header.
pub const ICC_HEADER_LEN: usize = 128;

/// Offset of the `acsp` profile file signature inside the header.
const SIGNATURE_OFFSET: usize = 36;
const SIGNATURE: &[u8; 4] = b"acsp";

/// An embedded ICC colour profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IccProfile(Bytes);

impl IccProfile {
    /// Validates and wraps raw profile bytes.
    ///
    /// The blob may be longer than the size declared in its header (some
    /// writers pad it); it is kept byte for byte in that case.
    pub fn parse(bytes: impl Into<Bytes>) -> Result<Self, ProfileReadError> {
        let bytes = bytes.into();

        if bytes.is_empty() {
            return Err(ProfileReadError::Missing);
        }
        if bytes.len() < ICC_HEADER_LEN {
            return Err(ProfileReadError::Malformed(format!(
                "{} bytes is shorter than the {ICC_HEADER_LEN}-byte header",
                bytes.len()
            )));
        }

        let declared = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if declared > bytes.len() {
            return Err(ProfileReadError::Malformed(format!(
                "header declares {declared} bytes but only {} are present",
                bytes.len()
            )));
        }

        if &bytes[SIGNATURE_OFFSET..SIGNATURE_OFFSET + SIGNATURE.len()] != SIGNATURE {
            return Err(ProfileReadError::Malformed(
                "missing 'acsp' signature".to_string(),
            ));
        }

        Ok(Self(bytes))
    }

    /// Maps an optional raw profile block to a parsed profile.
    pub fn from_block(block: Option<impl Into<Bytes>>) -> Result<Self, ProfileReadError> {
        match block {
            Some(bytes) => Self::parse(bytes),
            None => Err(ProfileReadError::Missing),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Cheap clone of the underlying buffer.
    pub fn to_bytes(&self) -> Bytes {
        self.0.clone()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
pub(crate) fn sample_profile(len: usize) -> Vec<u8> {
    let mut profile: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    profile[..4].copy_from_slice(&(len as u32).to_be_bytes());
    profile[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 4].copy_from_slice(SIGNATURE);
    profile
}
