// SPDX-License-Identifier: MPL-2.0
//! Supported upload formats and their MIME types.

use std::fmt;

/// MIME types the sanitizer accepts. Anything else bypasses it.
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/svg+xml",
];

/// How far into a file to look for an `<svg` root when sniffing.
const SVG_SNIFF_LEN: usize = 1024;

/// Image formats handled by the sanitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
    Svg,
}

impl ImageFormat {
    /// All supported formats, in the same order as [`SUPPORTED_MIME_TYPES`].
    pub const ALL: [ImageFormat; 5] = [
        ImageFormat::Jpeg,
        ImageFormat::Png,
        ImageFormat::Gif,
        ImageFormat::WebP,
        ImageFormat::Svg,
    ];

    /// Maps a declared MIME type to a format.
    ///
    /// Parameters (`; charset=...`) are ignored and the comparison is
    /// ASCII case-insensitive. Returns `None` for unsupported types.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        Self::ALL
            .into_iter()
            .find(|format| format.mime_type().eq_ignore_ascii_case(essence))
    }

    pub const fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Gif => "image/gif",
            ImageFormat::WebP => "image/webp",
            ImageFormat::Svg => "image/svg+xml",
        }
    }

    /// The `image` crate format used for pixel verification, if raster.
    pub const fn raster(self) -> Option<image_rs::ImageFormat> {
        match self {
            ImageFormat::Jpeg => Some(image_rs::ImageFormat::Jpeg),
            ImageFormat::Png => Some(image_rs::ImageFormat::Png),
            ImageFormat::Gif => Some(image_rs::ImageFormat::Gif),
            ImageFormat::WebP => Some(image_rs::ImageFormat::WebP),
            ImageFormat::Svg => None,
        }
    }

    /// Detects the format from file content.
    ///
    /// Raster formats are recognised by their magic bytes; SVG by an `<svg`
    /// root near the start of a text document.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if let Ok(format) = image_rs::guess_format(bytes) {
            return match format {
                image_rs::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
                image_rs::ImageFormat::Png => Some(ImageFormat::Png),
                image_rs::ImageFormat::Gif => Some(ImageFormat::Gif),
                image_rs::ImageFormat::WebP => Some(ImageFormat::WebP),
                _ => None,
            };
        }

        looks_like_svg(bytes).then_some(ImageFormat::Svg)
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::Gif => "GIF",
            ImageFormat::WebP => "WebP",
            ImageFormat::Svg => "SVG",
        };
        f.write_str(name)
    }
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(SVG_SNIFF_LEN)];
    let Ok(text) = std::str::from_utf8(head) else {
        // A multi-byte character may straddle the sniff boundary.
        return String::from_utf8_lossy(head).contains("<svg");
    };
    let trimmed = text.trim_start_matches('\u{feff}').trim_start();
    trimmed.starts_with('<') && trimmed.contains("<svg")
}
