// SPDX-License-Identifier: MPL-2.0
//! Fixture builders shared by the integration tests.
//!
//! Every fixture is generated in code: pixels come from the `image`
//! encoders, metadata is injected with `img-parts` (or by hand for GIF and
//! extended WebP), EXIF is written with `kamadak-exif` and XMP packets with
//! `xmp-writer`.

#![allow(dead_code)]

use exif::experimental::Writer as ExifWriter;
use exif::{Field, In, Rational, Tag, Value};
use image_rs::{DynamicImage, Rgba, RgbaImage};
use img_parts::jpeg::{Jpeg, JpegSegment};
use img_parts::png::{Png, PngChunk};
use img_parts::{Bytes, DynImage, ImageEXIF, ImageICC};
use std::io::Cursor;
use upload_scrubber::media::ImageFormat;

/// Author name planted in XMP, comments and text chunks.
pub const AUTHOR: &str = "Jane Doe";
/// Camera make planted in EXIF.
pub const CAMERA: &str = "SpyCam 3000";

pub const RASTER_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

const XMP_JPEG_MARKER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const XMP_PNG_KEYWORD: &[u8] = b"XML:com.adobe.xmp\0";

pub fn extension(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "jpg",
        ImageFormat::Png => "png",
        ImageFormat::Gif => "gif",
        ImageFormat::WebP => "webp",
        ImageFormat::Svg => "svg",
    }
}

/// Raw TIFF-structured EXIF with a camera make and a GPS position.
pub fn exif_with_gps() -> Vec<u8> {
    let make = Field {
        tag: Tag::Make,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![CAMERA.as_bytes().to_vec()]),
    };
    let latitude_ref = Field {
        tag: Tag::GPSLatitudeRef,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![b"N".to_vec()]),
    };
    let latitude = Field {
        tag: Tag::GPSLatitude,
        ifd_num: In::PRIMARY,
        value: Value::Rational(vec![
            Rational::from((48, 1)),
            Rational::from((51, 1)),
            Rational::from((2412, 100)),
        ]),
    };

    let mut writer = ExifWriter::new();
    writer.push_field(&make);
    writer.push_field(&latitude_ref);
    writer.push_field(&latitude);

    let mut out = Cursor::new(Vec::new());
    writer.write(&mut out, false).expect("write exif");
    out.into_inner()
}

pub fn xmp_packet() -> Vec<u8> {
    let mut writer = xmp_writer::XmpWriter::new();
    writer.creator([AUTHOR]);
    writer.title([(None, "Holiday snapshot")]);
    writer.finish(None).into_bytes()
}

/// A syntactically valid ICC profile of `len` bytes (at least 128).
pub fn icc_profile(len: usize) -> Vec<u8> {
    let mut profile = vec![0u8; len];
    profile[..4].copy_from_slice(&(len as u32).to_be_bytes());
    profile[4..8].copy_from_slice(b"test");
    profile[12..16].copy_from_slice(b"mntr");
    profile[16..20].copy_from_slice(b"RGB ");
    profile[20..24].copy_from_slice(b"XYZ ");
    profile[36..40].copy_from_slice(b"acsp");
    for (i, byte) in profile.iter_mut().enumerate().skip(128) {
        *byte = (i % 251) as u8;
    }
    profile
}

fn encode_plain(format: image_rs::ImageFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgba8(RgbaImage::from_fn(12, 9, |x, y| {
        Rgba([(x * 20) as u8, (y * 25) as u8, 128, 255])
    }));
    let image = match format {
        image_rs::ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    };
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encode fixture");
    bytes
}

/// An image of `format` carrying EXIF with GPS, XMP and a comment, plus
/// `profile` when given.
pub fn tagged(format: ImageFormat, profile: Option<&[u8]>) -> Vec<u8> {
    match format {
        ImageFormat::Jpeg => tagged_jpeg(profile),
        ImageFormat::Png => tagged_png(profile),
        ImageFormat::Gif => tagged_gif(profile),
        ImageFormat::WebP => tagged_webp(profile),
        ImageFormat::Svg => tagged_svg().into_bytes(),
    }
}

fn tagged_jpeg(profile: Option<&[u8]>) -> Vec<u8> {
    let plain = encode_plain(image_rs::ImageFormat::Jpeg);
    let mut jpeg = Jpeg::from_bytes(plain.into()).expect("parse jpeg");
    jpeg.set_exif(Some(exif_with_gps().into()));
    jpeg.set_icc_profile(profile.map(Bytes::copy_from_slice));

    let mut xmp = XMP_JPEG_MARKER.to_vec();
    xmp.extend_from_slice(&xmp_packet());
    let segments = jpeg.segments_mut();
    segments.insert(1, JpegSegment::new_with_contents(0xE1, xmp.into()));
    segments.insert(
        1,
        JpegSegment::new_with_contents(0xFE, Bytes::from(format!("Taken by {AUTHOR}"))),
    );

    let mut out = Vec::new();
    jpeg.encoder().write_to(&mut out).expect("write jpeg");
    out
}

fn tagged_png(profile: Option<&[u8]>) -> Vec<u8> {
    let plain = encode_plain(image_rs::ImageFormat::Png);
    let mut png = Png::from_bytes(plain.into()).expect("parse png");
    png.set_exif(Some(exif_with_gps().into()));
    png.set_icc_profile(profile.map(Bytes::copy_from_slice));

    let mut itxt = XMP_PNG_KEYWORD.to_vec();
    itxt.extend_from_slice(&[0, 0, 0, 0]);
    itxt.extend_from_slice(&xmp_packet());
    let chunks = png.chunks_mut();
    chunks.insert(1, PngChunk::new(*b"iTXt", itxt.into()));
    chunks.insert(
        1,
        PngChunk::new(*b"tEXt", Bytes::from(format!("Author\0{AUTHOR}"))),
    );

    let mut out = Vec::new();
    png.encoder().write_to(&mut out).expect("write png");
    out
}

fn gif_application_extension(app_id: &[u8; 11], payload: &[u8]) -> Vec<u8> {
    let mut raw = vec![0x21, 0xFF, 11];
    raw.extend_from_slice(app_id);
    for chunk in payload.chunks(255) {
        raw.push(chunk.len() as u8);
        raw.extend_from_slice(chunk);
    }
    raw.push(0);
    raw
}

fn gif_body_start(gif: &[u8]) -> usize {
    let packed = gif[10];
    let table = if packed & 0x80 != 0 {
        3 * (1usize << ((packed & 0x07) + 1))
    } else {
        0
    };
    13 + table
}

/// The NETSCAPE2.0 loop extension ("loop forever").
pub fn gif_loop_extension() -> Vec<u8> {
    vec![
        0x21, 0xFF, 11, b'N', b'E', b'T', b'S', b'C', b'A', b'P', b'E', b'2', b'.', b'0', 3, 1, 0,
        0, 0,
    ]
}

fn tagged_gif(profile: Option<&[u8]>) -> Vec<u8> {
    let plain = encode_plain(image_rs::ImageFormat::Gif);
    let body = gif_body_start(&plain);

    let mut comment = vec![0x21, 0xFE];
    let text = format!("Drawn by {AUTHOR}");
    comment.push(text.len() as u8);
    comment.extend_from_slice(text.as_bytes());
    comment.push(0);

    let mut out = plain[..body].to_vec();
    out.extend_from_slice(&gif_loop_extension());
    if let Some(profile) = profile {
        out.extend_from_slice(&gif_application_extension(b"ICCRGBG1012", profile));
    }
    out.extend_from_slice(&comment);
    out.extend_from_slice(&gif_application_extension(b"XMP DataXMP", &xmp_packet()));
    out.extend_from_slice(&plain[body..]);
    out
}

/// Reads the profile from a GIF `ICCRGBG1012` application extension.
pub fn gif_icc_profile(gif: &[u8]) -> Option<Vec<u8>> {
    let id = b"\x0bICCRGBG1012";
    let start = gif.windows(id.len()).position(|w| w == id)? + id.len();
    let mut pos = start;
    let mut profile = Vec::new();
    loop {
        let len = *gif.get(pos)? as usize;
        if len == 0 {
            return Some(profile);
        }
        profile.extend_from_slice(gif.get(pos + 1..pos + 1 + len)?);
        pos += 1 + len;
    }
}

fn push_riff_chunk(out: &mut Vec<u8>, id: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(id);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
}

fn tagged_webp(profile: Option<&[u8]>) -> Vec<u8> {
    let plain = encode_plain(image_rs::ImageFormat::WebP);
    let (width, height) = (12u32, 9u32);

    let mut flags = 0x08 | 0x04;
    if profile.is_some() {
        flags |= 0x20;
    }
    let mut vp8x = vec![flags, 0, 0, 0];
    vp8x.extend_from_slice(&(width - 1).to_le_bytes()[..3]);
    vp8x.extend_from_slice(&(height - 1).to_le_bytes()[..3]);

    let mut body = b"WEBP".to_vec();
    push_riff_chunk(&mut body, b"VP8X", &vp8x);
    if let Some(profile) = profile {
        push_riff_chunk(&mut body, b"ICCP", profile);
    }
    // Simple layout: "RIFF" size "WEBP" then exactly one image chunk.
    body.extend_from_slice(&plain[12..]);
    push_riff_chunk(&mut body, b"EXIF", &exif_with_gps());
    push_riff_chunk(&mut body, b"XMP ", &xmp_packet());

    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

pub fn tagged_svg() -> String {
    format!(
        r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<!-- Created with Inkscape by {AUTHOR} -->
<svg xmlns="http://www.w3.org/2000/svg"
   xmlns:sodipodi="http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd"
   xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape"
   xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
   xmlns:dc="http://purl.org/dc/elements/1.1/"
   width="12" height="9" viewBox="0 0 12 9"
   sodipodi:docname="logo.svg" inkscape:version="1.3">
  <sodipodi:namedview id="namedview1" pagecolor="white"/>
  <metadata>
    <rdf:RDF><rdf:Description><dc:creator>{AUTHOR}</dc:creator></rdf:Description></rdf:RDF>
  </metadata>
  <g inkscape:label="Layer 1" inkscape:groupmode="layer">
    <rect width="12" height="9" fill="#3366cc"/>
  </g>
</svg>
"##
    )
}

/// ICC profile embedded in a JPEG, PNG or WebP file.
pub fn container_icc_profile(bytes: &[u8]) -> Option<Vec<u8>> {
    let image = DynImage::from_bytes(Bytes::copy_from_slice(bytes)).ok()??;
    image.icc_profile().map(|p| p.to_vec())
}

/// EXIF block embedded in a JPEG, PNG or WebP file.
pub fn container_exif(bytes: &[u8]) -> Option<Vec<u8>> {
    let image = DynImage::from_bytes(Bytes::copy_from_slice(bytes)).ok()??;
    image.exif().map(|p| p.to_vec())
}

/// Embedded ICC profile of any raster fixture.
pub fn icc_profile_of(format: ImageFormat, bytes: &[u8]) -> Option<Vec<u8>> {
    match format {
        ImageFormat::Gif => gif_icc_profile(bytes),
        ImageFormat::Svg => None,
        _ => container_icc_profile(bytes),
    }
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Asserts that no planted metadata survived and the result still decodes.
pub fn assert_clean(format: ImageFormat, bytes: &[u8]) {
    assert!(!contains(bytes, AUTHOR.as_bytes()), "{format}: author survived");
    assert!(!contains(bytes, CAMERA.as_bytes()), "{format}: EXIF survived");
    assert!(!contains(bytes, b"Holiday snapshot"), "{format}: XMP survived");
    if matches!(format, ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP) {
        assert!(container_exif(bytes).is_none(), "{format}: EXIF block survived");
    }
    assert_decodes(format, bytes);
}

pub fn assert_decodes(format: ImageFormat, bytes: &[u8]) {
    match format.raster() {
        Some(raster) => {
            let image = image_rs::load_from_memory_with_format(bytes, raster)
                .unwrap_or_else(|e| panic!("{format} output does not decode: {e}"));
            assert_eq!((image.width(), image.height()), (12, 9));
        }
        None => {
            resvg::usvg::Tree::from_data(bytes, &resvg::usvg::Options::default())
                .unwrap_or_else(|e| panic!("SVG output does not parse: {e}"));
        }
    }
}
