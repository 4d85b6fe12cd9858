// SPDX-License-Identifier: MPL-2.0
//! SVG metadata stripping.
//!
//! SVG carries descriptive data as markup: `<metadata>` elements (usually
//! wrapping an RDF/Dublin Core description), XML comments, processing
//! instructions such as `<?xpacket?>`, and editor bookkeeping in the
//! Inkscape/Sodipodi namespaces. Those are removed; the rest of the
//! document is streamed through unchanged. `<color-profile>` references are
//! rendering data and stay put, so SVG never has an embedded profile to
//! restore.

use crate::error::{ProfileReadError, SanitizeError};
use crate::media::container::{MetadataContainer, RemovedMetadata};
use crate::media::icc::IccProfile;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::{NsReader, Reader, Writer};

const SVG_NS: &[u8] = b"http://www.w3.org/2000/svg";

/// Namespaces whose elements are pure metadata.
const METADATA_NAMESPACES: &[&[u8]] = &[
    b"http://www.w3.org/1999/02/22-rdf-syntax-ns#",
    b"http://purl.org/dc/elements/1.1/",
    b"http://creativecommons.org/ns#",
    b"http://web.resource.org/cc/",
    b"adobe:ns:meta/",
];

/// Editor namespaces; their elements and attributes are both dropped.
const EDITOR_NAMESPACES: &[&[u8]] = &[
    b"http://sodipodi.sourceforge.net/DTD/sodipodi-0.dtd",
    b"http://www.inkscape.org/namespaces/inkscape",
];

pub struct SvgContainer {
    source: Vec<u8>,
    stripped: Option<Vec<u8>>,
}

impl SvgContainer {
    /// Checks that the document is well-formed XML with an `<svg>` root.
    pub fn parse(source: Vec<u8>) -> Result<Self, SanitizeError> {
        let mut reader = Reader::from_reader(source.as_slice());
        let mut buf = Vec::new();
        let mut saw_root = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if !saw_root => {
                    if e.local_name().as_ref() != b"svg" {
                        return Err(SanitizeError::Decode(format!(
                            "Root element is <{}>, not <svg>",
                            String::from_utf8_lossy(e.name().as_ref())
                        )));
                    }
                    saw_root = true;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(SanitizeError::Decode(format!(
                        "Invalid SVG at byte {}: {e}",
                        reader.error_position()
                    )));
                }
            }
            buf.clear();
        }

        if !saw_root {
            return Err(SanitizeError::Decode("Document has no <svg> root".to_string()));
        }

        Ok(Self {
            source,
            stripped: None,
        })
    }

    fn current(&self) -> &[u8] {
        self.stripped.as_deref().unwrap_or(&self.source)
    }
}

/// Vocabulary an element or attribute belongs to, after namespace
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vocabulary {
    /// The SVG namespace, or no namespace at all.
    Svg,
    Metadata,
    Editor,
    Other,
}

impl Vocabulary {
    fn of_uri(uri: &[u8]) -> Self {
        if uri == SVG_NS {
            Self::Svg
        } else if METADATA_NAMESPACES.contains(&uri) {
            Self::Metadata
        } else if EDITOR_NAMESPACES.contains(&uri) {
            Self::Editor
        } else {
            Self::Other
        }
    }

    fn resolved(result: &ResolveResult<'_>) -> Self {
        match result {
            ResolveResult::Bound(Namespace(uri)) => Self::of_uri(uri),
            ResolveResult::Unbound => Self::Svg,
            ResolveResult::Unknown(_) => Self::Other,
        }
    }
}

/// How a metadata element is tallied once removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementKind {
    Xmp,
    Other,
}

fn metadata_element_kind(vocabulary: Vocabulary, local_name: &[u8]) -> Option<ElementKind> {
    match vocabulary {
        Vocabulary::Svg if local_name == b"metadata" => Some(ElementKind::Xmp),
        Vocabulary::Metadata if local_name == b"xmpmeta" => Some(ElementKind::Xmp),
        Vocabulary::Metadata | Vocabulary::Editor => Some(ElementKind::Other),
        Vocabulary::Svg | Vocabulary::Other => None,
    }
}

fn is_editor_attribute(reader: &NsReader<&[u8]>, attr: &Attribute<'_>) -> bool {
    // `xmlns:foo="<editor namespace>"` declarations go along with the
    // attributes they bind.
    if attr.key.as_namespace_binding().is_some() {
        return EDITOR_NAMESPACES.contains(&attr.value.as_ref());
    }
    let (namespace, _) = reader.resolve_attribute(attr.key);
    Vocabulary::resolved(&namespace) == Vocabulary::Editor
}

fn attribute_error(e: impl std::fmt::Display) -> SanitizeError {
    SanitizeError::Decode(format!("Invalid SVG attribute: {e}"))
}

/// Returns a copy of `element` without editor attributes, or `None` if it
/// has none to drop.
fn without_editor_attributes(
    reader: &NsReader<&[u8]>,
    element: &BytesStart<'_>,
) -> Result<Option<BytesStart<'static>>, SanitizeError> {
    let mut kept = Vec::new();
    let mut dropped = false;
    for attr in element.attributes() {
        let attr = attr.map_err(attribute_error)?;
        if is_editor_attribute(reader, &attr) {
            dropped = true;
        } else {
            kept.push(attr);
        }
    }
    if !dropped {
        return Ok(None);
    }

    let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
    let mut cleaned = BytesStart::new(name);
    for attr in kept {
        // Values are written back double-quoted; a `"` that was legal
        // inside single quotes has to become a reference.
        let value = attr.value.as_ref();
        let value = if value.contains(&b'"') {
            value.iter().fold(Vec::with_capacity(value.len() + 8), |mut out, &b| {
                match b {
                    b'"' => out.extend_from_slice(b"&quot;"),
                    _ => out.push(b),
                }
                out
            })
        } else {
            value.to_vec()
        };
        cleaned.push_attribute(Attribute {
            key: attr.key,
            value: value.into(),
        });
    }
    Ok(Some(cleaned))
}

/// What to do with one event outside removed subtrees.
enum Action {
    Keep,
    Drop,
    SkipSubtree,
    Replace(Event<'static>),
}

fn write_error(e: impl std::fmt::Display) -> SanitizeError {
    SanitizeError::EncodeOrWrite(format!("Failed to write SVG: {e}"))
}

fn strip_document(source: &[u8], removed: &mut RemovedMetadata) -> Result<Vec<u8>, SanitizeError> {
    let mut reader = NsReader::from_reader(source);
    let mut writer = Writer::new(Vec::with_capacity(source.len()));
    let mut buf = Vec::new();
    // Nesting depth inside a removed subtree; zero when copying.
    let mut skip_depth = 0usize;

    loop {
        buf.clear();
        let (vocabulary, event) = {
            let (namespace, event) = reader
                .read_resolved_event_into(&mut buf)
                .map_err(|e| SanitizeError::Decode(format!("Invalid SVG: {e}")))?;
            (Vocabulary::resolved(&namespace), event)
        };

        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        let action = match &event {
            Event::Eof => break,
            Event::Comment(_) => {
                removed.comments += 1;
                Action::Drop
            }
            Event::PI(_) => {
                removed.other += 1;
                Action::Drop
            }
            Event::Start(e) | Event::Empty(e) => {
                match metadata_element_kind(vocabulary, e.local_name().as_ref()) {
                    Some(kind) => {
                        match kind {
                            ElementKind::Xmp => removed.xmp += 1,
                            ElementKind::Other => removed.other += 1,
                        }
                        if matches!(event, Event::Start(_)) {
                            Action::SkipSubtree
                        } else {
                            Action::Drop
                        }
                    }
                    None => match without_editor_attributes(&reader, e)? {
                        Some(cleaned) if matches!(event, Event::Start(_)) => {
                            Action::Replace(Event::Start(cleaned))
                        }
                        Some(cleaned) => Action::Replace(Event::Empty(cleaned)),
                        None => Action::Keep,
                    },
                }
            }
            _ => Action::Keep,
        };

        match action {
            Action::Keep => writer.write_event(event).map_err(write_error)?,
            Action::Drop => {}
            Action::SkipSubtree => skip_depth = 1,
            Action::Replace(cleaned) => {
                removed.other += 1;
                writer.write_event(cleaned).map_err(write_error)?;
            }
        }
    }

    Ok(writer.into_inner())
}

impl MetadataContainer for SvgContainer {
    fn icc_profile(&self) -> Result<IccProfile, ProfileReadError> {
        Err(ProfileReadError::Missing)
    }

    fn strip(&mut self) -> Result<RemovedMetadata, SanitizeError> {
        let mut removed = RemovedMetadata::default();
        let stripped = strip_document(self.current(), &mut removed)?;
        self.stripped = Some(stripped);
        Ok(removed)
    }

    fn restore_icc_profile(&mut self, _profile: &IccProfile) {}

    fn encode(self: Box<Self>) -> Result<Vec<u8>, SanitizeError> {
        Ok(self.stripped.unwrap_or(self.source))
    }
}
