//! PDF text decoding.
//!
//! Enough of a PDF reader to pull linear text out of the first pages of a
//! paper: `lopdf` parses the file structure and content streams; this module
//! interprets the text operators and decodes font encodings.
//!
//! | Module | Concern |
//! |--------|---------|
//! | [`cmap`] | CMap programs (ToUnicode, CID maps, UCS-2 maps) |
//! | [`encoding`] | single-byte encodings and glyph names |
//! | `font` | font dictionary → decoder, per-document cache |
//! | `content` | content-stream text operators, form XObjects |

pub mod cmap;
mod content;
pub mod encoding;
mod font;

pub use font::standard_font_name;

use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use once_cell::sync::Lazy;
use pdf_resources::ResourceStore;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::PageLimit;
use crate::error::ExtractError;
use content::PageText;
use font::FontCache;

/// `Parent` chains longer than this are treated as broken.
const MAX_PAGE_TREE_DEPTH: usize = 32;

/// Runs of horizontal whitespace.
static RE_HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());

/// Extracts linear text from the leading pages of a PDF.
///
/// Cheap to clone; the resource store (and its font cache) is shared.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    resources: Arc<ResourceStore>,
}

impl TextExtractor {
    pub fn new(resources: Arc<ResourceStore>) -> Self {
        Self { resources }
    }

    /// Extractor over the files embedded in `pdf-resources`.
    ///
    /// CJK documents that name a predefined CMap need [`TextExtractor::new`]
    /// with a store over a full CMap directory.
    pub fn bundled() -> Self {
        Self::new(Arc::new(ResourceStore::bundled()))
    }

    pub fn resources(&self) -> &Arc<ResourceStore> {
        &self.resources
    }

    /// Text of the first `limit` pages, pages joined by `\n`.
    ///
    /// Pages without text contribute nothing, so the result for `n` pages is
    /// always a prefix of the result for `n + 1`.
    pub fn extract_bytes(&self, bytes: &[u8], limit: PageLimit) -> Result<String, ExtractError> {
        let pages = self.extract_pages(bytes, limit)?;
        Ok(pages
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Normalised text of each of the first `limit` pages, in page order.
    ///
    /// Encrypted documents are opened with the empty user password; anything
    /// else is [`ExtractError::Encrypted`]. Once the document structure has
    /// been read, a broken page or font only costs its own text.
    pub fn extract_pages(
        &self,
        bytes: &[u8],
        limit: PageLimit,
    ) -> Result<Vec<String>, ExtractError> {
        let mut doc = Document::load_mem(bytes)?;
        if doc.trailer.has(b"Encrypt") {
            if let Err(e) = doc.decrypt("") {
                debug!(error = %e, "Empty user password rejected");
                return Err(ExtractError::Encrypted);
            }
            debug!("Opened encrypted PDF with the empty user password");
        }

        let pages = doc.get_pages();
        debug!(total = pages.len(), limit = limit.get(), "Decoding pages");

        let mut fonts = FontCache::new(&doc, &self.resources);
        let mut out = Vec::with_capacity(limit.get().min(pages.len()));
        for (&number, &page_id) in pages.iter().take(limit.get()) {
            out.push(self.page_text(&doc, &mut fonts, number, page_id));
        }
        Ok(out)
    }

    fn page_text<'d>(
        &self,
        doc: &'d Document,
        fonts: &mut FontCache<'d>,
        number: u32,
        page_id: ObjectId,
    ) -> String {
        let content = match doc.get_page_content(page_id) {
            Ok(c) => c,
            Err(e) => {
                warn!(page = number, error = %e, "Unreadable page content, skipping page");
                return String::new();
            }
        };
        let resources = page_resources(doc, page_id);

        let mut page = PageText::new(doc, fonts);
        if let Err(e) = page.run(&content, resources, 0) {
            warn!(page = number, error = %e, "Malformed content stream, keeping partial text");
        }
        normalize_whitespace(&page.finish())
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::bundled()
    }
}

/// Collapse horizontal whitespace, trim lines, drop empty lines, and expand
/// typographic ligatures.
pub fn normalize_whitespace(raw: &str) -> String {
    let expanded = expand_ligatures(raw);
    expanded
        .lines()
        .map(|line| RE_HSPACE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn expand_ligatures(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\u{FB00}' => out.push_str("ff"),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB03}' => out.push_str("ffi"),
            '\u{FB04}' => out.push_str("ffl"),
            _ => out.push(ch),
        }
    }
    out
}

// ── Object helpers shared by the decoder modules ─────────────────────────────

/// Follow one level of indirection.
pub(crate) fn resolve<'d>(doc: &'d Document, obj: &'d Object) -> Option<&'d Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Dictionary lookup with indirection resolved.
pub(crate) fn dict_get<'d>(
    doc: &'d Document,
    dict: &'d Dictionary,
    key: &[u8],
) -> Option<&'d Object> {
    dict.get(key).ok().and_then(|o| resolve(doc, o))
}

pub(crate) fn name_of(obj: &Object) -> Option<&[u8]> {
    obj.as_name().ok()
}

/// Text of a string or name object.
pub(crate) fn text_of(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) | Object::Name(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        _ => None,
    }
}

/// Stream payload, decompressed when a filter is declared.
pub(crate) fn stream_bytes(stream: &Stream) -> Vec<u8> {
    if stream.dict.has(b"Filter") {
        stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone())
    } else {
        stream.content.clone()
    }
}

/// The page's `Resources`, inherited through `Parent` when absent.
fn page_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_PAGE_TREE_DEPTH {
        if let Some(res) = dict_get(doc, node, b"Resources").and_then(|o| o.as_dict().ok()) {
            return Some(res);
        }
        node = dict_get(doc, node, b"Parent")?.as_dict().ok()?;
    }
    None
}

#[cfg(test)]
pub(crate) mod testing {
    //! Builders for small in-memory PDFs.

    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

    /// A PDF whose page `i` shows the lines in `pages[i]`, one per baseline,
    /// in Helvetica with WinAnsi encoding. Resources live on the page tree
    /// root so pages exercise inheritance.
    pub fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for lines in pages {
            let mut ops = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("TL", vec![14.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
            ];
            for line in lines.iter() {
                ops.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                ops.push(Operation::new("T*", vec![]));
            }
            ops.push(Operation::new("ET", vec![]));
            let content = Content { operations: ops }.encode().unwrap();
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![Object::Integer(0), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    /// Two pages: Helvetica text, then a Type0 font over `UniGB-UCS2-H`
    /// with a `ToUnicode` map.
    pub fn pdf_with_cjk_second_page() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let latin = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let to_unicode = doc.add_object(Stream::new(
            Dictionary::new(),
            b"1 begincodespacerange <0000> <FFFF> endcodespacerange
2 beginbfchar <4E2D> <4E2D> <6587> <6587> endbfchar"
                .to_vec(),
        ));
        let cjk = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "STSong-Light",
            "Encoding" => "UniGB-UCS2-H",
            "ToUnicode" => to_unicode,
        });

        let shown: [(Object, Vec<u8>); 2] = [
            (Object::Reference(latin), b"first page".to_vec()),
            (Object::Reference(cjk), vec![0x4E, 0x2D, 0x65, 0x87]),
        ];
        let mut kids = Vec::new();
        for (font, text) in shown {
            let ops = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::String(text, StringFormat::Hexadecimal)]),
                Operation::new("ET", vec![]),
            ];
            let content = Content { operations: ops }.encode().unwrap();
            let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! { "Font" => dictionary! { "F1" => font } },
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => 2,
                "MediaBox" => vec![Object::Integer(0), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }
}
