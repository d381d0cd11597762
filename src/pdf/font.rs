//! Font dictionaries → byte decoders.
//!
//! A [`FontDecoder`] turns the bytes of a text-showing operator into Unicode.
//! Lookup order per code:
//!
//! 1. the font's `ToUnicode` map;
//! 2. composite fonts: code → CID through the encoding CMap, then CID →
//!    Unicode through the collection's `Adobe-<Ordering>-UCS2` map;
//! 3. simple fonts: the byte encoding (named base, `Differences`, or the
//!    built-in encoding of a standard font).
//!
//! Codes that resolve to nothing are dropped. A font whose resources cannot
//! be found still decodes what its `ToUnicode` map covers.

use std::collections::HashMap;
use std::sync::Arc;

use lopdf::{Dictionary, Document, Object, ObjectId};
use pdf_resources::{CMapCompression, ResourceError, ResourceStore};
use tracing::{debug, warn};

use super::cmap::CMap;
use super::encoding::{BaseEncoding, ByteEncoding};
use super::{dict_get, name_of, stream_bytes, text_of};
use crate::error::ExtractError;

/// `usecmap` chains longer than this are cut off.
const MAX_USECMAP_DEPTH: usize = 8;

/// Character collections with a published UCS-2 map.
const UCS2_COLLECTIONS: &[&str] = &["GB1", "CNS1", "Japan1", "Korea1"];

/// The fourteen fonts every reader provides without embedding.
const STANDARD_14: &[&str] = &[
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Symbol",
    "ZapfDingbats",
];

/// Common names that stand in for a standard font.
const STANDARD_ALIASES: &[(&str, &str)] = &[
    ("Arial", "Helvetica"),
    ("ArialMT", "Helvetica"),
    ("Arial,Bold", "Helvetica-Bold"),
    ("Arial-BoldMT", "Helvetica-Bold"),
    ("Arial,Italic", "Helvetica-Oblique"),
    ("Arial-ItalicMT", "Helvetica-Oblique"),
    ("Arial,BoldItalic", "Helvetica-BoldOblique"),
    ("Arial-BoldItalicMT", "Helvetica-BoldOblique"),
    ("CourierNew", "Courier"),
    ("CourierNewPSMT", "Courier"),
    ("CourierNew,Bold", "Courier-Bold"),
    ("CourierNewPS-BoldMT", "Courier-Bold"),
    ("Times", "Times-Roman"),
    ("TimesNewRoman", "Times-Roman"),
    ("TimesNewRomanPSMT", "Times-Roman"),
    ("TimesNewRoman,Bold", "Times-Bold"),
    ("TimesNewRomanPS-BoldMT", "Times-Bold"),
    ("TimesNewRoman,Italic", "Times-Italic"),
    ("TimesNewRomanPS-ItalicMT", "Times-Italic"),
    ("Symbol,Bold", "Symbol"),
];

/// Decodes the strings shown with one font.
#[derive(Debug)]
pub struct FontDecoder {
    name: String,
    kind: FontKind,
    to_unicode: Option<CMap>,
}

#[derive(Debug)]
enum FontKind {
    Simple(ByteEncoding),
    Composite {
        cmap: Arc<CMap>,
        cid_unicode: Option<Arc<HashMap<u32, char>>>,
        /// Codes are UCS-2 values themselves (`Uni*-UCS2-*` without the map file).
        codes_are_unicode: bool,
    },
}

impl FontDecoder {
    /// `BaseFont` name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, FontKind::Composite { .. })
    }

    /// Append the text for `bytes` to `out`.
    pub fn decode(&self, bytes: &[u8], out: &mut String) {
        match &self.kind {
            FontKind::Simple(encoding) => {
                for &b in bytes {
                    if let Some(text) = self.unicode_for(u32::from(b)) {
                        out.push_str(text);
                    } else if let Some(ch) = encoding.get(b) {
                        out.push(ch);
                    }
                }
            }
            FontKind::Composite {
                cmap,
                cid_unicode,
                codes_are_unicode,
            } => {
                let mut rest = bytes;
                while !rest.is_empty() {
                    let (code, len) = cmap.next_code(rest, 2);
                    rest = &rest[len..];
                    if let Some(text) = self.unicode_for(code) {
                        out.push_str(text);
                        continue;
                    }
                    let ch = if *codes_are_unicode {
                        char::from_u32(code)
                    } else {
                        cmap.lookup_cid(code).and_then(|cid| {
                            cid_unicode.as_ref().and_then(|m| m.get(&cid).copied())
                        })
                    };
                    if let Some(ch) = ch {
                        out.push(ch);
                    }
                }
            }
        }
    }

    fn unicode_for(&self, code: u32) -> Option<&str> {
        self.to_unicode.as_ref().and_then(|m| m.lookup_unicode(code))
    }
}

/// Per-document cache of decoders and the character maps they load.
pub struct FontCache<'d> {
    doc: &'d Document,
    store: &'d ResourceStore,
    by_ref: HashMap<ObjectId, Arc<FontDecoder>>,
    cmaps: HashMap<String, Arc<CMap>>,
    ucs2: HashMap<String, Option<Arc<HashMap<u32, char>>>>,
}

impl<'d> FontCache<'d> {
    pub fn new(doc: &'d Document, store: &'d ResourceStore) -> Self {
        Self {
            doc,
            store,
            by_ref: HashMap::new(),
            cmaps: HashMap::new(),
            ucs2: HashMap::new(),
        }
    }

    /// Decoder for a font resource entry (reference or inline dictionary).
    ///
    /// `None` when the entry is not a font dictionary.
    pub fn font(&mut self, entry: &'d Object) -> Option<Arc<FontDecoder>> {
        let doc = self.doc;
        match entry {
            Object::Reference(id) => {
                if let Some(hit) = self.by_ref.get(id) {
                    return Some(Arc::clone(hit));
                }
                let dict = doc.get_object(*id).ok().and_then(|o| o.as_dict().ok())?;
                let decoder = Arc::new(self.load(dict));
                self.by_ref.insert(*id, Arc::clone(&decoder));
                Some(decoder)
            }
            Object::Dictionary(dict) => Some(Arc::new(self.load(dict))),
            _ => None,
        }
    }

    fn load(&mut self, dict: &'d Dictionary) -> FontDecoder {
        let doc = self.doc;
        let subtype = dict_get(doc, dict, b"Subtype")
            .and_then(name_of)
            .unwrap_or(&b"Type1"[..]);
        let name = dict_get(doc, dict, b"BaseFont")
            .and_then(name_of)
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();

        let to_unicode = dict_get(doc, dict, b"ToUnicode")
            .and_then(|o| o.as_stream().ok())
            .map(|s| CMap::parse(&stream_bytes(s)))
            .filter(CMap::has_unicode);

        let kind = if subtype == b"Type0" {
            self.load_composite(dict, &name, to_unicode.is_some())
        } else {
            FontKind::Simple(self.simple_encoding(dict, subtype, &name))
        };

        let decoder = FontDecoder {
            name,
            kind,
            to_unicode,
        };
        debug!(
            font = %decoder.name(),
            composite = decoder.is_composite(),
            to_unicode = decoder.to_unicode.is_some(),
            "Loaded font"
        );
        decoder
    }

    // ── Composite fonts ──────────────────────────────────────────────────────

    /// A predefined CMap that cannot be loaded degrades to 2-byte codes.
    fn load_composite(
        &mut self,
        dict: &'d Dictionary,
        font: &str,
        has_to_unicode: bool,
    ) -> FontKind {
        let doc = self.doc;
        let mut codes_are_unicode = false;
        let cmap = match dict_get(doc, dict, b"Encoding") {
            Some(Object::Name(n)) => {
                let name = String::from_utf8_lossy(n);
                match self.predefined_cmap(&name, 0) {
                    Ok(cmap) => cmap,
                    Err(e) => {
                        warn!(
                            font = %font,
                            cmap = %name,
                            error = %e,
                            "Encoding CMap unavailable, assuming 2-byte codes"
                        );
                        codes_are_unicode = is_unicode_cmap(&name);
                        Arc::new(CMap::identity())
                    }
                }
            }
            Some(Object::Stream(s)) => {
                let mut embedded = CMap::parse(&stream_bytes(s));
                if let Some(parent) = embedded.use_cmap.clone() {
                    match self.predefined_cmap(&parent, 1) {
                        Ok(parent) => embedded.inherit(&parent),
                        Err(e) => {
                            warn!(font = %font, cmap = %parent, error = %e, "Parent CMap unavailable")
                        }
                    }
                }
                Arc::new(embedded)
            }
            _ => Arc::new(CMap::identity()),
        };

        let cid_unicode = if has_to_unicode {
            None
        } else {
            self.collection_of(dict)
                .and_then(|ordering| self.ucs2_map(&format!("Adobe-{ordering}-UCS2")))
        };

        FontKind::Composite {
            cmap,
            cid_unicode,
            codes_are_unicode,
        }
    }

    /// `Ordering` of an Adobe collection that has a UCS-2 map.
    fn collection_of(&self, dict: &'d Dictionary) -> Option<String> {
        let doc = self.doc;
        let descendant = dict_get(doc, dict, b"DescendantFonts")
            .and_then(|o| o.as_array().ok())
            .and_then(|a| a.first())
            .and_then(|o| super::resolve(doc, o))
            .and_then(|o| o.as_dict().ok())?;
        let info = dict_get(doc, descendant, b"CIDSystemInfo").and_then(|o| o.as_dict().ok())?;
        let registry = dict_get(doc, info, b"Registry").and_then(text_of)?;
        let ordering = dict_get(doc, info, b"Ordering").and_then(text_of)?;
        (registry == "Adobe" && UCS2_COLLECTIONS.contains(&ordering.as_str())).then_some(ordering)
    }

    fn predefined_cmap(&mut self, name: &str, depth: usize) -> Result<Arc<CMap>, ExtractError> {
        if name == "Identity-H" || name == "Identity-V" {
            return Ok(Arc::new(CMap::identity()));
        }
        if let Some(hit) = self.cmaps.get(name) {
            return Ok(Arc::clone(hit));
        }

        let data = self.store.cmap(name)?;
        debug!(cmap = %name, compressed = data.compression == CMapCompression::Zlib, "Loading CMap");
        let mut cmap = CMap::parse(&data.decompressed()?);
        if let Some(parent) = cmap.use_cmap.clone() {
            if depth < MAX_USECMAP_DEPTH {
                let parent = self.predefined_cmap(&parent, depth + 1)?;
                cmap.inherit(&parent);
            } else {
                warn!(cmap = %name, "usecmap chain too deep, ignoring parent");
            }
        }

        let cmap = Arc::new(cmap);
        self.cmaps.insert(name.to_string(), Arc::clone(&cmap));
        Ok(cmap)
    }

    /// CID → Unicode from a UCS-2 map. A missing map only costs the text of
    /// fonts without `ToUnicode`, so it is not an error.
    fn ucs2_map(&mut self, name: &str) -> Option<Arc<HashMap<u32, char>>> {
        if let Some(hit) = self.ucs2.get(name) {
            return hit.clone();
        }
        let loaded = match self.store.cmap(name).and_then(|d| {
            d.decompressed()
                .map(|text| Arc::new(CMap::parse(&text).invert_cids()))
        }) {
            Ok(map) => Some(map),
            Err(ResourceError::NotFound { .. }) => {
                debug!(cmap = %name, "UCS-2 map not available");
                None
            }
            Err(e) => {
                warn!(cmap = %name, error = %e, "Failed to load UCS-2 map");
                None
            }
        };
        self.ucs2.insert(name.to_string(), loaded.clone());
        loaded
    }

    // ── Simple fonts ─────────────────────────────────────────────────────────

    fn simple_encoding(&self, dict: &'d Dictionary, subtype: &[u8], name: &str) -> ByteEncoding {
        let doc = self.doc;
        match dict_get(doc, dict, b"Encoding") {
            Some(Object::Name(n)) => BaseEncoding::from_name(n)
                .map(ByteEncoding::base)
                .unwrap_or_else(|| self.builtin_encoding(dict, subtype, name)),
            Some(Object::Dictionary(enc)) => {
                let mut table = dict_get(doc, enc, b"BaseEncoding")
                    .and_then(name_of)
                    .and_then(BaseEncoding::from_name)
                    .map(ByteEncoding::base)
                    .unwrap_or_else(|| self.builtin_encoding(dict, subtype, name));
                if let Some(diffs) = dict_get(doc, enc, b"Differences").and_then(|o| o.as_array().ok())
                {
                    apply_differences(&mut table, diffs);
                }
                table
            }
            _ => self.builtin_encoding(dict, subtype, name),
        }
    }

    /// Encoding used when the dictionary names none.
    fn builtin_encoding(&self, dict: &'d Dictionary, subtype: &[u8], name: &str) -> ByteEncoding {
        if let Some(standard) = standard_font_name(name) {
            if !is_embedded(self.doc, dict) {
                if standard == "ZapfDingbats" {
                    return ByteEncoding::zapf_dingbats();
                }
                match self.store.standard_font(&format!("{standard}.afm")) {
                    Ok(afm) => {
                        if let Some(enc) = ByteEncoding::from_afm(&afm) {
                            return enc;
                        }
                    }
                    Err(ResourceError::NotFound { .. }) => {}
                    Err(e) => warn!(font = %name, error = %e, "Failed to read font metrics"),
                }
            }
            return ByteEncoding::base(BaseEncoding::Standard);
        }
        if subtype == b"TrueType" {
            ByteEncoding::base(BaseEncoding::WinAnsi)
        } else {
            ByteEncoding::base(BaseEncoding::Standard)
        }
    }
}

fn apply_differences(table: &mut ByteEncoding, diffs: &[Object]) {
    let mut code: Option<i64> = None;
    for entry in diffs {
        match entry {
            Object::Integer(n) => code = Some(*n),
            Object::Name(glyph) => {
                if let Some(c) = code {
                    if let Ok(byte) = u8::try_from(c) {
                        table.set_glyph(byte, &String::from_utf8_lossy(glyph));
                    }
                    code = Some(c + 1);
                }
            }
            _ => {}
        }
    }
}

/// `UniGB-UCS2-H`, `UniJIS-UTF16-V`, ...: codes are Unicode values.
fn is_unicode_cmap(name: &str) -> bool {
    name.starts_with("Uni") && (name.contains("-UCS2-") || name.contains("-UTF16-"))
}

fn is_embedded(doc: &Document, dict: &Dictionary) -> bool {
    dict_get(doc, dict, b"FontDescriptor")
        .and_then(|o| o.as_dict().ok())
        .is_some_and(|fd| {
            fd.has(b"FontFile") || fd.has(b"FontFile2") || fd.has(b"FontFile3")
        })
}

/// Canonical standard-14 name for a `BaseFont`, ignoring a subset tag.
pub fn standard_font_name(base_font: &str) -> Option<&'static str> {
    let name = strip_subset_tag(base_font);
    let compact: String = name.chars().filter(|c| !c.is_whitespace()).collect();
    if let Some(&std) = STANDARD_14.iter().find(|&&s| s == compact) {
        return Some(std);
    }
    STANDARD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == compact)
        .map(|(_, std)| *std)
}

/// `ABCDEF+Times-Roman` → `Times-Roman`.
fn strip_subset_tag(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}
