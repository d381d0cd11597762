//! # pdf-resources
//!
//! The resources a PDF text extractor needs besides the PDF itself:
//! predefined character maps (CMaps) and standard-font programs, looked up by
//! name.
//!
//! ## Sources
//!
//! Standard-font metrics ship inside the compiled crate (`include_bytes!`),
//! so a store never depends on where the crate was built. Character maps are
//! large (the Adobe collections run to tens of megabytes) and are read from an
//! optional resource directory laid out like the pdf.js distribution:
//!
//! ```text
//! <root>/
//!  ├─ cmaps/            <name>      plain-text CMap
//!  │                    <name>.z    zlib-compressed CMap
//!  └─ standard_fonts/   <file>      font program / metrics (e.g. Symbol.afm)
//! ```
//!
//! A file in the directory wins over the embedded copy of the same name.
//!
//! ## Caching
//!
//! Character maps are read on demand every time they are asked for; a document
//! only references a handful and the decoder keeps its own per-document copy.
//! Standard fonts are cached in memory for the lifetime of the
//! [`ResourceStore`], so repeated lookups of the same font never touch the
//! disk twice. The cache has no eviction: the font set is small and bounded.
//!
//! ```rust,no_run
//! use pdf_resources::ResourceStore;
//!
//! # fn main() -> Result<(), pdf_resources::ResourceError> {
//! let store = ResourceStore::bundled();
//! let afm = store.standard_font("Symbol.afm")?;
//! assert!(afm.starts_with(b"StartFontMetrics"));
//!
//! // CJK maps need a resource directory.
//! let store = ResourceStore::new("/usr/share/pdfjs");
//! if let Ok(cmap) = store.cmap("UniGB-UCS2-H") {
//!     let text = cmap.decompressed()?;
//!     assert!(!text.is_empty());
//! }
//! # Ok(())
//! # }
//! ```

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use thiserror::Error;

// ── Public constants ─────────────────────────────────────────────────────────

/// Sub-directory holding character maps.
pub const CMAP_DIR: &str = "cmaps";

/// Sub-directory holding standard-font programs.
pub const STANDARD_FONT_DIR: &str = "standard_fonts";

/// File suffix marking a zlib-compressed character map.
pub const COMPRESSED_CMAP_SUFFIX: &str = ".z";

/// Standard-font files compiled into the crate.
const EMBEDDED_FONTS: &[(&str, &[u8])] = &[(
    "Symbol.afm",
    include_bytes!("../assets/standard_fonts/Symbol.afm"),
)];

/// Names of the standard-font files available without a resource directory.
pub fn embedded_fonts() -> impl Iterator<Item = &'static str> {
    EMBEDDED_FONTS.iter().map(|(name, _)| *name)
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by resource lookups.
#[derive(Error, Debug)]
pub enum ResourceError {
    /// Name contains a path separator or a parent-directory component.
    #[error("Invalid resource name '{0}'")]
    InvalidName(String),

    /// Neither the resource directory nor the embedded set has the file.
    #[error("Resource '{name}' not found")]
    NotFound { name: String },

    /// The file exists but could not be read.
    #[error("Failed to read resource '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A compressed character map is not a valid zlib stream.
    #[error("Failed to inflate character map '{name}': {source}")]
    Inflate {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

// ── Character maps ───────────────────────────────────────────────────────────

/// How a character map is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMapCompression {
    /// Plain PostScript-style CMap text.
    None,
    /// zlib stream wrapping the CMap text.
    Zlib,
}

/// A character map as read from the resource directory.
#[derive(Debug, Clone)]
pub struct CMapData {
    /// Name the map was requested under.
    pub name: String,
    /// Raw file contents.
    pub data: Vec<u8>,
    /// Storage format of `data`.
    pub compression: CMapCompression,
}

impl CMapData {
    /// The CMap text, inflating it first when stored compressed.
    pub fn decompressed(&self) -> Result<Cow<'_, [u8]>, ResourceError> {
        match self.compression {
            CMapCompression::None => Ok(Cow::Borrowed(&self.data)),
            CMapCompression::Zlib => {
                let mut out = Vec::with_capacity(self.data.len() * 4);
                flate2::read::ZlibDecoder::new(self.data.as_slice())
                    .read_to_end(&mut out)
                    .map_err(|source| ResourceError::Inflate {
                        name: self.name.clone(),
                        source,
                    })?;
                Ok(Cow::Owned(out))
            }
        }
    }
}

// ── Store ────────────────────────────────────────────────────────────────────

/// Resolves character maps and standard fonts from an optional resource
/// directory, falling back to the embedded files.
///
/// Create one per process and share it behind an `Arc`; the font cache lives
/// as long as the store.
#[derive(Debug, Default)]
pub struct ResourceStore {
    root: Option<PathBuf>,
    fonts: Mutex<HashMap<String, Arc<[u8]>>>,
}

impl ResourceStore {
    /// Store over a resource directory, with the embedded files behind it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            fonts: Mutex::new(HashMap::new()),
        }
    }

    /// Store over the embedded files only.
    pub fn bundled() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Look up a character map by name.
    ///
    /// A compressed `<name>.z` wins over a plain `<name>` when both exist.
    pub fn cmap(&self, name: &str) -> Result<CMapData, ResourceError> {
        validate_name(name)?;
        let not_found = || ResourceError::NotFound {
            name: name.to_string(),
        };
        let dir = self.root.as_ref().ok_or_else(not_found)?.join(CMAP_DIR);

        let compressed = dir.join(format!("{name}{COMPRESSED_CMAP_SUFFIX}"));
        if compressed.is_file() {
            return Ok(CMapData {
                name: name.to_string(),
                data: read_file(&compressed)?,
                compression: CMapCompression::Zlib,
            });
        }

        let plain = dir.join(name);
        if plain.is_file() {
            return Ok(CMapData {
                name: name.to_string(),
                data: read_file(&plain)?,
                compression: CMapCompression::None,
            });
        }

        Err(not_found())
    }

    /// Look up a standard-font program by file name, caching the bytes.
    pub fn standard_font(&self, file_name: &str) -> Result<Arc<[u8]>, ResourceError> {
        validate_name(file_name)?;

        if let Some(hit) = self.lock_fonts().get(file_name) {
            return Ok(Arc::clone(hit));
        }

        let on_disk = self
            .root
            .as_ref()
            .map(|root| root.join(STANDARD_FONT_DIR).join(file_name))
            .filter(|path| path.is_file());
        let bytes: Arc<[u8]> = match on_disk {
            Some(path) => read_file(&path)?.into(),
            None => EMBEDDED_FONTS
                .iter()
                .find(|(name, _)| *name == file_name)
                .map(|(_, bytes)| Arc::from(*bytes))
                .ok_or_else(|| ResourceError::NotFound {
                    name: file_name.to_string(),
                })?,
        };

        // A concurrent reader may have filled the slot meanwhile; keep the first.
        let cached = self
            .lock_fonts()
            .entry(file_name.to_string())
            .or_insert(bytes)
            .clone();
        Ok(cached)
    }

    /// Number of fonts currently held in memory.
    pub fn cached_font_count(&self) -> usize {
        self.lock_fonts().len()
    }

    fn lock_fonts(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<[u8]>>> {
        // The map holds immutable bytes only, so a poisoned lock is still consistent.
        self.fonts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────────

/// Names come from PDF files; refuse anything that could leave the directory.
fn validate_name(name: &str) -> Result<(), ResourceError> {
    let bad = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
        || name.split('.').all(str::is_empty)
        || name.starts_with("..");
    if bad {
        return Err(ResourceError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn read_file(path: &Path) -> Result<Vec<u8>, ResourceError> {
    std::fs::read(path).map_err(|source| ResourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn store_with(files: &[(&str, &str, &[u8])]) -> (tempfile::TempDir, ResourceStore) {
        let dir = tempfile::tempdir().unwrap();
        for (sub, name, bytes) in files {
            let d = dir.path().join(sub);
            std::fs::create_dir_all(&d).unwrap();
            std::fs::write(d.join(name), bytes).unwrap();
        }
        let store = ResourceStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn plain_cmap_is_returned_verbatim() {
        let (_dir, store) = store_with(&[(CMAP_DIR, "Test-H", b"begincmap")]);
        let cmap = store.cmap("Test-H").unwrap();
        assert_eq!(cmap.compression, CMapCompression::None);
        assert_eq!(&*cmap.decompressed().unwrap(), b"begincmap");
    }

    #[test]
    fn compressed_cmap_is_preferred_and_inflated() {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"from zlib").unwrap();
        let z = enc.finish().unwrap();

        let (_dir, store) = store_with(&[
            (CMAP_DIR, "Test-H", b"plain"),
            (CMAP_DIR, "Test-H.z", &z),
        ]);
        let cmap = store.cmap("Test-H").unwrap();
        assert_eq!(cmap.compression, CMapCompression::Zlib);
        assert_eq!(&*cmap.decompressed().unwrap(), b"from zlib");
    }

    #[test]
    fn corrupt_compressed_cmap_reports_inflate_error() {
        let (_dir, store) = store_with(&[(CMAP_DIR, "Bad-H.z", b"not zlib at all")]);
        let err = store.cmap("Bad-H").unwrap().decompressed().unwrap_err();
        assert!(matches!(err, ResourceError::Inflate { .. }), "got: {err}");
    }

    #[test]
    fn missing_cmap_is_not_found() {
        let (_dir, store) = store_with(&[]);
        assert!(matches!(
            store.cmap("Nope-H"),
            Err(ResourceError::NotFound { .. })
        ));
        assert!(matches!(
            ResourceStore::bundled().cmap("UniGB-UCS2-H"),
            Err(ResourceError::NotFound { .. })
        ));
    }

    #[test]
    fn traversal_names_are_rejected() {
        let (_dir, store) = store_with(&[]);
        for name in ["../secret", "a/b", "..", ".", "", "a\\b"] {
            assert!(
                matches!(store.cmap(name), Err(ResourceError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn embedded_fonts_need_no_directory() {
        let store = ResourceStore::bundled();
        assert_eq!(store.root(), None);
        for name in embedded_fonts() {
            let bytes = store.standard_font(name).unwrap();
            assert!(bytes.starts_with(b"StartFontMetrics"), "{name}");
        }
        assert!(matches!(
            store.standard_font("Courier.afm"),
            Err(ResourceError::NotFound { .. })
        ));
    }

    #[test]
    fn directory_font_overrides_embedded_copy() {
        let (_dir, store) = store_with(&[(STANDARD_FONT_DIR, "Symbol.afm", b"StartFontMetrics 9")]);
        assert_eq!(&*store.standard_font("Symbol.afm").unwrap(), b"StartFontMetrics 9");
    }

    #[test]
    fn standard_font_is_cached_after_first_read() {
        let (dir, store) = store_with(&[(STANDARD_FONT_DIR, "Times-Roman.afm", b"StartFontMetrics")]);
        let first = store.standard_font("Times-Roman.afm").unwrap();
        assert_eq!(store.cached_font_count(), 1);

        // Served from memory even once the file is gone.
        std::fs::remove_file(dir.path().join(STANDARD_FONT_DIR).join("Times-Roman.afm")).unwrap();
        let second = store.standard_font("Times-Roman.afm").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.cached_font_count(), 1);
    }

    #[test]
    fn missing_font_is_not_cached() {
        let (_dir, store) = store_with(&[]);
        assert!(store.standard_font("Courier.afm").is_err());
        assert_eq!(store.cached_font_count(), 0);
    }
}
