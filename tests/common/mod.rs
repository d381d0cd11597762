//! Shared fixtures: an in-memory paper library standing in for the host, a
//! recording busy indicator, and a small PDF writer.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, Stream};
use paper_summarizer::busy::BusyIndicator;
use paper_summarizer::host::{
    DocumentStore, HostError, LocalFileResolver, PreferenceValue, SelectionSource, UpdateOptions,
};
use paper_summarizer::{Document, HostServices};
use tracing_subscriber::EnvFilter;

/// Route the crate's logs through the test harness; `RUST_LOG` picks the
/// level, warnings by default. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Holds the papers; the selection is a list of ids. Updates are written back
/// so a second run sees the first run's note.
#[derive(Default)]
pub struct Library {
    papers: Mutex<Vec<Document>>,
    selected: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<UpdateOptions>>,
}

impl Library {
    pub fn with(papers: Vec<Document>) -> Arc<Self> {
        Arc::new(Self {
            papers: Mutex::new(papers),
            ..Self::default()
        })
    }

    pub fn select(&self, ids: &[&str]) {
        *self.selected.lock().unwrap() = ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn note(&self, id: &str) -> String {
        self.papers
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.note.clone())
            .unwrap_or_default()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

#[async_trait]
impl SelectionSource for Library {
    async fn selected_documents(&self) -> Result<Vec<Document>, HostError> {
        let selected = self.selected.lock().unwrap().clone();
        let papers = self.papers.lock().unwrap();
        Ok(selected
            .iter()
            .filter_map(|id| papers.iter().find(|p| &p.id == id).cloned())
            .collect())
    }
}

#[async_trait]
impl DocumentStore for Library {
    async fn update(&self, document: &Document, options: UpdateOptions) -> Result<(), HostError> {
        let mut papers = self.papers.lock().unwrap();
        let Some(slot) = papers.iter_mut().find(|p| p.id == document.id) else {
            return Err(HostError::new(format!("unknown paper {}", document.id)));
        };
        *slot = document.clone();
        self.updates.lock().unwrap().push(options);
        Ok(())
    }
}

/// Records every published in-flight count.
#[derive(Default)]
pub struct RecordingIndicator {
    pub seen: Mutex<Vec<usize>>,
}

impl RecordingIndicator {
    pub fn counts(&self) -> Vec<usize> {
        self.seen.lock().unwrap().clone()
    }
}

impl BusyIndicator for RecordingIndicator {
    fn publish(&self, _key: &str, in_flight: usize) {
        self.seen.lock().unwrap().push(in_flight);
    }
}

/// Host services over `library`, with preferences pointing the chat endpoint
/// at `endpoint`.
pub fn host(library: &Arc<Library>, endpoint: &str, extra: &[(&str, PreferenceValue)]) -> HostServices {
    let mut prefs: HashMap<String, PreferenceValue> = HashMap::new();
    prefs.insert("api-url".into(), endpoint.into());
    for (k, v) in extra {
        prefs.insert(k.to_string(), v.clone());
    }
    HostServices {
        selection: library.clone(),
        preferences: Arc::new(prefs),
        files: Arc::new(LocalFileResolver),
        documents: library.clone(),
    }
}

/// Write a PDF to `dir/name` whose page `i` shows the lines in `pages[i]`,
/// Times-Roman with the standard encoding, each page carrying its own
/// resources.
pub fn write_pdf(dir: &Path, name: &str, pages: &[&[&str]]) -> PathBuf {
    let mut doc = PdfDocument::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });

    let mut kids = Vec::new();
    for lines in pages {
        let mut ops = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![56.into(), 760.into()]),
        ];
        for line in lines.iter() {
            ops.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            ops.push(Operation::new("Td", vec![0.into(), (-12).into()]));
        }
        ops.push(Operation::new("ET", vec![]));
        let content = Content { operations: ops }.encode().unwrap();
        let content_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![Object::Integer(0), 0.into(), 595.into(), 842.into()],
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
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}
