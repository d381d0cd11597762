//! Content-stream text interpretation.
//!
//! Walks the operations of a page (and the form XObjects it paints) and
//! appends the shown text in content order. Only what affects linear text is
//! tracked: the current font, the text and line matrices, leading, and the
//! graphics CTM. Glyph widths are never consulted, so word gaps come from
//! explicit repositioning and large `TJ` displacements.

use std::sync::Arc;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object};
use tracing::{debug, warn};

use super::font::{FontCache, FontDecoder};
use super::{dict_get, stream_bytes};
use crate::error::ExtractError;

/// Nested form XObjects deeper than this are not painted.
pub const MAX_FORM_DEPTH: usize = 8;

/// A `TJ` adjustment below this (in thousandths of text space) is a word gap.
pub const TJ_SPACE_THRESHOLD: f32 = -200.0;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `a × b` for PDF's row-vector affine matrices.
fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

fn translate(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// Graphics and text state that survives between operators.
#[derive(Clone)]
struct State {
    ctm: Matrix,
    tm: Matrix,
    tlm: Matrix,
    leading: f32,
    font: Option<Arc<FontDecoder>>,
    font_size: f32,
}

impl Default for State {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            tm: IDENTITY,
            tlm: IDENTITY,
            leading: 0.0,
            font: None,
            font_size: 0.0,
        }
    }
}

/// Collects the text of one page.
pub struct PageText<'d, 'c> {
    doc: &'d Document,
    fonts: &'c mut FontCache<'d>,
    state: State,
    saved: Vec<State>,
    out: String,
    last_y: Option<f32>,
    repositioned: bool,
}

impl<'d, 'c> PageText<'d, 'c> {
    pub fn new(doc: &'d Document, fonts: &'c mut FontCache<'d>) -> Self {
        Self {
            doc,
            fonts,
            state: State::default(),
            saved: Vec::new(),
            out: String::new(),
            last_y: None,
            repositioned: false,
        }
    }

    /// Interpret a content stream against `resources`.
    pub fn run(
        &mut self,
        content: &[u8],
        resources: Option<&'d Dictionary>,
        depth: usize,
    ) -> Result<(), ExtractError> {
        let content = Content::decode(content)?;
        for op in &content.operations {
            let args = op.operands.as_slice();
            match op.operator.as_str() {
                "q" => self.saved.push(self.state.clone()),
                "Q" => {
                    if let Some(s) = self.saved.pop() {
                        self.state = s;
                    }
                }
                "cm" => {
                    if let Some(m) = matrix(args) {
                        self.state.ctm = multiply(&m, &self.state.ctm);
                    }
                }
                "BT" => {
                    self.state.tm = IDENTITY;
                    self.state.tlm = IDENTITY;
                }
                "ET" => {}
                "Tf" => {
                    if let (Some(Object::Name(name)), Some(size)) = (args.first(), number(args, 1))
                    {
                        self.state.font = self.lookup_font(name, resources);
                        self.state.font_size = size;
                    }
                }
                "TL" => {
                    if let Some(tl) = number(args, 0) {
                        self.state.leading = tl;
                    }
                }
                "Td" => {
                    if let (Some(tx), Some(ty)) = (number(args, 0), number(args, 1)) {
                        self.move_line(tx, ty);
                    }
                }
                "TD" => {
                    if let (Some(tx), Some(ty)) = (number(args, 0), number(args, 1)) {
                        self.state.leading = -ty;
                        self.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some(m) = matrix(args) {
                        self.state.tm = m;
                        self.state.tlm = m;
                        self.repositioned = true;
                    }
                }
                "T*" => self.next_line(),
                "Tj" => {
                    if let Some(Object::String(bytes, _)) = args.first() {
                        self.show(bytes);
                    }
                }
                "'" => {
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = args.first() {
                        self.show(bytes);
                    }
                }
                "\"" => {
                    self.next_line();
                    if let Some(Object::String(bytes, _)) = args.get(2) {
                        self.show(bytes);
                    }
                }
                "TJ" => {
                    if let Some(Object::Array(items)) = args.first() {
                        self.show_array(items);
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = args.first() {
                        self.paint_xobject(name, resources, depth)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// The collected text, unnormalised.
    pub fn finish(self) -> String {
        self.out
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.state.tlm = multiply(&translate(tx, ty), &self.state.tlm);
        self.state.tm = self.state.tlm;
        self.repositioned = true;
    }

    fn next_line(&mut self) {
        let leading = self.state.leading;
        self.move_line(0.0, -leading);
    }

    fn show(&mut self, bytes: &[u8]) {
        let Some(font) = self.state.font.clone() else {
            return;
        };
        self.break_if_moved();
        font.decode(bytes, &mut self.out);
    }

    fn show_array(&mut self, items: &[Object]) {
        let Some(font) = self.state.font.clone() else {
            return;
        };
        self.break_if_moved();
        for item in items {
            match item {
                Object::String(bytes, _) => font.decode(bytes, &mut self.out),
                other => {
                    if other.as_float().is_ok_and(|n| n < TJ_SPACE_THRESHOLD) {
                        self.push_space();
                    }
                }
            }
        }
    }

    /// Emit a line break or word gap when the text position changed since
    /// the last run.
    fn break_if_moved(&mut self) {
        let rendering = multiply(&self.state.tm, &self.state.ctm);
        let y = rendering[5];
        if let Some(last) = self.last_y {
            let size = (self.state.font_size * rendering[3]).abs();
            let tolerance = (size * 0.5).max(1.0);
            if (y - last).abs() > tolerance {
                self.push_newline();
            } else if self.repositioned {
                self.push_space();
            }
        }
        self.last_y = Some(y);
        self.repositioned = false;
    }

    fn push_space(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn push_newline(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn lookup_font(
        &mut self,
        name: &[u8],
        resources: Option<&'d Dictionary>,
    ) -> Option<Arc<FontDecoder>> {
        let doc = self.doc;
        let entry = resources
            .and_then(|r| dict_get(doc, r, b"Font"))
            .and_then(|o| o.as_dict().ok())
            .and_then(|fonts| fonts.get(name).ok());
        match entry {
            Some(entry) => self.fonts.font(entry),
            None => {
                debug!(font = %String::from_utf8_lossy(name), "Font resource not found");
                None
            }
        }
    }

    fn paint_xobject(
        &mut self,
        name: &[u8],
        resources: Option<&'d Dictionary>,
        depth: usize,
    ) -> Result<(), ExtractError> {
        let doc = self.doc;
        let Some(Object::Stream(stream)) = resources
            .and_then(|r| dict_get(doc, r, b"XObject"))
            .and_then(|o| o.as_dict().ok())
            .and_then(|xobjects| dict_get(doc, xobjects, name))
        else {
            return Ok(());
        };
        let is_form = dict_get(doc, &stream.dict, b"Subtype")
            .and_then(|o| o.as_name().ok())
            .is_some_and(|s| s == b"Form");
        if !is_form {
            return Ok(());
        }
        if depth + 1 >= MAX_FORM_DEPTH {
            warn!(depth, "Form XObject nesting too deep, skipping");
            return Ok(());
        }

        let form_resources = dict_get(doc, &stream.dict, b"Resources")
            .and_then(|o| o.as_dict().ok())
            .or(resources);

        self.saved.push(self.state.clone());
        if let Some(m) = dict_get(doc, &stream.dict, b"Matrix")
            .and_then(|o| o.as_array().ok())
            .and_then(|a| matrix(a))
        {
            self.state.ctm = multiply(&m, &self.state.ctm);
        }
        let result = self.run(&stream_bytes(stream), form_resources, depth + 1);
        if let Some(s) = self.saved.pop() {
            self.state = s;
        }
        result
    }
}

fn number(args: &[Object], i: usize) -> Option<f32> {
    args.get(i).and_then(|o| o.as_float().ok())
}

fn matrix(args: &[Object]) -> Option<Matrix> {
    if args.len() < 6 {
        return None;
    }
    let mut m = [0.0; 6];
    for (i, slot) in m.iter_mut().enumerate() {
        *slot = number(args, i)?;
    }
    Some(m)
}
