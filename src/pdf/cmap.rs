//! Character-map parsing.
//!
//! One parser covers the three flavours a text extractor meets:
//!
//! * `ToUnicode` streams (`bfchar` / `bfrange`): code → Unicode text;
//! * predefined and embedded CID maps (`cidchar` / `cidrange`): code → CID;
//! * the `Adobe-<Ordering>-UCS2` maps, which map UCS-2 codes to CIDs and are
//!   inverted into CID → Unicode tables by [`CMap::invert_cids`].
//!
//! The grammar is the PostScript subset these files actually use. Unknown
//! operators are skipped.

use std::collections::HashMap;

/// One `begincodespacerange` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CodespaceRange {
    len: usize,
    low: u32,
    high: u32,
}

/// One `cidrange` entry (a `cidchar` is a range of one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CidRange {
    low: u32,
    high: u32,
    first_cid: u32,
}

/// A parsed character map.
#[derive(Debug, Clone, Default)]
pub struct CMap {
    codespace: Vec<CodespaceRange>,
    unicode: HashMap<u32, String>,
    cids: Vec<CidRange>,
    identity: bool,
    /// Parent named by `usecmap`, not yet merged.
    pub use_cmap: Option<String>,
}

impl CMap {
    /// `Identity-H` / `Identity-V`: two-byte codes, CID equals code.
    pub fn identity() -> Self {
        Self {
            codespace: vec![CodespaceRange {
                len: 2,
                low: 0,
                high: 0xFFFF,
            }],
            identity: true,
            ..Self::default()
        }
    }

    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Parse CMap program text. Never fails: malformed sections are skipped.
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut cmap = CMap::default();
        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Keyword(k) if k == "begincodespacerange" => {
                    i = cmap.parse_codespace(&tokens, i + 1);
                }
                Token::Keyword(k) if k == "beginbfchar" => {
                    i = cmap.parse_bfchar(&tokens, i + 1);
                }
                Token::Keyword(k) if k == "beginbfrange" => {
                    i = cmap.parse_bfrange(&tokens, i + 1);
                }
                Token::Keyword(k) if k == "begincidchar" => {
                    i = cmap.parse_cidchar(&tokens, i + 1);
                }
                Token::Keyword(k) if k == "begincidrange" => {
                    i = cmap.parse_cidrange(&tokens, i + 1);
                }
                Token::Keyword(k) if k == "usecmap" => {
                    if let Some(Token::Name(parent)) = i.checked_sub(1).map(|p| &tokens[p]) {
                        cmap.use_cmap = Some(parent.clone());
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }
        cmap
    }

    /// Fill gaps from the `usecmap` parent; own entries win.
    pub fn inherit(&mut self, parent: &CMap) {
        if self.codespace.is_empty() {
            self.codespace = parent.codespace.clone();
        }
        self.cids.extend(parent.cids.iter().copied());
        for (code, text) in &parent.unicode {
            self.unicode.entry(*code).or_insert_with(|| text.clone());
        }
        self.identity |= parent.identity;
        self.use_cmap = None;
    }

    /// Split the next character code off `bytes`.
    ///
    /// Returns the code and its byte length. Bytes outside every codespace
    /// range are consumed one at a time, or `fallback_len` at a time when the
    /// map declares no codespace at all.
    pub fn next_code(&self, bytes: &[u8], fallback_len: usize) -> (u32, usize) {
        for len in 1..=4usize {
            if len > bytes.len() {
                break;
            }
            let code = be_value(&bytes[..len]);
            if self
                .codespace
                .iter()
                .any(|r| r.len == len && r.low <= code && code <= r.high)
            {
                return (code, len);
            }
        }
        let len = if self.codespace.is_empty() {
            fallback_len.clamp(1, bytes.len().max(1))
        } else {
            1
        };
        let len = len.min(bytes.len());
        (be_value(&bytes[..len]), len.max(1))
    }

    /// Unicode text for a code, from `bfchar` / `bfrange`.
    pub fn lookup_unicode(&self, code: u32) -> Option<&str> {
        self.unicode.get(&code).map(String::as_str)
    }

    /// CID for a code, from `cidchar` / `cidrange` (or identity).
    pub fn lookup_cid(&self, code: u32) -> Option<u32> {
        if let Some(r) = self.cids.iter().find(|r| r.low <= code && code <= r.high) {
            return r.first_cid.checked_add(code - r.low);
        }
        self.identity.then_some(code)
    }

    /// `true` when the map carries any code → Unicode entries.
    pub fn has_unicode(&self) -> bool {
        !self.unicode.is_empty()
    }

    /// Reverse a UCS-2 → CID map into CID → char.
    ///
    /// The first code seen for a CID wins; several Unicode points share a
    /// CID for compatibility forms.
    pub fn invert_cids(&self) -> HashMap<u32, char> {
        let mut out = HashMap::new();
        for r in &self.cids {
            for code in r.low..=r.high {
                let (Some(ch), Some(cid)) =
                    (char::from_u32(code), r.first_cid.checked_add(code - r.low))
                else {
                    continue;
                };
                out.entry(cid).or_insert(ch);
            }
        }
        out
    }

    // ── Section parsers ──────────────────────────────────────────────────────

    fn parse_codespace(&mut self, t: &[Token], mut i: usize) -> usize {
        while let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) = (t.get(i), t.get(i + 1)) {
            if !lo.is_empty() && lo.len() <= 4 {
                self.codespace.push(CodespaceRange {
                    len: lo.len(),
                    low: be_value(lo),
                    high: be_value(hi),
                });
            }
            i += 2;
        }
        i
    }

    fn parse_bfchar(&mut self, t: &[Token], mut i: usize) -> usize {
        loop {
            match (t.get(i), t.get(i + 1)) {
                (Some(Token::Hex(src)), Some(Token::Hex(dst))) => {
                    self.unicode.insert(be_value(src), utf16be(dst));
                }
                (Some(Token::Hex(src)), Some(Token::Name(glyph))) => {
                    if let Some(ch) = super::encoding::glyph_to_char(glyph) {
                        self.unicode.insert(be_value(src), ch.to_string());
                    }
                }
                _ => return i,
            }
            i += 2;
        }
    }

    fn parse_bfrange(&mut self, t: &[Token], mut i: usize) -> usize {
        loop {
            let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) = (t.get(i), t.get(i + 1)) else {
                return i;
            };
            let (lo, hi) = (be_value(lo), be_value(hi));
            match t.get(i + 2) {
                Some(Token::Hex(dst)) => {
                    let mut units = utf16_units(dst);
                    for code in lo..=hi.min(lo.saturating_add(0xFFFF)) {
                        self.unicode
                            .insert(code, String::from_utf16_lossy(&units));
                        if let Some(last) = units.last_mut() {
                            *last = last.wrapping_add(1);
                        }
                    }
                    i += 3;
                }
                Some(Token::ArrayStart) => {
                    let mut j = i + 3;
                    let mut code = lo;
                    while let Some(Token::Hex(dst)) = t.get(j) {
                        if code <= hi {
                            self.unicode.insert(code, utf16be(dst));
                        }
                        code = code.saturating_add(1);
                        j += 1;
                    }
                    // Skip the closing bracket.
                    i = if matches!(t.get(j), Some(Token::ArrayEnd)) {
                        j + 1
                    } else {
                        j
                    };
                }
                _ => return i,
            }
        }
    }

    fn parse_cidchar(&mut self, t: &[Token], mut i: usize) -> usize {
        while let (Some(Token::Hex(src)), Some(Token::Int(cid))) = (t.get(i), t.get(i + 1)) {
            if let Ok(cid) = u32::try_from(*cid) {
                let code = be_value(src);
                self.cids.push(CidRange {
                    low: code,
                    high: code,
                    first_cid: cid,
                });
            }
            i += 2;
        }
        i
    }

    fn parse_cidrange(&mut self, t: &[Token], mut i: usize) -> usize {
        while let (Some(Token::Hex(lo)), Some(Token::Hex(hi)), Some(Token::Int(cid))) =
            (t.get(i), t.get(i + 1), t.get(i + 2))
        {
            if let Ok(cid) = u32::try_from(*cid) {
                let (low, high) = (be_value(lo), be_value(hi));
                if low <= high {
                    self.cids.push(CidRange {
                        low,
                        high,
                        first_cid: cid,
                    });
                }
            }
            i += 3;
        }
        i
    }
}

// ── Tokenizer ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Name(String),
    Int(i64),
    Keyword(String),
    ArrayStart,
    ArrayEnd,
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        match b {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let start = i + 1;
                let end = data[start..]
                    .iter()
                    .position(|&c| c == b'>')
                    .map_or(data.len(), |p| start + p);
                out.push(Token::Hex(decode_hex(&data[start..end])));
                i = end + 1;
            }
            b'[' => {
                out.push(Token::ArrayStart);
                i += 1;
            }
            b']' => {
                out.push(Token::ArrayEnd);
                i += 1;
            }
            b'(' => {
                // Literal strings only appear in header dictionaries.
                let mut depth = 0usize;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            b'/' => {
                let start = i + 1;
                i = start;
                while i < data.len() && is_regular(data[i]) {
                    i += 1;
                }
                out.push(Token::Name(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
            _ if b.is_ascii_whitespace() || b == 0 => i += 1,
            _ => {
                let start = i;
                while i < data.len() && is_regular(data[i]) {
                    i += 1;
                }
                if i == start {
                    i += 1;
                    continue;
                }
                let word = String::from_utf8_lossy(&data[start..i]).into_owned();
                match word.parse::<i64>() {
                    Ok(n) => out.push(Token::Int(n)),
                    Err(_) => out.push(Token::Keyword(word)),
                }
            }
        }
    }
    out
}

fn is_regular(b: u8) -> bool {
    !(b.is_ascii_whitespace()
        || b == 0
        || matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'))
}

fn decode_hex(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .iter()
        .filter_map(|&c| (c as char).to_digit(16).map(|d| d as u8))
        .collect();
    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

fn be_value(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    if bytes.len() == 1 {
        return vec![u16::from(bytes[0])];
    }
    bytes
        .chunks(2)
        .map(|c| (u16::from(c[0]) << 8) | u16::from(c.get(1).copied().unwrap_or(0)))
        .collect()
}

fn utf16be(bytes: &[u8]) -> String {
    String::from_utf16_lossy(&utf16_units(bytes))
}
