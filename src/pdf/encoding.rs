//! Single-byte font encodings and glyph names.
//!
//! Simple fonts map each byte to a glyph name through a base encoding plus
//! optional `Differences`; the glyph name then maps to Unicode. The tables
//! here store the composed byte → char result for the three base encodings a
//! PDF can name, and [`glyph_to_char`] covers the glyph names seen in
//! `Differences` arrays and standard-font metrics.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Encodings a font dictionary can name directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseEncoding {
    Standard,
    WinAnsi,
    MacRoman,
}

impl BaseEncoding {
    /// Map an `/Encoding` or `/BaseEncoding` name.
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"StandardEncoding" => Some(Self::Standard),
            b"WinAnsiEncoding" => Some(Self::WinAnsi),
            b"MacRomanEncoding" => Some(Self::MacRoman),
            _ => None,
        }
    }
}

/// A complete byte → char table for a simple font.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteEncoding {
    table: [Option<char>; 256],
}

impl ByteEncoding {
    pub fn base(base: BaseEncoding) -> Self {
        let mut table = [None; 256];
        for code in 0x20u8..0x7F {
            table[usize::from(code)] = Some(char::from(code));
        }
        match base {
            BaseEncoding::Standard => {
                table[0x27] = Some('\u{2019}');
                table[0x60] = Some('\u{2018}');
                for &(code, ch) in STANDARD_HIGH {
                    table[usize::from(code)] = Some(ch);
                }
            }
            BaseEncoding::WinAnsi => {
                for (i, ch) in WIN_ANSI_80_9F.chars().enumerate() {
                    table[0x80 + i] = (ch != '\0').then_some(ch);
                }
                for code in 0xA0u32..=0xFF {
                    table[code as usize] = char::from_u32(code);
                }
                table[0xA0] = Some(' ');
                table[0xAD] = Some('-');
            }
            BaseEncoding::MacRoman => {
                for (i, ch) in MAC_ROMAN_HIGH.chars().enumerate() {
                    table[0x80 + i] = (ch != '\0').then_some(ch);
                }
            }
        }
        Self { table }
    }

    /// Built-in encoding of the ZapfDingbats standard font.
    ///
    /// The font's glyph names (`a1`...`a191`) carry no Unicode meaning, so
    /// the table maps codes straight to the Dingbats block.
    pub fn zapf_dingbats() -> Self {
        let mut table = [None; 256];
        table[0x20] = Some(' ');
        let ranges: [(u8, u8, u32); 7] = [
            (0x21, 0x7E, 0x2701),
            (0x80, 0x8D, 0x2768),
            (0xA1, 0xA7, 0x2761),
            (0xAC, 0xB5, 0x2460),
            (0xB6, 0xD4, 0x2776),
            (0xD8, 0xEF, 0x2798),
            (0xF1, 0xFE, 0x27B1),
        ];
        for (low, high, first) in ranges {
            for code in low..=high {
                table[usize::from(code)] = char::from_u32(first + u32::from(code - low));
            }
        }
        for &(code, ch) in ZAPF_DINGBATS_EXCEPTIONS {
            table[usize::from(code)] = Some(ch);
        }
        Self { table }
    }

    /// Built-in encoding of a font, read from its AFM metrics
    /// (`C <code> ; WX <w> ; N <glyph> ; ...` lines).
    ///
    /// Returns `None` when the metrics contain no encoded glyph.
    pub fn from_afm(afm: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(afm);
        let mut table = [None; 256];
        let mut any = false;
        for line in text.lines() {
            let Some(rest) = line.strip_prefix("C ") else {
                continue;
            };
            let mut fields = rest.split(';').map(str::trim);
            let Some(Ok(code)) = fields.next().map(str::parse::<i32>) else {
                continue;
            };
            let Ok(code) = u8::try_from(code) else {
                continue;
            };
            let glyph = fields.find_map(|f| f.strip_prefix("N ").map(str::trim));
            if let Some(ch) = glyph.and_then(glyph_to_char) {
                table[usize::from(code)] = Some(ch);
                any = true;
            }
        }
        any.then_some(Self { table })
    }

    /// Override one code with a glyph from a `Differences` array.
    /// Unknown glyph names leave the code unmapped.
    pub fn set_glyph(&mut self, code: u8, glyph: &str) {
        self.table[usize::from(code)] = glyph_to_char(glyph);
    }

    pub fn get(&self, code: u8) -> Option<char> {
        self.table[usize::from(code)]
    }
}

/// ZapfDingbats codes outside the contiguous runs of the Dingbats block.
const ZAPF_DINGBATS_EXCEPTIONS: &[(u8, char)] = &[
    (0x25, '\u{260E}'),
    (0x2A, '\u{261B}'),
    (0x2B, '\u{261E}'),
    (0x48, '\u{2605}'),
    (0x6C, '\u{25CF}'),
    (0x6E, '\u{25A0}'),
    (0x73, '\u{25B2}'),
    (0x74, '\u{25BC}'),
    (0x75, '\u{25C6}'),
    (0x77, '\u{25D7}'),
    (0xA8, '\u{2663}'),
    (0xA9, '\u{2666}'),
    (0xAA, '\u{2665}'),
    (0xAB, '\u{2660}'),
    (0xD5, '\u{2192}'),
    (0xD6, '\u{2194}'),
    (0xD7, '\u{2195}'),
];

/// Unicode for a glyph name.
///
/// Handles the common named glyphs, single-letter names, and the
/// `uniXXXX` / `uXXXX[XX]` conventions. Suffixes after a period
/// (`a.sc`, `one.oldstyle`) are ignored.
pub fn glyph_to_char(name: &str) -> Option<char> {
    let base = name.split('.').next().unwrap_or(name);
    if base.is_empty() {
        return None;
    }
    if let Some(&ch) = GLYPHS.get(base) {
        return Some(ch);
    }
    let mut chars = base.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return Some(c);
        }
    }
    if let Some(hex) = base.strip_prefix("uni") {
        if hex.len() >= 4 {
            return u32::from_str_radix(&hex[..4], 16).ok().and_then(char::from_u32);
        }
    }
    if let Some(hex) = base.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        }
    }
    None
}

static GLYPHS: Lazy<HashMap<&'static str, char>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, char> = GLYPH_LIST.iter().copied().collect();
    for (i, name) in LATIN1_A0_FF.iter().enumerate() {
        if let Some(ch) = char::from_u32(0xA0 + i as u32) {
            map.entry(*name).or_insert(ch);
        }
    }
    map
});

// ── Tables ───────────────────────────────────────────────────────────────────

/// WinAnsi 0x80..=0x9F; `\0` marks an unassigned code.
const WIN_ANSI_80_9F: &str = "€\0‚ƒ„…†‡ˆ‰Š‹Œ\0Ž\0\0‘’“”•–—˜™š›œ\0žŸ";

/// MacRoman 0x80..=0xFF; `\0` marks an unassigned code.
const MAC_ROMAN_HIGH: &str = concat!(
    "ÄÅÇÉÑÖÜáàâäãåçéèêëíìîïñóòôöõúùûü",
    "†°¢£§•¶ß®©™´¨≠ÆØ∞±≤≥¥µ∂∑∏π∫ªºΩæø",
    "¿¡¬√ƒ≈∆«»…\u{A0}ÀÃÕŒœ–—“”‘’÷◊ÿŸ⁄¤‹›ﬁﬂ",
    "‡·‚„‰ÂÊÁËÈÍÎÏÌÓÔ\0ÒÚÛÙıˆ˜¯˘˙˚¸˝˛ˇ",
);

/// StandardEncoding above 0x7F.
const STANDARD_HIGH: &[(u8, char)] = &[
    (0xA1, '¡'),
    (0xA2, '¢'),
    (0xA3, '£'),
    (0xA4, '⁄'),
    (0xA5, '¥'),
    (0xA6, 'ƒ'),
    (0xA7, '§'),
    (0xA8, '¤'),
    (0xA9, '\''),
    (0xAA, '“'),
    (0xAB, '«'),
    (0xAC, '‹'),
    (0xAD, '›'),
    (0xAE, 'ﬁ'),
    (0xAF, 'ﬂ'),
    (0xB1, '–'),
    (0xB2, '†'),
    (0xB3, '‡'),
    (0xB4, '·'),
    (0xB6, '¶'),
    (0xB7, '•'),
    (0xB8, '‚'),
    (0xB9, '„'),
    (0xBA, '”'),
    (0xBB, '»'),
    (0xBC, '…'),
    (0xBD, '‰'),
    (0xBF, '¿'),
    (0xC1, '`'),
    (0xC2, '´'),
    (0xC3, 'ˆ'),
    (0xC4, '˜'),
    (0xC5, '¯'),
    (0xC6, '˘'),
    (0xC7, '˙'),
    (0xC8, '¨'),
    (0xCA, '˚'),
    (0xCB, '¸'),
    (0xCD, '˝'),
    (0xCE, '˛'),
    (0xCF, 'ˇ'),
    (0xD0, '—'),
    (0xE1, 'Æ'),
    (0xE3, 'ª'),
    (0xE8, 'Ł'),
    (0xE9, 'Ø'),
    (0xEA, 'Œ'),
    (0xEB, 'º'),
    (0xF1, 'æ'),
    (0xF5, 'ı'),
    (0xF8, 'ł'),
    (0xF9, 'ø'),
    (0xFA, 'œ'),
    (0xFB, 'ß'),
];

/// Glyph names of U+00A0..=U+00FF, in code order.
const LATIN1_A0_FF: [&str; 96] = [
    "nbspace", "exclamdown", "cent", "sterling", "currency", "yen", "brokenbar", "section",
    "dieresis", "copyright", "ordfeminine", "guillemotleft", "logicalnot", "sfthyphen",
    "registered", "macron", "degree", "plusminus", "twosuperior", "threesuperior", "acute", "mu",
    "paragraph", "periodcentered", "cedilla", "onesuperior", "ordmasculine", "guillemotright",
    "onequarter", "onehalf", "threequarters", "questiondown", "Agrave", "Aacute", "Acircumflex",
    "Atilde", "Adieresis", "Aring", "AE", "Ccedilla", "Egrave", "Eacute", "Ecircumflex",
    "Edieresis", "Igrave", "Iacute", "Icircumflex", "Idieresis", "Eth", "Ntilde", "Ograve",
    "Oacute", "Ocircumflex", "Otilde", "Odieresis", "multiply", "Oslash", "Ugrave", "Uacute",
    "Ucircumflex", "Udieresis", "Yacute", "Thorn", "germandbls", "agrave", "aacute",
    "acircumflex", "atilde", "adieresis", "aring", "ae", "ccedilla", "egrave", "eacute",
    "ecircumflex", "edieresis", "igrave", "iacute", "icircumflex", "idieresis", "eth", "ntilde",
    "ograve", "oacute", "ocircumflex", "otilde", "odieresis", "divide", "oslash", "ugrave",
    "uacute", "ucircumflex", "udieresis", "yacute", "thorn", "ydieresis",
];

/// Named glyphs outside Latin-1 and single letters.
const GLYPH_LIST: &[(&str, char)] = &[
    // ASCII punctuation and digits
    ("space", ' '),
    ("exclam", '!'),
    ("quotedbl", '"'),
    ("numbersign", '#'),
    ("dollar", '$'),
    ("percent", '%'),
    ("ampersand", '&'),
    ("quotesingle", '\''),
    ("parenleft", '('),
    ("parenright", ')'),
    ("asterisk", '*'),
    ("plus", '+'),
    ("comma", ','),
    ("hyphen", '-'),
    ("period", '.'),
    ("slash", '/'),
    ("zero", '0'),
    ("one", '1'),
    ("two", '2'),
    ("three", '3'),
    ("four", '4'),
    ("five", '5'),
    ("six", '6'),
    ("seven", '7'),
    ("eight", '8'),
    ("nine", '9'),
    ("colon", ':'),
    ("semicolon", ';'),
    ("less", '<'),
    ("equal", '='),
    ("greater", '>'),
    ("question", '?'),
    ("at", '@'),
    ("bracketleft", '['),
    ("backslash", '\\'),
    ("bracketright", ']'),
    ("asciicircum", '^'),
    ("underscore", '_'),
    ("grave", '`'),
    ("braceleft", '{'),
    ("bar", '|'),
    ("braceright", '}'),
    ("asciitilde", '~'),
    // Typography
    ("quoteleft", '‘'),
    ("quoteright", '’'),
    ("quotedblleft", '“'),
    ("quotedblright", '”'),
    ("quotesinglbase", '‚'),
    ("quotedblbase", '„'),
    ("guilsinglleft", '‹'),
    ("guilsinglright", '›'),
    ("bullet", '•'),
    ("ellipsis", '…'),
    ("endash", '–'),
    ("emdash", '—'),
    ("dagger", '†'),
    ("daggerdbl", '‡'),
    ("perthousand", '‰'),
    ("trademark", '™'),
    ("fraction", '⁄'),
    ("florin", 'ƒ'),
    ("Euro", '€'),
    ("fi", 'ﬁ'),
    ("fl", 'ﬂ'),
    ("ff", 'ﬀ'),
    ("ffi", 'ﬃ'),
    ("ffl", 'ﬄ'),
    ("circumflex", 'ˆ'),
    ("tilde", '˜'),
    ("breve", '˘'),
    ("dotaccent", '˙'),
    ("ring", '˚'),
    ("hungarumlaut", '˝'),
    ("ogonek", '˛'),
    ("caron", 'ˇ'),
    ("dotlessi", 'ı'),
    ("Lslash", 'Ł'),
    ("lslash", 'ł'),
    ("OE", 'Œ'),
    ("oe", 'œ'),
    ("Scaron", 'Š'),
    ("scaron", 'š'),
    ("Zcaron", 'Ž'),
    ("zcaron", 'ž'),
    ("Ydieresis", 'Ÿ'),
    ("minus", '−'),
    // Greek
    ("Alpha", 'Α'),
    ("Beta", 'Β'),
    ("Gamma", 'Γ'),
    ("Delta", 'Δ'),
    ("Epsilon", 'Ε'),
    ("Zeta", 'Ζ'),
    ("Eta", 'Η'),
    ("Theta", 'Θ'),
    ("Iota", 'Ι'),
    ("Kappa", 'Κ'),
    ("Lambda", 'Λ'),
    ("Mu", 'Μ'),
    ("Nu", 'Ν'),
    ("Xi", 'Ξ'),
    ("Omicron", 'Ο'),
    ("Pi", 'Π'),
    ("Rho", 'Ρ'),
    ("Sigma", 'Σ'),
    ("Tau", 'Τ'),
    ("Upsilon", 'Υ'),
    ("Phi", 'Φ'),
    ("Chi", 'Χ'),
    ("Psi", 'Ψ'),
    ("Omega", 'Ω'),
    ("alpha", 'α'),
    ("beta", 'β'),
    ("gamma", 'γ'),
    ("delta", 'δ'),
    ("epsilon", 'ε'),
    ("zeta", 'ζ'),
    ("eta", 'η'),
    ("theta", 'θ'),
    ("iota", 'ι'),
    ("kappa", 'κ'),
    ("lambda", 'λ'),
    ("mu", 'μ'),
    ("nu", 'ν'),
    ("xi", 'ξ'),
    ("omicron", 'ο'),
    ("pi", 'π'),
    ("rho", 'ρ'),
    ("sigma", 'σ'),
    ("sigma1", 'ς'),
    ("tau", 'τ'),
    ("upsilon", 'υ'),
    ("phi", 'φ'),
    ("chi", 'χ'),
    ("psi", 'ψ'),
    ("omega", 'ω'),
    ("theta1", 'ϑ'),
    ("phi1", 'ϕ'),
    ("omega1", 'ϖ'),
    // Symbol font
    ("universal", '∀'),
    ("existential", '∃'),
    ("suchthat", '∋'),
    ("asteriskmath", '∗'),
    ("congruent", '≅'),
    ("therefore", '∴'),
    ("perpendicular", '⊥'),
    ("radicalex", '‾'),
    ("similar", '∼'),
    ("lessequal", '≤'),
    ("greaterequal", '≥'),
    ("infinity", '∞'),
    ("partialdiff", '∂'),
    ("notequal", '≠'),
    ("equivalence", '≡'),
    ("approxequal", '≈'),
    ("element", '∈'),
    ("notelement", '∉'),
    ("summation", '∑'),
    ("product", '∏'),
    ("integral", '∫'),
    ("radical", '√'),
    ("proportional", '∝'),
    ("gradient", '∇'),
    ("angle", '∠'),
    ("intersection", '∩'),
    ("union", '∪'),
    ("propersubset", '⊂'),
    ("propersuperset", '⊃'),
    ("reflexsubset", '⊆'),
    ("reflexsuperset", '⊇'),
    ("emptyset", '∅'),
    ("logicaland", '∧'),
    ("logicalor", '∨'),
    ("arrowleft", '←'),
    ("arrowup", '↑'),
    ("arrowright", '→'),
    ("arrowdown", '↓'),
    ("arrowboth", '↔'),
    ("arrowdblleft", '⇐'),
    ("arrowdblright", '⇒'),
    ("arrowdblboth", '⇔'),
    ("minute", '′'),
    ("second", '″'),
    ("aleph", 'ℵ'),
    ("dotmath", '⋅'),
    ("circleplus", '⊕'),
    ("circlemultiply", '⊗'),
    ("lozenge", '◊'),
    ("club", '♣'),
    ("diamond", '♦'),
    ("heart", '♥'),
    ("spade", '♠'),
    ("Upsilon1", '\u{03D2}'),
    ("Ifraktur", '\u{2111}'),
    ("Rfraktur", '\u{211C}'),
    ("weierstrass", '\u{2118}'),
    ("notsubset", '\u{2284}'),
    ("registerserif", '\u{00AE}'),
    ("registersans", '\u{00AE}'),
    ("copyrightserif", '\u{00A9}'),
    ("copyrightsans", '\u{00A9}'),
    ("trademarkserif", '\u{2122}'),
    ("trademarksans", '\u{2122}'),
    ("arrowdblup", '\u{21D1}'),
    ("arrowdbldown", '\u{21D3}'),
    ("carriagereturn", '\u{21B5}'),
    ("angleleft", '\u{2329}'),
    ("angleright", '\u{232A}'),
    // Symbol extension pieces
    ("arrowvertex", '\u{23D0}'),
    ("arrowhorizex", '\u{23AF}'),
    ("parenlefttp", '\u{239B}'),
    ("parenleftex", '\u{239C}'),
    ("parenleftbt", '\u{239D}'),
    ("parenrighttp", '\u{239E}'),
    ("parenrightex", '\u{239F}'),
    ("parenrightbt", '\u{23A0}'),
    ("bracketlefttp", '\u{23A1}'),
    ("bracketleftex", '\u{23A2}'),
    ("bracketleftbt", '\u{23A3}'),
    ("bracketrighttp", '\u{23A4}'),
    ("bracketrightex", '\u{23A5}'),
    ("bracketrightbt", '\u{23A6}'),
    ("bracelefttp", '\u{23A7}'),
    ("braceleftmid", '\u{23A8}'),
    ("braceleftbt", '\u{23A9}'),
    ("braceex", '\u{23AA}'),
    ("bracerighttp", '\u{23AB}'),
    ("bracerightmid", '\u{23AC}'),
    ("bracerightbt", '\u{23AD}'),
    ("integraltp", '\u{2320}'),
    ("integralex", '\u{23AE}'),
    ("integralbt", '\u{2321}'),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_have_expected_width() {
        assert_eq!(WIN_ANSI_80_9F.chars().count(), 32);
        assert_eq!(MAC_ROMAN_HIGH.chars().count(), 128);
    }

    #[test]
    fn base_encodings_differ_where_expected() {
        let std = ByteEncoding::base(BaseEncoding::Standard);
        let win = ByteEncoding::base(BaseEncoding::WinAnsi);
        let mac = ByteEncoding::base(BaseEncoding::MacRoman);

        assert_eq!(std.get(b'A'), Some('A'));
        assert_eq!(std.get(0x27), Some('’'));
        assert_eq!(win.get(0x27), Some('\''));
        assert_eq!(win.get(0x93), Some('“'));
        assert_eq!(win.get(0xE9), Some('é'));
        assert_eq!(win.get(0x81), None);
        assert_eq!(mac.get(0x8E), Some('é'));
        assert_eq!(mac.get(0xD0), Some('–'));
        assert_eq!(std.get(0xD0), Some('—'));
        assert_eq!(std.get(0x05), None);
    }

    #[test]
    fn glyph_names() {
        assert_eq!(glyph_to_char("eacute"), Some('é'));
        assert_eq!(glyph_to_char("Q"), Some('Q'));
        assert_eq!(glyph_to_char("uni03B1"), Some('α'));
        assert_eq!(glyph_to_char("u1D400"), Some('𝐀'));
        assert_eq!(glyph_to_char("a.sc"), Some('a'));
        assert_eq!(glyph_to_char("fi"), Some('ﬁ'));
        assert_eq!(glyph_to_char("g123"), None);
        assert_eq!(glyph_to_char(".notdef"), None);
    }

    #[test]
    fn differences_override_base() {
        let mut enc = ByteEncoding::base(BaseEncoding::WinAnsi);
        enc.set_glyph(b'a', "alpha");
        enc.set_glyph(b'b', "nonsense123");
        assert_eq!(enc.get(b'a'), Some('α'));
        assert_eq!(enc.get(b'b'), None);
    }

    #[test]
    fn zapf_dingbats_table() {
        let enc = ByteEncoding::zapf_dingbats();
        assert_eq!(enc.get(b' '), Some(' '));
        assert_eq!(enc.get(0x21), Some('\u{2701}'));
        assert_eq!(enc.get(0x25), Some('\u{260E}'));
        assert_eq!(enc.get(0x7E), Some('\u{275E}'));
        assert_eq!(enc.get(0x80), Some('\u{2768}'));
        assert_eq!(enc.get(0xAB), Some('\u{2660}'));
        assert_eq!(enc.get(0xB6), Some('\u{2776}'));
        assert_eq!(enc.get(0xD6), Some('\u{2194}'));
        assert_eq!(enc.get(0xFE), Some('\u{27BE}'));
        assert_eq!(enc.get(0xF0), None);
        assert_eq!(enc.get(0x7F), None);
    }

    #[test]
    fn afm_builtin_encoding() {
        let afm = b"StartFontMetrics 4.1\nFontName Symbol\nStartCharMetrics 3\n\
C 32 ; WX 250 ; N space ; B 0 0 0 0 ;\n\
C 97 ; WX 631 ; N alpha ; B 41 -18 622 500 ;\n\
C -1 ; WX 790 ; N apple ; B 56 -3 733 808 ;\n\
EndCharMetrics\n";
        let enc = ByteEncoding::from_afm(afm).unwrap();
        assert_eq!(enc.get(b'a'), Some('α'));
        assert_eq!(enc.get(b' '), Some(' '));
        assert_eq!(enc.get(b'b'), None);
        assert!(ByteEncoding::from_afm(b"no metrics here").is_none());
    }
}
