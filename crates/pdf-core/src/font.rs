//! Fonts: built-in Helvetica or an embedded TrueType face
//!
//! Embedded faces are written as Type0 / CIDFontType2 with Identity-H
//! encoding, so the content stream carries glyph ids directly.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;
use std::io::Write as _;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::text::escape_literal;
use crate::{PdfError, Result};

/// Helvetica advance widths (1/1000 em) for ASCII 0x20..=0x7E
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Em width charged for characters Helvetica cannot show
const UNMAPPED_WIDTH: u16 = 1000;

/// bfchar blocks may hold at most 100 mappings
const BFCHAR_LIMIT: usize = 100;

const CMAP_PROLOGUE: &str = "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
";

const CMAP_EPILOGUE: &str = "endcmap
CMapName currentdict /CMap defineresource pop
end
end
";

/// Built-in PDF base-14 fonts that need no embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
}

impl StandardFont {
    fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
        }
    }

    fn advance(self, c: char) -> u16 {
        match (self, u32::from(c)) {
            (StandardFont::Helvetica, cp @ 0x20..=0x7E) => HELVETICA_WIDTHS[(cp - 0x20) as usize],
            (StandardFont::Helvetica, 0xA5) => 556,
            _ => UNMAPPED_WIDTH,
        }
    }
}

/// WinAnsi byte for a character, `None` when the code page lacks it
fn win_ansi(c: char) -> Option<u8> {
    match u32::from(c) {
        cp @ (0x20..=0x7E | 0xA0..=0xFF) => Some(cp as u8),
        _ => None,
    }
}

/// Parsed TrueType face plus its original bytes
#[derive(Debug, Clone)]
struct Face {
    bytes: Vec<u8>,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    cmap: HashMap<char, u16>,
    advances: Vec<u16>,
}

impl Face {
    fn parse(bytes: &[u8]) -> Result<Self> {
        let face = ttf_parser::Face::parse(bytes, 0)
            .map_err(|e| PdfError::FontParseError(e.to_string()))?;

        let mut cmap = HashMap::new();
        let unicode_tables = face
            .tables()
            .cmap
            .into_iter()
            .flat_map(|table| table.subtables)
            .filter(|sub| sub.is_unicode());
        for sub in unicode_tables {
            sub.codepoints(|cp| {
                let glyph = sub.glyph_index(cp);
                if let (Some(c), Some(glyph)) = (char::from_u32(cp), glyph) {
                    cmap.entry(c).or_insert(glyph.0);
                }
            });
        }

        let advances = (0..face.number_of_glyphs())
            .map(|id| face.glyph_hor_advance(ttf_parser::GlyphId(id)).unwrap_or(0))
            .collect();

        Ok(Self {
            bytes: bytes.to_vec(),
            units_per_em: face.units_per_em().max(1),
            ascender: face.ascender(),
            descender: face.descender(),
            cmap,
            advances,
        })
    }
}

#[derive(Debug, Clone)]
enum Source {
    Embedded(Face),
    Standard(StandardFont),
}

/// A named font registered with a document
#[derive(Debug, Clone)]
pub struct FontData {
    pub name: String,
    /// Every character shown with this font; drives /W and ToUnicode
    pub used_chars: BTreeSet<char>,
    source: Source,
}

impl FontData {
    /// Parse TrueType bytes into an embeddable font
    pub fn from_ttf(name: &str, ttf_data: &[u8]) -> Result<Self> {
        Ok(Self::with_source(name, Source::Embedded(Face::parse(ttf_data)?)))
    }

    /// A base-14 font, referenced by name and never embedded
    pub fn standard(name: &str, font: StandardFont) -> Self {
        Self::with_source(name, Source::Standard(font))
    }

    fn with_source(name: &str, source: Source) -> Self {
        Self {
            name: name.to_string(),
            used_chars: BTreeSet::new(),
            source,
        }
    }

    pub fn add_chars(&mut self, text: &str) {
        self.used_chars.extend(text.chars());
    }

    /// Glyph id (embedded) or WinAnsi code (standard) for a character
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        match &self.source {
            Source::Embedded(face) => face.cmap.get(&c).copied(),
            Source::Standard(_) => Some(u16::from(win_ansi(c).unwrap_or(b'?'))),
        }
    }

    /// Whether the character renders as itself rather than `.notdef` or `?`
    pub fn has_glyph(&self, c: char) -> bool {
        match &self.source {
            Source::Embedded(face) => face.cmap.get(&c).is_some_and(|&id| id != 0),
            Source::Standard(_) => win_ansi(c).is_some(),
        }
    }

    /// Horizontal advance in font units
    pub fn glyph_advance(&self, c: char) -> Option<u16> {
        match &self.source {
            Source::Embedded(face) => {
                let id = face.cmap.get(&c)?;
                face.advances.get(usize::from(*id)).copied()
            }
            Source::Standard(font) => Some(font.advance(c)),
        }
    }

    pub fn units_per_em(&self) -> u16 {
        match &self.source {
            Source::Embedded(face) => face.units_per_em,
            Source::Standard(_) => 1000,
        }
    }

    fn vertical_metrics(&self) -> (i16, i16) {
        match &self.source {
            Source::Embedded(face) => (face.ascender, face.descender),
            Source::Standard(_) => (718, -207),
        }
    }

    /// Advance of `text` in points at `size`
    pub fn text_width(&self, text: &str, size: f64) -> f64 {
        let units: u32 = text
            .chars()
            .filter_map(|c| self.glyph_advance(c))
            .map(u32::from)
            .sum();
        f64::from(units) / f64::from(self.units_per_em()) * size
    }

    /// `Tj` operand for `text`
    ///
    /// Embedded fonts take a hex string of glyph ids; the standard font
    /// takes a WinAnsi literal string.
    pub fn encode_text(&self, text: &str) -> String {
        match &self.source {
            Source::Embedded(_) => {
                let mut hex = String::with_capacity(text.len() * 4 + 2);
                hex.push('<');
                for c in text.chars() {
                    let _ = write!(hex, "{:04X}", self.glyph_id(c).unwrap_or(0));
                }
                hex.push('>');
                hex
            }
            Source::Standard(_) => {
                let bytes: Vec<u8> = text.chars().map(|c| win_ansi(c).unwrap_or(b'?')).collect();
                escape_literal(&bytes)
            }
        }
    }

    /// Add this font's objects to `doc`, returning the font dictionary id
    pub(crate) fn embed(&self, doc: &mut Document) -> Result<ObjectId> {
        let face = match &self.source {
            Source::Standard(font) => {
                return Ok(doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => font.base_font(),
                    "Encoding" => "WinAnsiEncoding",
                }));
            }
            Source::Embedded(face) => face,
        };

        let base_font = Object::Name(pdf_name(&self.name).into_bytes());
        let (ascender, descender) = self.vertical_metrics();
        let ascent = self.to_thousandths(ascender.into());
        let descent = self.to_thousandths(descender.into());

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&face.bytes)?;
        let font_file = doc.add_object(Stream::new(
            dictionary! {
                "Length1" => face.bytes.len() as i64,
                "Filter" => "FlateDecode",
            },
            encoder.finish()?,
        ));

        let descriptor = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => base_font.clone(),
            "Flags" => 4,
            "FontBBox" => vec![Object::from(0), descent.into(), 1000.into(), ascent.into()],
            "ItalicAngle" => 0,
            "Ascent" => ascent,
            "Descent" => descent,
            "CapHeight" => ascent,
            "StemV" => 80,
            "FontFile2" => font_file,
        });

        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => base_font.clone(),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "CIDToGIDMap" => "Identity",
            "W" => self.widths(),
            "DW" => 1000,
            "FontDescriptor" => descriptor,
        });

        let to_unicode = doc.add_object(Stream::new(
            dictionary! { "Type" => "CMap" },
            self.to_unicode_cmap().into_bytes(),
        ));

        Ok(doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => base_font,
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::from(cid_font)],
            "ToUnicode" => to_unicode,
        }))
    }

    fn to_thousandths(&self, units: f64) -> i64 {
        (units * 1000.0 / f64::from(self.units_per_em())).round() as i64
    }

    /// `/W` entries for the used glyphs: `gid [width]` pairs in gid order
    fn widths(&self) -> Vec<Object> {
        let by_glyph: BTreeSet<(u16, i64)> = self
            .used_chars
            .iter()
            .filter_map(|&c| {
                let id = self.glyph_id(c)?;
                let advance = self.glyph_advance(c).unwrap_or(0);
                Some((id, self.to_thousandths(advance.into())))
            })
            .collect();

        let mut last = None;
        let mut widths = Vec::with_capacity(by_glyph.len() * 2);
        for (id, width) in by_glyph {
            if last == Some(id) {
                continue;
            }
            last = Some(id);
            widths.push(i64::from(id).into());
            widths.push(vec![width.into()].into());
        }
        widths
    }

    /// ToUnicode CMap mapping each used glyph back to its character
    fn to_unicode_cmap(&self) -> String {
        let mut cmap = String::from(CMAP_PROLOGUE);
        let chars: Vec<char> = self.used_chars.iter().copied().collect();
        for block in chars.chunks(BFCHAR_LIMIT) {
            let _ = writeln!(cmap, "{} beginbfchar", block.len());
            for &c in block {
                let mut utf16 = [0u16; 2];
                let _ = write!(cmap, "<{:04X}> <", self.glyph_id(c).unwrap_or(0));
                for unit in c.encode_utf16(&mut utf16) {
                    let _ = write!(cmap, "{unit:04X}");
                }
                cmap.push_str(">\n");
            }
            cmap.push_str("endbfchar\n");
        }
        cmap.push_str(CMAP_EPILOGUE);
        cmap
    }
}

/// Replace characters that cannot appear in a PDF name
fn pdf_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '-',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn helvetica() -> FontData {
        FontData::standard("latin", StandardFont::Helvetica)
    }

    #[test]
    fn test_from_ttf_rejects_garbage() {
        let result = FontData::from_ttf("broken", &[0u8; 100]);
        assert!(matches!(result, Err(PdfError::FontParseError(_))));
    }

    #[test]
    fn test_used_chars_are_a_set() {
        let mut font = helvetica();
        font.add_chars("Hello");
        font.add_chars("ole");
        assert_eq!(font.used_chars.iter().collect::<String>(), "Helo");
    }

    #[test]
    fn test_helvetica_widths() {
        let font = helvetica();
        assert_eq!(font.units_per_em(), 1000);
        assert!((font.text_width("0", 10.0) - 5.56).abs() < 1e-9);
        assert!((font.text_width("Hi", 1000.0) - 944.0).abs() < 1e-9);
        assert_eq!(font.text_width("", 12.0), 0.0);
        // outside WinAnsi every character costs a full em
        assert!((font.text_width("日本", 10.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_helvetica_coverage() {
        let font = helvetica();
        assert!(font.has_glyph('A'));
        assert!(font.has_glyph('é'));
        assert!(!font.has_glyph('日'));
        assert_eq!(font.encode_text("A(1)"), "(A\\(1\\))");
        assert_eq!(font.encode_text("日"), "(?)");
    }

    #[test]
    fn test_standard_font_object() {
        let mut doc = Document::with_version("1.5");
        let id = helvetica().embed(&mut doc).unwrap();
        let dict = doc.get_dictionary(id).unwrap();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
        assert_eq!(dict.get(b"Subtype").unwrap().as_name().unwrap(), b"Type1");
        assert_eq!(doc.objects.len(), 1);
    }

    #[test]
    fn test_to_unicode_blocks() {
        let mut font = helvetica();
        assert!(!font.to_unicode_cmap().contains("beginbfchar"));

        font.add_chars("AB");
        let cmap = font.to_unicode_cmap();
        assert!(cmap.starts_with("/CIDInit"));
        assert!(cmap.contains("2 beginbfchar\n<0041> <0041>\n<0042> <0042>\nendbfchar"));
        assert!(cmap.ends_with("end\nend\n"));
    }

    #[test]
    fn test_to_unicode_splits_large_sets() {
        let mut font = helvetica();
        let text: String = (0x20u8..=0x7E).chain(0xA0..=0xFF).map(char::from).collect();
        font.add_chars(&text);
        let cmap = font.to_unicode_cmap();
        assert!(cmap.contains("100 beginbfchar"));
        assert!(cmap.contains("91 beginbfchar"));
        assert_eq!(cmap.matches("endbfchar").count(), 2);
    }

    #[test]
    fn test_widths_one_entry_per_glyph() {
        let mut font = helvetica();
        font.add_chars("AA0");
        // two glyphs, each as gid + [width]
        let widths = font.widths();
        assert_eq!(widths.len(), 4);
        assert_eq!(widths[0].as_i64().unwrap(), 0x30);
    }

    #[test]
    fn test_pdf_name() {
        assert_eq!(pdf_name("Noto Sans/JP"), "Noto-Sans-JP");
    }
}
