use lopdf::dictionary;
use unicode_normalization::UnicodeNormalization as _;

/// The PDF resource name under which the watermark font is registered on
/// every stamped page. Deliberately verbose so that it does not collide with
/// the short names (`F0`, `F1`, ...) most generators give their own fonts.
pub(crate) const FONT_RESOURCE_NAME: &str = "FWmark";

/// Advance widths of the Helvetica-Bold glyphs for the printable ASCII range
/// (codepoints 32 through 126), in 1/1000 em units, as published in the Adobe
/// AFM metrics for the standard fourteen fonts.
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // A..Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389,
    556, 333, 611, 556, 778, 556, 556, 500, // a..z
    389, 280, 389, 584, // {..~
];

/// Advance width assumed for characters outside the measured range, again in
/// 1/1000 em units. Watermark strings are plain text, so this only matters
/// for the occasional accented character.
const FALLBACK_GLYPH_WIDTH: u16 = 556;

/// The fixed watermark font: the standard bold sans-serif font
/// Helvetica-Bold, one of the fourteen fonts every PDF renderer must provide.
///
/// Because it is a standard font, embedding it means inserting a `Type1` font
/// dictionary into the document and referencing it from each page's
/// resources; no font program is carried in the output. Exactly one such
/// object is created per transformation call and shared by every stamp.
#[derive(Debug, Clone, Copy)]
pub struct StampFont {
    object_id: lopdf::ObjectId,
}

impl StampFont {
    /// Inserts the font dictionary into the document and returns the handle
    /// used for all subsequent stamping operations.
    pub fn embed_into_document(document: &mut lopdf::Document) -> Self {
        let font_dictionary = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        };
        let object_id = document.add_object(font_dictionary);

        StampFont { object_id }
    }

    /// The ID of the font object inside the document it was embedded into.
    pub fn object_id(&self) -> lopdf::ObjectId {
        self.object_id
    }

    /// Measures the width of a single line of text at the given font size, in
    /// page-coordinate units. The text is normalized in the NFC form before
    /// measuring, so that composed and decomposed inputs measure the same.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let total_advance: u32 = text
            .nfc()
            .map(|character| u32::from(glyph_advance(character)))
            .sum();

        total_advance as f32 * font_size / 1000.0
    }

    /// Encodes the text into the byte string written by the `Tj` operator.
    /// The font is registered with the WinAnsi encoding, which follows
    /// Latin-1 except in the `0x80..=0x9F` block, where it places the Euro
    /// sign, typographic quotes and dashes instead of the C1 control codes;
    /// anything WinAnsi cannot represent is replaced by a question mark.
    pub fn encode_text(&self, text: &str) -> Vec<u8> {
        text.nfc()
            .map(|character| match winansi_code(character) {
                Some(code) => code,
                None => {
                    log::warn!(
                        "Unable to encode the character {:?} in the watermark font, replacing it",
                        character
                    );
                    b'?'
                }
            })
            .collect()
    }
}

/// The WinAnsi code of a character, if the encoding assigns one.
fn winansi_code(character: char) -> Option<u8> {
    match character as u32 {
        codepoint @ (0x00..=0x7F | 0xA0..=0xFF) => Some(codepoint as u8),
        _ => match character {
            '\u{20AC}' => Some(0x80), // €
            '\u{201A}' => Some(0x82),
            '\u{0192}' => Some(0x83),
            '\u{201E}' => Some(0x84),
            '\u{2026}' => Some(0x85), // …
            '\u{2020}' => Some(0x86),
            '\u{2021}' => Some(0x87),
            '\u{02C6}' => Some(0x88),
            '\u{2030}' => Some(0x89),
            '\u{0160}' => Some(0x8A),
            '\u{2039}' => Some(0x8B),
            '\u{0152}' => Some(0x8C),
            '\u{017D}' => Some(0x8E),
            '\u{2018}' => Some(0x91),
            '\u{2019}' => Some(0x92),
            '\u{201C}' => Some(0x93),
            '\u{201D}' => Some(0x94),
            '\u{2022}' => Some(0x95),
            '\u{2013}' => Some(0x96), // en dash
            '\u{2014}' => Some(0x97), // em dash
            '\u{02DC}' => Some(0x98),
            '\u{2122}' => Some(0x99), // ™
            '\u{0161}' => Some(0x9A),
            '\u{203A}' => Some(0x9B),
            '\u{0153}' => Some(0x9C),
            '\u{017E}' => Some(0x9E),
            '\u{0178}' => Some(0x9F),
            _ => None,
        },
    }
}

/// Retrieve the advance width of a character in 1/1000 em units.
fn glyph_advance(character: char) -> u16 {
    let codepoint = character as u32;
    match codepoint {
        32..=126 => HELVETICA_BOLD_WIDTHS[(codepoint - 32) as usize],
        _ => {
            log::warn!(
                "Unable to find the character {:?} in the font metrics, assuming a default width",
                character
            );
            FALLBACK_GLYPH_WIDTH
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font() -> StampFont {
        let mut document = lopdf::Document::with_version("1.5");
        StampFont::embed_into_document(&mut document)
    }

    #[test]
    fn text_width_scales_linearly_with_the_font_size() {
        let font = font();
        let narrow = font.text_width("CONFIDENTIAL", 12.0);
        let wide = font.text_width("CONFIDENTIAL", 24.0);
        assert!(narrow > 0.0);
        assert!((wide - 2.0 * narrow).abs() < 1e-3);
    }

    #[test]
    fn empty_text_measures_zero() {
        assert_eq!(font().text_width("", 36.72), 0.0);
    }

    #[test]
    fn wide_glyphs_measure_wider_than_narrow_ones() {
        let font = font();
        assert!(font.text_width("WWW", 14.0) > font.text_width("iii", 14.0));
    }

    #[test]
    fn normalization_makes_composed_and_decomposed_text_measure_the_same() {
        let font = font();
        let composed = font.text_width("caf\u{e9}", 18.0);
        let decomposed = font.text_width("cafe\u{301}", 18.0);
        assert_eq!(composed, decomposed);
    }

    #[test]
    fn ascii_text_encodes_as_its_own_bytes() {
        assert_eq!(font().encode_text("CONFIDENTIAL"), b"CONFIDENTIAL".to_vec());
    }

    #[test]
    fn characters_outside_the_encoding_are_replaced() {
        assert_eq!(font().encode_text("\u{4e2d}"), b"?".to_vec());
    }

    #[test]
    fn winansi_specific_characters_map_into_the_0x80_block() {
        assert_eq!(font().encode_text("\u{20ac}"), vec![0x80]);
        assert_eq!(font().encode_text("\u{2014}"), vec![0x97]);
        assert_eq!(font().encode_text("\u{2122}"), vec![0x99]);
    }

    #[test]
    fn c1_control_codepoints_are_not_passed_through_as_raw_bytes() {
        assert_eq!(font().encode_text("\u{0080}"), b"?".to_vec());
    }
}
