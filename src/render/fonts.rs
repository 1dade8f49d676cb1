//! Standard Type1 fonts: face selection, WinAnsi encoding and advance widths.
//!
//! Only the 14 base fonts are used, so nothing is embedded. Widths are the
//! published AFM advances in 1/1000 em for the printable ASCII range; the
//! upper WinAnsi range falls back to per-face averages.

/// One of the base fonts a text run can be set in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    Mono,
    MonoBold,
    MonoItalic,
    MonoBoldItalic,
}

impl Face {
    pub const ALL: [Face; 8] = [
        Face::Regular,
        Face::Bold,
        Face::Italic,
        Face::BoldItalic,
        Face::Mono,
        Face::MonoBold,
        Face::MonoItalic,
        Face::MonoBoldItalic,
    ];

    pub fn select(bold: bool, italic: bool, mono: bool) -> Self {
        match (mono, bold, italic) {
            (false, false, false) => Face::Regular,
            (false, true, false) => Face::Bold,
            (false, false, true) => Face::Italic,
            (false, true, true) => Face::BoldItalic,
            (true, false, false) => Face::Mono,
            (true, true, false) => Face::MonoBold,
            (true, false, true) => Face::MonoItalic,
            (true, true, true) => Face::MonoBoldItalic,
        }
    }

    /// Resource name used in page content streams.
    pub fn resource(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
            Face::Italic => "F3",
            Face::BoldItalic => "F4",
            Face::Mono => "F5",
            Face::MonoBold => "F6",
            Face::MonoItalic => "F7",
            Face::MonoBoldItalic => "F8",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Face::Regular => "Helvetica",
            Face::Bold => "Helvetica-Bold",
            Face::Italic => "Helvetica-Oblique",
            Face::BoldItalic => "Helvetica-BoldOblique",
            Face::Mono => "Courier",
            Face::MonoBold => "Courier-Bold",
            Face::MonoItalic => "Courier-Oblique",
            Face::MonoBoldItalic => "Courier-BoldOblique",
        }
    }

    fn is_mono(self) -> bool {
        matches!(
            self,
            Face::Mono | Face::MonoBold | Face::MonoItalic | Face::MonoBoldItalic
        )
    }

    fn is_bold(self) -> bool {
        matches!(self, Face::Bold | Face::BoldItalic)
    }

    /// Advance width of an encoded byte, in 1/1000 em.
    pub fn glyph_width(self, byte: u8) -> u16 {
        if self.is_mono() {
            return 600;
        }
        let table = if self.is_bold() {
            &HELVETICA_BOLD
        } else {
            &HELVETICA
        };
        match byte {
            0x20..=0x7e => table[(byte - 0x20) as usize],
            0x95 => 350,
            0x96 => 556,
            0x97 | 0x85 | 0x89 => 1000,
            0x91 | 0x92 | 0x82 => 278,
            0x93 | 0x94 | 0x84 => 500,
            0xa0 => 278,
            _ if self.is_bold() => 611,
            _ => 556,
        }
    }

    /// Width of `bytes` set at `size` points.
    pub fn measure(self, bytes: &[u8], size: f32) -> f32 {
        let units: u32 = bytes.iter().map(|b| self.glyph_width(*b) as u32).sum();
        units as f32 * size / 1000.0
    }
}

/// Map a character to its WinAnsiEncoding byte. Characters outside the
/// encoding become `?`.
pub fn encode_char(c: char) -> u8 {
    match c {
        ' '..='~' => c as u8,
        '\u{a0}'..='\u{ff}' => c as u32 as u8,
        '\t' => b' ',
        '\u{20ac}' => 0x80,
        '\u{201a}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201e}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8a,
        '\u{0152}' => 0x8c,
        '\u{017d}' => 0x8e,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9a,
        '\u{0153}' => 0x9c,
        '\u{017e}' => 0x9e,
        '\u{0178}' => 0x9f,
        _ => b'?',
    }
}

pub fn encode(text: &str) -> Vec<u8> {
    text.chars().map(encode_char).collect()
}

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,      // 'p'..'~'
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_ascii_latin1_and_typographic_marks() {
        assert_eq!(encode("Az~"), b"Az~".to_vec());
        assert_eq!(encode("é"), vec![0xe9]);
        assert_eq!(encode("\u{2022}\u{2014}"), vec![0x95, 0x97]);
        assert_eq!(encode("\u{4e2d}"), b"?".to_vec());
    }

    #[test]
    fn measures_with_face_specific_widths() {
        assert_eq!(Face::Regular.measure(b"i", 1000.0), 222.0);
        assert_eq!(Face::Bold.measure(b"i", 1000.0), 278.0);
        assert_eq!(Face::Mono.measure(b"iW", 10.0), 12.0);
        assert!(Face::Regular.measure(b"Test 1", 11.0) > 0.0);
    }

    #[test]
    fn selects_faces_by_style() {
        assert_eq!(Face::select(true, true, false), Face::BoldItalic);
        assert_eq!(Face::select(false, false, true).base_font(), "Courier");
        assert_eq!(Face::ALL.len(), 8);
    }
}
