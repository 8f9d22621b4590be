use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Millimetres per typographic point.
pub const MM_PER_PT: f32 = 0.352778;

/// Convert a font size in points to millimetres.
pub fn mm(pt: f32) -> f32 {
    pt * MM_PER_PT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (true, true) => FontStyle::BoldItalic,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (false, false) => FontStyle::Normal,
        }
    }
}

/// One of the standard Type1 faces the document writer references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    TimesRoman,
    TimesBold,
    TimesItalic,
    TimesBoldItalic,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

impl FontFace {
    pub const ALL: [FontFace; 8] = [
        FontFace::TimesRoman,
        FontFace::TimesBold,
        FontFace::TimesItalic,
        FontFace::TimesBoldItalic,
        FontFace::Courier,
        FontFace::CourierBold,
        FontFace::CourierOblique,
        FontFace::CourierBoldOblique,
    ];

    pub fn select(style: FontStyle, mono: bool) -> Self {
        match (mono, style) {
            (false, FontStyle::Normal) => FontFace::TimesRoman,
            (false, FontStyle::Bold) => FontFace::TimesBold,
            (false, FontStyle::Italic) => FontFace::TimesItalic,
            (false, FontStyle::BoldItalic) => FontFace::TimesBoldItalic,
            (true, FontStyle::Normal) => FontFace::Courier,
            (true, FontStyle::Bold) => FontFace::CourierBold,
            (true, FontStyle::Italic) => FontFace::CourierOblique,
            (true, FontStyle::BoldItalic) => FontFace::CourierBoldOblique,
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            FontFace::TimesRoman => "Times-Roman",
            FontFace::TimesBold => "Times-Bold",
            FontFace::TimesItalic => "Times-Italic",
            FontFace::TimesBoldItalic => "Times-BoldItalic",
            FontFace::Courier => "Courier",
            FontFace::CourierBold => "Courier-Bold",
            FontFace::CourierOblique => "Courier-Oblique",
            FontFace::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Resource name used inside content streams (`/F1` .. `/F8`).
    pub fn resource_name(self) -> String {
        let index = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        format!("F{}", index + 1)
    }

    pub fn is_monospace(self) -> bool {
        matches!(
            self,
            FontFace::Courier
                | FontFace::CourierBold
                | FontFace::CourierOblique
                | FontFace::CourierBoldOblique
        )
    }

    /// Advance width of one character in 1/1000 em.
    pub fn char_width(self, c: char) -> u16 {
        if self.is_monospace() {
            return 600;
        }
        let table = match self {
            FontFace::TimesBold => &TIMES_BOLD,
            FontFace::TimesItalic => &TIMES_ITALIC,
            FontFace::TimesBoldItalic => &TIMES_BOLD_ITALIC,
            _ => &TIMES_ROMAN,
        };
        match c {
            ' '..='~' => table[c as usize - 32],
            '\u{2022}' => 350,
            _ if win_ansi_byte(c).is_some() => 500,
            // drawn as '?'
            _ => table['?' as usize - 32],
        }
    }

    /// Width of `text` in millimetres at `size` points.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f32 / 1000.0 * mm(size)
    }
}

// AFM advance widths for ' '..='~'.
#[rustfmt::skip]
static TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

#[rustfmt::skip]
static TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 570, 570, 570, 500, 930,
    722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944,
    722, 778, 611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667,
    333, 278, 333, 581, 500, 333,
    500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833,
    556, 500, 556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444,
    394, 220, 394, 520,
];

#[rustfmt::skip]
static TIMES_ITALIC: [u16; 95] = [
    250, 333, 420, 500, 500, 833, 778, 214, 333, 333, 500, 675, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 675, 675, 675, 500, 920,
    611, 611, 667, 722, 611, 611, 722, 722, 333, 444, 667, 556, 833,
    667, 722, 611, 722, 611, 500, 556, 722, 611, 833, 611, 556, 556,
    389, 278, 389, 422, 500, 333,
    500, 500, 444, 500, 444, 278, 500, 500, 278, 278, 444, 278, 722,
    500, 500, 500, 500, 389, 389, 278, 500, 444, 667, 444, 444, 389,
    400, 275, 400, 541,
];

#[rustfmt::skip]
static TIMES_BOLD_ITALIC: [u16; 95] = [
    250, 389, 555, 500, 500, 833, 778, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    333, 333, 570, 570, 570, 500, 832,
    667, 667, 667, 722, 667, 667, 722, 778, 389, 500, 667, 611, 889,
    722, 722, 611, 722, 667, 556, 611, 722, 667, 889, 667, 611, 611,
    333, 278, 333, 570, 500, 333,
    500, 500, 444, 500, 444, 333, 500, 556, 278, 278, 500, 278, 778,
    556, 500, 500, 500, 389, 389, 278, 556, 444, 667, 500, 444, 389,
    348, 220, 348, 570,
];

// Code points WinAnsiEncoding places in 0x80..=0x9F.
static WIN_ANSI_EXTRA: Lazy<HashMap<char, u8>> = Lazy::new(|| {
    [
        ('\u{20AC}', 0x80),
        ('\u{201A}', 0x82),
        ('\u{0192}', 0x83),
        ('\u{201E}', 0x84),
        ('\u{2026}', 0x85),
        ('\u{2020}', 0x86),
        ('\u{2021}', 0x87),
        ('\u{02C6}', 0x88),
        ('\u{2030}', 0x89),
        ('\u{0160}', 0x8A),
        ('\u{2039}', 0x8B),
        ('\u{0152}', 0x8C),
        ('\u{017D}', 0x8E),
        ('\u{2018}', 0x91),
        ('\u{2019}', 0x92),
        ('\u{201C}', 0x93),
        ('\u{201D}', 0x94),
        ('\u{2022}', 0x95),
        ('\u{2013}', 0x96),
        ('\u{2014}', 0x97),
        ('\u{02DC}', 0x98),
        ('\u{2122}', 0x99),
        ('\u{0161}', 0x9A),
        ('\u{203A}', 0x9B),
        ('\u{0153}', 0x9C),
        ('\u{017E}', 0x9E),
        ('\u{0178}', 0x9F),
    ]
    .into_iter()
    .collect()
});

/// Byte for `c` in WinAnsiEncoding, if the encoding has it.
pub fn win_ansi_byte(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(c as u32 as u8),
        _ => WIN_ANSI_EXTRA.get(&c).copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_from_flags() {
        assert_eq!(FontStyle::from_flags(true, true), FontStyle::BoldItalic);
        assert_eq!(FontStyle::from_flags(true, false), FontStyle::Bold);
        assert_eq!(FontStyle::from_flags(false, true), FontStyle::Italic);
        assert_eq!(FontStyle::from_flags(false, false), FontStyle::Normal);
    }

    #[test]
    fn test_face_selection() {
        assert_eq!(FontFace::select(FontStyle::Bold, false), FontFace::TimesBold);
        assert_eq!(FontFace::select(FontStyle::Bold, true), FontFace::CourierBold);
        assert_eq!(FontFace::select(FontStyle::Italic, true), FontFace::CourierOblique);
        assert_eq!(FontFace::TimesRoman.resource_name(), "F1");
        assert_eq!(FontFace::CourierBoldOblique.resource_name(), "F8");
    }

    #[test]
    fn test_widths() {
        assert_eq!(FontFace::TimesRoman.char_width(' '), 250);
        assert_eq!(FontFace::TimesRoman.char_width('m'), 778);
        assert_eq!(FontFace::TimesBold.char_width('W'), 1000);
        assert_eq!(FontFace::Courier.char_width('W'), 600);
        assert_eq!(FontFace::TimesRoman.char_width('\u{2022}'), 350);

        // 10 Courier characters at 10pt: 10 * 0.6 * 10pt
        let w = FontFace::Courier.text_width("0123456789", 10.0);
        assert!((w - 60.0 * MM_PER_PT).abs() < 0.0001);
    }

    #[test]
    fn test_win_ansi() {
        assert_eq!(win_ansi_byte('A'), Some(b'A'));
        assert_eq!(win_ansi_byte('é'), Some(0xE9));
        assert_eq!(win_ansi_byte('\u{2022}'), Some(0x95));
        assert_eq!(win_ansi_byte('\u{2713}'), None);
    }
}
