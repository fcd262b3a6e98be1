//! Metrics for the two standard PDF fonts the statement uses.
//!
//! Widths come from the Adobe core-14 AFM files (units of 1/1000 em) for the
//! printable ASCII range; anything else is measured as a digit.

/// Standard Type 1 fonts, always available to PDF viewers without embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

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

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

const FALLBACK_WIDTH: u16 = 556;

impl Font {
    /// PostScript name written into the font dictionary.
    pub fn base_name(self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Resource name used inside content streams.
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
        }
    }

    pub fn all() -> [Font; 2] {
        [Font::Helvetica, Font::HelveticaBold]
    }

    /// Distance from the top of a line box to the baseline, per point of size.
    pub fn ascent(self) -> f32 {
        0.718
    }

    /// Height of one line (ascender + descender + line gap), per point of size.
    pub fn line_height_factor(self) -> f32 {
        match self {
            Font::Helvetica => 1.156,
            Font::HelveticaBold => 1.19,
        }
    }

    pub fn line_height(self, size: f32) -> f32 {
        self.line_height_factor() * size
    }

    /// Advance width of `text` at `size` points.
    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let table = match self {
            Font::Helvetica => &HELVETICA_WIDTHS,
            Font::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        let units: u32 = text
            .chars()
            .map(|c| {
                let code = c as u32;
                if (32..=126).contains(&code) {
                    table[(code - 32) as usize] as u32
                } else {
                    FALLBACK_WIDTH as u32
                }
            })
            .sum();
        units as f32 * size / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_widths() {
        // Digits are tabular (556) in both faces.
        assert!((Font::Helvetica.text_width("150", 12.0) - 20.016).abs() < 1e-3);
        assert!((Font::HelveticaBold.text_width("150", 12.0) - 20.016).abs() < 1e-3);
    }

    #[test]
    fn bold_is_wider() {
        let word = "TOTAL";
        assert!(Font::HelveticaBold.text_width(word, 12.0) > Font::Helvetica.text_width(word, 12.0) - 0.01);
        assert!((Font::Helvetica.text_width("i", 1000.0) - 222.0).abs() < 1e-3);
        assert!((Font::HelveticaBold.text_width("m", 1000.0) - 889.0).abs() < 1e-3);
    }

    #[test]
    fn non_ascii_uses_fallback() {
        assert!((Font::Helvetica.text_width("ş", 1000.0) - 556.0).abs() < 1e-3);
    }
}
