use super::fonts::FontStyle;

/// Page-drawing primitive the layout engine renders through.
///
/// Coordinates are millimetres measured from the top-left corner of the
/// current page; text is positioned by its baseline.
pub trait Canvas {
    fn set_font(&mut self, style: FontStyle, size: f32, mono: bool);

    /// Width of `text` in the current font, in millimetres.
    fn text_width(&self, text: &str) -> f32;

    fn draw_text(&mut self, text: &str, x: f32, y: f32);

    fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32);

    fn line_width(&self) -> f32;

    fn set_line_width(&mut self, width: f32);

    fn set_draw_color(&mut self, r: u8, g: u8, b: u8);

    fn add_page(&mut self);

    /// `(width, height)` of a page in millimetres.
    fn page_size(&self) -> (f32, f32);

    /// Wrap `text` to `max_width` using the current font.
    ///
    /// Breaks between words where possible and splits words that are wider
    /// than a whole line. Whitespace at a break is dropped; leading
    /// indentation of the first chunk is kept. Always returns at least one
    /// chunk.
    fn split_text_to_size(&self, text: &str, max_width: f32) -> Vec<String> {
        wrap_to_width(text, max_width, |chunk| self.text_width(chunk))
    }
}

/// Greedy word wrap of `text` against an arbitrary width function.
///
/// Used directly when chunks are not drawn as plain text, e.g. with glyphs
/// whose advance differs from the font's.
pub fn wrap_to_width(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for unit in split_keep_whitespace(text) {
        let is_space = unit.trim().is_empty();
        let candidate = format!("{}{}", current, unit);

        if measure(&candidate) <= max_width {
            current = candidate;
            continue;
        }

        if is_space {
            // never carry whitespace across a break
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            continue;
        }

        if !current.trim().is_empty() {
            lines.push(current.trim_end().to_string());
            current = String::new();
        }

        if measure(&format!("{}{}", current, unit)) <= max_width {
            current.push_str(unit);
            continue;
        }

        for c in unit.chars() {
            let mut next = current.clone();
            next.push(c);
            if !current.is_empty() && measure(&next) > max_width {
                lines.push(std::mem::take(&mut current));
                current.push(c);
            } else {
                current = next;
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }

    lines
}

/// Split `text` into alternating word and whitespace runs, keeping both.
pub fn split_keep_whitespace(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;

    for (i, c) in text.char_indices() {
        let space = c.is_whitespace();
        match in_space {
            Some(prev) if prev != space => {
                parts.push(&text[start..i]);
                start = i;
            }
            _ => {}
        }
        in_space = Some(space);
    }

    if start < text.len() {
        parts.push(&text[start..]);
    }

    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keep_whitespace() {
        assert_eq!(
            split_keep_whitespace("a  bc d"),
            vec!["a", "  ", "bc", " ", "d"]
        );
        assert_eq!(split_keep_whitespace("  lead"), vec!["  ", "lead"]);
        assert!(split_keep_whitespace("").is_empty());
    }

    struct FixedWidth;

    impl Canvas for FixedWidth {
        fn set_font(&mut self, _: FontStyle, _: f32, _: bool) {}
        fn text_width(&self, text: &str) -> f32 {
            text.chars().count() as f32
        }
        fn draw_text(&mut self, _: &str, _: f32, _: f32) {}
        fn draw_line(&mut self, _: f32, _: f32, _: f32, _: f32) {}
        fn line_width(&self) -> f32 {
            0.2
        }
        fn set_line_width(&mut self, _: f32) {}
        fn set_draw_color(&mut self, _: u8, _: u8, _: u8) {}
        fn add_page(&mut self) {}
        fn page_size(&self) -> (f32, f32) {
            (100.0, 100.0)
        }
    }

    #[test]
    fn test_split_text_to_size_words() {
        let lines = FixedWidth.split_text_to_size("one two three four", 9.0);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn test_split_text_to_size_long_word() {
        let lines = FixedWidth.split_text_to_size("abcdefghij", 4.0);
        assert_eq!(lines, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_split_text_to_size_keeps_indent() {
        let lines = FixedWidth.split_text_to_size("    let x = 1;", 40.0);
        assert_eq!(lines, vec!["    let x = 1;"]);
    }

    #[test]
    fn test_wrap_to_width_uses_measure() {
        // '#' counts double
        let measure = |s: &str| s.chars().map(|c| if c == '#' { 2.0 } else { 1.0 }).sum::<f32>();
        let lines = wrap_to_width("ab## cd", 5.0, measure);
        assert_eq!(lines, vec!["ab#", "# cd"]);
        assert!(lines.iter().all(|line| measure(line) <= 5.0));
    }

    #[test]
    fn test_split_text_to_size_empty() {
        assert_eq!(FixedWidth.split_text_to_size("", 10.0), vec![String::new()]);
    }
}
