//! Paginated layout of markdown blocks onto a [`Canvas`].

use super::canvas::{split_keep_whitespace, wrap_to_width, Canvas};
use super::fonts::{mm, FontStyle};
use super::markdown::{Block, Inline};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub left: f32,
    pub right: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSizes {
    pub h1: f32,
    pub h2: f32,
    pub h3: f32,
    pub paragraph: f32,
    pub small: f32,
}

/// Fixed page geometry and typography for exported responses.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub margins: Margins,
    pub sizes: FontSizes,
    /// Multiplier applied to the font size to get the line pitch.
    pub line_height: f32,
    pub bullet: &'static str,
    pub rule_height: f32,
    pub rule_color: (u8, u8, u8),
    pub fence_gap: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            margins: Margins { top: 20.0, left: 18.0, right: 18.0, bottom: 20.0 },
            sizes: FontSizes { h1: 18.0, h2: 15.0, h3: 13.0, paragraph: 12.0, small: 10.0 },
            line_height: 1.5,
            bullet: "\u{2022}",
            rule_height: 6.0,
            rule_color: (180, 180, 180),
            fence_gap: 2.0,
        }
    }
}

impl LayoutConfig {
    pub fn line_pitch(&self, size: f32) -> f32 {
        mm(size) * self.line_height
    }

    pub fn heading_size(&self, level: u8) -> f32 {
        match level {
            1 => self.sizes.h1,
            2 => self.sizes.h2,
            _ => self.sizes.h3,
        }
    }
}

/// Vertical write position on the current page, in millimetres from the top.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub y: f32,
}

impl Cursor {
    pub fn new(config: &LayoutConfig) -> Self {
        Cursor { y: config.margins.top }
    }
}

/// Replace characters the standard fonts cannot show with plain equivalents.
pub fn sanitize(text: &str) -> String {
    text.replace(['\u{2013}', '\u{2014}'], "-")
        .replace('\u{a0}', " ")
        .replace("\r\n", "\n")
}

const CHECK_MARKS: [&str; 3] = ["\u{2713}", "\u{2714}", "\\u2713"];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment<'a> {
    Check,
    Text(&'a str),
}

/// Split `s` around check marks. Empty text segments are dropped.
fn split_checks(s: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = s;

    loop {
        let next = CHECK_MARKS
            .iter()
            .filter_map(|mark| rest.find(mark).map(|at| (at, mark.len())))
            .min_by_key(|(at, _)| *at);

        match next {
            Some((at, len)) => {
                if at > 0 {
                    segments.push(Segment::Text(&rest[..at]));
                }
                segments.push(Segment::Check);
                rest = &rest[at + len..];
            }
            None => {
                if !rest.is_empty() {
                    segments.push(Segment::Text(rest));
                }
                break;
            }
        }
    }

    segments
}

/// Horizontal advance of a drawn check mark.
fn check_width(size: f32) -> f32 {
    mm(size) * 0.8
}

/// Style flags and horizontal position for one inline sequence.
struct Run {
    bold: bool,
    italic: bool,
    mono: bool,
    force_bold: bool,
    size: f32,
    pitch: f32,
    line_start: f32,
    x: f32,
}

impl Run {
    fn style(&self) -> FontStyle {
        FontStyle::from_flags(self.bold, self.italic)
    }
}

pub struct LayoutEngine<'a, C: Canvas> {
    canvas: &'a mut C,
    config: &'a LayoutConfig,
}

impl<'a, C: Canvas> LayoutEngine<'a, C> {
    pub fn new(canvas: &'a mut C, config: &'a LayoutConfig) -> Self {
        LayoutEngine { canvas, config }
    }

    fn right_edge(&self) -> f32 {
        self.canvas.page_size().0 - self.config.margins.right
    }

    fn content_width(&self) -> f32 {
        self.right_edge() - self.config.margins.left
    }

    /// Start a new page if `height` more millimetres would cross the bottom
    /// margin. Call before drawing, never after.
    pub fn page_break(&mut self, cursor: &mut Cursor, height: f32) {
        let limit = self.canvas.page_size().1 - self.config.margins.bottom;
        if cursor.y + height > limit {
            self.canvas.add_page();
            cursor.y = self.config.margins.top;
        }
    }

    /// Walk the block tree top to bottom.
    pub fn render(&mut self, blocks: &[Block], cursor: &mut Cursor) {
        let left = self.config.margins.left;
        let paragraph = self.config.sizes.paragraph;

        for block in blocks {
            match block {
                Block::Heading { level, inline } => {
                    let size = self.config.heading_size(*level);
                    self.draw_inline(cursor, inline, size, left, None, true);
                }
                Block::Paragraph(inline) => {
                    self.draw_inline(cursor, inline, paragraph, left, None, false);
                }
                Block::BulletList(items) => {
                    let bullet = self.config.bullet;
                    for item in items {
                        self.draw_inline(cursor, item, paragraph, left, Some(bullet), false);
                    }
                }
                Block::Fence(content) => self.draw_fence(cursor, content),
                Block::Rule => self.draw_rule(cursor),
            }
        }
    }

    /// Draw a check mark as two strokes with its baseline at `baseline`.
    /// Returns the horizontal advance.
    pub fn draw_check(&mut self, x: f32, baseline: f32, size: f32) -> f32 {
        let w = check_width(size);
        let h = check_width(size);
        let (x0, y0) = (x, baseline - h * 0.2);
        let (x1, y1) = (x + w * 0.38, baseline + h * 0.25);
        let (x2, y2) = (x + w, baseline - h * 0.45);

        let previous = self.canvas.line_width();
        self.canvas.set_line_width((mm(size) * 0.08).max(0.6));
        self.canvas.draw_line(x0, y0, x1, y1);
        self.canvas.draw_line(x1, y1, x2, y2);
        self.canvas.set_line_width(previous);

        w
    }

    /// Width of `text` as drawn, with check marks at their glyph advance.
    fn drawn_width(&self, text: &str, size: f32) -> f32 {
        split_checks(text)
            .iter()
            .map(|segment| match segment {
                Segment::Check => check_width(size),
                Segment::Text(text) => self.canvas.text_width(text),
            })
            .sum()
    }

    fn apply_style(&mut self, run: &Run) {
        self.canvas.set_font(run.style(), run.size, run.mono);
    }

    fn line_break(&mut self, cursor: &mut Cursor, run: &mut Run) {
        cursor.y += run.pitch;
        self.page_break(cursor, run.pitch);
        run.x = run.line_start;
    }

    fn draw_unit(&mut self, cursor: &mut Cursor, run: &mut Run, unit: &str) {
        let max_x = self.right_edge();

        for segment in split_checks(unit) {
            match segment {
                Segment::Check => {
                    run.x += self.draw_check(run.x, cursor.y, run.size);
                }
                Segment::Text(text) => {
                    let width = self.canvas.text_width(text);
                    if run.x > run.line_start && run.x + width > max_x && !text.trim().is_empty() {
                        self.line_break(cursor, run);
                    }
                    self.canvas.draw_text(text, run.x, cursor.y);
                    run.x += width;
                }
            }
        }
    }

    fn draw_text(&mut self, cursor: &mut Cursor, run: &mut Run, content: &str) {
        let content = sanitize(content);
        for (index, line) in content.split('\n').enumerate() {
            if index > 0 {
                self.line_break(cursor, run);
            }
            for unit in split_keep_whitespace(line) {
                self.draw_unit(cursor, run, unit);
            }
        }
    }

    /// Lay out one inline sequence starting at `x_start`, then advance one line.
    pub fn draw_inline(
        &mut self,
        cursor: &mut Cursor,
        inline: &[Inline],
        size: f32,
        x_start: f32,
        bullet: Option<&str>,
        force_bold: bool,
    ) {
        let pitch = self.config.line_pitch(size);
        let mut run = Run {
            bold: force_bold,
            italic: false,
            mono: false,
            force_bold,
            size,
            pitch,
            line_start: x_start,
            x: x_start,
        };

        self.page_break(cursor, pitch);
        self.apply_style(&run);

        if let Some(bullet) = bullet {
            let prefix = format!("{} ", bullet);
            let width = self.canvas.text_width(&prefix);
            self.canvas.draw_text(&prefix, x_start, cursor.y);
            run.line_start = x_start + width;
            run.x = run.line_start;
        }

        for token in inline {
            match token {
                Inline::SoftBreak | Inline::HardBreak => self.line_break(cursor, &mut run),
                Inline::StrongOpen => {
                    run.bold = true;
                    self.apply_style(&run);
                }
                Inline::StrongClose => {
                    run.bold = run.force_bold;
                    self.apply_style(&run);
                }
                Inline::EmOpen => {
                    run.italic = true;
                    self.apply_style(&run);
                }
                Inline::EmClose => {
                    run.italic = false;
                    self.apply_style(&run);
                }
                Inline::Code(code) => {
                    run.mono = true;
                    self.apply_style(&run);
                    self.draw_text(cursor, &mut run, code);
                    run.mono = false;
                    self.apply_style(&run);
                }
                Inline::Text(text) => self.draw_text(cursor, &mut run, text),
                Inline::LinkOpen(_) | Inline::LinkClose => {}
            }
        }

        // the next block checks for room before it draws
        cursor.y += pitch;
    }

    /// Literal code block: monospace, wrapped to the content width.
    pub fn draw_fence(&mut self, cursor: &mut Cursor, content: &str) {
        let size = self.config.sizes.small;
        let pitch = self.config.line_pitch(size);
        let left = self.config.margins.left;
        let width = self.content_width();

        self.canvas.set_font(FontStyle::Normal, size, true);

        // the escaped form would otherwise be split mid-mark
        let content = sanitize(content).replace(CHECK_MARKS[2], CHECK_MARKS[0]);
        for line in content.split('\n') {
            let chunks = if split_checks(line).contains(&Segment::Check) {
                wrap_to_width(line, width, |chunk| self.drawn_width(chunk, size))
            } else {
                self.canvas.split_text_to_size(line, width)
            };
            for chunk in chunks {
                self.page_break(cursor, pitch);
                let mut x = left;
                for segment in split_checks(&chunk) {
                    match segment {
                        Segment::Check => x += self.draw_check(x, cursor.y, size),
                        Segment::Text(text) => {
                            self.canvas.draw_text(text, x, cursor.y);
                            x += self.canvas.text_width(text);
                        }
                    }
                }
                cursor.y += pitch;
            }
        }

        cursor.y += self.config.fence_gap;
    }

    pub fn draw_rule(&mut self, cursor: &mut Cursor) {
        let height = self.config.rule_height;
        self.page_break(cursor, height);

        let (r, g, b) = self.config.rule_color;
        self.canvas.set_draw_color(r, g, b);
        let (left, right) = (self.config.margins.left, self.right_edge());
        self.canvas.draw_line(left, cursor.y, right, cursor.y);
        self.canvas.set_draw_color(0, 0, 0);

        cursor.y += height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fonts::FontFace;
    use crate::export::markdown::parse;
    use crate::export::pdf::{DrawOp, PdfDocument};

    const EPS: f32 = 1e-3;

    fn render(markdown: &str) -> (PdfDocument, Cursor) {
        let config = LayoutConfig::default();
        let mut doc = PdfDocument::new("test");
        let mut cursor = Cursor::new(&config);
        LayoutEngine::new(&mut doc, &config).render(&parse(markdown), &mut cursor);
        (doc, cursor)
    }

    struct TextOp {
        page: usize,
        text: String,
        x: f32,
        y: f32,
        face: FontFace,
    }

    fn text_ops(doc: &PdfDocument) -> Vec<TextOp> {
        let mut out = Vec::new();
        for (page, p) in doc.pages().iter().enumerate() {
            for op in &p.ops {
                if let DrawOp::Text { text, x, y, face, .. } = op {
                    out.push(TextOp { page, text: text.clone(), x: *x, y: *y, face: *face });
                }
            }
        }
        out
    }

    /// Text ops grouped into visual lines, in drawing order.
    fn lines(doc: &PdfDocument) -> Vec<Vec<TextOp>> {
        let mut lines: Vec<Vec<TextOp>> = Vec::new();
        for op in text_ops(doc) {
            match lines.last_mut() {
                Some(line) if line[0].page == op.page && (line[0].y - op.y).abs() < EPS => {
                    line.push(op)
                }
                _ => lines.push(vec![op]),
            }
        }
        lines
    }

    fn line_ops(doc: &PdfDocument) -> usize {
        doc.pages()
            .iter()
            .flat_map(|p| p.ops.iter())
            .filter(|op| matches!(op, DrawOp::Line { .. }))
            .count()
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a\u{2013}b\u{2014}c\u{a0}d\r\ne"), "a-b-c d\ne");
    }

    #[test]
    fn test_split_checks() {
        assert_eq!(
            split_checks("B)\u{2713} x\\u2713"),
            vec![Segment::Text("B)"), Segment::Check, Segment::Text(" x"), Segment::Check]
        );
        assert_eq!(split_checks("\u{2714}"), vec![Segment::Check]);
        assert_eq!(split_checks("plain"), vec![Segment::Text("plain")]);
    }

    #[test]
    fn test_short_paragraph_is_one_line() {
        let config = LayoutConfig::default();
        let (doc, cursor) = render("Hello world");

        let lines = lines(&doc);
        assert_eq!(lines.len(), 1);
        assert_eq!(doc.page_count(), 1);
        let joined: String = lines[0].iter().map(|op| op.text.as_str()).collect();
        assert_eq!(joined, "Hello world");
        assert!((cursor.y - config.margins.top - config.line_pitch(12.0)).abs() < EPS);
    }

    #[test]
    fn test_bold_then_normal_runs() {
        let (doc, _) = render("**Bold** and normal");
        let lines = lines(&doc);
        assert_eq!(lines.len(), 1);

        let mut runs: Vec<(FontFace, String)> = Vec::new();
        for op in &lines[0] {
            match runs.last_mut() {
                Some((face, text)) if *face == op.face => text.push_str(&op.text),
                _ => runs.push((op.face, op.text.clone())),
            }
        }
        assert_eq!(
            runs,
            vec![
                (FontFace::TimesBold, "Bold".to_string()),
                (FontFace::TimesRoman, " and normal".to_string()),
            ]
        );

        let bold_width = FontFace::TimesBold.text_width("Bold", 12.0);
        assert!((lines[0][1].x - (18.0 + bold_width)).abs() < EPS);
    }

    #[test]
    fn test_italic_and_bold_italic() {
        let (doc, _) = render("*it* ***both*** `code`");
        let faces: Vec<(String, FontFace)> = text_ops(&doc)
            .into_iter()
            .filter(|op| !op.text.trim().is_empty())
            .map(|op| (op.text, op.face))
            .collect();
        assert_eq!(
            faces,
            vec![
                ("it".to_string(), FontFace::TimesItalic),
                ("both".to_string(), FontFace::TimesBoldItalic),
                ("code".to_string(), FontFace::Courier),
            ]
        );
    }

    #[test]
    fn test_heading_is_bold_at_level_size() {
        let (doc, _) = render("# Title *x*");
        let ops = text_ops(&doc);
        assert_eq!(ops[0].face, FontFace::TimesBold);
        assert_eq!(ops.last().unwrap().face, FontFace::TimesBoldItalic);
        match &doc.pages()[0].ops[0] {
            DrawOp::Text { size, .. } => assert_eq!(*size, 18.0),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_check_marks_are_drawn_as_strokes() {
        let (doc, _) = render("Done \u{2713} and \\u2713 ok \u{2714}, also B)\u{2713}");
        assert_eq!(line_ops(&doc), 4 * 2);
        for op in text_ops(&doc) {
            assert!(!op.text.contains('\u{2713}'));
            assert!(!op.text.contains('\u{2714}'));
            assert!(!op.text.contains("\\u2713"));
        }
    }

    #[test]
    fn test_check_restores_line_width() {
        let config = LayoutConfig::default();
        let mut doc = PdfDocument::new("t");
        let before = doc.line_width();
        let advance = LayoutEngine::new(&mut doc, &config).draw_check(18.0, 30.0, 12.0);
        assert!((advance - mm(12.0) * 0.8).abs() < EPS);
        assert_eq!(doc.line_width(), before);

        match &doc.pages()[0].ops[0] {
            DrawOp::Line { width, .. } => assert!((*width - 0.6).abs() < EPS),
            other => panic!("unexpected op {:?}", other),
        }
    }

    #[test]
    fn test_long_paragraph_wraps_to_left_margin() {
        let words = vec!["wrapping"; 60].join(" ");
        let (doc, _) = render(&words);
        let lines = lines(&doc);
        assert!(lines.len() > 1);

        for line in &lines {
            assert!((line[0].x - 18.0).abs() < EPS);
            let last = line.iter().filter(|op| !op.text.trim().is_empty()).last().unwrap();
            let end = last.x + FontFace::TimesRoman.text_width(&last.text, 12.0);
            assert!(end <= 210.0 - 18.0 + EPS);
        }
    }

    #[test]
    fn test_soft_break_starts_new_line() {
        let config = LayoutConfig::default();
        let (doc, cursor) = render("first\nsecond");
        let lines = lines(&doc);
        assert_eq!(lines.len(), 2);
        assert!((lines[1][0].y - lines[0][0].y - config.line_pitch(12.0)).abs() < EPS);
        assert!((lines[1][0].x - 18.0).abs() < EPS);
        assert!((cursor.y - 20.0 - 2.0 * config.line_pitch(12.0)).abs() < EPS);
    }

    #[test]
    fn test_links_are_transparent() {
        let (plain, _) = render("see docs now");
        let (linked, _) = render("see [docs](http://example.com) now");
        assert_eq!(plain.pages(), linked.pages());
    }

    #[test]
    fn test_fence_wraps_within_content_width() {
        let long = "x".repeat(200);
        let (doc, _) = render(&format!("```\n{}\nshort\n```", long));
        let ops = text_ops(&doc);
        assert!(ops.len() >= 3);
        for op in &ops {
            assert_eq!(op.face, FontFace::Courier);
            assert!(FontFace::Courier.text_width(&op.text, 10.0) <= 174.0 + EPS);
            assert!((op.x - 18.0).abs() < EPS);
        }
        let joined: String = ops.iter().take(ops.len() - 1).map(|op| op.text.as_str()).collect();
        assert_eq!(joined, long);
        assert_eq!(ops.last().unwrap().text, "short");
    }

    #[test]
    fn test_ordered_list_and_quote_are_drawn() {
        let (doc, _) = render("1. Answer is B\n2. Answer is C\n\n> quoted note");
        let drawn: Vec<String> = lines(&doc)
            .iter()
            .map(|line| line.iter().map(|op| op.text.as_str()).collect())
            .collect();
        assert_eq!(drawn, vec!["Answer is B", "Answer is C", "quoted note"]);
    }

    #[test]
    fn test_fence_with_check_marks_stays_inside_margin() {
        let config = LayoutConfig::default();
        let line = format!("{}{}", "x".repeat(78), "\u{2713}".repeat(4));
        let (doc, _) = render(&format!("```\n{}\n```", line));
        let right_edge = 210.0 - config.margins.right;

        let mut rightmost: f32 = 0.0;
        for op in doc.pages().iter().flat_map(|p| p.ops.iter()) {
            match op {
                DrawOp::Text { text, x, face, size, .. } => {
                    rightmost = rightmost.max(x + face.text_width(text, *size))
                }
                DrawOp::Line { from, to, .. } => rightmost = rightmost.max(from.0).max(to.0),
            }
        }
        assert!(rightmost <= right_edge + EPS, "rightmost x {}", rightmost);
        assert_eq!(line_ops(&doc), 4 * 2);
    }

    #[test]
    fn test_fence_escaped_check_is_not_split() {
        let line = format!("{}\\u2713", "y".repeat(100));
        let (doc, _) = render(&format!("```\n{}\n```", line));
        assert_eq!(line_ops(&doc), 2);
        assert!(text_ops(&doc).iter().all(|op| !op.text.contains('\\')));
    }

    #[test]
    fn test_fence_ignores_markdown_styling() {
        let (doc, cursor) = render("```\n**not bold** \u{2713}\n```");
        let ops = text_ops(&doc);
        assert!(ops.iter().all(|op| op.face == FontFace::Courier));
        assert!(ops[0].text.starts_with("**not bold**"));
        assert_eq!(line_ops(&doc), 2);

        let config = LayoutConfig::default();
        let expected = 20.0 + config.line_pitch(10.0) + config.fence_gap;
        assert!((cursor.y - expected).abs() < EPS);
    }

    #[test]
    fn test_rule_is_gray_and_advances() {
        let (doc, cursor) = render("---");
        match &doc.pages()[0].ops[0] {
            DrawOp::Line { from, to, color, .. } => {
                assert_eq!(*color, (180, 180, 180));
                assert_eq!(from.0, 18.0);
                assert_eq!(to.0, 192.0);
            }
            other => panic!("unexpected op {:?}", other),
        }
        assert!((cursor.y - 26.0).abs() < EPS);
    }

    #[test]
    fn test_page_break_boundary() {
        let config = LayoutConfig::default();
        let mut doc = PdfDocument::new("t");

        // bottom limit is 297 - 20 = 277
        let mut cursor = Cursor { y: 271.0 };
        LayoutEngine::new(&mut doc, &config).page_break(&mut cursor, 6.0);
        assert_eq!(doc.page_count(), 1);
        assert_eq!(cursor.y, 271.0);

        LayoutEngine::new(&mut doc, &config).page_break(&mut cursor, 7.0);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(cursor.y, config.margins.top);

        LayoutEngine::new(&mut doc, &config).page_break(&mut cursor, 7.0);
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn test_lines_never_cross_bottom_margin() {
        let body = (0..120).map(|i| format!("line {}", i)).collect::<Vec<_>>().join("\n");
        let (doc, _) = render(&body);
        let config = LayoutConfig::default();
        let pitch = config.line_pitch(12.0);

        // 40 lines per page, and no blank page after the last one
        assert_eq!(doc.page_count(), 3);
        for op in text_ops(&doc) {
            assert!(op.y + pitch <= 277.0 + EPS);
        }
        // each page starts at the top margin
        for page in 1..doc.page_count() {
            let first = text_ops(&doc).into_iter().find(|op| op.page == page).unwrap();
            assert!((first.y - 20.0).abs() < EPS);
        }
    }

    #[test]
    fn test_long_bullet_list_spans_pages_with_hanging_indent() {
        let item = vec!["answer"; 30].join(" ");
        let list: String = (0..30).map(|i| format!("- {} {}\n", i, item)).collect();
        let (doc, _) = render(&list);

        assert!(doc.page_count() >= 2);

        let bullet_width = FontFace::TimesRoman.text_width("\u{2022} ", 12.0);
        let mut bullets = 0;
        for line in lines(&doc) {
            let first = &line[0];
            if first.text == "\u{2022} " {
                bullets += 1;
                assert!((first.x - 18.0).abs() < EPS);
                assert!((line[1].x - (18.0 + bullet_width)).abs() < EPS);
            } else {
                assert!((first.x - (18.0 + bullet_width)).abs() < EPS);
            }
        }
        assert_eq!(bullets, 30);
    }

    #[test]
    fn test_render_is_deterministic() {
        let content = "# Heading\n\nSome **bold** text \u{2713}\n\n- a\n- b\n\n```\ncode\n```\n\n---\n";
        let (first, _) = render(content);
        let (second, _) = render(content);
        assert_eq!(first.pages(), second.pages());
        assert_eq!(first.to_bytes(), second.to_bytes());
    }

    #[test]
    fn test_empty_content() {
        let (doc, cursor) = render("   \n");
        assert_eq!(doc.page_count(), 1);
        assert!(doc.pages()[0].ops.is_empty());
        assert_eq!(cursor.y, 20.0);
    }
}
