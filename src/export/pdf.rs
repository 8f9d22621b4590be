//! Minimal PDF 1.4 writer backing the layout engine.
//!
//! Draw calls are recorded per page and serialized on demand. Only the
//! standard Type1 faces are referenced, so nothing is embedded.

use super::canvas::Canvas;
use super::fonts::{win_ansi_byte, FontFace, FontStyle};

/// Points per millimetre.
const PT_PER_MM: f32 = 2.834_646;

/// A4 portrait, in millimetres.
pub const A4: (f32, f32) = (210.0, 297.0);

const DEFAULT_LINE_WIDTH: f32 = 0.200025;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        text: String,
        x: f32,
        y: f32,
        face: FontFace,
        size: f32,
    },
    Line {
        from: (f32, f32),
        to: (f32, f32),
        width: f32,
        color: (u8, u8, u8),
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

#[derive(Debug, Clone)]
pub struct PdfDocument {
    title: String,
    page_size: (f32, f32),
    pages: Vec<Page>,
    style: FontStyle,
    mono: bool,
    font_size: f32,
    line_width: f32,
    draw_color: (u8, u8, u8),
}

impl PdfDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_page_size(title, A4)
    }

    pub fn with_page_size(title: impl Into<String>, page_size: (f32, f32)) -> Self {
        PdfDocument {
            title: title.into(),
            page_size,
            pages: vec![Page::default()],
            style: FontStyle::Normal,
            mono: false,
            font_size: 16.0,
            line_width: DEFAULT_LINE_WIDTH,
            draw_color: (0, 0, 0),
        }
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn face(&self) -> FontFace {
        FontFace::select(self.style, self.mono)
    }

    fn current_page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Serialize the document into PDF bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let (width_mm, height_mm) = self.page_size;
        let width_pt = width_mm * PT_PER_MM;
        let height_pt = height_mm * PT_PER_MM;
        let page_count = self.pages.len();

        let mut pdf: Vec<u8> = Vec::new();
        pdf.extend_from_slice(b"%PDF-1.4\n");
        pdf.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        // Object layout: 1 catalog, 2 pages, then a page + content pair per
        // page, then the fonts, then the info dictionary.
        let font_start = 3 + page_count * 2;
        let info_id = font_start + FontFace::ALL.len();
        let mut offsets = vec![0usize; info_id];

        offsets[0] = pdf.len();
        pdf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");

        offsets[1] = pdf.len();
        let kids: Vec<String> = (0..page_count)
            .map(|i| format!("{} 0 R", 3 + i * 2))
            .collect();
        pdf.extend_from_slice(
            format!(
                "2 0 obj\n<< /Type /Pages /Kids [{}] /Count {} >>\nendobj\n",
                kids.join(" "),
                page_count
            )
            .as_bytes(),
        );

        let font_resources: Vec<String> = FontFace::ALL
            .iter()
            .enumerate()
            .map(|(i, face)| format!("/{} {} 0 R", face.resource_name(), font_start + i))
            .collect();
        let font_resources = font_resources.join(" ");

        for (index, page) in self.pages.iter().enumerate() {
            let page_id = 3 + index * 2;
            let content_id = page_id + 1;

            offsets[page_id - 1] = pdf.len();
            pdf.extend_from_slice(
                format!(
                    "{} 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] /Contents {} 0 R /Resources << /Font << {} >> >> >>\nendobj\n",
                    page_id, width_pt, height_pt, content_id, font_resources
                )
                .as_bytes(),
            );

            let stream = content_stream(page, height_pt);
            offsets[content_id - 1] = pdf.len();
            pdf.extend_from_slice(
                format!("{} 0 obj\n<< /Length {} >>\nstream\n", content_id, stream.len())
                    .as_bytes(),
            );
            pdf.extend_from_slice(&stream);
            pdf.extend_from_slice(b"\nendstream\nendobj\n");
        }

        for (i, face) in FontFace::ALL.iter().enumerate() {
            let id = font_start + i;
            offsets[id - 1] = pdf.len();
            pdf.extend_from_slice(
                format!(
                    "{} 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>\nendobj\n",
                    id,
                    face.base_font()
                )
                .as_bytes(),
            );
        }

        offsets[info_id - 1] = pdf.len();
        let mut info = format!("{} 0 obj\n<< /Title (", info_id).into_bytes();
        info.extend_from_slice(&escape_pdf_string(&self.title));
        info.extend_from_slice(b") /Producer (question-images) >>\nendobj\n");
        pdf.extend_from_slice(&info);

        let xref_start = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n", offsets.len() + 1).as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
                offsets.len() + 1,
                info_id,
                xref_start
            )
            .as_bytes(),
        );

        pdf
    }
}

impl Canvas for PdfDocument {
    fn set_font(&mut self, style: FontStyle, size: f32, mono: bool) {
        self.style = style;
        self.font_size = size;
        self.mono = mono;
    }

    fn text_width(&self, text: &str) -> f32 {
        self.face().text_width(text, self.font_size)
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32) {
        let op = DrawOp::Text {
            text: text.to_string(),
            x,
            y,
            face: self.face(),
            size: self.font_size,
        };
        self.current_page().ops.push(op);
    }

    fn draw_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        let op = DrawOp::Line {
            from: (x0, y0),
            to: (x1, y1),
            width: self.line_width,
            color: self.draw_color,
        };
        self.current_page().ops.push(op);
    }

    fn line_width(&self) -> f32 {
        self.line_width
    }

    fn set_line_width(&mut self, width: f32) {
        self.line_width = width;
    }

    fn set_draw_color(&mut self, r: u8, g: u8, b: u8) {
        self.draw_color = (r, g, b);
    }

    fn add_page(&mut self) {
        self.pages.push(Page::default());
    }

    fn page_size(&self) -> (f32, f32) {
        self.page_size
    }
}

fn content_stream(page: &Page, height_pt: f32) -> Vec<u8> {
    let mut stream: Vec<u8> = Vec::new();

    for op in &page.ops {
        match op {
            DrawOp::Text { text, x, y, face, size } => {
                stream.extend_from_slice(
                    format!(
                        "BT /{} {:.2} Tf {:.2} {:.2} Td (",
                        face.resource_name(),
                        size,
                        x * PT_PER_MM,
                        height_pt - y * PT_PER_MM
                    )
                    .as_bytes(),
                );
                stream.extend_from_slice(&escape_pdf_string(text));
                stream.extend_from_slice(b") Tj ET\n");
            }
            DrawOp::Line { from, to, width, color } => {
                stream.extend_from_slice(
                    format!(
                        "{:.3} {:.3} {:.3} RG {:.2} w {:.2} {:.2} m {:.2} {:.2} l S\n",
                        color.0 as f32 / 255.0,
                        color.1 as f32 / 255.0,
                        color.2 as f32 / 255.0,
                        width * PT_PER_MM,
                        from.0 * PT_PER_MM,
                        height_pt - from.1 * PT_PER_MM,
                        to.0 * PT_PER_MM,
                        height_pt - to.1 * PT_PER_MM
                    )
                    .as_bytes(),
                );
            }
        }
    }

    stream
}

/// Encode `s` as the body of a PDF literal string in WinAnsiEncoding.
fn escape_pdf_string(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.extend_from_slice(b"\\\\"),
            '(' => out.extend_from_slice(b"\\("),
            ')' => out.extend_from_slice(b"\\)"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            _ => match win_ansi_byte(c) {
                Some(b) if b.is_ascii() => out.push(b),
                Some(b) => out.extend_from_slice(format!("\\{:03o}", b).as_bytes()),
                None => out.push(b'?'),
            },
        }
    }
    out
}
