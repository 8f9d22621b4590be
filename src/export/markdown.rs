//! Markdown tokenization for the PDF exporter.
//!
//! `pulldown-cmark` events are lowered into a flat open/close token stream
//! and then folded once into a block tree, so the layout walker never has to
//! match brackets itself.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    BulletList,
    OrderedList,
    ListItem,
    BlockQuote,
    Table,
    /// Any other container (table rows and cells, indented code, footnotes).
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    StrongOpen,
    StrongClose,
    EmOpen,
    EmClose,
    Code(String),
    SoftBreak,
    HardBreak,
    LinkOpen(String),
    LinkClose,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open(BlockKind),
    Close(BlockKind),
    Inline(Vec<Inline>),
    Fence(String),
    Rule,
}

/// Blocks the exporter knows how to draw.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, inline: Vec<Inline> },
    Paragraph(Vec<Inline>),
    /// One inline run per list item.
    BulletList(Vec<Vec<Inline>>),
    Fence(String),
    Rule,
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn block_kind(tag: &Tag) -> Option<BlockKind> {
    let kind = match tag {
        Tag::Heading(level, _, _) => BlockKind::Heading(heading_level(*level)),
        Tag::Paragraph => BlockKind::Paragraph,
        Tag::List(None) => BlockKind::BulletList,
        Tag::List(Some(_)) => BlockKind::OrderedList,
        Tag::Item => BlockKind::ListItem,
        Tag::BlockQuote => BlockKind::BlockQuote,
        Tag::Table(_) => BlockKind::Table,
        Tag::TableHead
        | Tag::TableRow
        | Tag::TableCell
        | Tag::FootnoteDefinition(_)
        | Tag::CodeBlock(CodeBlockKind::Indented) => BlockKind::Other,
        _ => return None,
    };
    Some(kind)
}

fn is_inline_container(kind: Option<&BlockKind>) -> bool {
    matches!(
        kind,
        Some(BlockKind::Paragraph) | Some(BlockKind::Heading(_)) | Some(BlockKind::ListItem)
    )
}

#[derive(Default)]
struct Tokenizer {
    tokens: Vec<Token>,
    stack: Vec<BlockKind>,
    pending: Vec<Inline>,
    fence: Option<String>,
    html: String,
    image_depth: usize,
}

impl Tokenizer {
    fn flush_inline(&mut self) {
        if !self.pending.is_empty() {
            let children = std::mem::take(&mut self.pending);
            self.tokens.push(Token::Inline(children));
        }
    }

    // Raw HTML outside a paragraph is shown as a literal paragraph.
    fn flush_html(&mut self) {
        if self.html.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.html);
        let text = text.trim_end_matches('\n').to_string();
        self.tokens.push(Token::Open(BlockKind::Paragraph));
        self.tokens.push(Token::Inline(vec![Inline::Text(text)]));
        self.tokens.push(Token::Close(BlockKind::Paragraph));
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Inline::Text(last)) = self.pending.last_mut() {
            last.push_str(text);
        } else {
            self.pending.push(Inline::Text(text.to_string()));
        }
    }

    fn event(&mut self, event: Event) {
        if !matches!(event, Event::Html(_)) {
            self.flush_html();
        }

        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) => {
                self.flush_inline();
                self.fence = Some(String::new());
            }
            Event::End(Tag::CodeBlock(CodeBlockKind::Fenced(_))) => {
                let mut content = self.fence.take().unwrap_or_default();
                if content.ends_with('\n') {
                    content.pop();
                }
                self.tokens.push(Token::Fence(content));
            }
            Event::Text(text) if self.fence.is_some() => {
                if let Some(fence) = self.fence.as_mut() {
                    fence.push_str(&text);
                }
            }
            Event::Start(Tag::Image(..)) => self.image_depth += 1,
            Event::End(Tag::Image(..)) => self.image_depth = self.image_depth.saturating_sub(1),
            _ if self.image_depth > 0 => {}
            Event::Start(Tag::Strong) => self.pending.push(Inline::StrongOpen),
            Event::End(Tag::Strong) => self.pending.push(Inline::StrongClose),
            Event::Start(Tag::Emphasis) => self.pending.push(Inline::EmOpen),
            Event::End(Tag::Emphasis) => self.pending.push(Inline::EmClose),
            Event::Start(Tag::Link(_, dest, _)) => {
                self.pending.push(Inline::LinkOpen(dest.to_string()))
            }
            Event::End(Tag::Link(..)) => self.pending.push(Inline::LinkClose),
            Event::Start(tag) => {
                if let Some(kind) = block_kind(&tag) {
                    self.flush_inline();
                    self.stack.push(kind);
                    self.tokens.push(Token::Open(kind));
                }
            }
            Event::End(tag) => {
                if let Some(kind) = block_kind(&tag) {
                    self.flush_inline();
                    self.stack.pop();
                    self.tokens.push(Token::Close(kind));
                }
            }
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.pending.push(Inline::Code(code.to_string())),
            Event::Html(html) => {
                if is_inline_container(self.stack.last()) {
                    self.push_text(&html);
                } else {
                    self.html.push_str(&html);
                }
            }
            Event::SoftBreak => self.pending.push(Inline::SoftBreak),
            Event::HardBreak => self.pending.push(Inline::HardBreak),
            Event::Rule => {
                self.flush_inline();
                self.tokens.push(Token::Rule);
            }
            Event::FootnoteReference(_) | Event::TaskListMarker(_) => {}
        }
    }

    fn finish(mut self) -> Vec<Token> {
        self.flush_html();
        self.flush_inline();
        self.tokens
    }
}

/// Lower markdown text into the flat token stream.
pub fn tokenize(markdown: &str) -> Vec<Token> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut tokenizer = Tokenizer::default();
    for event in Parser::new_ext(markdown, options) {
        tokenizer.event(event);
    }
    tokenizer.finish()
}

#[derive(Debug, Clone)]
enum Node {
    Element { kind: BlockKind, children: Vec<Node> },
    Inline(Vec<Inline>),
    Fence(String),
    Rule,
}

fn parse_nodes(tokens: &[Token], pos: &mut usize, closing: Option<BlockKind>) -> Vec<Node> {
    let mut nodes = Vec::new();

    while *pos < tokens.len() {
        let token = &tokens[*pos];
        *pos += 1;

        match token {
            Token::Open(kind) => {
                let children = parse_nodes(tokens, pos, Some(*kind));
                nodes.push(Node::Element { kind: *kind, children });
            }
            Token::Close(kind) => {
                if closing == Some(*kind) {
                    return nodes;
                }
                // stray close
            }
            Token::Inline(children) => nodes.push(Node::Inline(children.clone())),
            Token::Fence(content) => nodes.push(Node::Fence(content.clone())),
            Token::Rule => nodes.push(Node::Rule),
        }
    }

    nodes
}

fn first_inline(nodes: &[Node]) -> Option<&Vec<Inline>> {
    nodes.iter().find_map(|node| match node {
        Node::Inline(children) => Some(children),
        Node::Element { children, .. } => first_inline(children),
        Node::Fence(_) | Node::Rule => None,
    })
}

fn lower(nodes: &[Node]) -> Vec<Block> {
    let mut blocks = Vec::new();

    for node in nodes {
        match node {
            Node::Element { kind: BlockKind::Heading(level), children } => {
                if let Some(inline) = first_inline(children) {
                    blocks.push(Block::Heading { level: *level, inline: inline.clone() });
                }
            }
            Node::Element { kind: BlockKind::Paragraph, children } => {
                if let Some(inline) = first_inline(children) {
                    blocks.push(Block::Paragraph(inline.clone()));
                }
            }
            Node::Element { kind: BlockKind::BulletList, children } => {
                let items: Vec<Vec<Inline>> = children
                    .iter()
                    .filter_map(|child| match child {
                        Node::Element { kind: BlockKind::ListItem, children } => {
                            first_inline(children).cloned()
                        }
                        _ => None,
                    })
                    .collect();
                blocks.push(Block::BulletList(items));
            }
            // Their content is drawn as plain blocks, without numbers or bars.
            Node::Element {
                kind: BlockKind::OrderedList | BlockKind::BlockQuote | BlockKind::ListItem,
                children,
            } => blocks.extend(lower(children)),
            // Tight list items carry their text without a paragraph.
            Node::Inline(inline) => blocks.push(Block::Paragraph(inline.clone())),
            Node::Fence(content) => blocks.push(Block::Fence(content.clone())),
            Node::Rule => blocks.push(Block::Rule),
            Node::Element { kind: BlockKind::Table | BlockKind::Other, .. } => {}
        }
    }

    blocks
}

/// Fold a flat token stream into renderable blocks.
///
/// Each open token is matched with its close once, here. Ordered lists and
/// block quotes pass their content through; tables and other containers are
/// dropped together with everything nested inside them.
pub fn build_tree(tokens: &[Token]) -> Vec<Block> {
    let mut pos = 0;
    let nodes = parse_nodes(tokens, &mut pos, None);
    lower(&nodes)
}

pub fn parse(markdown: &str) -> Vec<Block> {
    build_tree(&tokenize(markdown))
}
