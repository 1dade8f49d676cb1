//! Print layout: XHTML in, positioned glyph runs on fixed-size pages out.
//!
//! Two passes. `collect_blocks` walks the XHTML with a strict XML reader and
//! flattens it into a list of blocks, each a sequence of styled inline
//! content. `LayoutContext` then breaks every block into lines, greedily, and
//! stacks the lines onto pages, starting a new page whenever the next line
//! would cross the bottom margin.
//!
//! All mutable layout state lives in `LayoutContext`, which is created per
//! render call and never shared.

use quick_xml::{Reader, events::Event};

use super::{
    RenderError,
    fonts::{self, Face},
    xhtml::resolve_html_entity,
};

/// Fixed print settings: page geometry and base typography.
#[derive(Debug, Clone, PartialEq)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub base_font_size: f32,
    pub line_spacing: f32,
}

impl Default for PageSetup {
    /// A4 portrait, one-inch margins, 11pt body text.
    fn default() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin: 72.0,
            base_font_size: 11.0,
            line_spacing: 1.35,
        }
    }
}

impl PageSetup {
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }
}

/// Something drawn on a page. Coordinates are PDF user space (origin at the
/// bottom-left corner, y upwards).
#[derive(Debug, Clone, PartialEq)]
pub enum DrawItem {
    /// A WinAnsi-encoded run with its baseline starting at (`x`, `y`).
    Text {
        x: f32,
        y: f32,
        size: f32,
        face: Face,
        bytes: Vec<u8>,
    },
    /// A stroked straight line.
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        gray: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<DrawItem>,
}

impl Page {
    #[cfg(test)]
    pub(crate) fn text(&self) -> String {
        self.items
            .iter()
            .filter_map(|item| match item {
                DrawItem::Text { bytes, .. } => Some(String::from_utf8_lossy(bytes).into_owned()),
                DrawItem::Line { .. } => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub bold: bool,
    pub italic: bool,
    pub mono: bool,
    pub underline: bool,
    pub strike: bool,
}

impl InlineStyle {
    fn face(&self) -> Face {
        Face::select(self.bold, self.italic, self.mono)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    Preformatted,
    ListItem { marker: String },
    TableRow,
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String, InlineStyle),
    Break,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub indent: u8,
    pub content: Vec<Inline>,
}

impl Block {
    fn has_text(&self) -> bool {
        self.content.iter().any(|inline| match inline {
            Inline::Text(text, _) => !text.trim().is_empty(),
            Inline::Break => false,
        })
    }
}

/// One open element while walking the XHTML tree.
struct Frame {
    name: String,
    style: InlineStyle,
    kind: Option<BlockKind>,
    indent: u8,
    list: Option<ListState>,
}

struct ListState {
    ordered: bool,
    next: u32,
}

/// Flatten an XHTML document into blocks.
pub fn collect_blocks(xhtml: &str) -> Result<Vec<Block>, RenderError> {
    let mut reader = Reader::from_str(xhtml);
    reader.trim_text(false);

    let mut collector = BlockCollector::default();
    loop {
        match reader.read_event().map_err(RenderError::markup)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let mut start = None;
                for attr in e.attributes().with_checks(false).flatten() {
                    if attr.key.local_name().as_ref() == b"start" {
                        start = attr
                            .unescape_value()
                            .ok()
                            .and_then(|v| v.trim().parse::<u32>().ok());
                    }
                }
                collector.open(name, start);
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let mut alt = None;
                for attr in e.attributes().with_checks(false).flatten() {
                    if attr.key.local_name().as_ref() == b"alt" {
                        alt = attr.unescape_value().ok().map(|v| v.into_owned());
                    }
                }
                collector.void(&name, alt);
            }
            Event::End(_) => collector.close(),
            Event::Text(t) => {
                let text = t
                    .unescape_with(resolve_html_entity)
                    .map_err(RenderError::markup)?;
                collector.text(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(collector.finish())
}

#[derive(Default)]
struct BlockCollector {
    frames: Vec<Frame>,
    blocks: Vec<Block>,
    current: Option<Block>,
}

impl BlockCollector {
    fn style(&self) -> InlineStyle {
        self.frames.last().map(|f| f.style).unwrap_or_default()
    }

    fn indent(&self) -> u8 {
        self.frames.last().map(|f| f.indent).unwrap_or(0)
    }

    fn kind(&self) -> BlockKind {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.kind.clone())
            .unwrap_or(BlockKind::Paragraph)
    }

    fn in_pre(&self) -> bool {
        self.frames
            .iter()
            .any(|f| f.kind == Some(BlockKind::Preformatted))
    }

    fn flush(&mut self) {
        if let Some(block) = self.current.take() {
            let keep = match block.kind {
                BlockKind::ListItem { .. } | BlockKind::Preformatted => {
                    !block.content.is_empty()
                }
                _ => block.has_text(),
            };
            if keep {
                self.blocks.push(block);
            }
        }
    }

    fn current_block(&mut self) -> &mut Block {
        let kind = self.kind();
        let indent = self.indent();
        self.current.get_or_insert_with(|| Block {
            kind,
            indent,
            content: Vec::new(),
        })
    }

    fn open(&mut self, name: String, start: Option<u32>) {
        let mut style = self.style();
        let mut indent = self.indent();
        let mut kind = None;
        let mut list = None;

        match name.as_str() {
            "p" | "div" | "section" | "figure" | "figcaption" | "dl" | "dt" | "table"
            | "thead" | "tbody" => {
                self.flush();
                kind = Some(BlockKind::Paragraph);
            }
            "dd" => {
                self.flush();
                indent = indent.saturating_add(1);
                kind = Some(BlockKind::Paragraph);
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush();
                let level = name.as_bytes()[1] - b'0';
                kind = Some(BlockKind::Heading(level));
                style.bold = true;
            }
            "pre" => {
                self.flush();
                kind = Some(BlockKind::Preformatted);
                style.mono = true;
            }
            "blockquote" => {
                self.flush();
                indent = indent.saturating_add(1);
                kind = Some(BlockKind::Paragraph);
                style.italic = true;
            }
            "ul" | "ol" => {
                self.flush();
                indent = indent.saturating_add(1);
                list = Some(ListState {
                    ordered: name == "ol",
                    next: start.unwrap_or(1),
                });
            }
            "li" => {
                self.flush();
                kind = Some(BlockKind::ListItem {
                    marker: self.next_marker(),
                });
            }
            "tr" => {
                self.flush();
                kind = Some(BlockKind::TableRow);
            }
            "td" | "th" => {
                let block = self.current_block();
                if !block.content.is_empty() {
                    block
                        .content
                        .push(Inline::Text("   ".into(), InlineStyle::default()));
                }
                if name == "th" {
                    style.bold = true;
                }
            }
            "b" | "strong" => style.bold = true,
            "i" | "em" => style.italic = true,
            "code" | "kbd" => style.mono = true,
            "u" | "ins" => style.underline = true,
            "s" | "del" => style.strike = true,
            _ => {}
        }

        self.frames.push(Frame {
            name,
            style,
            kind,
            indent,
            list,
        });
    }

    fn next_marker(&mut self) -> String {
        let list = self.frames.iter_mut().rev().find_map(|f| f.list.as_mut());
        match list {
            Some(ListState { ordered: true, next }) => {
                let marker = format!("{}.", next);
                *next += 1;
                marker
            }
            _ => "\u{2022}".into(),
        }
    }

    fn close(&mut self) {
        if let Some(frame) = self.frames.pop() {
            if frame.kind.is_some() || frame.list.is_some() || frame.name == "body" {
                self.flush();
            }
        }
    }

    fn void(&mut self, name: &str, alt: Option<String>) {
        match name {
            "br" => self.current_block().content.push(Inline::Break),
            "hr" => {
                self.flush();
                let indent = self.indent();
                self.blocks.push(Block {
                    kind: BlockKind::Rule,
                    indent,
                    content: Vec::new(),
                });
            }
            "img" => {
                let label = match alt.as_deref().map(str::trim) {
                    Some(alt) if !alt.is_empty() => format!("[image: {}]", alt),
                    _ => "[image]".to_string(),
                };
                let mut style = self.style();
                style.italic = true;
                self.current_block().content.push(Inline::Text(label, style));
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let pre = self.in_pre();
        if !pre && self.current.is_none() && text.chars().all(is_collapsible) {
            // Inter-element whitespace never opens a block on its own.
            return;
        }
        let style = self.style();
        let block = self.current_block();
        if pre {
            let mut lines = text.split('\n').peekable();
            while let Some(line) = lines.next() {
                if !line.is_empty() {
                    block
                        .content
                        .push(Inline::Text(line.replace('\t', "    "), style));
                }
                if lines.peek().is_some() {
                    block.content.push(Inline::Break);
                }
            }
        } else {
            block.content.push(Inline::Text(text.to_string(), style));
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

/// Whitespace that collapses between words. No-break space is not included.
fn is_collapsible(c: char) -> bool {
    c.is_whitespace() && c != '\u{a0}'
}

/// A run of characters in one style, already WinAnsi-encoded.
#[derive(Debug, Clone, PartialEq)]
struct Piece {
    bytes: Vec<u8>,
    style: InlineStyle,
}

#[derive(Debug, Clone, PartialEq)]
struct Word {
    pieces: Vec<Piece>,
    space_before: bool,
}

impl Word {
    fn new(space_before: bool) -> Self {
        Self {
            pieces: Vec::new(),
            space_before,
        }
    }

    fn push(&mut self, byte: u8, style: InlineStyle) {
        match self.pieces.last_mut() {
            Some(piece) if piece.style == style => piece.bytes.push(byte),
            _ => self.pieces.push(Piece {
                bytes: vec![byte],
                style,
            }),
        }
    }

    fn width(&self, size: f32) -> f32 {
        self.pieces
            .iter()
            .map(|p| p.style.face().measure(&p.bytes, size))
            .sum()
    }

    fn leading_style(&self) -> InlineStyle {
        self.pieces.first().map(|p| p.style).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(Word),
    Break,
}

/// Split inline content into words. Outside `pre` whitespace runs collapse to
/// a single inter-word space; inside `pre` every character is kept and only
/// explicit breaks separate lines.
fn tokenize(content: &[Inline], preserve: bool) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word: Option<Word> = None;
    let mut pending_space = false;

    for inline in content {
        match inline {
            Inline::Break => {
                if let Some(w) = word.take() {
                    tokens.push(Token::Word(w));
                }
                tokens.push(Token::Break);
                pending_space = false;
            }
            Inline::Text(text, style) => {
                for c in text.chars() {
                    if !preserve && is_collapsible(c) {
                        if let Some(w) = word.take() {
                            tokens.push(Token::Word(w));
                        }
                        pending_space = true;
                        continue;
                    }
                    let w = word.get_or_insert_with(|| Word::new(pending_space));
                    pending_space = false;
                    w.push(fonts::encode_char(c), *style);
                }
            }
        }
    }
    if let Some(w) = word {
        tokens.push(Token::Word(w));
    }
    tokens
}

/// A piece positioned relative to the start of its line.
#[derive(Debug, Clone, PartialEq)]
struct Placed {
    offset: f32,
    piece: Piece,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Line {
    placed: Vec<Placed>,
    width: f32,
}

impl Line {
    fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    fn append(&mut self, word: Word, space: f32, size: f32) {
        let mut offset = self.width + space;
        for piece in word.pieces {
            let w = piece.style.face().measure(&piece.bytes, size);
            self.placed.push(Placed { offset, piece });
            offset += w;
        }
        self.width = offset;
    }
}

/// Cut a word that cannot fit on an empty line into line-sized parts.
fn split_word(word: Word, max_width: f32, size: f32) -> Vec<Word> {
    let mut parts = Vec::new();
    let mut part = Word::new(word.space_before);
    let mut width = 0.0;
    for piece in word.pieces {
        let face = piece.style.face();
        for byte in piece.bytes {
            let w = face.measure(&[byte], size);
            if width + w > max_width && !part.pieces.is_empty() {
                parts.push(std::mem::replace(&mut part, Word::new(false)));
                width = 0.0;
            }
            part.push(byte, piece.style);
            width += w;
        }
    }
    if !part.pieces.is_empty() {
        parts.push(part);
    }
    parts
}

/// Greedy line breaking of `tokens` into lines no wider than `max_width`.
fn break_lines(tokens: Vec<Token>, max_width: f32, size: f32) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut line = Line::default();

    for token in tokens {
        let word = match token {
            Token::Break => {
                lines.push(std::mem::take(&mut line));
                continue;
            }
            Token::Word(word) => word,
        };

        let space = if word.space_before && !line.is_empty() {
            word.leading_style().face().measure(b" ", size)
        } else {
            0.0
        };
        let width = word.width(size);

        if line.width + space + width <= max_width {
            line.append(word, space, size);
            continue;
        }
        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if width <= max_width {
            line.append(word, 0.0, size);
        } else {
            let mut parts = split_word(word, max_width, size).into_iter().peekable();
            while let Some(part) = parts.next() {
                line.append(part, 0.0, size);
                if parts.peek().is_some() {
                    lines.push(std::mem::take(&mut line));
                }
            }
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

struct BlockMetrics {
    size: f32,
    space_before: f32,
    space_after: f32,
}

/// Mutable state of one layout pass.
pub struct LayoutContext<'a> {
    setup: &'a PageSetup,
    pages: Vec<Page>,
    current: Page,
    cursor: f32,
    at_page_top: bool,
}

const INDENT_STEP: f32 = 18.0;

impl<'a> LayoutContext<'a> {
    pub fn new(setup: &'a PageSetup) -> Self {
        Self {
            setup,
            pages: Vec::new(),
            current: Page::default(),
            cursor: setup.height - setup.margin,
            at_page_top: true,
        }
    }

    fn metrics(&self, kind: &BlockKind) -> BlockMetrics {
        let base = self.setup.base_font_size;
        match kind {
            BlockKind::Heading(level) => {
                let scale = match level {
                    1 => 2.0,
                    2 => 1.6,
                    3 => 1.35,
                    4 => 1.15,
                    _ => 1.0,
                };
                BlockMetrics {
                    size: base * scale,
                    space_before: base * 1.1,
                    space_after: base * 0.5,
                }
            }
            BlockKind::Preformatted => BlockMetrics {
                size: base * 0.9,
                space_before: base * 0.3,
                space_after: base * 0.7,
            },
            BlockKind::ListItem { .. } | BlockKind::TableRow => BlockMetrics {
                size: base,
                space_before: 0.0,
                space_after: base * 0.25,
            },
            BlockKind::Paragraph | BlockKind::Rule => BlockMetrics {
                size: base,
                space_before: 0.0,
                space_after: base * 0.6,
            },
        }
    }

    fn new_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        self.cursor = self.setup.height - self.setup.margin;
        self.at_page_top = true;
    }

    /// Reserve `height` points below the cursor, breaking the page if needed.
    fn reserve(&mut self, height: f32) {
        if !self.at_page_top && self.cursor - height < self.setup.margin {
            self.new_page();
        }
    }

    fn skip(&mut self, space: f32) {
        if !self.at_page_top {
            self.cursor -= space;
        }
    }

    pub fn place(&mut self, block: &Block) {
        let metrics = self.metrics(&block.kind);
        let left = self.setup.margin + block.indent as f32 * INDENT_STEP;
        let max_width = (self.setup.width - self.setup.margin - left).max(INDENT_STEP);

        if block.kind == BlockKind::Rule {
            let height = metrics.size;
            self.reserve(height);
            let y = self.cursor - height / 2.0;
            self.current.items.push(DrawItem::Line {
                x1: left,
                y1: y,
                x2: self.setup.width - self.setup.margin,
                y2: y,
                width: 0.75,
                gray: 0.6,
            });
            self.cursor -= height;
            self.at_page_top = false;
            self.skip(metrics.space_after);
            return;
        }

        self.skip(metrics.space_before);

        let preserve = block.kind == BlockKind::Preformatted;
        let lines = break_lines(tokenize(&block.content, preserve), max_width, metrics.size);
        let line_height = metrics.size * self.setup.line_spacing;

        for (index, line) in lines.iter().enumerate() {
            self.reserve(line_height);
            let baseline = self.cursor - metrics.size * 0.8 - (line_height - metrics.size) / 2.0;

            if index == 0 {
                if let BlockKind::ListItem { marker } = &block.kind {
                    let bytes = fonts::encode(marker);
                    let width = Face::Regular.measure(&bytes, metrics.size);
                    self.current.items.push(DrawItem::Text {
                        x: left - width - 4.0,
                        y: baseline,
                        size: metrics.size,
                        face: Face::Regular,
                        bytes,
                    });
                }
            }

            for placed in &line.placed {
                let x = left + placed.offset;
                let face = placed.piece.style.face();
                let width = face.measure(&placed.piece.bytes, metrics.size);
                if placed.piece.style.underline {
                    self.decorate(x, baseline - metrics.size * 0.12, width, metrics.size);
                }
                if placed.piece.style.strike {
                    self.decorate(x, baseline + metrics.size * 0.28, width, metrics.size);
                }
                self.current.items.push(DrawItem::Text {
                    x,
                    y: baseline,
                    size: metrics.size,
                    face,
                    bytes: placed.piece.bytes.clone(),
                });
            }

            self.cursor -= line_height;
            self.at_page_top = false;
        }

        self.skip(metrics.space_after);
    }

    fn decorate(&mut self, x: f32, y: f32, width: f32, size: f32) {
        self.current.items.push(DrawItem::Line {
            x1: x,
            y1: y,
            x2: x + width,
            y2: y,
            width: (size * 0.05).max(0.5),
            gray: 0.0,
        });
    }

    /// Close the last page and return all pages. A document always has at
    /// least one page, even when empty.
    pub fn finish(mut self) -> Vec<Page> {
        if !self.current.items.is_empty() || self.pages.is_empty() {
            let page = std::mem::take(&mut self.current);
            self.pages.push(page);
        }
        self.pages
    }
}

/// Lay out `blocks` onto pages.
pub fn paginate(setup: &PageSetup, blocks: &[Block]) -> Vec<Page> {
    let mut ctx = LayoutContext::new(setup);
    for block in blocks {
        ctx.place(block);
    }
    ctx.finish()
}
