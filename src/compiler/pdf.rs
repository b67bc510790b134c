//! Flow engine: [`LayoutDocument`] → PDF bytes.
//!
//! The layout stage hands over a flat element stream; this module owns every
//! decision about *where* things land. Text is word-wrapped with Helvetica
//! advance widths, a new A4 page is started whenever the next line would
//! cross the bottom margin, boxes and rules are painted per page fragment,
//! and the footer is stamped on every page as it is created.
//!
//! Each page has two layers: `Background` for fills and rules, `Content`
//! for text. Boxes can then be painted after their text has been placed
//! (their height is only known once the last line is down) without hiding
//! that text.
//!
//! The builtin PDF fonts only cover the WinAnsi character set, so
//! [`to_winansi`] swaps anything else (the emoji markers in particular) for
//! a plain fallback before text reaches the page.

use crate::compiler::layout::{
    Align, Border, BorderStyle, Callout, Element, Footer, Header, LayoutDocument, PageSetup, Rgb,
    TextBlock, TextStyle,
};
use crate::error::GuideError;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, LineDashPattern, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerIndex, PdfLayerReference, PdfPageIndex, Rect,
};
use serde::Serialize;
use std::io::BufWriter;
use tracing::debug;

/// Gap between a callout caption and its body.
const CAPTION_GAP: f32 = 3.0;
/// Gap between the title and the subtitle line.
const SUBTITLE_GAP: f32 = 6.0;
/// Gap between the subtitle and the header rule.
const HEADER_RULE_GAP: f32 = 15.0;

/// Bytes of a finished PDF plus how many pages the flow produced.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedPdf {
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Paginate a layout tree into a PDF.
pub fn render(tree: &LayoutDocument) -> Result<RenderedPdf, GuideError> {
    let setup = tree.page;
    let (doc, page1, layer1) = PdfDocument::new(
        to_winansi(&tree.header.title),
        mm(setup.width),
        mm(setup.height),
        "Background",
    );
    let fonts = Fonts::load(&doc)?;

    let page_count = {
        let mut flow = Flow::start(&doc, &fonts, setup, &tree.footer, page1, layer1);
        flow.header(&tree.header);
        for element in &tree.elements {
            match element {
                Element::Spacer { height } => flow.spacer(*height),
                Element::Text(text) => flow.text_block(text),
                Element::Callout(callout) => flow.callout(callout),
            }
        }
        flow.page_count
    };
    debug!("Laid out {} elements on {} page(s)", tree.elements.len(), page_count);

    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| GuideError::RenderFailed(format!("PDF save error: {e}")))?;
    let bytes = buf
        .into_inner()
        .map_err(|e| GuideError::RenderFailed(format!("PDF buffer error: {e}")))?;

    Ok(RenderedPdf { bytes, page_count })
}

// ── Fonts ────────────────────────────────────────────────────────────────────

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    bold_italic: IndirectFontRef,
}

impl Fonts {
    fn load(doc: &PdfDocumentReference) -> Result<Self, GuideError> {
        let add = |font: BuiltinFont| {
            doc.add_builtin_font(font)
                .map_err(|e| GuideError::RenderFailed(format!("PDF font error: {e}")))
        };
        Ok(Self {
            regular: add(BuiltinFont::Helvetica)?,
            bold: add(BuiltinFont::HelveticaBold)?,
            italic: add(BuiltinFont::HelveticaOblique)?,
            bold_italic: add(BuiltinFont::HelveticaBoldOblique)?,
        })
    }

    fn pick(&self, style: &TextStyle) -> &IndirectFontRef {
        match (style.bold, style.italic) {
            (false, false) => &self.regular,
            (true, false) => &self.bold,
            (false, true) => &self.italic,
            (true, true) => &self.bold_italic,
        }
    }
}

// ── Flow state ───────────────────────────────────────────────────────────────

struct Flow<'a> {
    doc: &'a PdfDocumentReference,
    fonts: &'a Fonts,
    setup: PageSetup,
    footer: &'a Footer,
    back: PdfLayerReference,
    front: PdfLayerReference,
    /// Top of the next line, in points from the bottom edge.
    y: f32,
    page_count: usize,
    /// Nothing placed on the current page yet.
    at_top: bool,
}

impl<'a> Flow<'a> {
    /// Take over the document's first page and stamp its footer.
    fn start(
        doc: &'a PdfDocumentReference,
        fonts: &'a Fonts,
        setup: PageSetup,
        footer: &'a Footer,
        page: PdfPageIndex,
        layer: PdfLayerIndex,
    ) -> Self {
        let flow = Flow {
            doc,
            fonts,
            setup,
            footer,
            back: doc.get_page(page).get_layer(layer),
            front: doc.get_page(page).add_layer("Content"),
            y: setup.height - setup.margin,
            page_count: 1,
            at_top: true,
        };
        flow.draw_footer();
        flow
    }

    fn bottom(&self) -> f32 {
        self.setup.margin
    }

    fn top(&self) -> f32 {
        self.setup.height - self.setup.margin
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(mm(self.setup.width), mm(self.setup.height), "Background");
        self.back = self.doc.get_page(page).get_layer(layer);
        self.front = self.doc.get_page(page).add_layer("Content");
        self.page_count += 1;
        self.y = self.top();
        self.at_top = true;
        self.draw_footer();
    }

    /// Start a new page unless `needed` points still fit on this one.
    fn ensure(&mut self, needed: f32) {
        if !self.at_top && self.y - needed < self.bottom() {
            self.new_page();
        }
    }

    fn spacer(&mut self, height: f32) {
        if self.at_top {
            return;
        }
        self.y = (self.y - height).max(self.bottom());
    }

    fn draw_footer(&self) {
        let style = self.footer.style;
        let width = self.setup.content_width();
        for line in wrap(&self.footer.text, &style, width).iter().take(1) {
            let x = self.setup.margin + align_offset(line, &style, width);
            self.put_text(line, &style, x, self.setup.footer_offset);
        }
    }

    fn header(&mut self, header: &Header) {
        self.header_lines(&header.title, &header.title_style);
        self.y -= SUBTITLE_GAP;
        self.header_lines(&header.subtitle, &header.subtitle_style);
        self.y -= HEADER_RULE_GAP;
        if self.y - 1.0 < self.bottom() {
            self.new_page();
        }
        let width = self.setup.content_width();
        fill_rect(
            &self.back,
            header.rule_color,
            self.setup.margin,
            self.y - 1.0,
            width,
            1.0,
        );
        self.y = (self.y - header.space_after).max(self.bottom());
        self.at_top = false;
    }

    /// Header lines break pages like body text, even at the top of page one.
    fn header_lines(&mut self, text: &str, style: &TextStyle) {
        let width = self.setup.content_width();
        let h = line_height(style);
        for line in wrap(text, style, width) {
            if self.y - h < self.bottom() {
                self.new_page();
            }
            self.line(&line, style, self.setup.margin, width, false);
        }
    }

    fn text_block(&mut self, block: &TextBlock) {
        let rule_width = block.rule.map(|r| r.width).unwrap_or(0.0);
        let x = self.setup.margin + rule_width + block.indent;
        let width = self.setup.content_width() - rule_width - block.indent;
        let lines = wrap(&block.text, &block.style, width);
        let line_h = line_height(&block.style);
        if block.keep_with_next > 0.0 {
            self.ensure(line_h * lines.len() as f32 + block.keep_with_next);
        }

        let mut fragment_top = None;
        for (i, line) in lines.iter().enumerate() {
            if self.y - line_h < self.bottom() && !self.at_top {
                if let (Some(top), Some(rule)) = (fragment_top.take(), block.rule) {
                    self.rule(rule, top, self.y);
                }
                self.new_page();
            }
            if fragment_top.is_none() {
                fragment_top = Some(self.y);
            }
            let last = i + 1 == lines.len();
            self.line(line, &block.style, x, width, !last);
        }
        if let (Some(top), Some(rule)) = (fragment_top, block.rule) {
            self.rule(rule, top, self.y);
        }
        self.y -= block.space_after;
    }

    fn callout(&mut self, callout: &Callout) {
        self.spacer(callout.space_before);

        let pad = callout.padding;
        let inner_x = self.setup.margin + pad;
        let inner_w = self.setup.content_width() - 2.0 * pad;
        let caption = wrap(&callout.caption, &callout.caption_style, inner_w);
        let body = wrap(&callout.body, &callout.body_style, inner_w);
        let cap_h = line_height(&callout.caption_style);
        let body_h = line_height(&callout.body_style);

        // Keep the caption together with the first body line.
        let head = pad + cap_h * caption.len() as f32 + CAPTION_GAP + body_h.min(body_h * body.len() as f32);
        self.ensure(head + pad);

        let mut lines: Vec<(&str, &TextStyle, bool)> = Vec::with_capacity(caption.len() + body.len());
        lines.extend(caption.iter().map(|l| (l.as_str(), &callout.caption_style, false)));
        let body_start = lines.len();
        lines.extend(
            body.iter()
                .enumerate()
                .map(|(i, l)| (l.as_str(), &callout.body_style, i + 1 < body.len())),
        );

        let mut fragment_top = self.y;
        self.y -= pad;
        self.at_top = false;
        for (i, (line, style, justify)) in lines.into_iter().enumerate() {
            if i == body_start {
                self.y -= CAPTION_GAP;
            }
            let h = line_height(style);
            if self.y - h - pad < self.bottom() {
                self.paint_box(callout, fragment_top, self.y - pad);
                self.new_page();
                fragment_top = self.y;
                self.y -= pad;
                self.at_top = false;
            }
            self.line(line, style, inner_x, inner_w, justify);
        }
        self.y -= pad;
        self.paint_box(callout, fragment_top, self.y);
        self.y -= callout.space_after;
    }

    /// Place one wrapped line at the cursor and advance.
    fn line(&mut self, line: &str, style: &TextStyle, x: f32, width: f32, may_justify: bool) {
        let h = line_height(style);
        let baseline = self.y - (h - style.size) / 2.0 - style.size * 0.8;
        match style.align {
            Align::Justify if may_justify => self.justified(line, style, x, width, baseline),
            _ => {
                let x = x + align_offset(line, style, width);
                self.put_text(line, style, x, baseline);
            }
        }
        self.y -= h;
        self.at_top = false;
    }

    /// Spread the words of a full line across the available width.
    fn justified(&self, line: &str, style: &TextStyle, x: f32, width: f32, baseline: f32) {
        let words: Vec<&str> = line.split(' ').filter(|w| !w.is_empty()).collect();
        let natural = text_width(line, style);
        if words.len() < 2 || natural >= width {
            self.put_text(line, style, x, baseline);
            return;
        }
        let words_width: f32 = words.iter().map(|w| text_width(w, style)).sum();
        let gap = (width - words_width) / (words.len() - 1) as f32;
        // Very short lines read better ragged than stretched.
        if gap > style.size * 1.5 {
            self.put_text(line, style, x, baseline);
            return;
        }
        let mut cursor = x;
        for word in words {
            self.put_text(word, style, cursor, baseline);
            cursor += text_width(word, style) + gap;
        }
    }

    fn put_text(&self, text: &str, style: &TextStyle, x: f32, baseline: f32) {
        self.front.set_fill_color(pdf_color(style.color));
        self.front
            .use_text(to_winansi(text), style.size, mm(x), mm(baseline), self.fonts.pick(style));
    }

    fn rule(&self, border: Border, top: f32, bottom: f32) {
        fill_rect(
            &self.back,
            border.color,
            self.setup.margin,
            bottom,
            border.width,
            top - bottom,
        );
    }

    fn paint_box(&self, callout: &Callout, top: f32, bottom: f32) {
        let x = self.setup.margin;
        let w = self.setup.content_width();
        let h = top - bottom;
        if h <= 0.0 {
            return;
        }
        if let Some(fill) = callout.fill {
            fill_rect(&self.back, fill, x, bottom, w, h);
        }
        let Some(border) = callout.border else {
            return;
        };
        if border.left_only {
            fill_rect(&self.back, border.color, x, bottom, border.width, h);
            return;
        }
        self.back.set_outline_color(pdf_color(border.color));
        self.back.set_outline_thickness(border.width);
        if border.style == BorderStyle::Dashed {
            self.back.set_line_dash_pattern(LineDashPattern {
                dash_1: Some(4),
                gap_1: Some(3),
                ..Default::default()
            });
        }
        self.back.add_rect(
            Rect::new(mm(x), mm(bottom), mm(x + w), mm(top)).with_mode(PaintMode::Stroke),
        );
        if border.style == BorderStyle::Dashed {
            self.back.set_line_dash_pattern(LineDashPattern::default());
        }
    }
}

fn fill_rect(layer: &PdfLayerReference, color: Rgb, x: f32, y: f32, w: f32, h: f32) {
    layer.set_fill_color(pdf_color(color));
    layer.add_rect(Rect::new(mm(x), mm(y), mm(x + w), mm(y + h)).with_mode(PaintMode::Fill));
}

fn pdf_color(c: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(
        c.r as f32 / 255.0,
        c.g as f32 / 255.0,
        c.b as f32 / 255.0,
        None,
    ))
}

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

fn line_height(style: &TextStyle) -> f32 {
    style.size * style.leading
}

fn align_offset(line: &str, style: &TextStyle, width: f32) -> f32 {
    match style.align {
        Align::Center => ((width - text_width(line, style)) / 2.0).max(0.0),
        Align::Left | Align::Justify => 0.0,
    }
}

// ── Measuring and wrapping ───────────────────────────────────────────────────

/// Approximate Helvetica advance width of one character, in em.
fn char_em(c: char, bold: bool) -> f32 {
    let w = match c {
        ' ' => 0.278,
        'i' | 'j' | 'l' | '\'' | '|' => 0.222,
        '.' | ',' | ':' | ';' | '!' | '¡' | 'í' | 'ì' | 'ï' => 0.278,
        'f' | 't' | 'I' | '(' | ')' | '[' | ']' | '/' | '-' => 0.333,
        'r' => 0.333,
        'm' | 'M' => 0.833,
        'w' => 0.722,
        'W' => 0.944,
        '—' => 1.0,
        '0'..='9' => 0.556,
        c if c.is_uppercase() => 0.70,
        c if c.is_alphabetic() => 0.556,
        _ => 0.584,
    };
    if bold {
        w * 1.06
    } else {
        w
    }
}

/// Width of `text` in points once rendered in `style`.
pub fn text_width(text: &str, style: &TextStyle) -> f32 {
    to_winansi(text)
        .chars()
        .map(|c| char_em(c, style.bold))
        .sum::<f32>()
        * style.size
}

/// Greedy word wrap to `width` points. Words wider than a line are split
/// between characters. Always returns at least one line.
pub fn wrap(text: &str, style: &TextStyle, width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, style) <= width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if text_width(word, style) <= width {
            current = word.to_string();
            continue;
        }
        for c in word.chars() {
            current.push(c);
            if text_width(&current, style) > width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Map text onto what the builtin fonts can draw.
pub fn to_winansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{FE0F}' | '\u{FE0E}' | '\u{200D}' => {}
            '💡' => out.push('*'),
            '⚠' => out.push('!'),
            '❓' | '❔' => out.push('?'),
            '✅' | '✔' => out.push('+'),
            c if is_winansi(c) => out.push(c),
            c if c.is_whitespace() => out.push(' '),
            _ => out.push('?'),
        }
    }
    out
}

fn is_winansi(c: char) -> bool {
    matches!(
        c,
        ' '..='~'
            | '\u{00A0}'..='\u{00FF}'
            | '€' | '‚' | 'ƒ' | '„' | '…' | '†' | '‡' | 'ˆ' | '‰' | 'Š' | '‹' | 'Œ' | 'Ž'
            | '‘' | '’' | '“' | '”' | '•' | '–' | '—' | '˜' | '™' | 'š' | '›' | 'œ' | 'ž'
            | 'Ÿ'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::layout::{layout, Theme};
    use crate::document::{Block, StructuredDocument};

    fn body() -> TextStyle {
        Theme::default().body_style
    }

    #[test]
    fn winansi_keeps_spanish_and_replaces_emoji() {
        assert_eq!(to_winansi("¿Qué es la fotosíntesis? Ñandú"), "¿Qué es la fotosíntesis? Ñandú");
        assert_eq!(to_winansi("💡 Analogía"), "* Analogía");
        assert_eq!(to_winansi("⚠️ Cuidado"), "! Cuidado");
        assert_eq!(to_winansi("FormatZero — Neuro • x"), "FormatZero — Neuro • x");
        assert_eq!(to_winansi("中"), "?");
    }

    #[test]
    fn wrap_respects_width() {
        let style = body();
        let text = "La fotosíntesis es el proceso mediante el cual las plantas convierten la luz solar en energía química almacenada";
        let lines = wrap(text, &style, 150.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, &style) <= 150.0, "too wide: {line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn wrap_splits_overlong_words() {
        let style = body();
        let word = "a".repeat(200);
        let lines = wrap(&word, &style, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn wrap_of_empty_text_is_one_empty_line() {
        assert_eq!(wrap("", &body(), 100.0), vec![String::new()]);
    }

    #[test]
    fn bold_is_wider() {
        let mut bold = body();
        bold.bold = true;
        assert!(text_width("Memoria", &bold) > text_width("Memoria", &body()));
    }

    fn doc(blocks: Vec<Block>) -> StructuredDocument {
        StructuredDocument {
            title: "Fotosíntesis".into(),
            author: "ana@example.com".into(),
            blocks,
        }
    }

    #[test]
    fn short_document_fits_one_page() {
        let tree = layout(
            &doc(vec![
                Block::Heading { label: "Introducción".into() },
                Block::ContextNote { payload: "Sirve para producir energía".into() },
                Block::AnalogyNote { payload: "Es como una fábrica solar".into() },
                Block::ChallengeQuestion { payload: "¿Dónde ocurre?".into() },
                Block::Warning { payload: "No confundir con respiración".into() },
                Block::Paragraph { payload: "Texto.".into() },
            ]),
            &Theme::default(),
        );
        let pdf = render(&tree).expect("render");
        assert!(pdf.bytes.starts_with(b"%PDF"));
        assert_eq!(pdf.page_count, 1);
    }

    #[test]
    fn long_document_flows_onto_more_pages() {
        let para = "Las células vegetales contienen cloroplastos, orgánulos donde se captura la energía de la luz. ".repeat(6);
        let mut blocks = Vec::new();
        for i in 0..40 {
            blocks.push(Block::Heading { label: format!("Sección {i}") });
            blocks.push(Block::Paragraph { payload: para.clone() });
            blocks.push(Block::ChallengeQuestion { payload: para.clone() });
        }
        let pdf = render(&layout(&doc(blocks), &Theme::default())).expect("render");
        assert!(pdf.page_count > 5, "got {} pages", pdf.page_count);
    }

    #[test]
    fn long_title_stays_inside_the_margins() {
        let mut d = doc(vec![Block::Paragraph { payload: "Texto.".into() }]);
        d.title = "Fotosíntesis ".repeat(160);
        let tree = layout(&d, &Theme::default());

        let (pdf, page1, layer1) = PdfDocument::new(
            "t",
            mm(tree.page.width),
            mm(tree.page.height),
            "Background",
        );
        let fonts = Fonts::load(&pdf).expect("fonts");
        let mut flow = Flow::start(&pdf, &fonts, tree.page, &tree.footer, page1, layer1);
        flow.header(&tree.header);
        assert!(flow.page_count > 1, "title fit on {} page", flow.page_count);
        assert!(
            flow.y >= tree.page.margin,
            "cursor {} below margin {}",
            flow.y,
            tree.page.margin
        );

        assert!(render(&tree).expect("render").page_count > 1);
    }

    #[test]
    fn heading_is_not_stranded_at_page_bottom() {
        let theme = Theme::default();
        let tree = layout(
            &doc(vec![
                Block::Heading { label: "Fase luminosa".into() },
                Block::Paragraph { payload: "La luz excita la clorofila.".into() },
            ]),
            &theme,
        );
        let Element::Text(heading) = &tree.elements[1] else {
            panic!("expected heading text, got {:?}", tree.elements[1]);
        };

        let (pdf, page1, layer1) = PdfDocument::new(
            "t",
            mm(tree.page.width),
            mm(tree.page.height),
            "Background",
        );
        let fonts = Fonts::load(&pdf).expect("fonts");
        let mut flow = Flow::start(&pdf, &fonts, tree.page, &tree.footer, page1, layer1);
        flow.at_top = false;
        // Room for the heading line itself but not for the body line after it.
        flow.y = tree.page.margin + line_height(&heading.style) + 1.0;
        flow.text_block(heading);

        assert_eq!(flow.page_count, 2);
        let body_h = line_height(&theme.body_style);
        assert!(flow.y - body_h >= tree.page.margin);
    }

    #[test]
    fn callout_taller_than_a_page_is_split() {
        let huge = "palabra ".repeat(4000);
        let pdf = render(&layout(
            &doc(vec![Block::ContextNote { payload: huge }]),
            &Theme::default(),
        ))
        .expect("render");
        assert!(pdf.page_count >= 2);
    }
}
