//! Layout renderer: [`StructuredDocument`] → [`LayoutDocument`].
//!
//! This stage decides *how each block looks* and nothing else. It emits a
//! flat, ordered list of [`Element`]s with fully resolved styles plus the
//! page furniture (header, footer, margins). Where a page ends is the flow
//! engine's business ([`crate::compiler::pdf`]); nothing here measures text.
//!
//! All lengths are PDF points (1/72 inch).

use crate::document::{Block, StructuredDocument};
use serde::{Deserialize, Serialize};

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn hex(v: u32) -> Self {
        Self {
            r: ((v >> 16) & 0xFF) as u8,
            g: ((v >> 8) & 0xFF) as u8,
            b: (v & 0xFF) as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Align {
    #[default]
    Left,
    Center,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextStyle {
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: Rgb,
    pub align: Align,
    /// Line height as a multiple of `size`.
    pub leading: f32,
}

impl TextStyle {
    const fn new(size: f32, color: Rgb) -> Self {
        Self {
            size,
            bold: false,
            italic: false,
            color,
            align: Align::Left,
            leading: 1.3,
        }
    }

    const fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    const fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    const fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    const fn leading(mut self, leading: f32) -> Self {
        self.leading = leading;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BorderStyle {
    Solid,
    Dashed,
}

/// Box border. `left_only` draws a single accent rule on the left edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Border {
    pub color: Rgb,
    pub width: f32,
    pub style: BorderStyle,
    pub left_only: bool,
}

/// A run of wrapped text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub style: TextStyle,
    /// Left indent from the content edge.
    pub indent: f32,
    /// Accent rule drawn at the left edge of the indented area.
    pub rule: Option<Border>,
    pub space_after: f32,
    /// Height of the content that must stay on the same page as this block.
    #[serde(default)]
    pub keep_with_next: f32,
}

/// A captioned box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callout {
    pub caption: String,
    pub caption_style: TextStyle,
    pub body: String,
    pub body_style: TextStyle,
    pub fill: Option<Rgb>,
    pub border: Option<Border>,
    pub padding: f32,
    pub space_before: f32,
    pub space_after: f32,
}

/// One item of the flat element stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    /// Vertical gap. Swallowed at the top of a page.
    Spacer { height: f32 },
    Text(TextBlock),
    Callout(Callout),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    /// Distance from the bottom edge to the footer baseline.
    pub footer_offset: f32,
}

impl PageSetup {
    pub const A4: PageSetup = PageSetup {
        width: 595.28,
        height: 841.89,
        margin: 45.0,
        footer_offset: 30.0,
    };

    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }
}

/// Title block rendered once on the first page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub title: String,
    pub title_style: TextStyle,
    pub subtitle: String,
    pub subtitle_style: TextStyle,
    pub rule_color: Rgb,
    pub space_after: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Footer {
    pub text: String,
    pub style: TextStyle,
}

/// The renderable document tree handed to the flow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    pub page: PageSetup,
    pub header: Header,
    pub footer: Footer,
    pub elements: Vec<Element>,
}

/// Fixed strings, glyphs and styles for every block kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub page: PageSetup,
    /// `{author}` is replaced with the document author.
    pub subtitle_template: String,
    pub footer: String,
    pub context_caption: String,
    pub challenge_caption: String,
    pub analogy_prefix: String,
    pub warning_prefix: String,
    /// Shown when the document has no blocks.
    pub placeholder: String,

    pub title_style: TextStyle,
    pub subtitle_style: TextStyle,
    pub header_rule: Rgb,
    pub footer_style: TextStyle,

    pub heading_style: TextStyle,
    pub heading_space_before: f32,
    pub heading_space_after: f32,

    pub context_fill: Rgb,
    pub context_rule: Rgb,
    pub context_caption_style: TextStyle,
    pub context_body_style: TextStyle,

    pub analogy_style: TextStyle,
    pub analogy_rule: Rgb,
    pub analogy_indent: f32,

    pub challenge_fill: Rgb,
    pub challenge_border: Rgb,
    pub challenge_caption_style: TextStyle,
    pub challenge_body_style: TextStyle,

    pub warning_style: TextStyle,
    pub body_style: TextStyle,
    pub block_gap: f32,
    pub box_padding: f32,
}

impl Default for Theme {
    fn default() -> Self {
        let ink = Rgb::hex(0x374151);
        Self {
            page: PageSetup::A4,
            subtitle_template: "RUTA DE APRENDIZAJE • {author}".into(),
            footer: "FormatZero — Neurociencia aplicada al estudio".into(),
            context_caption: "¿POR QUÉ IMPORTA ESTO?".into(),
            challenge_caption: "RETO DE MEMORIA ACTIVA".into(),
            analogy_prefix: "💡 Analogía:".into(),
            warning_prefix: "⚠️".into(),
            placeholder: "Sin contenido todavía.".into(),

            title_style: TextStyle::new(26.0, Rgb::hex(0x111827)).bold().leading(1.15),
            subtitle_style: TextStyle::new(8.0, Rgb::hex(0x9CA3AF)),
            header_rule: Rgb::hex(0xE5E7EB),
            footer_style: TextStyle::new(8.0, Rgb::hex(0xD1D5DB)).align(Align::Center),

            heading_style: TextStyle::new(13.0, Rgb::hex(0x4F46E5)).bold(),
            heading_space_before: 25.0,
            heading_space_after: 12.0,

            context_fill: Rgb::hex(0xF0F9FF),
            context_rule: Rgb::hex(0x0EA5E9),
            context_caption_style: TextStyle::new(8.0, Rgb::hex(0x0369A1)).bold(),
            context_body_style: TextStyle::new(10.0, Rgb::hex(0x0C4A6E)),

            analogy_style: TextStyle::new(10.0, Rgb::hex(0x6366F1)).italic(),
            analogy_rule: Rgb::hex(0xE5E7EB),
            analogy_indent: 10.0,

            challenge_fill: Rgb::hex(0xF5F3FF),
            challenge_border: Rgb::hex(0xC7D2FE),
            challenge_caption_style: TextStyle::new(8.0, Rgb::hex(0x4338CA)).bold(),
            challenge_body_style: TextStyle::new(10.0, Rgb::hex(0x4338CA)).bold(),

            warning_style: TextStyle::new(10.5, Rgb::hex(0xB45309))
                .bold()
                .align(Align::Justify)
                .leading(1.6),
            body_style: TextStyle::new(10.5, ink).align(Align::Justify).leading(1.6),
            block_gap: 12.0,
            box_padding: 12.0,
        }
    }
}

/// Map a compiled document onto the theme.
pub fn layout(doc: &StructuredDocument, theme: &Theme) -> LayoutDocument {
    let header = Header {
        title: doc.title.clone(),
        title_style: theme.title_style,
        subtitle: theme
            .subtitle_template
            .replace("{author}", &doc.author.to_uppercase()),
        subtitle_style: theme.subtitle_style,
        rule_color: theme.header_rule,
        space_after: 35.0,
    };

    let mut elements = Vec::with_capacity(doc.blocks.len() + 4);
    if doc.blocks.is_empty() {
        elements.push(paragraph(theme, theme.placeholder.clone()));
    }
    for block in &doc.blocks {
        push_block(&mut elements, block, theme);
    }

    LayoutDocument {
        page: theme.page,
        header,
        footer: Footer {
            text: theme.footer.clone(),
            style: theme.footer_style,
        },
        elements,
    }
}

fn push_block(out: &mut Vec<Element>, block: &Block, theme: &Theme) {
    match block {
        Block::Heading { label } => {
            out.push(Element::Spacer {
                height: theme.heading_space_before,
            });
            out.push(Element::Text(TextBlock {
                text: label.to_uppercase(),
                style: theme.heading_style,
                indent: 0.0,
                rule: None,
                space_after: theme.heading_space_after,
                keep_with_next: theme.heading_space_after
                    + theme.body_style.size * theme.body_style.leading,
            }));
        }
        Block::ContextNote { payload } => out.push(Element::Callout(Callout {
            caption: theme.context_caption.clone(),
            caption_style: theme.context_caption_style,
            body: payload.clone(),
            body_style: theme.context_body_style,
            fill: Some(theme.context_fill),
            border: Some(Border {
                color: theme.context_rule,
                width: 3.0,
                style: BorderStyle::Solid,
                left_only: true,
            }),
            padding: theme.box_padding,
            space_before: 0.0,
            space_after: 15.0,
        })),
        Block::AnalogyNote { payload } => out.push(Element::Text(TextBlock {
            text: format!("{} {}", theme.analogy_prefix, payload),
            style: theme.analogy_style,
            indent: theme.analogy_indent,
            rule: Some(Border {
                color: theme.analogy_rule,
                width: 2.0,
                style: BorderStyle::Solid,
                left_only: true,
            }),
            space_after: 15.0,
            keep_with_next: 0.0,
        })),
        Block::ChallengeQuestion { payload } => out.push(Element::Callout(Callout {
            caption: theme.challenge_caption.clone(),
            caption_style: theme.challenge_caption_style,
            body: payload.clone(),
            body_style: theme.challenge_body_style,
            fill: Some(theme.challenge_fill),
            border: Some(Border {
                color: theme.challenge_border,
                width: 1.0,
                style: BorderStyle::Dashed,
                left_only: false,
            }),
            padding: theme.box_padding,
            space_before: 10.0,
            space_after: theme.block_gap,
        })),
        Block::Warning { payload } => out.push(Element::Text(TextBlock {
            text: format!("{} {}", theme.warning_prefix, payload),
            style: theme.warning_style,
            indent: 0.0,
            rule: None,
            space_after: theme.block_gap,
            keep_with_next: 0.0,
        })),
        Block::Paragraph { payload } => out.push(paragraph(theme, payload.clone())),
    }
}

fn paragraph(theme: &Theme, text: String) -> Element {
    Element::Text(TextBlock {
        text,
        style: theme.body_style,
        indent: 0.0,
        rule: None,
        space_after: theme.block_gap,
        keep_with_next: 0.0,
    })
}
