//! The document model shared by the compiler stages.
//!
//! ```text
//! model output ──▶ RawDocument ──▶ StructuredDocument ──▶ LayoutDocument
//!                 (title + lines)   (title + Blocks)       (see compiler::layout)
//! ```
//!
//! Blocks are flat: a study guide is a single ordered stream of sections,
//! notes and paragraphs, never a tree.

use serde::{Deserialize, Serialize};

/// Title used when the model output has no usable first line.
pub const DEFAULT_TITLE: &str = "Guía de Aprendizaje";

/// Model output split into its title line and the remaining body lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDocument {
    pub title: String,
    pub body_lines: Vec<String>,
}

/// One classified unit of study-guide content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    /// `SECCIÓN:` section label.
    Heading { label: String },
    /// `CONTEXTO:` why the next concept matters.
    ContextNote { payload: String },
    /// `ANALOGÍA:` everyday comparison.
    AnalogyNote { payload: String },
    /// `PREGUNTA:` / `RETO:` active-recall question.
    ChallengeQuestion { payload: String },
    /// `NOTA:` caution the reader should not miss.
    Warning { payload: String },
    /// Any untagged line.
    Paragraph { payload: String },
}

impl Block {
    /// The display text carried by the block, whatever its kind.
    pub fn text(&self) -> &str {
        match self {
            Block::Heading { label } => label,
            Block::ContextNote { payload }
            | Block::AnalogyNote { payload }
            | Block::ChallengeQuestion { payload }
            | Block::Warning { payload }
            | Block::Paragraph { payload } => payload,
        }
    }

    /// Short stable name of the variant, used in logs and stats.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Block::Heading { .. } => "heading",
            Block::ContextNote { .. } => "context_note",
            Block::AnalogyNote { .. } => "analogy_note",
            Block::ChallengeQuestion { .. } => "challenge_question",
            Block::Warning { .. } => "warning",
            Block::Paragraph { .. } => "paragraph",
        }
    }
}

/// The compiled study guide. Block order is the order of the surviving
/// source lines; nothing is merged, deduplicated or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub title: String,
    pub author: String,
    pub blocks: Vec<Block>,
}

impl StructuredDocument {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of blocks of each kind, in first-seen order.
    pub fn kind_counts(&self) -> Vec<(&'static str, usize)> {
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for block in &self.blocks {
            let kind = block.kind_name();
            match counts.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((kind, 1)),
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_serialises_with_kind_tag() {
        let b = Block::ChallengeQuestion {
            payload: "¿Qué produce la fotosíntesis?".into(),
        };
        let json = serde_json::to_value(&b).unwrap();
        assert_eq!(json["kind"], "challenge_question");
        assert_eq!(json["payload"], "¿Qué produce la fotosíntesis?");

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn heading_text_is_its_label() {
        let b = Block::Heading {
            label: "Introducción".into(),
        };
        assert_eq!(b.text(), "Introducción");
        assert_eq!(b.kind_name(), "heading");
    }

    #[test]
    fn kind_counts_keep_first_seen_order() {
        let doc = StructuredDocument {
            title: "t".into(),
            author: "a".into(),
            blocks: vec![
                Block::Paragraph { payload: "p1".into() },
                Block::Heading { label: "h".into() },
                Block::Paragraph { payload: "p2".into() },
            ],
        };
        assert_eq!(doc.kind_counts(), vec![("paragraph", 2), ("heading", 1)]);
    }
}
