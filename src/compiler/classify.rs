//! Line classifier: one sanitized line in, one [`Block`] out.
//!
//! The tag grammar is a fixed, ordered table of line-prefix keywords. A line
//! is tagged when its uppercase form starts with a keyword that is followed
//! by the end of the line or, after optional spaces, by a colon. Everything
//! else is a paragraph. Matching never looks past the keyword, never looks at
//! neighbouring lines, and never fails.

use crate::document::Block;

/// Semantic kind selected by a tag keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Heading,
    Context,
    Analogy,
    Challenge,
    Warning,
}

/// Recognised keywords in match order, uppercase, accents included.
const TAGS: &[(&str, TagKind)] = &[
    ("SECCIÓN", TagKind::Heading),
    ("CONTEXTO", TagKind::Context),
    ("ANALOGÍA", TagKind::Analogy),
    ("PREGUNTA", TagKind::Challenge),
    ("RETO", TagKind::Challenge),
    ("NOTA", TagKind::Warning),
];

/// Classify one line. Blank input yields `None`; anything else yields
/// exactly one block.
pub fn classify_line(line: &str) -> Option<Block> {
    let t = line.trim();
    if t.is_empty() {
        return None;
    }

    let block = match match_tag(t) {
        Some(kind) => {
            let text = tag_payload(t).to_string();
            match kind {
                TagKind::Heading => Block::Heading { label: text },
                TagKind::Context => Block::ContextNote { payload: text },
                TagKind::Analogy => Block::AnalogyNote { payload: text },
                TagKind::Challenge => Block::ChallengeQuestion { payload: text },
                TagKind::Warning => Block::Warning { payload: text },
            }
        }
        None => Block::Paragraph {
            payload: t.to_string(),
        },
    };
    Some(block)
}

fn match_tag(trimmed: &str) -> Option<TagKind> {
    let upper = trimmed.to_uppercase();
    TAGS.iter().find_map(|(keyword, kind)| {
        // `upper` starts with the ASCII/Latin keyword, so slicing at its byte
        // length lands on a char boundary.
        let rest = upper.strip_prefix(keyword)?;
        let rest = rest.trim_start();
        (rest.is_empty() || rest.starts_with(':')).then_some(*kind)
    })
}

/// Text after the first colon, trimmed. Falls back to the whole line when
/// there is no colon or nothing follows it, so a tagged block never ends up
/// with an empty payload.
fn tag_payload(trimmed: &str) -> &str {
    match trimmed.split_once(':') {
        Some((_, after)) if !after.trim().is_empty() => after.trim(),
        _ => trimmed,
    }
}
