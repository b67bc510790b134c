//! Sanitizer: strip incidental markup and drop lines that are not content.
//!
//! Even with an explicit "no asterisks, no greetings" instruction, models
//! routinely emit `**bold**`, `## headings`, a cheerful `¡Claro! …` opener or a
//! `(Nota del asistente …)` aside. None of that belongs in a study guide, and
//! all of it is cheaper to remove here than to fight in the prompt.
//!
//! ## Rule Order
//!
//! Character-level rules run on the whole text first, then the line filter
//! runs on every line. Stripping markers before filtering keeps the pass
//! idempotent: a line such as `*(aside)` is judged on its cleaned form
//! `(aside)` the first time round, exactly as it would be on a second pass.
//!
//! 1. Normalise line endings (CRLF / CR → LF)
//! 2. Strip invisible Unicode (zero-width characters, BOM, soft hyphen)
//! 3. Strip emphasis markers `*`, `#`, `_`
//! 4. Per line: trim, then drop blank lines, code-fence lines and
//!    conversational preamble

use once_cell::sync::Lazy;
use regex::Regex;

/// Marker substrings that identify conversational preamble by default.
pub const DEFAULT_PREAMBLE_MARKERS: &[&str] = &["analizado"];

/// Line filter configuration. Character stripping is fixed; which
/// lowercase substrings mark a line as model chatter is configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitizer {
    preamble_markers: Vec<String>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_PREAMBLE_MARKERS.iter().copied())
    }
}

impl Sanitizer {
    /// Build a sanitizer with custom preamble markers.
    ///
    /// Markers are matched against the lowercase form of each line, so they
    /// are lowercased here; empty markers are ignored since they would match
    /// every line.
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let preamble_markers = markers
            .into_iter()
            .map(|m| m.as_ref().trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        Self { preamble_markers }
    }

    pub fn preamble_markers(&self) -> &[String] {
        &self.preamble_markers
    }

    /// Sanitize a whole text. Surviving lines are trimmed and joined with `\n`.
    pub fn sanitize(&self, input: &str) -> String {
        let s = normalise_line_endings(input);
        let s = remove_invisible_chars(&s);
        let s = strip_emphasis_markers(&s);
        s.lines()
            .filter_map(|line| self.clean_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Sanitize a single line: `None` when the line carries no content.
    ///
    /// The assembler works line by line, so this is the entry point it uses;
    /// [`Sanitizer::sanitize`] is the same thing applied to every line.
    pub fn sanitize_line(&self, line: &str) -> Option<String> {
        let s = remove_invisible_chars(line);
        let s = strip_emphasis_markers(&s);
        self.clean_line(&s).map(str::to_string)
    }

    /// Whether a trimmed line is model chatter rather than content.
    pub fn is_preamble(&self, trimmed: &str) -> bool {
        if trimmed.starts_with('!') || trimmed.starts_with('¡') || trimmed.starts_with('(') {
            return true;
        }
        if self.preamble_markers.is_empty() {
            return false;
        }
        let lower = trimmed.to_lowercase();
        self.preamble_markers.iter().any(|m| lower.contains(m.as_str()))
    }

    fn clean_line<'a>(&self, line: &'a str) -> Option<&'a str> {
        let t = line.trim();
        if t.is_empty() || is_fence_line(t) || self.is_preamble(t) {
            return None;
        }
        Some(t)
    }
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

pub(crate) fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 3: Strip emphasis markers ──────────────────────────────────────────

static RE_EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*#_]").unwrap());

/// Remove every `*`, `#` and `_`. Purely lexical; nothing else moves.
pub fn strip_emphasis_markers(input: &str) -> String {
    RE_EMPHASIS.replace_all(input, "").into_owned()
}

// ── Rule 4: Code fences ─────────────────────────────────────────────────────

fn is_fence_line(trimmed: &str) -> bool {
    trimmed.starts_with("```")
}

// ── Tests ────────────────────────────────────────────────────────────────────
