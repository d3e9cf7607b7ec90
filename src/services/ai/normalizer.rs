//! Text cleanup applied before embedding

use regex::Regex;

use crate::error::{AppResult, ResultExt};

pub const DEFAULT_EMBED_CHAR_CAP: usize = 4000;

pub struct TextNormalizer {
    page_number: Regex,
    hyphen_break: Regex,
    line_break: Regex,
    spaces: Regex,
    char_cap: usize,
}

impl TextNormalizer {
    pub fn new(char_cap: usize) -> AppResult<Self> {
        Ok(Self {
            page_number: Regex::new(r"\n\d{1,3}\n").config_err("page number pattern")?,
            hyphen_break: Regex::new(r"(\w+)-\n(\w+)").config_err("hyphenation pattern")?,
            line_break: Regex::new(r"\s*\n\s*").config_err("line break pattern")?,
            spaces: Regex::new(r"\s{2,}").config_err("whitespace pattern")?,
            char_cap,
        })
    }

    /// Strip page numbers, join hyphenated line breaks and collapse
    /// whitespace. The result has no newlines, so a second pass is a no-op.
    pub fn normalize(&self, text: &str) -> String {
        let text = self.page_number.replace_all(text, " ");
        let text = self.hyphen_break.replace_all(&text, "$1$2");
        let text = self.line_break.replace_all(&text, " ");
        let text = self.spaces.replace_all(&text, " ");
        text.trim().to_string()
    }

    /// First `char_cap` characters of `text`
    pub fn cap<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.char_cap) {
            Some((idx, _)) => &text[..idx],
            None => text,
        }
    }

    /// Normalized and capped text ready for the embedder, `None` when nothing
    /// is left after cleanup
    pub fn prepare(&self, text: &str) -> Option<String> {
        let normalized = self.normalize(text);
        if normalized.is_empty() {
            return None;
        }
        Some(self.cap(&normalized).to_string())
    }
}
