//! Line reconstruction by vertical proximity

use super::layout::Word;

pub const DEFAULT_LINE_TOL: f32 = 3.0;

#[derive(Debug, Clone, Copy)]
pub struct LineAssembler {
    line_tol: f32,
}

impl Default for LineAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_LINE_TOL)
    }
}

impl LineAssembler {
    pub fn new(line_tol: f32) -> Self {
        Self { line_tol }
    }

    /// Collapse reading-ordered words into lines of space-joined text.
    pub fn assemble(&self, words: &[Word]) -> Vec<String> {
        self.group(words)
            .into_iter()
            .map(|line| {
                line.iter()
                    .map(|word| word.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    /// Same grouping as [`assemble`](Self::assemble) but keeps the words.
    ///
    /// The anchor follows the running average of itself and each joined
    /// word, so slowly drifting baselines stay on one line.
    pub fn group<'a>(&self, words: &'a [Word]) -> Vec<Vec<&'a Word>> {
        let mut lines = Vec::new();
        let mut anchor: Option<f32> = None;
        let mut current: Vec<&Word> = Vec::new();

        for word in words {
            match anchor {
                Some(y) if (word.top - y).abs() <= self.line_tol => {
                    current.push(word);
                    anchor = Some((y + word.top) / 2.0);
                }
                Some(_) => {
                    lines.push(std::mem::take(&mut current));
                    current.push(word);
                    anchor = Some(word.top);
                }
                None => {
                    current.push(word);
                    anchor = Some(word.top);
                }
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }
}
