//! Two-column reading order

use std::cmp::Ordering;

use super::layout::Word;

pub const DEFAULT_GUTTER_RATIO: f32 = 0.08;

/// Assigns page words to a left and a right reading column.
///
/// Words whose center falls inside the gutter band around the midline go to
/// whichever band edge is closer; a center exactly on the midline goes left.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSplitter {
    gutter_ratio: f32,
}

impl Default for ColumnSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_GUTTER_RATIO)
    }
}

impl ColumnSplitter {
    pub fn new(gutter_ratio: f32) -> Self {
        Self { gutter_ratio }
    }

    /// Both outputs are in top-to-bottom, left-to-right order; either may be
    /// empty.
    pub fn split(&self, words: &[Word], page_width: f32) -> (Vec<Word>, Vec<Word>) {
        if words.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let midline = page_width / 2.0;
        let gutter = page_width * self.gutter_ratio;
        let left_edge = midline - gutter / 2.0;
        let right_edge = midline + gutter / 2.0;

        let mut sorted: Vec<&Word> = words.iter().collect();
        sorted.sort_by(|a, b| {
            a.top
                .partial_cmp(&b.top)
                .unwrap_or(Ordering::Equal)
                .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
        });

        let mut left = Vec::new();
        let mut right = Vec::new();
        for word in sorted {
            let center = word.center_x();
            let goes_left = if center <= left_edge {
                true
            } else if center >= right_edge {
                false
            } else {
                (center - left_edge).abs() <= (center - right_edge).abs()
            };

            if goes_left {
                left.push(word.clone());
            } else {
                right.push(word.clone());
            }
        }

        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // page width 1000 -> midline 500, gutter 80, band 460..540
    const WIDTH: f32 = 1000.0;

    fn centered(text: &str, center: f32, top: f32) -> Word {
        Word::new(text, center - 10.0, center + 10.0, top)
    }

    fn texts(words: &[Word]) -> Vec<&str> {
        words.iter().map(|w| w.text.as_str()).collect()
    }

    #[test]
    fn empty_page_yields_two_empty_columns() {
        let (left, right) = ColumnSplitter::default().split(&[], WIDTH);
        assert!(left.is_empty());
        assert!(right.is_empty());
    }

    #[test]
    fn band_edges_assign_to_their_own_side() {
        let words = vec![centered("edge-left", 460.0, 10.0), centered("edge-right", 540.0, 10.0)];
        let (left, right) = ColumnSplitter::default().split(&words, WIDTH);
        assert_eq!(texts(&left), vec!["edge-left"]);
        assert_eq!(texts(&right), vec!["edge-right"]);
    }

    #[test]
    fn gutter_words_go_to_the_closer_edge_and_midline_ties_go_left() {
        let words = vec![
            centered("near-left", 470.0, 10.0),
            centered("near-right", 530.0, 20.0),
            centered("tie", 500.0, 30.0),
        ];
        let (left, right) = ColumnSplitter::default().split(&words, WIDTH);
        assert_eq!(texts(&left), vec!["near-left", "tie"]);
        assert_eq!(texts(&right), vec!["near-right"]);
    }

    #[test]
    fn far_words_take_the_nearer_side() {
        let words = vec![centered("a", 50.0, 10.0), centered("b", 950.0, 10.0)];
        let (left, right) = ColumnSplitter::default().split(&words, WIDTH);
        assert_eq!(texts(&left), vec!["a"]);
        assert_eq!(texts(&right), vec!["b"]);
    }

    #[test]
    fn output_is_sorted_by_top_then_x() {
        let words = vec![
            centered("third", 100.0, 30.0),
            centered("second", 200.0, 10.0),
            centered("first", 100.0, 10.0),
            centered("right-top", 800.0, 5.0),
        ];
        let (left, right) = ColumnSplitter::default().split(&words, WIDTH);
        assert_eq!(texts(&left), vec!["first", "second", "third"]);
        assert_eq!(texts(&right), vec!["right-top"]);
    }

    #[test]
    fn single_column_page_fills_one_side() {
        let words: Vec<_> = (0..5).map(|i| centered("w", 150.0, i as f32 * 12.0)).collect();
        let (left, right) = ColumnSplitter::default().split(&words, WIDTH);
        assert_eq!(left.len(), 5);
        assert!(right.is_empty());
    }
}
