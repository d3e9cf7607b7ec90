//! Page geometry: words, ruling lines and the glyph-to-word grouping
//!
//! Coordinates are PDF points with the origin at the top-left corner of the
//! page, `top` growing downwards.

/// A positioned character as reported by the PDF reader
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub x0: f32,
    pub x1: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Word {
    pub fn new(text: &str, x0: f32, x1: f32, top: f32) -> Self {
        Self {
            text: text.to_string(),
            x0,
            x1,
            top,
            bottom: top,
        }
    }

    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }

    fn push(&mut self, glyph: &Glyph) {
        self.text.push(glyph.ch);
        self.x0 = self.x0.min(glyph.x0);
        self.x1 = self.x1.max(glyph.x1);
        self.top = self.top.min(glyph.top);
        self.bottom = self.bottom.max(glyph.bottom);
    }

    fn from_glyph(glyph: &Glyph) -> Self {
        Self {
            text: glyph.ch.to_string(),
            x0: glyph.x0,
            x1: glyph.x1,
            top: glyph.top,
            bottom: glyph.bottom,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// A thin line segment drawn on the page (table borders, rules)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    pub orientation: Orientation,
    /// y for horizontal rulings, x for vertical ones
    pub position: f32,
    pub start: f32,
    pub end: f32,
}

impl Ruling {
    pub fn horizontal(y: f32, x0: f32, x1: f32) -> Self {
        Self {
            orientation: Orientation::Horizontal,
            position: y,
            start: x0.min(x1),
            end: x0.max(x1),
        }
    }

    pub fn vertical(x: f32, top: f32, bottom: f32) -> Self {
        Self {
            orientation: Orientation::Vertical,
            position: x,
            start: top.min(bottom),
            end: top.max(bottom),
        }
    }

    /// Turn the bounding box of a path object into rulings: a thin box is a
    /// single line, a larger box contributes its four edges.
    pub fn from_box(x0: f32, top: f32, x1: f32, bottom: f32, thickness: f32) -> Vec<Ruling> {
        let width = (x1 - x0).abs();
        let height = (bottom - top).abs();

        if width <= thickness && height <= thickness {
            return Vec::new();
        }
        if height <= thickness {
            return vec![Ruling::horizontal((top + bottom) / 2.0, x0, x1)];
        }
        if width <= thickness {
            return vec![Ruling::vertical((x0 + x1) / 2.0, top, bottom)];
        }

        vec![
            Ruling::horizontal(top, x0, x1),
            Ruling::horizontal(bottom, x0, x1),
            Ruling::vertical(x0, top, bottom),
            Ruling::vertical(x1, top, bottom),
        ]
    }

    pub fn intersects(&self, other: &Ruling, tol: f32) -> bool {
        if self.orientation == other.orientation {
            return false;
        }
        other.position >= self.start - tol
            && other.position <= self.end + tol
            && self.position >= other.start - tol
            && self.position <= other.end + tol
    }
}

/// Everything the text and table steps need to know about one page
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub words: Vec<Word>,
    pub rulings: Vec<Ruling>,
}

/// Group glyphs (in content-stream order) into words. Whitespace always ends
/// a word; so does a horizontal gap or a baseline jump larger than `gap_tol`.
pub fn words_from_glyphs<I>(glyphs: I, gap_tol: f32) -> Vec<Word>
where
    I: IntoIterator<Item = Glyph>,
{
    let mut words = Vec::new();
    let mut current: Option<Word> = None;

    for glyph in glyphs {
        if glyph.ch.is_whitespace() || glyph.ch.is_control() {
            if let Some(word) = current.take() {
                words.push(word);
            }
            continue;
        }

        let breaks = match current.as_ref() {
            Some(word) => {
                glyph.x0 - word.x1 > gap_tol
                    || glyph.x1 < word.x0
                    || (glyph.top - word.top).abs() > gap_tol
            }
            None => false,
        };
        if breaks {
            if let Some(word) = current.take() {
                words.push(word);
            }
        }

        match current.as_mut() {
            Some(word) => word.push(&glyph),
            None => current = Some(Word::from_glyph(&glyph)),
        }
    }

    if let Some(word) = current {
        words.push(word);
    }
    words
}
