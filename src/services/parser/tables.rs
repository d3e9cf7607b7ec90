//! Table detection
//!
//! Two independent strategies run on every page:
//! - `lattice`: grids formed by ruling lines drawn on the page
//! - `stream`: runs of lines whose words line up in whitespace-separated cells
//!
//! A table found by both strategies is reported twice; callers keep the
//! `strategy` with each table so duplicates stay distinguishable.

use std::cmp::Ordering;

use super::layout::{Orientation, PageLayout, Ruling, Word};
use super::lines::LineAssembler;
use crate::error::{AppError, AppResult};
use crate::services::ExtractionConfig;

pub const STRATEGY_LATTICE: &str = "lattice";
pub const STRATEGY_STREAM: &str = "stream";

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        let cols = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        (self.rows.len(), cols)
    }

    /// Cells joined by `" | "`, rows by newline
    pub fn flatten(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.join(" | "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub trait TableDetector {
    fn strategy(&self) -> &'static str;

    /// `Ok(vec![])` means the page has no tables; `Err` means the detector
    /// could not run.
    fn detect(&self, layout: &PageLayout) -> AppResult<Vec<Table>>;
}

/// Build the detectors named in the config, in config order. Unknown names
/// are skipped with a warning.
pub fn detectors_from_config(config: &ExtractionConfig) -> Vec<Box<dyn TableDetector>> {
    let mut detectors: Vec<Box<dyn TableDetector>> = Vec::new();
    for name in &config.table_strategies {
        match name.as_str() {
            STRATEGY_LATTICE => detectors.push(Box::new(LatticeDetector::new(config.ruling_tol))),
            STRATEGY_STREAM => detectors.push(Box::new(StreamDetector::from_config(config))),
            other => tracing::warn!(strategy = other, "Unknown table strategy ignored"),
        }
    }
    detectors
}

fn check_geometry(layout: &PageLayout) -> AppResult<()> {
    let valid = |v: f32| v.is_finite() && v > 0.0;
    if valid(layout.width) && valid(layout.height) {
        Ok(())
    } else {
        Err(AppError::Pdf(format!(
            "invalid page geometry {}x{}",
            layout.width, layout.height
        )))
    }
}

fn reading_order(a: &&Word, b: &&Word) -> Ordering {
    a.top
        .partial_cmp(&b.top)
        .unwrap_or(Ordering::Equal)
        .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
}

fn join_words(words: &mut Vec<&Word>) -> String {
    words.sort_by(reading_order);
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Merge sorted-able values closer than `tol` into their average
fn cluster(mut values: Vec<f32>, tol: f32) -> Vec<f32> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mut clusters: Vec<(f32, usize)> = Vec::new();
    for value in values {
        match clusters.last_mut() {
            Some((sum, count)) if value - *sum / *count as f32 <= tol => {
                *sum += value;
                *count += 1;
            }
            _ => clusters.push((value, 1)),
        }
    }
    clusters
        .into_iter()
        .map(|(sum, count)| sum / count as f32)
        .collect()
}

fn band_index(edges: &[f32], value: f32) -> Option<usize> {
    edges
        .windows(2)
        .position(|pair| value >= pair[0] && value < pair[1])
}

// ========== Lattice ==========

pub struct LatticeDetector {
    tol: f32,
}

impl LatticeDetector {
    pub fn new(tol: f32) -> Self {
        Self { tol }
    }

    /// Connected groups of mutually crossing rulings
    fn components<'a>(&self, rulings: &'a [Ruling]) -> Vec<Vec<&'a Ruling>> {
        let mut parent: Vec<usize> = (0..rulings.len()).collect();

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        for i in 0..rulings.len() {
            for j in (i + 1)..rulings.len() {
                if rulings[i].intersects(&rulings[j], self.tol) {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                    if a != b {
                        parent[b] = a;
                    }
                }
            }
        }

        let mut groups: Vec<(usize, Vec<&Ruling>)> = Vec::new();
        for (i, ruling) in rulings.iter().enumerate() {
            let root = find(&mut parent, i);
            match groups.iter_mut().find(|(r, _)| *r == root) {
                Some((_, members)) => members.push(ruling),
                None => groups.push((root, vec![ruling])),
            }
        }
        groups.into_iter().map(|(_, members)| members).collect()
    }

    fn grid_table(&self, group: &[&Ruling], words: &[Word]) -> Option<Table> {
        let positions = |orientation: Orientation| {
            group
                .iter()
                .filter(|r| r.orientation == orientation)
                .map(|r| r.position)
                .collect::<Vec<_>>()
        };
        let ys = cluster(positions(Orientation::Horizontal), self.tol);
        let xs = cluster(positions(Orientation::Vertical), self.tol);
        if ys.len() < 2 || xs.len() < 2 {
            return None;
        }
        // a lone box (page border, framed figure) is one cell, not a table
        if ys.len() < 3 && xs.len() < 3 {
            return None;
        }

        let mut cells: Vec<Vec<Vec<&Word>>> = vec![vec![Vec::new(); xs.len() - 1]; ys.len() - 1];
        for word in words {
            let row = band_index(&ys, word.center_y());
            let col = band_index(&xs, word.center_x());
            if let (Some(row), Some(col)) = (row, col) {
                cells[row][col].push(word);
            }
        }

        let rows: Vec<Vec<String>> = cells
            .into_iter()
            .map(|row| row.into_iter().map(|mut cell| join_words(&mut cell)).collect::<Vec<_>>())
            .filter(|row: &Vec<String>| row.iter().any(|cell| !cell.is_empty()))
            .collect();

        if rows.is_empty() {
            None
        } else {
            Some(Table::new(rows))
        }
    }
}

impl TableDetector for LatticeDetector {
    fn strategy(&self) -> &'static str {
        STRATEGY_LATTICE
    }

    fn detect(&self, layout: &PageLayout) -> AppResult<Vec<Table>> {
        check_geometry(layout)?;
        if layout.rulings.len() < 4 {
            return Ok(Vec::new());
        }

        Ok(self
            .components(&layout.rulings)
            .iter()
            .filter_map(|group| self.grid_table(group, &layout.words))
            .collect())
    }
}

// ========== Stream ==========

pub struct StreamDetector {
    lines: LineAssembler,
    cell_gap: f32,
    min_cols: usize,
    min_rows: usize,
}

struct Cell {
    text: String,
    x0: f32,
}

impl StreamDetector {
    pub fn new(line_tol: f32, cell_gap: f32, min_cols: usize, min_rows: usize) -> Self {
        Self {
            lines: LineAssembler::new(line_tol),
            cell_gap,
            min_cols: min_cols.max(2),
            min_rows: min_rows.max(1),
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(
            config.line_tol,
            config.stream_cell_gap,
            config.stream_min_cols,
            config.stream_min_rows,
        )
    }

    fn cells(&self, mut line: Vec<&Word>) -> Vec<Cell> {
        line.sort_by(|a, b| a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal));

        let mut cells: Vec<Cell> = Vec::new();
        let mut last_x1 = f32::NEG_INFINITY;
        for word in line {
            match cells.last_mut() {
                Some(cell) if word.x0 - last_x1 <= self.cell_gap => {
                    cell.text.push(' ');
                    cell.text.push_str(&word.text);
                }
                _ => cells.push(Cell {
                    text: word.text.clone(),
                    x0: word.x0,
                }),
            }
            last_x1 = last_x1.max(word.x1);
        }
        cells
    }

    fn build_table(&self, run: &[Vec<Cell>]) -> Option<Table> {
        let widest = run.iter().max_by_key(|cells| cells.len())?;
        let anchors: Vec<f32> = widest.iter().map(|cell| cell.x0).collect();
        let slack = self.cell_gap / 2.0;

        let rows = run
            .iter()
            .map(|cells| {
                let mut row = vec![String::new(); anchors.len()];
                for cell in cells {
                    let col = anchors
                        .iter()
                        .rposition(|anchor| *anchor <= cell.x0 + slack)
                        .unwrap_or(0);
                    if !row[col].is_empty() {
                        row[col].push(' ');
                    }
                    row[col].push_str(&cell.text);
                }
                row
            })
            .collect();

        Some(Table::new(rows))
    }
}

impl TableDetector for StreamDetector {
    fn strategy(&self) -> &'static str {
        STRATEGY_STREAM
    }

    fn detect(&self, layout: &PageLayout) -> AppResult<Vec<Table>> {
        check_geometry(layout)?;

        let mut ordered: Vec<&Word> = layout.words.iter().collect();
        ordered.sort_by(reading_order);
        let ordered: Vec<Word> = ordered.into_iter().cloned().collect();

        let mut tables = Vec::new();
        let mut run: Vec<Vec<Cell>> = Vec::new();
        for line in self.lines.group(&ordered) {
            let cells = self.cells(line);
            if cells.len() >= self.min_cols {
                run.push(cells);
                continue;
            }
            if run.len() >= self.min_rows {
                tables.extend(self.build_table(&run));
            }
            run.clear();
        }
        if run.len() >= self.min_rows {
            tables.extend(self.build_table(&run));
        }

        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(words: Vec<Word>, rulings: Vec<Ruling>) -> PageLayout {
        PageLayout {
            width: 600.0,
            height: 800.0,
            words,
            rulings,
        }
    }

    fn grid(x_edges: &[f32], y_edges: &[f32]) -> Vec<Ruling> {
        let (x0, x1) = (x_edges[0], x_edges[x_edges.len() - 1]);
        let (y0, y1) = (y_edges[0], y_edges[y_edges.len() - 1]);
        let mut rulings: Vec<Ruling> = y_edges.iter().map(|y| Ruling::horizontal(*y, x0, x1)).collect();
        rulings.extend(x_edges.iter().map(|x| Ruling::vertical(*x, y0, y1)));
        rulings
    }

    fn cell_word(text: &str, x: f32, top: f32) -> Word {
        Word {
            text: text.to_string(),
            x0: x,
            x1: x + 30.0,
            top,
            bottom: top + 8.0,
        }
    }

    #[test]
    fn flatten_joins_cells_and_rows() {
        let table = Table::new(vec![
            vec!["Param".into(), "Value".into()],
            vec!["Gain".into(), "12 dB".into()],
        ]);
        assert_eq!(table.shape(), (2, 2));
        assert_eq!(table.flatten(), "Param | Value\nGain | 12 dB");
    }

    #[test]
    fn lattice_reads_words_into_grid_cells() {
        let rulings = grid(&[100.0, 200.0, 300.0], &[100.0, 120.0, 140.0]);
        let words = vec![
            cell_word("Param", 110.0, 106.0),
            cell_word("Value", 210.0, 106.0),
            cell_word("Gain", 110.0, 126.0),
            cell_word("12", 210.0, 126.0),
            cell_word("outside", 400.0, 400.0),
        ];

        let tables = LatticeDetector::new(2.0).detect(&layout(words, rulings)).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].flatten(), "Param | Value\nGain | 12");
    }

    #[test]
    fn lattice_separates_disjoint_grids() {
        let mut rulings = grid(&[50.0, 150.0], &[50.0, 70.0, 90.0]);
        rulings.extend(grid(&[50.0, 150.0], &[500.0, 520.0, 540.0]));
        let words = vec![cell_word("top", 60.0, 56.0), cell_word("bottom", 60.0, 506.0)];

        let tables = LatticeDetector::new(2.0).detect(&layout(words, rulings)).unwrap();
        let flat: Vec<String> = tables.iter().map(Table::flatten).collect();
        assert_eq!(flat, vec!["top", "bottom"]);
    }

    #[test]
    fn bordered_page_is_not_a_table() {
        let rulings = Ruling::from_box(20.0, 20.0, 580.0, 780.0, 2.0);
        let words = vec![
            cell_word("Intro", 50.0, 100.0),
            cell_word("text", 90.0, 100.0),
            cell_word("More", 50.0, 114.0),
            cell_word("prose", 90.0, 114.0),
        ];

        let tables = LatticeDetector::new(2.0).detect(&layout(words, rulings)).unwrap();
        assert!(tables.is_empty());
    }

    #[test]
    fn single_row_grid_is_still_a_table() {
        let rulings = grid(&[100.0, 200.0, 300.0], &[100.0, 120.0]);
        let words = vec![cell_word("Gain", 110.0, 106.0), cell_word("12", 210.0, 106.0)];

        let tables = LatticeDetector::new(2.0).detect(&layout(words, rulings)).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].flatten(), "Gain | 12");
    }

    #[test]
    fn no_rulings_is_empty_not_an_error() {
        let tables = LatticeDetector::new(2.0)
            .detect(&layout(vec![cell_word("text", 10.0, 10.0)], Vec::new()))
            .unwrap();
        assert!(tables.is_empty());
    }

    #[test]
    fn broken_geometry_is_an_error() {
        let mut page = layout(Vec::new(), Vec::new());
        page.width = 0.0;
        assert!(LatticeDetector::new(2.0).detect(&page).is_err());
        assert!(StreamDetector::new(3.0, 12.0, 3, 2).detect(&page).is_err());
    }

    #[test]
    fn stream_finds_aligned_whitespace_columns() {
        let words = vec![
            cell_word("Mode", 50.0, 100.0),
            cell_word("Rate", 200.0, 100.0),
            cell_word("Power", 350.0, 100.0),
            cell_word("Idle", 50.0, 115.0),
            cell_word("0", 200.0, 115.0),
            cell_word("1W", 350.0, 115.0),
            cell_word("Body", 50.0, 200.0),
            cell_word("text", 85.0, 200.0),
        ];

        let tables = StreamDetector::new(3.0, 12.0, 3, 2)
            .detect(&layout(words, Vec::new()))
            .unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].flatten(), "Mode | Rate | Power\nIdle | 0 | 1W");
    }

    #[test]
    fn stream_ignores_plain_two_column_prose() {
        let words = vec![
            cell_word("left", 50.0, 100.0),
            cell_word("words", 85.0, 100.0),
            cell_word("right", 350.0, 100.0),
            cell_word("left", 50.0, 115.0),
            cell_word("right", 350.0, 115.0),
        ];
        let tables = StreamDetector::new(3.0, 12.0, 3, 2)
            .detect(&layout(words, Vec::new()))
            .unwrap();
        assert!(tables.is_empty());
    }

    #[test]
    fn config_order_decides_detector_order() {
        let mut config = ExtractionConfig::default();
        let names: Vec<_> = detectors_from_config(&config).iter().map(|d| d.strategy()).collect();
        assert_eq!(names, vec![STRATEGY_LATTICE, STRATEGY_STREAM]);

        config.table_strategies = vec!["stream".into(), "bogus".into()];
        let names: Vec<_> = detectors_from_config(&config).iter().map(|d| d.strategy()).collect();
        assert_eq!(names, vec![STRATEGY_STREAM]);
    }
}
