//! Borderless table detection from text positions.
//!
//! Lines become rows. An x position that several rows start a span at
//! becomes a column edge. A run of consecutive rows that keep to those
//! edges is a table. Ruling lines are never consulted.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use super::layout::TextSpan;
use crate::model::Grid;

/// Left edges closer than this (points) vote for the same column.
const EDGE_SLACK: f32 = 5.0;

/// A span may start this far (points) left of its column edge.
const CELL_SLACK: f32 = 10.0;

/// Table detector configuration.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Fewest rows a table may have
    pub min_rows: usize,
    /// Fewest columns a table may have
    pub min_columns: usize,
    /// More columns than this is word spacing, not a table
    pub max_columns: usize,
    /// Baseline distance, as a fraction of font size, that still counts as one row
    pub row_tolerance: f32,
    /// Share of a row's spans (0.0-1.0) that must sit on a column edge
    pub min_alignment: f32,
    /// Narrowest gap between two column edges (points)
    pub min_column_gap: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            row_tolerance: 0.4,
            min_alignment: 0.3,
            min_column_gap: 15.0,
        }
    }
}

/// Finds tables among the spans of one page.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

/// Spans sharing a baseline, left to right.
#[derive(Debug)]
struct Row<'s> {
    spans: Vec<&'s TextSpan>,
}

impl<'s> Row<'s> {
    fn alignment(&self, edges: &[f32]) -> f32 {
        if self.spans.is_empty() || edges.is_empty() {
            return 0.0;
        }
        let on_edge = self
            .spans
            .iter()
            .filter(|s| edges.iter().any(|e| (s.x - e).abs() <= EDGE_SLACK))
            .count();
        on_edge as f32 / self.spans.len() as f32
    }

    fn cells(&self, edges: &[f32]) -> Vec<String> {
        let mut cells: Vec<Vec<&str>> = vec![Vec::new(); edges.len()];
        for span in &self.spans {
            cells[column_of(span.x, edges)].push(span.text.trim());
        }
        cells.into_iter().map(|parts| parts.join(" ")).collect()
    }

    fn marker(&self) -> Marker {
        self.spans
            .first()
            .map_or(Marker::None, |span| Marker::classify(&span.text))
    }
}

impl TableDetector {
    /// Detector with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector with custom settings.
    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Tables found among `spans`, top of the page first, each as rows of
    /// cell strings. Every row of a grid has the same number of cells.
    pub fn detect(&self, spans: &[TextSpan]) -> Vec<Grid> {
        let cfg = &self.config;
        if spans.len() < cfg.min_rows * cfg.min_columns {
            return Vec::new();
        }

        let rows = self.rows(spans);
        if rows.len() < cfg.min_rows {
            return Vec::new();
        }

        let page_edges = self.column_edges(&rows);
        if page_edges.len() < cfg.min_columns {
            return Vec::new();
        }

        let mut grids = Vec::new();
        for run in self.aligned_runs(&rows, &page_edges) {
            let region = &rows[run];
            let edges = self.column_edges(region);

            if !(cfg.min_columns..=cfg.max_columns).contains(&edges.len()) {
                log::debug!("Table candidate dropped: {} column edges", edges.len());
                continue;
            }
            if looks_like_list(region, &edges) {
                log::debug!("Table candidate dropped: rows start with list markers");
                continue;
            }

            grids.push(region.iter().map(|row| row.cells(&edges)).collect());
        }

        grids
    }

    fn rows<'s>(&self, spans: &'s [TextSpan]) -> Vec<Row<'s>> {
        let mut sorted: Vec<&TextSpan> = spans.iter().collect();
        sorted.sort_by(|a, b| {
            b.y.partial_cmp(&a.y)
                .unwrap_or(Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        });

        let mut rows: Vec<Row<'s>> = Vec::new();
        let mut baseline = f32::NAN;
        for span in sorted {
            let tolerance = span.font_size * self.config.row_tolerance;
            if let Some(row) = rows.last_mut() {
                if (span.y - baseline).abs() <= tolerance {
                    row.spans.push(span);
                    continue;
                }
            }
            baseline = span.y;
            rows.push(Row { spans: vec![span] });
        }

        for row in &mut rows {
            row.spans
                .sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
        }
        rows
    }

    /// Left edges shared by enough rows, merged when closer than the gap.
    ///
    /// Single-span rows only vote when too few rows have several spans.
    fn column_edges(&self, rows: &[Row<'_>]) -> Vec<f32> {
        let multi: Vec<&Row<'_>> = rows.iter().filter(|r| r.spans.len() > 1).collect();
        let voters: Vec<&Row<'_>> = if multi.len() >= self.config.min_rows {
            multi
        } else {
            rows.iter().collect()
        };
        if voters.is_empty() {
            return Vec::new();
        }

        let mut votes: BTreeMap<i32, usize> = BTreeMap::new();
        for row in &voters {
            let slots: BTreeSet<i32> = row
                .spans
                .iter()
                .map(|s| (s.x / EDGE_SLACK).round() as i32)
                .collect();
            for slot in slots {
                *votes.entry(slot).or_default() += 1;
            }
        }

        let quorum = ((voters.len() as f32 * self.config.min_alignment) as usize).max(2);
        let mut edges: Vec<f32> = Vec::new();
        for (slot, count) in votes {
            if count < quorum {
                continue;
            }
            let x = slot as f32 * EDGE_SLACK;
            if edges
                .last()
                .map_or(true, |last| x - last >= self.config.min_column_gap)
            {
                edges.push(x);
            }
        }
        edges
    }

    /// Maximal runs of consecutive rows aligned with `edges`.
    fn aligned_runs(&self, rows: &[Row<'_>], edges: &[f32]) -> Vec<Range<usize>> {
        let mut runs = Vec::new();
        let mut start = None;

        for (i, row) in rows.iter().enumerate() {
            let aligned = row.alignment(edges) >= self.config.min_alignment;
            match (aligned, start) {
                (true, None) => start = Some(i),
                (false, Some(s)) => {
                    runs.push(s..i);
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = start {
            runs.push(s..rows.len());
        }

        runs.retain(|run| run.len() >= self.config.min_rows);
        runs
    }
}

/// Column whose edge `x` falls at or after, allowing some slack.
fn column_of(x: f32, edges: &[f32]) -> usize {
    edges
        .iter()
        .rposition(|edge| x >= edge - CELL_SLACK)
        .unwrap_or(0)
}

/// Leading token of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    None,
    Bullet,
    Ordinal,
}

impl Marker {
    fn classify(text: &str) -> Self {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Marker::None;
        }

        const BULLETS: &[&str] = &[
            "-", "–", "—", "•", "·", "*", "○", "▪", "◦", "▸", "►", "■", "●", "※", "□", "◆", "▶",
            "➤",
        ];
        if BULLETS.contains(&compact.as_str()) {
            return Marker::Bullet;
        }

        if compact.chars().all(|c| c.is_ascii_digit()) {
            return Marker::Ordinal;
        }
        let body = match compact.strip_suffix('.').or_else(|| compact.strip_suffix(')')) {
            Some(body) if !body.is_empty() => body,
            _ => return Marker::None,
        };
        let mut chars = body.chars();
        let single_letter = matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic());
        if body.chars().all(|c| c.is_ascii_digit()) || single_letter {
            Marker::Ordinal
        } else {
            Marker::None
        }
    }
}

/// Marker-led rows split into a marker column and a text column, which
/// reads as a table but is a list.
///
/// Numbered first columns are common in real tables, so ordinals only
/// disqualify two-column regions.
fn looks_like_list(rows: &[Row<'_>], edges: &[f32]) -> bool {
    if rows.is_empty() || edges.len() < 2 {
        return false;
    }
    let markers: Vec<Marker> = rows.iter().map(Row::marker).collect();
    let share = |pred: fn(&Marker) -> bool| {
        markers.iter().filter(|m| pred(m)).count() as f32 / rows.len() as f32
    };

    share(|m| *m == Marker::Bullet) >= 0.5
        || (edges.len() == 2 && share(|m| *m != Marker::None) >= 0.5)
}
