//! Table types.
//!
//! Extracted tables are kept as raw [`Grid`]s. Translated tables come back
//! from the service as free text and are rebuilt into a [`TableGrid`] with a
//! header row and rectangular data rows.

use serde::Serialize;

use crate::error::{Error, Result};

/// A raw extracted table: rows of cell strings.
pub type Grid = Vec<Vec<String>>;

/// Column delimiter used in table prompts and replies.
pub const CELL_DELIMITER: char = '|';

/// A rectangular table with one header row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableGrid {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableGrid {
    /// Create a table, checking that every row has as many cells as the header.
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != header.len())
        {
            return Err(Error::TableReconstruction(format!(
                "row {} has {} cells, header has {}",
                idx + 1,
                row.len(),
                header.len()
            )));
        }
        Ok(Self { header, rows })
    }

    /// Rebuild a table from a delimited reply such as `"A | B\n1 | 2"`.
    ///
    /// Rows are split on newlines and cells on `|`. Cells are trimmed and
    /// empty cells dropped, so leading and trailing pipes are harmless. The
    /// first row becomes the header. Blank lines are skipped, and so is a
    /// Markdown separator row (`|---|:--:|`) directly under the header. A
    /// dash-only row anywhere else is data.
    pub fn parse_delimited(reply: &str) -> Result<Self> {
        let trimmed = reply.trim();
        if trimmed.is_empty() {
            return Err(Error::TableReconstruction("empty reply".to_string()));
        }

        let mut parsed: Vec<Vec<String>> = trimmed
            .lines()
            .map(|line| {
                line.split(CELL_DELIMITER)
                    .map(str::trim)
                    .filter(|cell| !cell.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            })
            .filter(|cells| !cells.is_empty())
            .collect();

        if parsed.is_empty() {
            return Err(Error::TableReconstruction(
                "reply contains no table rows".to_string(),
            ));
        }

        let header = parsed.remove(0);
        if parsed.first().is_some_and(|row| is_separator_row(row)) {
            parsed.remove(0);
        }
        Self::new(header, parsed)
    }

    /// Column headers.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Data rows (header excluded).
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.header.len()
    }

    /// Number of data rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// A table with no columns or no data rows has nothing worth rendering.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty() || self.rows.is_empty()
    }
}

fn is_separator_row(cells: &[String]) -> bool {
    cells
        .iter()
        .all(|c| c.contains('-') && c.chars().all(|ch| matches!(ch, '-' | ':')))
}

/// Render raw grids as prompt text: one row per line, cells joined by ` | `.
pub fn grids_to_text(grids: &[Grid]) -> String {
    grids
        .iter()
        .flat_map(|grid| grid.iter())
        .map(|row| row.join(" | "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_basic_reply() {
        let grid = TableGrid::parse_delimited("A | B\n1 | 2\n3 | 4").unwrap();
        assert_eq!(grid.header(), strings(&["A", "B"]).as_slice());
        assert_eq!(
            grid.rows(),
            &[strings(&["1", "2"]), strings(&["3", "4"])]
        );
        assert_eq!(grid.column_count(), 2);
        assert_eq!(grid.row_count(), 2);
    }

    #[test]
    fn test_parse_markdown_style_reply() {
        let reply = "\n| Name | Age |\n|------|:---:|\n| Alice | 30 |\n\n| Bob | 25 |\n";
        let grid = TableGrid::parse_delimited(reply).unwrap();
        assert_eq!(grid.header(), strings(&["Name", "Age"]).as_slice());
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.rows()[1], strings(&["Bob", "25"]));
    }

    #[test]
    fn test_parse_crlf_reply() {
        let grid = TableGrid::parse_delimited("H1 | H2\r\nA | B\r\n").unwrap();
        assert_eq!(grid.rows(), &[strings(&["A", "B"])]);
    }

    #[test]
    fn test_parse_ragged_reply_fails() {
        let err = TableGrid::parse_delimited("A | B\n1 | 2 | 3").unwrap_err();
        assert!(matches!(err, Error::TableReconstruction(_)));
    }

    #[test]
    fn test_parse_empty_reply_fails() {
        assert!(TableGrid::parse_delimited("").is_err());
        assert!(TableGrid::parse_delimited("  \n | | \n").is_err());
    }

    #[test]
    fn test_header_only_is_empty() {
        let grid = TableGrid::parse_delimited("A | B").unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.column_count(), 2);
    }

    #[test]
    fn test_dash_data_rows_are_kept() {
        let grid = TableGrid::parse_delimited("A | B\n--- | ---\n1 | 2\n- | -").unwrap();
        assert_eq!(
            grid.rows(),
            &[strings(&["1", "2"]), strings(&["-", "-"])]
        );

        let grid = TableGrid::parse_delimited("A | B\n1 | 2\n--- | ---").unwrap();
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.rows()[1], strings(&["---", "---"]));
    }

    #[test]
    fn test_separator_detection() {
        assert!(is_separator_row(&strings(&["---", ":--:", "--"])));
        assert!(!is_separator_row(&strings(&["---", "x"])));
        assert!(!is_separator_row(&strings(&[":"])));
    }

    #[test]
    fn test_grids_to_text() {
        let grids = vec![
            vec![strings(&["H1", "H2"]), strings(&["a", "b"])],
            vec![strings(&["x", "y"])],
        ];
        assert_eq!(grids_to_text(&grids), "H1 | H2\na | b\nx | y");
    }
}
