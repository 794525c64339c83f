//! A record: an ordered set of cells under one line type.
//!
//! Cells keep the order they were added in. Named cells are also indexed
//! by name, and a name is unique within a line: adding a cell whose name
//! is already present replaces the old cell in place.
//!
//! ## Examples
//!
//! ```rust
//! use flatcell::{Cell, Line};
//!
//! let mut line = Line::new("Person")
//!     .with_cell(Cell::new("First name", "Jonas"))
//!     .with_cell(Cell::new("Last name", "Stenberg"));
//!
//! line.add_cell(Cell::new("Last name", "Svensson"));
//! assert_eq!(line.len(), 2);
//! assert_eq!(line.get_str("Last name"), Some("Svensson"));
//! assert_eq!(line.cell_at(0).and_then(|c| c.name()), Some("First name"));
//! ```

use crate::cell::{Cell, CellValue};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    line_type: String,
    number: Option<usize>,
    cells: Vec<Cell>,
    #[serde(skip)]
    index: IndexMap<String, usize>,
}

impl Line {
    /// Creates an empty line of the given type.
    pub fn new(line_type: impl Into<String>) -> Self {
        Line {
            line_type: line_type.into(),
            number: None,
            cells: Vec::new(),
            index: IndexMap::new(),
        }
    }

    /// Adds a cell, builder style.
    #[must_use]
    pub fn with_cell(mut self, cell: Cell) -> Self {
        self.add_cell(cell);
        self
    }

    /// Adds a cell. A cell with the same name is replaced at its position
    /// and returned.
    pub fn add_cell(&mut self, cell: Cell) -> Option<Cell> {
        if let Some(name) = cell.name() {
            if let Some(&pos) = self.index.get(name) {
                return Some(std::mem::replace(&mut self.cells[pos], cell));
            }
            self.index.insert(name.to_string(), self.cells.len());
        }
        self.cells.push(cell);
        None
    }

    /// Removes a named cell.
    pub fn remove_cell(&mut self, name: &str) -> Option<Cell> {
        let pos = self.index.shift_remove(name)?;
        for p in self.index.values_mut() {
            if *p > pos {
                *p -= 1;
            }
        }
        Some(self.cells.remove(pos))
    }

    #[must_use]
    pub fn line_type(&self) -> &str {
        &self.line_type
    }

    /// The 1-based number of the physical line this record started on,
    /// when the line was parsed.
    #[must_use]
    pub fn number(&self) -> Option<usize> {
        self.number
    }

    pub(crate) fn set_number(&mut self, number: usize) {
        self.number = Some(number);
    }

    #[must_use]
    pub fn cell(&self, name: &str) -> Option<&Cell> {
        self.index.get(name).map(|&pos| &self.cells[pos])
    }

    #[must_use]
    pub fn cell_at(&self, pos: usize) -> Option<&Cell> {
        self.cells.get(pos)
    }

    /// Looks at position `hint` first and falls back to the name index.
    ///
    /// Composing a line parsed with the same schema hits the hint every time.
    #[must_use]
    pub fn cell_hinted(&self, name: &str, hint: usize) -> Option<&Cell> {
        match self.cells.get(hint) {
            Some(cell) if cell.name() == Some(name) => Some(cell),
            _ => self.cell(name),
        }
    }

    /// The value of a named cell.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&CellValue> {
        self.cell(name).map(Cell::value)
    }

    /// The value of a named cell if it holds a string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(CellValue::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.cells.iter()
    }

    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    #[must_use]
    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<'a> IntoIterator for &'a Line {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.iter()
    }
}

impl Extend<Cell> for Line {
    fn extend<T: IntoIterator<Item = Cell>>(&mut self, iter: T) {
        for cell in iter {
            self.add_cell(cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_keeps_position() {
        let mut line = Line::new("P")
            .with_cell(Cell::new("a", 1))
            .with_cell(Cell::new("b", 2));
        let old = line.add_cell(Cell::new("a", 3));
        assert_eq!(old.map(Cell::into_value), Some(CellValue::Integer(1)));
        assert_eq!(line.cell_at(0).map(Cell::value), Some(&CellValue::Integer(3)));
        assert_eq!(line.len(), 2);
    }

    #[test]
    fn test_unnamed_cells_are_appended() {
        let line = Line::new("P")
            .with_cell(Cell::unnamed("x"))
            .with_cell(Cell::unnamed("x"));
        assert_eq!(line.len(), 2);
        assert!(line.cell("x").is_none());
    }

    #[test]
    fn test_hinted_lookup_falls_back_to_name() {
        let line = Line::new("P")
            .with_cell(Cell::new("a", "1"))
            .with_cell(Cell::new("b", "2"));
        assert_eq!(line.cell_hinted("b", 1).and_then(|c| c.value().as_str()), Some("2"));
        assert_eq!(line.cell_hinted("b", 0).and_then(|c| c.value().as_str()), Some("2"));
        assert!(line.cell_hinted("c", 0).is_none());
    }

    #[test]
    fn test_remove_reindexes() {
        let mut line = Line::new("P")
            .with_cell(Cell::new("a", 1))
            .with_cell(Cell::new("b", 2))
            .with_cell(Cell::new("c", 3));
        assert!(line.remove_cell("a").is_some());
        assert_eq!(line.value("c"), Some(&CellValue::Integer(3)));
        assert_eq!(line.cell_at(0).and_then(Cell::name), Some("b"));
    }

    #[test]
    fn test_serialize() {
        let mut line = Line::new("P").with_cell(Cell::new("a", "x"));
        line.set_number(4);
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["line_type"], "P");
        assert_eq!(json["number"], 4);
        assert_eq!(json["cells"][0]["name"], "a");
    }
}
