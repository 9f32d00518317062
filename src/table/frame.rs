use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::table::Predicate;

struct Columns {
    names: Vec<String>,
    positions: HashMap<String, usize>,
    cells: Vec<Vec<String>>,
}

impl Columns {
    fn position(&self, name: &str) -> Result<usize> {
        self.positions
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }
}

/// Immutable columnar table. Clones share storage; every transformation
/// returns a new frame over a new row selection.
#[derive(Clone)]
pub struct Frame {
    columns: Arc<Columns>,
    rows: Arc<[usize]>,
}

impl Frame {
    pub fn from_columns(names: Vec<String>, cells: Vec<Vec<String>>) -> Result<Frame> {
        if names.len() != cells.len() {
            return Err(Error::Shape(format!(
                "{} column names for {} columns",
                names.len(),
                cells.len()
            )));
        }
        let height = cells.first().map(Vec::len).unwrap_or(0);
        if let Some((name, column)) = names.iter().zip(&cells).find(|(_, c)| c.len() != height) {
            return Err(Error::Shape(format!(
                "column '{name}' has {} rows, expected {height}",
                column.len()
            )));
        }
        let mut positions = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if positions.insert(name.clone(), position).is_some() {
                return Err(Error::Shape(format!("duplicated column '{name}'")));
            }
        }
        Ok(Frame {
            columns: Arc::new(Columns {
                names,
                positions,
                cells,
            }),
            rows: (0..height).collect(),
        })
    }

    pub fn from_rows<I>(names: Vec<String>, rows: I) -> Result<Frame>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != names.len() {
                return Err(Error::Shape(format!(
                    "row {index} has {} cells, expected {}",
                    row.len(),
                    names.len()
                )));
            }
            for (column, cell) in cells.iter_mut().zip(row) {
                column.push(cell);
            }
        }
        Frame::from_columns(names, cells)
    }

    pub fn empty(names: Vec<String>) -> Result<Frame> {
        let cells = vec![Vec::new(); names.len()];
        Frame::from_columns(names, cells)
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.positions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<Row<'_>> {
        self.rows.get(index).map(|&physical| Row {
            columns: &self.columns,
            physical,
        })
    }

    pub fn rows(&self) -> impl DoubleEndedIterator<Item = Row<'_>> + ExactSizeIterator + '_ {
        self.rows.iter().map(|&physical| Row {
            columns: &self.columns,
            physical,
        })
    }

    /// Values of one column over the selected rows.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &str> + '_> {
        let cells = &self.columns.cells[self.columns.position(name)?];
        Ok(self.rows.iter().map(move |&physical| cells[physical].as_str()))
    }

    pub fn filter(&self, predicate: &Predicate) -> Result<Frame> {
        let mut kept = Vec::new();
        for (row, &physical) in self.rows().zip(self.rows.iter()) {
            if predicate.evaluate(&row)? {
                kept.push(physical);
            }
        }
        Ok(self.with_rows(kept))
    }

    /// Rows `offset..offset + len`, clamped to the frame.
    pub fn slice(&self, offset: usize, len: usize) -> Frame {
        let start = offset.min(self.rows.len());
        let end = start.saturating_add(len).min(self.rows.len());
        self.with_rows(self.rows[start..end].to_vec())
    }

    pub fn reverse(&self) -> Frame {
        self.with_rows(self.rows.iter().rev().copied().collect())
    }

    /// The `n` rows with the greatest integer `by` value; ties go to the
    /// smaller `tie` value. Null `by` values rank last.
    pub fn top_k(&self, n: usize, by: &str, tie: &str) -> Result<Frame> {
        let by_cells = &self.columns.cells[self.columns.position(by)?];
        let tie_cells = &self.columns.cells[self.columns.position(tie)?];
        let mut ranked = Vec::with_capacity(self.rows.len());
        for &physical in self.rows.iter() {
            let key = parse_nullable(by, &by_cells[physical])?;
            let tie_key = parse_nullable(tie, &tie_cells[physical])?;
            ranked.push((key, tie_key, physical));
        }
        ranked.sort_by(|a, b| match (a.0, b.0) {
            (Some(x), Some(y)) => y.cmp(&x).then(a.1.cmp(&b.1)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.1.cmp(&b.1),
        });
        ranked.truncate(n);
        Ok(self.with_rows(ranked.into_iter().map(|(_, _, physical)| physical).collect()))
    }

    /// Copies the selected rows of the named columns into a new frame.
    pub fn select_columns(&self, names: &[&str]) -> Result<Frame> {
        let mut cells = Vec::with_capacity(names.len());
        for name in names {
            cells.push(self.column(name)?.map(str::to_string).collect());
        }
        Frame::from_columns(names.iter().map(|name| name.to_string()).collect(), cells)
    }

    /// Whether any selected row has `value` in `column`.
    pub fn any_equals(&self, column: &str, value: &str) -> Result<bool> {
        Ok(self.column(column)?.any(|cell| cell == value))
    }

    /// Distinct values of `column` that appear in `candidates`.
    pub fn intersect(&self, column: &str, candidates: &HashSet<String>) -> Result<HashSet<String>> {
        Ok(self
            .column(column)?
            .filter(|cell| candidates.contains(*cell))
            .map(str::to_string)
            .collect())
    }

    fn with_rows(&self, rows: Vec<usize>) -> Frame {
        Frame {
            columns: Arc::clone(&self.columns),
            rows: rows.into(),
        }
    }
}

pub(crate) fn parse_nullable(column: &str, value: &str) -> Result<Option<i64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|e| Error::decode(column, value, e))
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("columns", &self.columns.names)
            .field("rows", &self.rows.len())
            .finish()
    }
}

/// Borrowed view of one row.
#[derive(Clone, Copy)]
pub struct Row<'a> {
    columns: &'a Columns,
    physical: usize,
}

impl<'a> Row<'a> {
    pub fn get(&self, column: &str) -> Result<&'a str> {
        let position = self.columns.position(column)?;
        Ok(self.columns.cells[position][self.physical].as_str())
    }

    /// Cells in column order.
    pub fn values(&self) -> impl Iterator<Item = &'a str> + 'a {
        let physical = self.physical;
        self.columns.cells.iter().map(move |column| column[physical].as_str())
    }
}
