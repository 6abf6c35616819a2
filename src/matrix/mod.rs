//! The encoder's internal matrix representation.
//!
//! A matrix is a vector of rows, each row a sorted vector of [`Cell`]s. A
//! cell is either a plain `(column, value)` non-zero or a pattern anchor
//! carrying a descriptor and the covered values, so a cell owns its values
//! outright. Row vectors are ordinary growable arrays:
//! push-back and pop-last are O(1), which the block re-encoder relies on
//! when it annexes the singleton preceding a detected block.
//!
//! The matrix owns a current [`IterationOrder`]; `transform` re-labels every
//! cell (pattern anchors included) into another order's coordinate space and
//! re-sorts, so that plain row-major iteration walks the alternate order.

pub mod transform;

pub use transform::{IterationOrder, ENUMERATION};

use crate::error::CsxError;

/// A recognized geometric run anchored at one cell.
///
/// For linear kinds `delta` is the stride between successive cells; for
/// block kinds it is the block's extent in the non-aligned dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternDescriptor {
    pub order: IterationOrder,
    pub delta: u64,
    pub size: u64,
}

impl PatternDescriptor {
    /// The cells covered by this pattern, in value order, given the anchor's
    /// position in horizontal space.
    pub fn cells(&self, row: u64, col: u64) -> Vec<(u64, u64)> {
        let d = self.delta;
        (0..self.size)
            .map(|i| match self.order {
                IterationOrder::Horizontal => (row, col + i * d),
                IterationOrder::Vertical => (row + i * d, col),
                IterationOrder::Diagonal => (row + i * d, col + i * d),
                IterationOrder::AntiDiagonal => (row + i * d, col - i * d),
                IterationOrder::BlockRow(k) => {
                    let k = k as u64;
                    (row + i % k, col + i / k)
                }
                IterationOrder::BlockCol(k) => {
                    let k = k as u64;
                    (row + i / k, col + i % k)
                }
            })
            .collect()
    }

    /// The column a decoder's cursor rests on after consuming this unit,
    /// given the anchor column. Only cells on the anchor's own row count.
    pub fn last_col_on_anchor_row(&self, col: u64) -> u64 {
        match self.order {
            IterationOrder::Horizontal => col + self.delta * (self.size - 1),
            IterationOrder::Vertical
            | IterationOrder::Diagonal
            | IterationOrder::AntiDiagonal => col,
            IterationOrder::BlockRow(k) => col + self.size / k as u64 - 1,
            IterationOrder::BlockCol(k) => col + k as u64 - 1,
        }
    }

    /// How many rows below the anchor this pattern touches.
    pub fn row_span(&self) -> u64 {
        match self.order {
            IterationOrder::Horizontal => 0,
            IterationOrder::Vertical
            | IterationOrder::Diagonal
            | IterationOrder::AntiDiagonal => (self.size - 1) * self.delta,
            IterationOrder::BlockRow(k) => k as u64 - 1,
            IterationOrder::BlockCol(k) => self.size / k as u64 - 1,
        }
    }
}

/// One non-zero entry of a row: a singleton or a pattern anchor.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Plain {
        col: u64,
        val: f64,
    },
    Patterned {
        col: u64,
        pattern: PatternDescriptor,
        vals: Vec<f64>,
    },
}

impl Cell {
    pub fn col(&self) -> u64 {
        match *self {
            Cell::Plain { col, .. } | Cell::Patterned { col, .. } => col,
        }
    }

    fn set_col(&mut self, new_col: u64) {
        match self {
            Cell::Plain { col, .. } | Cell::Patterned { col, .. } => *col = new_col,
        }
    }

    /// Number of matrix non-zeros this cell accounts for.
    pub fn size(&self) -> u64 {
        match *self {
            Cell::Plain { .. } => 1,
            Cell::Patterned { ref pattern, .. } => pattern.size,
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(*self, Cell::Plain { .. })
    }
}

/// The mutable matrix handle the encoder owns during a pass.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    pub nr_rows: u64,
    pub nr_cols: u64,
    pub nr_nonzeros: u64,
    /// Global index of this partition's first row.
    pub row_start: u64,
    pub order: IterationOrder,
    rows: Vec<Vec<Cell>>,
}

impl SparseMatrix {
    /// Builds a matrix from a sequence of 1-based `(row, column, value)`
    /// non-zero entries. Entries need not be sorted; duplicates are not
    /// checked.
    pub fn from_triplets(
        nr_rows: u64,
        nr_cols: u64,
        triplets: &[(u64, u64, f64)],
    ) -> Result<Self, CsxError> {
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); nr_rows as usize];
        for &(r, c, v) in triplets {
            if r < 1 || r > nr_rows || c < 1 || c > nr_cols {
                return Err(CsxError::Internal(format!(
                    "entry ({r}, {c}) outside a {nr_rows}x{nr_cols} matrix"
                )));
            }
            rows[(r - 1) as usize].push(Cell::Plain { col: c, val: v });
        }
        for row in &mut rows {
            row.sort_by_key(Cell::col);
        }
        Ok(SparseMatrix {
            nr_rows,
            nr_cols,
            nr_nonzeros: triplets.len() as u64,
            row_start: 0,
            order: IterationOrder::Horizontal,
            rows,
        })
    }

    /// Number of logical rows in the current order's coordinate space.
    pub fn nr_transformed_rows(&self) -> u64 {
        self.rows.len() as u64
    }

    pub fn row(&self, idx: u64) -> &[Cell] {
        &self.rows[idx as usize]
    }

    /// Moves row `idx`'s cells out, leaving it empty.
    pub(crate) fn take_row(&mut self, idx: u64) -> Vec<Cell> {
        std::mem::take(&mut self.rows[idx as usize])
    }

    /// Replaces the cells of row `idx`. The caller is responsible for
    /// keeping the total non-zero count intact.
    pub fn replace_row(&mut self, idx: u64, cells: Vec<Cell>) {
        self.rows[idx as usize] = cells;
    }

    /// Re-labels every cell into `target`'s coordinate space and re-sorts.
    /// Pattern anchors move with their cell; the covered geometry stays
    /// attached to the descriptor.
    pub fn transform(&mut self, target: IterationOrder) {
        if self.order == target {
            return;
        }
        let source = self.order;
        let (dim_rows, _) = target.transformed_dims(self.nr_rows, self.nr_cols);
        let mut new_rows: Vec<Vec<Cell>> = vec![Vec::new(); dim_rows as usize];
        for (idx, row) in self.rows.drain(..).enumerate() {
            let tr = idx as u64 + 1;
            for mut cell in row {
                let (hr, hc) = source.unmap_point(self.nr_cols, tr, cell.col());
                let (nr, nc) = target.map_point(self.nr_cols, hr, hc);
                cell.set_col(nc);
                new_rows[(nr - 1) as usize].push(cell);
            }
        }
        for row in &mut new_rows {
            row.sort_by_key(Cell::col);
        }
        self.rows = new_rows;
        self.order = target;
    }

    /// Expands every cell (patterns included) into 1-based horizontal-space
    /// triples. The matrix must currently be in horizontal order.
    pub fn triplets(&self) -> Vec<(u64, u64, f64)> {
        debug_assert_eq!(self.order, IterationOrder::Horizontal);
        let mut out = Vec::with_capacity(self.nr_nonzeros as usize);
        for (idx, row) in self.rows.iter().enumerate() {
            let r = idx as u64 + 1;
            for cell in row {
                match cell {
                    Cell::Plain { col, val } => out.push((r, *col, *val)),
                    Cell::Patterned { col, pattern, vals } => {
                        for (pos, &v) in pattern.cells(r, *col).iter().zip(vals.iter()) {
                            out.push((pos.0, pos.1, v));
                        }
                    }
                }
            }
        }
        out
    }

    /// Count of plain (singleton) cells across all rows.
    pub fn nr_singletons(&self) -> u64 {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| cell.is_plain())
            .count() as u64
    }
}
