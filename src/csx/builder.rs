//! The ctl stream builder: consumes a re-encoded matrix row by row and
//! serializes singleton runs and pattern descriptors into the CSX byte
//! stream, value array, and flag map.
//!
//! Ctl rules:
//! 1. Each unit leaves the column cursor at the last element it produced on
//!    the current row.
//! 2. A unit's size byte is the number of values it consumes.
//!
//! Row changes are deferred: empty rows only bump a counter, and the next
//! non-empty row's first unit carries the new-row bit plus, when rows were
//! skipped, the row-jump varint.

use std::collections::BTreeMap;

use log::trace;

use crate::csx::{
    delta_unit_id, delta_width, pattern_id, CsxMatrix, CsxSymMatrix, RowInfo, UnitKind,
    CTL_FLAG_MASK, CTL_NR_MASK, CTL_PATTERNS_MAX, CTL_RJMP_MASK, CTL_SIZE_MAX, PID_DELTA_MASK,
};
use crate::error::CsxError;
use crate::kernels::{delta, leb128};
use crate::matrix::{Cell, IterationOrder, PatternDescriptor, SparseMatrix};

/// Bookkeeping for one distinct pattern identity.
#[derive(Debug, Clone, Copy)]
struct PatInfo {
    flag: u8,
    npatterns: u64,
    nnz: u64,
}

/// Builds the CSX serialization of one matrix. Single-use: `build` (or
/// `build_sym`) consumes the builder and hands ownership of the buffers to
/// the returned matrix.
pub struct CsxBuilder<'a> {
    matrix: &'a SparseMatrix,
    ctl: Vec<u8>,
    values: Vec<f64>,
    patterns: BTreeMap<UnitKind, PatInfo>,
    flag_avail: u8,
    last_col: u64,
    new_row: bool,
    empty_rows: u64,
    row_jumps: bool,
    row_info: Vec<RowInfo>,
    span: u64,
}

impl<'a> CsxBuilder<'a> {
    /// The matrix must be in horizontal order (the driver always transforms
    /// back after an encoding pass).
    pub fn new(matrix: &'a SparseMatrix) -> Self {
        debug_assert_eq!(matrix.order, IterationOrder::Horizontal);
        CsxBuilder {
            matrix,
            // Greedy initial capacity to avoid regrowth on dense streams.
            ctl: Vec::with_capacity(6 * matrix.nr_nonzeros as usize),
            values: Vec::with_capacity(matrix.nr_nonzeros as usize),
            patterns: BTreeMap::new(),
            flag_avail: 0,
            last_col: 0,
            new_row: false,
            empty_rows: 0,
            row_jumps: false,
            row_info: Vec::with_capacity(matrix.nr_rows as usize),
            span: 0,
        }
    }

    /// Serializes the whole matrix.
    pub fn build(mut self) -> Result<CsxMatrix, CsxError> {
        let matrix = self.matrix;
        let mut xs: Vec<u64> = Vec::new();

        for i in 0..matrix.nr_rows {
            let row = matrix.row(i);
            if row.is_empty() {
                self.skip_empty_row();
                continue;
            }

            let info = RowInfo {
                ctl_offset: self.ctl.len(),
                values_offset: self.values.len(),
                span: 0,
            };
            self.row_info.push(info);
            self.do_row(row, &mut xs, |_| true)?;
            self.row_info[i as usize].span = self.span;
            self.new_row = true;
        }

        self.finalize()
    }

    /// Serializes a lower-triangle partition of a symmetric matrix, with its
    /// separated diagonal. Each row is walked twice through the same
    /// row-walker: first the columns before this partition's diagonal block,
    /// then the rest.
    pub fn build_sym(mut self, diagonal: Vec<f64>) -> Result<CsxSymMatrix, CsxError> {
        let matrix = self.matrix;
        let split = matrix.row_start + 1;
        let mut xs: Vec<u64> = Vec::new();

        for i in 0..matrix.nr_rows {
            let row = matrix.row(i);
            if row.is_empty() {
                self.skip_empty_row();
                continue;
            }

            let info = RowInfo {
                ctl_offset: self.ctl.len(),
                values_offset: self.values.len(),
                span: 0,
            };
            self.row_info.push(info);
            self.do_row(row, &mut xs, |col| col < split)?;
            self.walk(row, &mut xs, |col| col >= split)?;
            self.row_info[i as usize].span = self.span;
            self.new_row = true;
        }

        Ok(CsxSymMatrix {
            dvalues: diagonal,
            lower: self.finalize()?,
        })
    }

    fn skip_empty_row(&mut self) {
        self.new_row = true;
        self.empty_rows += 1;
        let prev_offset = self.row_info.last().map(|ri| ri.ctl_offset).unwrap_or(0);
        self.row_info.push(RowInfo {
            ctl_offset: prev_offset,
            values_offset: 0,
            span: 0,
        });
    }

    fn finalize(self) -> Result<CsxMatrix, CsxError> {
        if self.values.len() as u64 != self.matrix.nr_nonzeros {
            return Err(CsxError::Internal(format!(
                "value cursor at {} of {} at finalization",
                self.values.len(),
                self.matrix.nr_nonzeros
            )));
        }

        let mut id_map = [-1i64; CTL_PATTERNS_MAX + 1];
        for (&kind, info) in &self.patterns {
            let id = match kind {
                UnitKind::Delta { width } => delta_unit_id(width),
                UnitKind::Pattern { order, delta } => pattern_id(order, delta),
            };
            id_map[info.flag as usize] = id as i64;
            trace!(
                "flag {} -> pattern {} ({} instances, {} nnz)",
                info.flag,
                id,
                info.npatterns,
                info.nnz
            );
        }

        Ok(CsxMatrix {
            nnz: self.matrix.nr_nonzeros,
            nr_rows: self.matrix.nr_rows,
            nr_cols: self.matrix.nr_cols,
            row_start: self.matrix.row_start,
            row_jumps: self.row_jumps,
            ctl: self.ctl,
            values: self.values,
            id_map,
            row_info: self.row_info,
        })
    }

    /// Serializes one row: resets the column cursor and row span, then walks
    /// the cells admitted by `included`.
    fn do_row<F>(&mut self, row: &'a [Cell], xs: &mut Vec<u64>, included: F) -> Result<(), CsxError>
    where
        F: Fn(u64) -> bool,
    {
        self.last_col = 0;
        self.span = 0;
        self.walk(row, xs, included)
    }

    /// The row walker: gathers singleton columns until a pattern anchor (or
    /// the unit size cap) forces a flush.
    fn walk<F>(&mut self, row: &'a [Cell], xs: &mut Vec<u64>, included: F) -> Result<(), CsxError>
    where
        F: Fn(u64) -> bool,
    {
        for cell in row {
            if !included(cell.col()) {
                continue;
            }
            match cell {
                Cell::Patterned { col, pattern, vals } => {
                    if !xs.is_empty() {
                        self.add_xs(xs)?;
                    }
                    self.span = self.span.max(pattern.row_span());
                    self.add_pattern(*col, pattern)?;
                    self.values.extend_from_slice(vals);
                }
                Cell::Plain { col, val } => {
                    if xs.len() == CTL_SIZE_MAX {
                        self.add_xs(xs)?;
                    }
                    xs.push(*col);
                    self.values.push(*val);
                }
            }
        }
        if !xs.is_empty() {
            self.add_xs(xs)?;
        }
        Ok(())
    }

    /// Returns the 6-bit flag for a unit identity, assigning the next free
    /// one on first encounter.
    fn get_flag(&mut self, kind: UnitKind, nnz: u64) -> Result<u8, CsxError> {
        if let Some(info) = self.patterns.get_mut(&kind) {
            info.npatterns += 1;
            info.nnz += nnz;
            return Ok(info.flag);
        }

        let flag = self.flag_avail;
        if flag as usize > CTL_PATTERNS_MAX {
            return Err(CsxError::TooManyPatterns(CTL_PATTERNS_MAX + 1));
        }
        self.flag_avail += 1;
        self.patterns.insert(
            kind,
            PatInfo {
                flag,
                npatterns: 1,
                nnz,
            },
        );
        Ok(flag)
    }

    /// Stamps the deferred row-change markers onto a freshly written flags
    /// byte, appending the row-jump varint when rows were skipped.
    fn update_new_row(&mut self, flags_idx: usize) {
        if !self.new_row {
            return;
        }
        self.ctl[flags_idx] |= CTL_NR_MASK;
        self.new_row = false;
        if self.empty_rows != 0 {
            self.ctl[flags_idx] |= CTL_RJMP_MASK;
            leb128::encode_one(self.empty_rows + 1, &mut self.ctl);
            self.empty_rows = 0;
            self.row_jumps = true;
        }
    }

    /// Pads the ctl buffer up to a multiple of `width` bytes.
    fn align_to(&mut self, width: usize) {
        while self.ctl.len() % width != 0 {
            self.ctl.push(0);
        }
    }

    /// Emits one singleton-run unit: flags, size, deferred row markers, the
    /// column jump, and the delta payload at its chosen width.
    fn add_xs(&mut self, xs: &mut Vec<u64>) -> Result<(), CsxError> {
        let xs_size = xs.len();
        if xs_size > CTL_SIZE_MAX {
            return Err(CsxError::UnitTooLarge(xs_size));
        }

        let last_col = *xs.last().ok_or_else(|| {
            CsxError::Internal("singleton flush on an empty buffer".to_string())
        })?;
        delta::encode_from(self.last_col, xs);
        self.last_col = last_col;

        // The leading element is the column jump, not a delta; the payload
        // width is chosen from the remaining elements only.
        let max_delta = xs[1..].iter().copied().max().unwrap_or(0);
        let width = delta_width(max_delta);
        let flag = self.get_flag(UnitKind::Delta { width }, xs_size as u64)?;
        debug_assert_eq!(flag & !CTL_FLAG_MASK, 0);

        let flags_idx = self.ctl.len();
        self.ctl.push(flag);
        self.ctl.push(xs_size as u8);
        self.update_new_row(flags_idx);
        leb128::encode_one(xs[0], &mut self.ctl);

        if xs_size > 1 {
            self.align_to(width);
            match width {
                1 => {
                    for &d in &xs[1..] {
                        self.ctl.push(d as u8);
                    }
                }
                2 => {
                    let payload: Vec<u16> = xs[1..].iter().map(|&d| d as u16).collect();
                    self.ctl.extend_from_slice(bytemuck::cast_slice(&payload));
                }
                4 => {
                    let payload: Vec<u32> = xs[1..].iter().map(|&d| d as u32).collect();
                    self.ctl.extend_from_slice(bytemuck::cast_slice(&payload));
                }
                _ => {
                    self.ctl.extend_from_slice(bytemuck::cast_slice(&xs[1..]));
                }
            }
        }

        xs.clear();
        Ok(())
    }

    /// Emits one pattern unit: flags, size, deferred row markers, and the
    /// jump to the anchor cell. Patterns carry no delta payload.
    fn add_pattern(&mut self, col: u64, pattern: &PatternDescriptor) -> Result<(), CsxError> {
        let size = pattern.size;
        if size as usize > CTL_SIZE_MAX {
            return Err(CsxError::UnitTooLarge(size as usize));
        }
        if pattern.delta > PID_DELTA_MASK {
            return Err(CsxError::PatternDeltaTooWide(pattern.delta));
        }

        let kind = UnitKind::Pattern {
            order: pattern.order,
            delta: pattern.delta,
        };
        let flag = self.get_flag(kind, size)?;
        debug_assert_eq!(flag & !CTL_FLAG_MASK, 0);

        let flags_idx = self.ctl.len();
        self.ctl.push(flag);
        self.ctl.push(size as u8);
        self.update_new_row(flags_idx);

        let jump = col.checked_sub(self.last_col).ok_or_else(|| {
            CsxError::Internal(format!(
                "pattern anchor {} behind the column cursor {}",
                col, self.last_col
            ))
        })?;
        leb128::encode_one(jump, &mut self.ctl);
        self.last_col = pattern.last_col_on_anchor_row(col);
        Ok(())
    }
}
